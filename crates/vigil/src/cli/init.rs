//! `vigil init` - write the default configuration file.

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_TOML;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Where to write the config
    #[arg(long, default_value = "vigil.toml")]
    pub path: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    if args.path.exists() && !args.force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            args.path.display()
        );
    }
    std::fs::write(&args.path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("Failed to write {}", args.path.display()))?;
    println!("Wrote {}", args.path.display());
    Ok(())
}
