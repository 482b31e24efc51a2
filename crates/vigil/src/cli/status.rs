//! `vigil status` - per-stage artifact counts.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use vigil_protocol::Stage;
use vigil_tracker::StageTracker;

use crate::config::AgentConfig;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Path to the config file
    #[arg(long, default_value = "vigil.toml")]
    pub config: PathBuf,
}

pub fn run(args: StatusArgs) -> Result<()> {
    let config = AgentConfig::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let tracker =
        StageTracker::new(config.stages.to_layout()).context("Failed to set up stage directories")?;

    println!("Stage tree: {}", tracker.layout().root.display());
    for stage in Stage::all() {
        let count = tracker.count(stage)?;
        println!(
            "  {:<12} {:<16} {}",
            stage.as_str(),
            tracker.layout().dir_name(stage),
            count
        );
    }
    Ok(())
}
