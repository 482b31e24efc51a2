//! `vigil records` - recently persisted records.

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;
use vigil_sinks::SqliteSink;

use crate::config::{AgentConfig, SinkBackend};

#[derive(Args, Debug)]
pub struct RecordsArgs {
    /// Path to the config file
    #[arg(long, default_value = "vigil.toml")]
    pub config: PathBuf,

    /// How many records to show
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

pub fn run(args: RecordsArgs) -> Result<()> {
    let config = AgentConfig::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;

    if config.sink.backend != SinkBackend::Sqlite {
        bail!("`vigil records` requires the sqlite sink backend");
    }

    let sink =
        SqliteSink::open(&config.sink.database_path).context("Failed to open record database")?;
    let rows = sink.recent(args.limit)?;
    if rows.is_empty() {
        println!("No records yet.");
        return Ok(());
    }

    for row in rows {
        println!(
            "#{:<5} {}  {:<9} {:<24} {:<24} confidence {:.2}",
            row.id, row.captured_at, row.profile, row.artifact, row.label, row.confidence
        );
    }
    Ok(())
}
