//! `vigil run` - the polling loop.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::agent::{Agent, AgentSettings};
use crate::config::{AgentConfig, SinkBackend};
use vigil_sinks::{JsonlSink, RecordSink, SqliteSink};
use vigil_tracker::StageTracker;
use vigil_vision::{GeminiAnalyzer, GeminiConfig};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the config file
    #[arg(long, default_value = "vigil.toml")]
    pub config: PathBuf,

    /// Do a single poll pass and exit
    #[arg(long)]
    pub once: bool,

    /// Gemini API key (prefer the environment variable)
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = AgentConfig::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;

    let api_key = args
        .api_key
        .filter(|key| !key.trim().is_empty())
        .context("GEMINI_API_KEY is not set; export it or pass --api-key")?;

    let tracker =
        StageTracker::new(config.stages.to_layout()).context("Failed to set up stage directories")?;

    let analyzer = GeminiAnalyzer::new(
        GeminiConfig {
            api_key,
            model: config.gemini.model.clone(),
            endpoint: config.gemini.endpoint.clone(),
        },
        config.agent.profile,
    )
    .context("Failed to build analyzer")?;

    let sink: Box<dyn RecordSink> = match config.sink.backend {
        SinkBackend::Sqlite => Box::new(
            SqliteSink::open(&config.sink.database_path).context("Failed to open record database")?,
        ),
        SinkBackend::Jsonl => Box::new(
            JsonlSink::open(&config.sink.jsonl_path).context("Failed to open record log")?,
        ),
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::Relaxed);
        })
        .context("Failed to install interrupt handler")?;
    }

    let settings = AgentSettings {
        poll_interval: Duration::from_secs(config.agent.poll_interval_secs),
        confidence_threshold: config.agent.confidence_threshold,
        success_policy: config.agent.success_policy,
    };

    info!(profile = %config.agent.profile, "Starting agent");
    let agent = Agent::new(tracker, analyzer, sink, settings, shutdown);
    if args.once {
        agent.run_once();
    } else {
        agent.run();
    }
    Ok(())
}
