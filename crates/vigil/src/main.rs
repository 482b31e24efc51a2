use anyhow::Result;
use clap::Parser;
use vigil::cli::{self, Cli};
use vigil_logging::LogConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    vigil_logging::init_logging(LogConfig {
        app_name: "vigil",
        verbose: cli.verbose,
    })?;

    cli::dispatch(cli)
}
