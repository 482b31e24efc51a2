//! Command-line interface for the Vigil agent.
//!
//! One file per command; each exposes an args struct and a `run`
//! function returning `anyhow::Result<()>`.

use clap::{Parser, Subcommand};

pub mod init;
pub mod records;
pub mod run;
pub mod status;

#[derive(Parser, Debug)]
#[command(
    name = "vigil",
    version,
    about = "Folder-watching detection agent: images in, findings out"
)]
pub struct Cli {
    /// Raise console logging to debug
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default vigil.toml
    Init(init::InitArgs),
    /// Run the polling loop
    Run(run::RunArgs),
    /// Show per-stage artifact counts
    Status(status::StatusArgs),
    /// Show recently persisted records (sqlite sink only)
    Records(records::RecordsArgs),
}

pub fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Init(args) => init::run(args),
        Command::Run(args) => run::run(args),
        Command::Status(args) => status::run(args),
        Command::Records(args) => records::run(args),
    }
}
