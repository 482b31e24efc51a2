//! Vigil Flow agent: the polling loop, its configuration, and the CLI.

pub mod agent;
pub mod cli;
pub mod config;
