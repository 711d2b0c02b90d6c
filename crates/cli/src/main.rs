//! CLI entry point for pairmsg.

use std::process::ExitCode;

use clap::Parser;
use pairmsg_cli::CliConfig;

fn main() -> anyhow::Result<ExitCode> {
    let config = CliConfig::parse();
    config.run()
}
