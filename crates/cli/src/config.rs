//! Command-line configuration and the top-level error handler.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use pairmsg_core::Address;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::runner::{self, NodeConfig, NodeError, DEFAULT_ITERATIONS};

/// Pair two processes over a PAIR socket and trade a few messages.
///
/// Start the same command twice with different node names and the same
/// address; the first one listens, the second one dials.
#[derive(Debug, Parser)]
#[command(name = "pairmsg", version)]
pub struct CliConfig {
    /// Node name shown in the logs, e.g. 0 or 1
    pub node: Option<String>,

    /// Address shared by both nodes, e.g. tcp://localhost:54545 or ipc:///tmp/pair.ipc
    pub url: Option<String>,

    /// Number of send/receive round trips
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    pub iterations: usize,

    /// Seconds to wait for each reply
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub recv_timeout_secs: u64,

    /// Milliseconds to pause after each round trip
    #[arg(long, default_value_t = 1000)]
    pub pause_ms: u64,
}

impl CliConfig {
    /// One-line usage string.
    pub fn usage() -> String {
        Self::command().render_usage().to_string()
    }

    /// Node settings, or `None` when a positional argument is missing.
    pub fn node_config(&self) -> Option<Result<NodeConfig, NodeError>> {
        let (node, url) = match (&self.node, &self.url) {
            (Some(node), Some(url)) => (node, url),
            _ => return None,
        };

        let config = Address::parse(url)
            .map(|address| {
                NodeConfig::new(node.clone(), address)
                    .with_iterations(self.iterations)
                    .with_recv_timeout(Duration::from_secs(self.recv_timeout_secs))
                    .with_pause(Duration::from_millis(self.pause_ms))
            })
            .map_err(|source| NodeError::InvalidAddress {
                node: node.clone(),
                url: url.clone(),
                source,
            });
        Some(config)
    }

    /// Run the node and turn the outcome into a process exit code.
    ///
    /// Missing arguments print usage and exit successfully. Any node failure
    /// is logged here, after the endpoint has been closed, and exits non-zero.
    pub fn run(self) -> anyhow::Result<ExitCode> {
        init_tracing();

        let config = match self.node_config() {
            None => {
                info!("{}", Self::usage());
                return Ok(ExitCode::SUCCESS);
            }
            Some(Ok(config)) => config,
            Some(Err(e)) => {
                error!("{}", e);
                return Ok(ExitCode::FAILURE);
            }
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start the async runtime")?;

        match runtime.block_on(runner::run_node(&config)) {
            Ok(_) => Ok(ExitCode::SUCCESS),
            Err(e) => {
                error!("{}", e);
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

/// Log to stderr at INFO unless RUST_LOG says otherwise.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
