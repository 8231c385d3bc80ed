//! # cradlectl: cradle CLI
//!
//! Drives the container lifecycle core from the command line. Every
//! invocation restores the persisted state, runs one operation, and saves
//! the state again.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod commands;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;

/// Reads `RUST_LOG`, falling back to `info` for the cradle crates.
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

const DEFAULT_LOG_FILTER: &str =
    "warn,cradlectl=info,cradle_common=info,cradle_core=info,cradle_storage=info,cradle_runtime=info";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(app = cradle_common::constants::APP_NAME, ?cli, "starting");
    commands::execute(cli)
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::filter::LevelFilter;

    use super::*;

    #[test]
    fn default_filter_shows_info() {
        let filter = EnvFilter::new(DEFAULT_LOG_FILTER);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }
}
