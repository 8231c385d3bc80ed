//! CLI command definitions and dispatch.

pub mod create;
pub mod gc;
pub mod inspect;
pub mod logs;
pub mod ps;
pub mod rm;
pub mod start;
pub mod stop;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cradle_common::config::CradleConfig;
use cradle_runtime::lifecycle::Lifecycle;
use cradle_runtime::state::{self, StateFile};

/// cradlectl: create, run, and remove containers.
#[derive(Parser, Debug)]
#[command(name = cradle_common::constants::BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Root directory for all state. Every path is derived from it.
    #[arg(long, global = true, env = "CRADLE_ROOT", conflicts_with = "config")]
    pub root: Option<PathBuf>,

    /// JSON configuration file.
    #[arg(long, global = true, env = "CRADLE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a container without starting it.
    Create(create::CreateArgs),
    /// Start a created container.
    Start(start::StartArgs),
    /// Stop a running container.
    Stop(stop::StopArgs),
    /// Remove containers, killing them first if needed.
    Rm(rm::RmArgs),
    /// List containers.
    Ps(ps::PsArgs),
    /// Show a container's status as JSON.
    Inspect(inspect::InspectArgs),
    /// Print a container's output.
    Logs(logs::LogsArgs),
    /// Reclaim storage and names left behind by failed removals.
    Gc(gc::GcArgs),
}

/// A lifecycle restored from disk for the duration of one command.
pub struct Session {
    /// Resolved configuration.
    pub config: CradleConfig,
    /// The orchestrator, with persisted containers restored.
    pub lifecycle: Lifecycle,
}

impl Session {
    /// Resolves the configuration and restores persisted containers.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or state cannot be loaded.
    pub fn open(cli: &Cli) -> anyhow::Result<Self> {
        let config = match (&cli.root, &cli.config) {
            (Some(root), _) => CradleConfig::with_root(root),
            (None, Some(path)) => CradleConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            (None, None) => CradleConfig::default(),
        };
        let lifecycle = Lifecycle::open(&config)?;
        let persisted = state::load_state(&config.state_file)
            .with_context(|| format!("loading state {}", config.state_file.display()))?;
        lifecycle.restore(persisted.containers);
        Ok(Self { config, lifecycle })
    }

    /// Persists the current set of containers.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be written.
    pub fn save(&self) -> anyhow::Result<()> {
        let snapshot = StateFile {
            containers: self.lifecycle.snapshot(),
        };
        state::save_state(&self.config.state_file, &snapshot)
            .with_context(|| format!("saving state {}", self.config.state_file.display()))
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// State is saved even when the command fails, since a failed removal
/// may already have unregistered the container.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let session = Session::open(&cli)?;
    let result = match cli.command {
        Command::Create(args) => create::execute(args, &session),
        Command::Start(args) => start::execute(&args, &session),
        Command::Stop(args) => stop::execute(&args, &session),
        Command::Rm(args) => rm::execute(&args, &session),
        Command::Ps(args) => ps::execute(&args, &session),
        Command::Inspect(args) => inspect::execute(&args, &session),
        Command::Logs(args) => logs::execute(&args, &session),
        Command::Gc(args) => gc::execute(&args, &session),
    };
    session.save()?;
    result
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn root_and_config_conflict() {
        let parsed = Cli::try_parse_from([
            "cradlectl", "--root", "/tmp/a", "--config", "/tmp/c.json", "ps",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn global_root_after_subcommand() {
        let cli = Cli::try_parse_from(["cradlectl", "ps", "--root", "/tmp/a"]).unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/a")));
    }
}
