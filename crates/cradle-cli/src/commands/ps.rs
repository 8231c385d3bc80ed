//! `cradlectl ps`: List containers.

use clap::Args;
use cradle_common::types::ContainerState;

use super::Session;
use crate::output;

/// Arguments for the `ps` command.
#[derive(Args, Debug)]
pub struct PsArgs {
    /// Show all containers (including created and stopped).
    #[arg(short, long)]
    pub all: bool,

    /// Only print container IDs.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Executes the `ps` command.
///
/// # Errors
///
/// Returns an error if a container's status cannot be read.
pub fn execute(args: &PsArgs, session: &Session) -> anyhow::Result<()> {
    let statuses: Vec<_> = session
        .lifecycle
        .list()?
        .into_iter()
        .filter(|s| args.all || s.state == ContainerState::Running)
        .collect();

    if args.quiet {
        for s in &statuses {
            println!("{}", s.container.id);
        }
        return Ok(());
    }

    if statuses.is_empty() {
        println!("No containers found.");
        return Ok(());
    }

    let now = chrono::Utc::now();
    println!(
        "{:<14} {:<20} {:<14} {:<8} {:<16} {}",
        "CONTAINER ID", "NAME", "STATUS", "PID", "CREATED", "COMMAND"
    );
    for s in &statuses {
        println!(
            "{:<14} {:<20} {:<14} {:<8} {:<16} {}",
            s.container.id.short(),
            s.container.name,
            output::format_state(s.state, s.exit.as_ref()),
            s.pid.map_or_else(|| "-".to_string(), |p| p.to_string()),
            output::format_age(s.container.created_at, now),
            output::format_command(&s.container.command),
        );
    }

    Ok(())
}
