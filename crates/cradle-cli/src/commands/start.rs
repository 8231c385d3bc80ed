//! `cradlectl start`: Start a created container.

use clap::Args;

use super::Session;

/// Arguments for the `start` command.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Container ID or unique prefix.
    pub container: String,
}

/// Executes the `start` command.
///
/// # Errors
///
/// Returns an error if the container is unknown, not in `created` state,
/// or its process cannot be spawned.
pub fn execute(args: &StartArgs, session: &Session) -> anyhow::Result<()> {
    let pid = session.lifecycle.start(&args.container)?;
    tracing::debug!(container = %args.container, pid, "started");
    println!("{}", args.container);
    Ok(())
}
