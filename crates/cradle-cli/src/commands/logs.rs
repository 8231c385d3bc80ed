//! `cradlectl logs`: Print a container's output.

use clap::Args;

use super::Session;

/// Arguments for the `logs` command.
#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Container ID or unique prefix.
    pub container: String,
}

/// Executes the `logs` command.
///
/// # Errors
///
/// Returns an error if the container is not found or its log is unreadable.
pub fn execute(args: &LogsArgs, session: &Session) -> anyhow::Result<()> {
    let logs = session.lifecycle.logs(&args.container)?;
    print!("{logs}");
    Ok(())
}
