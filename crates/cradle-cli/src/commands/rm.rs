//! `cradlectl rm`: Remove containers, killing them first if needed.

use clap::Args;
use cradle_runtime::lifecycle::Cancellation;

use super::Session;

/// Arguments for the `rm` command.
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Container IDs or unique prefixes.
    #[arg(required = true)]
    pub containers: Vec<String>,
}

/// Executes the `rm` command.
///
/// Containers are removed one after another. Ctrl+C skips the removals
/// that have not begun yet; one already in progress runs to the end.
///
/// # Errors
///
/// Returns an error if any removal failed or was cancelled.
pub fn execute(args: &RmArgs, session: &Session) -> anyhow::Result<()> {
    let cancel = Cancellation::new();
    let handler = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler.cancel()) {
        tracing::warn!(error = %e, "could not install Ctrl+C handler");
    }

    let mut failed = 0usize;
    for container in &args.containers {
        match session.lifecycle.remove_cancellable(container, &cancel) {
            Ok(()) => println!("{container}"),
            Err(e) => {
                tracing::error!(container = %container, error = %e, "remove failed");
                eprintln!("Error: {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("failed to remove {failed} of {} containers", args.containers.len());
    }
    Ok(())
}
