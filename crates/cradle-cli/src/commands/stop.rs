//! `cradlectl stop`: Stop a running container.

use clap::Args;
use cradle_common::types::StopTimeout;

use super::Session;

/// Arguments for the `stop` command.
#[derive(Args, Debug)]
pub struct StopArgs {
    /// Container ID or unique prefix.
    pub container: String,

    /// Seconds to wait before killing. Zero or less kills immediately.
    #[arg(short = 't', long = "time", allow_negative_numbers = true)]
    pub timeout: Option<i64>,
}

/// Executes the `stop` command.
///
/// # Errors
///
/// Returns an error if the container is unknown or cannot be stopped.
pub fn execute(args: &StopArgs, session: &Session) -> anyhow::Result<()> {
    let secs = args
        .timeout
        .unwrap_or(session.config.default_stop_timeout_secs);
    session
        .lifecycle
        .stop(&args.container, StopTimeout::from_secs(secs))?;
    println!("{}", args.container);
    Ok(())
}
