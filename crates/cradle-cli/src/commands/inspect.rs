//! `cradlectl inspect`: Show a container's status as JSON.

use clap::Args;
use cradle_runtime::service::ContainerStatusResponse;

use super::Session;

/// Arguments for the `inspect` command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Container ID or unique prefix.
    pub container: String,
}

/// Executes the `inspect` command.
///
/// # Errors
///
/// Returns an error if the container is not found.
pub fn execute(args: &InspectArgs, session: &Session) -> anyhow::Result<()> {
    let status = session.lifecycle.status(&args.container)?;
    let view = ContainerStatusResponse::from(status);
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}
