//! `cradlectl create`: Create a container without starting it.

use std::path::PathBuf;

use clap::Args;
use cradle_runtime::container::ContainerSpec;

use super::Session;

/// Arguments for the `create` command.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Container name, unique among live containers.
    #[arg(long)]
    pub name: String,

    /// Directory to seed the root filesystem from.
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Environment variable for the process, as KEY=VALUE.
    #[arg(short, long = "env", value_parser = parse_env)]
    pub env: Vec<(String, String)>,

    /// Command to run inside the container.
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

fn parse_env(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

/// Executes the `create` command and prints the new container's ID.
///
/// # Errors
///
/// Returns an error if the name is invalid or taken, or provisioning fails.
pub fn execute(args: CreateArgs, session: &Session) -> anyhow::Result<()> {
    let mut spec = ContainerSpec::new(args.name).command(args.command);
    spec.image = args.image;
    spec.env = args.env;

    let container = session.lifecycle.create(spec)?;
    println!("{}", container.id);
    Ok(())
}
