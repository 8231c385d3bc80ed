//! `cradlectl gc`: Reclaim what failed removals left behind.

use clap::Args;

use super::Session;

/// Arguments for the `gc` command.
#[derive(Args, Debug)]
pub struct GcArgs {}

/// Executes the `gc` command.
///
/// # Errors
///
/// Returns an error if storage cannot be listed or an orphan could not be
/// reclaimed.
pub fn execute(_args: &GcArgs, session: &Session) -> anyhow::Result<()> {
    let report = session.lifecycle.sweep()?;
    if report.is_empty() {
        println!("Nothing to reclaim.");
        return Ok(());
    }

    for id in &report.storage_deleted {
        println!("deleted storage     {id}");
    }
    for id in &report.index_entries_deleted {
        println!("dropped index entry {id}");
    }
    for name in &report.names_released {
        println!("released name       {name}");
    }
    for (id, reason) in &report.failures {
        eprintln!("Error: {id}: {reason}");
    }

    if !report.failures.is_empty() {
        anyhow::bail!("{} orphans could not be reclaimed", report.failures.len());
    }
    Ok(())
}
