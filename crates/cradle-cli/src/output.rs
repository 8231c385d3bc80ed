//! Formatted output helpers for CLI commands.

use chrono::{DateTime, Utc};
use cradle_common::types::{ContainerState, ExitInfo};

/// Formats a container's state, including the exit code once it stopped.
#[must_use]
pub fn format_state(state: ContainerState, exit: Option<&ExitInfo>) -> String {
    match (state, exit) {
        (ContainerState::Stopped, Some(exit)) => format!("exited ({})", exit.code),
        (ContainerState::Stopped, None) => "exited".to_string(),
        (state, _) => state.to_string(),
    }
}

/// Formats how long ago `then` was, relative to `now`.
#[must_use]
pub fn format_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    let (value, unit) = match secs {
        0..60 => (secs, "second"),
        60..3_600 => (secs / 60, "minute"),
        3_600..86_400 => (secs / 3_600, "hour"),
        _ => (secs / 86_400, "day"),
    };
    let plural = if value == 1 { "" } else { "s" };
    format!("{value} {unit}{plural} ago")
}

/// Joins a command line for display, truncated to a table-friendly width.
#[must_use]
pub fn format_command(command: &[String]) -> String {
    const MAX: usize = 30;
    let joined = command.join(" ");
    if joined.chars().count() <= MAX {
        return joined;
    }
    let cut: String = joined.chars().take(MAX - 3).collect();
    format!("{cut}...")
}
