//! System-wide constants and default paths.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Default base directory for cradle data when running with root access.
pub const SYSTEM_DATA_DIR: &str = "/var/lib/cradle";

/// Name of the persisted container state file under the root directory.
pub const STATE_FILE_NAME: &str = "state.json";

/// Directory under the root holding one exit-status file per container.
pub const EXITS_DIR_NAME: &str = "exits";

/// Directory under the root owned by the storage layer.
pub const STORAGE_DIR_NAME: &str = "storage";

/// Directory under the root owned by the runtime supervisor.
pub const RUNTIME_DIR_NAME: &str = "runtime";

/// Grace period, in seconds, used by an explicit stop when none is given.
pub const DEFAULT_STOP_TIMEOUT_SECS: i64 = 10;

/// Interval between liveness probes while waiting for a process to exit.
pub const EXIT_POLL_INTERVAL_MS: u64 = 20;

/// Application name used in log output and state files.
pub const APP_NAME: &str = "cradle";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "cradlectl";

/// Returns the data directory, preferring `$HOME/.cradle` for unprivileged
/// users and falling back to `/var/lib/cradle`.
fn resolve_data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        let user_dir = PathBuf::from(home).join(".cradle");
        if std::fs::create_dir_all(&user_dir).is_ok() {
            return user_dir;
        }
    }
    PathBuf::from(SYSTEM_DATA_DIR)
}

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved data directory for this session.
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(resolve_data_dir)
}
