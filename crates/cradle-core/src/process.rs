//! Process signalling and liveness probes.
//!
//! Containers run in their own process group, so termination signals are
//! delivered to the whole group and reach every descendant.

use cradle_common::error::{CradleError, Result};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::{self, Pid};

fn to_pid(pid: u32) -> Result<Pid> {
    let raw = i32::try_from(pid).map_err(|_| CradleError::Config {
        message: format!("pid {pid} out of range"),
    })?;
    Ok(Pid::from_raw(raw))
}

/// Sends `sig` to the process group led by `pgid`.
///
/// Returns `Ok(false)` when the group no longer exists.
///
/// # Errors
///
/// Returns an error if the signal cannot be delivered for any other reason
/// (for example, insufficient permission).
pub fn signal_group(pgid: u32, sig: Signal) -> Result<bool> {
    let pid = to_pid(pgid)?;
    match signal::killpg(pid, sig) {
        Ok(()) => {
            tracing::debug!(pgid, signal = %sig, "signalled process group");
            Ok(true)
        }
        Err(Errno::ESRCH) => Ok(false),
        Err(e) => Err(CradleError::Signal {
            pid: pid.as_raw(),
            source: e.into(),
        }),
    }
}

/// Returns whether `pid` is alive and still leads its own process group.
///
/// Zombies count until they are reaped. Container processes are spawned as group leaders. A recorded PID that
/// fails this check has exited and may have been reused by something else.
#[must_use]
pub fn leads_group(pid: u32) -> bool {
    let Ok(pid) = to_pid(pid) else {
        return false;
    };
    matches!(unistd::getpgid(Some(pid)), Ok(pgid) if pgid == pid)
}

/// Exit code reported for a process terminated by `sig`.
#[must_use]
pub const fn signal_exit_code(sig: Signal) -> i32 {
    128 + sig as i32
}
