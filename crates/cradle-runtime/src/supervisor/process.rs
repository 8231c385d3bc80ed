//! Runtime supervisor backed by host processes.
//!
//! Each container process runs in its own process group, with the
//! container root as its working directory and its output appended to a
//! log file. The supervisor keeps a record per container under
//! `<root>/<id>/state.json`, so a later daemon process can pick up
//! containers started by an earlier one.

use std::collections::HashMap;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use cradle_common::constants::EXIT_POLL_INTERVAL_MS;
use cradle_common::error::CradleError;
use cradle_common::types::{ContainerId, ContainerState, StopTimeout};
use cradle_core::process::{leads_group, signal_exit_code, signal_group};
use nix::sys::signal::Signal;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::RuntimeSupervisor;
use crate::container::Container;
use crate::error::RuntimeError;
use crate::exits::ExitStore;
use crate::logs;

const RECORD_FILE: &str = "state.json";

/// The supervisor's persisted view of one container.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProcessRecord {
    id: ContainerId,
    command: Vec<String>,
    env: Vec<(String, String)>,
    rootfs: PathBuf,
    state: ContainerState,
    pid: Option<u32>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

enum Probe {
    Alive,
    Exited(Option<i32>),
}

enum Wait {
    Exited(Option<i32>),
    TimedOut,
}

/// Supervisor that runs each container as a host process group.
pub struct ProcessSupervisor {
    root: PathBuf,
    exits: ExitStore,
    records: Mutex<HashMap<ContainerId, ProcessRecord>>,
    children: Mutex<HashMap<ContainerId, Child>>,
    poll_interval: Duration,
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("root", &self.root)
            .field("exits", &self.exits)
            .finish_non_exhaustive()
    }
}

impl ProcessSupervisor {
    /// Creates a supervisor keeping its records under `root` and writing
    /// observed exits to `exits`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, exits: ExitStore) -> Self {
        Self {
            root: root.into(),
            exits,
            records: Mutex::new(HashMap::new()),
            children: Mutex::new(HashMap::new()),
            poll_interval: Duration::from_millis(EXIT_POLL_INTERVAL_MS),
        }
    }

    /// Returns the directory holding per-container records.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_dir(&self, id: &ContainerId) -> PathBuf {
        self.root.join(id.as_str())
    }

    fn load(&self, id: &ContainerId) -> Result<Option<ProcessRecord>, RuntimeError> {
        if let Some(record) = self.records.lock().get(id) {
            return Ok(Some(record.clone()));
        }
        let path = self.record_dir(id).join(RECORD_FILE);
        let loaded: Option<ProcessRecord> = cradle_common::fs::read_json(&path)?;
        if let Some(record) = &loaded {
            let _ = self.records.lock().insert(id.clone(), record.clone());
        }
        Ok(loaded)
    }

    fn require(&self, id: &ContainerId) -> Result<ProcessRecord, RuntimeError> {
        self.load(id)?
            .ok_or_else(|| RuntimeError::UnknownContainer { id: id.clone() })
    }

    fn persist(&self, record: &ProcessRecord) -> Result<(), RuntimeError> {
        let path = self.record_dir(&record.id).join(RECORD_FILE);
        cradle_common::fs::write_json(&path, record)?;
        let _ = self.records.lock().insert(record.id.clone(), record.clone());
        Ok(())
    }

    /// Checks whether a running container's process is still there.
    ///
    /// A child spawned by this supervisor is polled directly. A process
    /// adopted from an earlier supervisor is judged by group leadership.
    fn probe(&self, id: &ContainerId, pid: u32) -> Probe {
        {
            let mut children = self.children.lock();
            if let Some(child) = children.get_mut(id) {
                match child.try_wait() {
                    Ok(Some(status)) => {
                        let _ = children.remove(id);
                        return Probe::Exited(Some(exit_code(status)));
                    }
                    Ok(None) => return Probe::Alive,
                    Err(e) => tracing::warn!(id = %id, error = %e, "try_wait failed, probing pid"),
                }
            }
        }
        // An adopted pid only counts while it still leads the group we
        // spawned; otherwise it has exited and may since have been reused.
        if leads_group(pid) {
            Probe::Alive
        } else {
            Probe::Exited(None)
        }
    }

    /// Brings a `Running` record up to date with the process it describes.
    fn refresh(&self, record: &mut ProcessRecord) -> Result<(), RuntimeError> {
        if record.state != ContainerState::Running {
            return Ok(());
        }
        let code = match record.pid {
            Some(pid) => match self.probe(&record.id, pid) {
                Probe::Alive => return Ok(()),
                Probe::Exited(code) => code,
            },
            None => None,
        };
        self.mark_stopped(record, code)
    }

    fn mark_stopped(&self, record: &mut ProcessRecord, code: Option<i32>) -> Result<(), RuntimeError> {
        record.state = ContainerState::Stopped;
        record.pid = None;
        record.finished_at = Some(Utc::now());
        if let Some(code) = code {
            self.exits.record(&record.id, code)?;
        }
        self.persist(record)?;
        tracing::info!(id = %record.id, code = ?code, "container stopped");
        Ok(())
    }

    /// Settles a record whose process group was gone when signalled.
    fn vanished(&self, record: &mut ProcessRecord, pid: u32) -> Result<(), RuntimeError> {
        let code = match self.probe(&record.id, pid) {
            Probe::Exited(code) => code,
            Probe::Alive => None,
        };
        tracing::debug!(id = %record.id, pid, "process group already gone");
        self.mark_stopped(record, code)
    }

    fn wait_for_exit(&self, id: &ContainerId, pid: u32, deadline: Option<Instant>) -> Wait {
        loop {
            if let Probe::Exited(code) = self.probe(id, pid) {
                return Wait::Exited(code);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Wait::TimedOut;
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    fn spawn(&self, record: &ProcessRecord) -> Result<Child, RuntimeError> {
        let id = &record.id;
        let Some((program, args)) = record.command.split_first() else {
            return Err(RuntimeError::EmptyCommand { id: id.clone() });
        };
        let log = logs::log_path(&self.root, id);
        let stdout = logs::open_for_append(&log)?;
        let stderr = stdout.try_clone().map_err(|e| CradleError::io(&log, e))?;
        Command::new(program)
            .args(args)
            .envs(record.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&record.rootfs)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .process_group(0)
            .spawn()
            .map_err(|source| RuntimeError::Spawn {
                id: id.clone(),
                source,
            })
    }

    fn reap(&self, id: &ContainerId, pid: u32) {
        let _ = signal_group(pid, Signal::SIGKILL);
        if let Some(mut child) = self.children.lock().remove(id) {
            let _ = child.wait();
        }
    }
}

impl RuntimeSupervisor for ProcessSupervisor {
    fn create(&self, container: &Container, rootfs: &Path) -> Result<(), RuntimeError> {
        if self.load(&container.id)?.is_some() {
            return Err(RuntimeError::AlreadyExists {
                id: container.id.clone(),
            });
        }
        self.persist(&ProcessRecord {
            id: container.id.clone(),
            command: container.command.clone(),
            env: container.env.clone(),
            rootfs: rootfs.to_path_buf(),
            state: ContainerState::Created,
            pid: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        })?;
        tracing::debug!(id = %container.id, "runtime record created");
        Ok(())
    }

    fn start(&self, id: &ContainerId) -> Result<u32, RuntimeError> {
        let mut record = self.require(id)?;
        if record.state != ContainerState::Created {
            return Err(RuntimeError::InvalidState {
                id: id.clone(),
                state: record.state,
            });
        }
        let child = self.spawn(&record)?;
        let pid = child.id();
        let _ = self.children.lock().insert(id.clone(), child);

        record.state = ContainerState::Running;
        record.pid = Some(pid);
        record.started_at = Some(Utc::now());
        if let Err(e) = self.persist(&record) {
            // An unrecorded process could never be stopped again.
            self.reap(id, pid);
            return Err(e);
        }
        tracing::info!(id = %id, pid, "container started");
        Ok(pid)
    }

    fn status(&self, id: &ContainerId) -> ContainerState {
        let mut record = match self.load(id) {
            Ok(Some(record)) => record,
            Ok(None) => return ContainerState::Unknown,
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "unreadable runtime record");
                return ContainerState::Unknown;
            }
        };
        if let Err(e) = self.refresh(&mut record) {
            tracing::warn!(id = %id, error = %e, "failed to refresh container state");
        }
        record.state
    }

    fn pid(&self, id: &ContainerId) -> Option<u32> {
        let mut record = self.load(id).ok()??;
        self.refresh(&mut record).ok()?;
        record.pid
    }

    fn stop(&self, id: &ContainerId, timeout: StopTimeout) -> Result<(), RuntimeError> {
        let mut record = self.require(id)?;
        self.refresh(&mut record)?;
        match (record.state, record.pid) {
            (ContainerState::Running, Some(pid)) => {
                if let StopTimeout::Bounded(grace) = timeout {
                    if !signal_group(pid, Signal::SIGTERM)? {
                        return self.vanished(&mut record, pid);
                    }
                    match self.wait_for_exit(id, pid, Some(Instant::now() + grace)) {
                        Wait::Exited(code) => {
                            let code = code.unwrap_or_else(|| signal_exit_code(Signal::SIGTERM));
                            return self.mark_stopped(&mut record, Some(code));
                        }
                        Wait::TimedOut => {
                            tracing::warn!(id = %id, pid, %timeout, "graceful stop timed out, killing");
                        }
                    }
                }
                if !signal_group(pid, Signal::SIGKILL)? {
                    return self.vanished(&mut record, pid);
                }
                let code = match self.wait_for_exit(id, pid, None) {
                    Wait::Exited(code) => code,
                    // Unreachable without a deadline.
                    Wait::TimedOut => None,
                };
                let code = code.unwrap_or_else(|| signal_exit_code(Signal::SIGKILL));
                self.mark_stopped(&mut record, Some(code))
            }
            // Never started, or the record lost its pid: there is nothing to kill.
            (ContainerState::Created | ContainerState::Running, _) => {
                self.mark_stopped(&mut record, None)
            }
            (ContainerState::Stopped | ContainerState::Unknown, _) => Ok(()),
        }
    }

    fn delete(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        let mut record = self.require(id)?;
        self.refresh(&mut record)?;
        if record.state == ContainerState::Running {
            return Err(RuntimeError::InvalidState {
                id: id.clone(),
                state: record.state,
            });
        }
        let dir = self.record_dir(id);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(CradleError::io(dir, e).into()),
        }
        let _ = self.records.lock().remove(id);
        let _ = self.children.lock().remove(id);
        tracing::debug!(id = %id, "runtime record deleted");
        Ok(())
    }

    fn log_path(&self, id: &ContainerId) -> Option<PathBuf> {
        Some(logs::log_path(&self.root, id))
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(-1)
}
