//! Request surface over the lifecycle orchestrator.
//!
//! Transport-agnostic: a server decodes requests into these types and
//! encodes the responses. Every request runs on its own blocking worker.
//! A dispatched request runs to completion even if the caller stops
//! waiting for it.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cradle_common::types::{ContainerState, ExitInfo, StopTimeout};
use serde::{Deserialize, Serialize};

use crate::container::{ContainerSpec, ContainerStatus};
use crate::error::{LifecycleError, Result};
use crate::lifecycle::Lifecycle;

/// Request to remove a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveContainerRequest {
    /// Full container ID or a unique prefix.
    pub container_id: String,
}

/// Empty acknowledgement of a removal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveContainerResponse {}

/// Request to create a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateContainerRequest {
    /// What to create.
    pub spec: ContainerSpec,
}

/// Identity of a created container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateContainerResponse {
    /// Full ID of the new container.
    pub container_id: String,
}

/// Request to start a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartContainerRequest {
    /// Full container ID or a unique prefix.
    pub container_id: String,
}

/// PID of a started container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartContainerResponse {
    /// PID of the container process.
    pub pid: u32,
}

/// Request to stop a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopContainerRequest {
    /// Full container ID or a unique prefix.
    pub container_id: String,
    /// Grace period in seconds. Zero or less kills immediately.
    pub timeout: i64,
}

/// Empty acknowledgement of a stop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopContainerResponse {}

/// Request for a container's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStatusRequest {
    /// Full container ID or a unique prefix.
    pub container_id: String,
}

/// A container's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStatusResponse {
    /// Full container ID.
    pub id: String,
    /// Container name.
    pub name: String,
    /// Process state.
    pub state: ContainerState,
    /// PID while running.
    pub pid: Option<u32>,
    /// Last recorded exit.
    pub exit: Option<ExitInfo>,
    /// Root filesystem path.
    pub rootfs: PathBuf,
    /// File the container's output is written to.
    pub log_path: Option<PathBuf>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<ContainerStatus> for ContainerStatusResponse {
    fn from(status: ContainerStatus) -> Self {
        Self {
            id: status.container.id.to_string(),
            name: status.container.name.clone(),
            state: status.state,
            pid: status.pid,
            exit: status.exit,
            rootfs: status.container.rootfs.clone(),
            log_path: status.log_path,
            created_at: status.container.created_at,
        }
    }
}

/// Async front end of a [`Lifecycle`].
#[derive(Debug, Clone)]
pub struct RuntimeService {
    lifecycle: Arc<Lifecycle>,
}

impl RuntimeService {
    /// Wraps a shared orchestrator.
    #[must_use]
    pub const fn new(lifecycle: Arc<Lifecycle>) -> Self {
        Self { lifecycle }
    }

    /// The orchestrator behind this service.
    #[must_use]
    pub const fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    async fn dispatch<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Lifecycle) -> Result<T> + Send + 'static,
    {
        let lifecycle = Arc::clone(&self.lifecycle);
        tokio::task::spawn_blocking(move || f(&lifecycle))
            .await
            .map_err(|source| LifecycleError::Worker { operation, source })?
    }

    /// Removes a container.
    ///
    /// # Errors
    ///
    /// Returns the orchestrator's error, or [`LifecycleError::Worker`] if
    /// the worker died.
    pub async fn remove_container(
        &self,
        request: RemoveContainerRequest,
    ) -> Result<RemoveContainerResponse> {
        tracing::debug!(?request, "RemoveContainer");
        let id = request.container_id;
        let result = self.dispatch("remove", move |lc| lc.remove(&id)).await;
        log_result("RemoveContainer", &result);
        result.map(|()| RemoveContainerResponse {})
    }

    /// Creates a container.
    ///
    /// # Errors
    ///
    /// As [`RuntimeService::remove_container`].
    pub async fn create_container(
        &self,
        request: CreateContainerRequest,
    ) -> Result<CreateContainerResponse> {
        tracing::debug!(?request, "CreateContainer");
        let result = self
            .dispatch("create", move |lc| lc.create(request.spec))
            .await
            .map(|c| CreateContainerResponse {
                container_id: c.id.to_string(),
            });
        log_result("CreateContainer", &result);
        result
    }

    /// Starts a container.
    ///
    /// # Errors
    ///
    /// As [`RuntimeService::remove_container`].
    pub async fn start_container(
        &self,
        request: StartContainerRequest,
    ) -> Result<StartContainerResponse> {
        tracing::debug!(?request, "StartContainer");
        let id = request.container_id;
        let result = self
            .dispatch("start", move |lc| lc.start(&id))
            .await
            .map(|pid| StartContainerResponse { pid });
        log_result("StartContainer", &result);
        result
    }

    /// Stops a container.
    ///
    /// # Errors
    ///
    /// As [`RuntimeService::remove_container`].
    pub async fn stop_container(
        &self,
        request: StopContainerRequest,
    ) -> Result<StopContainerResponse> {
        tracing::debug!(?request, "StopContainer");
        let timeout = StopTimeout::from_secs(request.timeout);
        let id = request.container_id;
        let result = self
            .dispatch("stop", move |lc| lc.stop(&id, timeout))
            .await
            .map(|()| StopContainerResponse {});
        log_result("StopContainer", &result);
        result
    }

    /// Reports a container's status.
    ///
    /// # Errors
    ///
    /// As [`RuntimeService::remove_container`].
    pub async fn container_status(
        &self,
        request: ContainerStatusRequest,
    ) -> Result<ContainerStatusResponse> {
        tracing::debug!(?request, "ContainerStatus");
        let id = request.container_id;
        let result = self
            .dispatch("status", move |lc| lc.status(&id))
            .await
            .map(ContainerStatusResponse::from);
        log_result("ContainerStatus", &result);
        result
    }
}

fn log_result<T: std::fmt::Debug>(method: &str, result: &Result<T>) {
    match result {
        Ok(response) => tracing::debug!(method, ?response, "request succeeded"),
        Err(e) => tracing::debug!(method, error = %e, "request failed"),
    }
}
