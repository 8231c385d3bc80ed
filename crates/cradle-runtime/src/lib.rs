//! Container lifecycle management for the cradle daemon.
//!
//! The [`Lifecycle`](lifecycle::Lifecycle) orchestrator is the only place
//! that touches every backing store of a container: the in-memory
//! [`Registry`](registry::Registry), the name and ID
//! [`index`], the [`RuntimeSupervisor`](supervisor::RuntimeSupervisor)
//! that owns the process, the storage layer that owns the root
//! filesystem, and the [`ExitStore`](exits::ExitStore). It keeps them
//! consistent without cross-store transactions by running every
//! operation as a fixed sequence of steps, serialized per container ID.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod container;
pub mod error;
pub mod exits;
pub mod index;
pub mod lifecycle;
pub mod locks;
pub mod logs;
pub mod registry;
pub mod service;
pub mod state;
pub mod supervisor;
