//! # cradle-core
//!
//! Low-level Linux primitives for the cradle lifecycle core.
//!
//! This crate provides safe wrappers over:
//! - **Filesystem**: `OverlayFS` mount and idempotent unmount, plus
//!   mount-table inspection through `/proc/self/mountinfo`.
//! - **Process**: process-group signalling and liveness probes used by
//!   the runtime supervisor to stop containers.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod filesystem;
pub mod process;
