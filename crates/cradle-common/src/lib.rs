//! # cradle-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the cradle workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and provides the identifiers and lifecycle primitives
//! that the storage layer, the runtime supervisor, and the lifecycle
//! orchestrator all agree on.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod fs;
pub mod types;
