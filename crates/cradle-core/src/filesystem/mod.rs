//! Filesystem management for container root filesystems.
//!
//! Provides `OverlayFS` mounting for layered roots and a reader for the
//! kernel mount table so callers can tell "not mounted" apart from a
//! failed unmount.

pub mod mountinfo;
pub mod overlayfs;
