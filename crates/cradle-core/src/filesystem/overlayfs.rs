//! `OverlayFS` management for layered container root filesystems.
//!
//! Stacks the read-only image directory under a per-container writable
//! diff, giving each container a copy-on-write root.

use std::path::{Path, PathBuf};

use cradle_common::error::{CradleError, Result};

/// Configuration for an `OverlayFS` mount.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Read-only lower layers (bottom to top).
    pub lower_dirs: Vec<PathBuf>,
    /// Writable upper layer directory.
    pub upper_dir: PathBuf,
    /// Work directory required by `OverlayFS`.
    pub work_dir: PathBuf,
    /// Final merged mount point.
    pub merged_dir: PathBuf,
}

impl OverlayConfig {
    /// Renders the `mount(2)` data string for this configuration.
    ///
    /// Lower layers are listed top-most first, as the kernel expects.
    #[must_use]
    pub fn mount_options(&self) -> String {
        let lowers = self
            .lower_dirs
            .iter()
            .rev()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(":");
        format!(
            "lowerdir={},upperdir={},workdir={}",
            lowers,
            self.upper_dir.display(),
            self.work_dir.display()
        )
    }
}

/// Mounts an `OverlayFS` with the given configuration.
///
/// Creates the upper, work, and merged directories if they do not exist,
/// then issues the `mount(2)` syscall with overlay-specific options.
///
/// # Errors
///
/// Returns an error if there is no lower layer, if directory creation
/// fails, or if the mount syscall fails.
#[cfg(target_os = "linux")]
pub fn mount_overlay(config: &OverlayConfig) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    if config.lower_dirs.is_empty() {
        return Err(CradleError::Config {
            message: "overlay mount needs at least one lower directory".into(),
        });
    }
    for dir in [&config.upper_dir, &config.work_dir, &config.merged_dir] {
        std::fs::create_dir_all(dir).map_err(|e| CradleError::io(dir, e))?;
    }

    let opts = config.mount_options();
    mount(
        Some("overlay"),
        &config.merged_dir,
        Some("overlay"),
        MsFlags::empty(),
        Some(opts.as_str()),
    )
    .map_err(|e| CradleError::io(&config.merged_dir, e.into()))?;

    tracing::info!(merged = %config.merged_dir.display(), "overlayfs mounted");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: `OverlayFS` mounting requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn mount_overlay(_config: &OverlayConfig) -> Result<()> {
    Err(CradleError::Config {
        message: "the overlay storage driver requires Linux".into(),
    })
}

/// Unmounts the filesystem at `merged_dir` if one is mounted there.
///
/// Returns `Ok(false)` without touching the kernel when nothing is
/// mounted, so a teardown interrupted after its unmount can be retried.
/// Uses `MNT_DETACH` to lazily detach a busy filesystem.
///
/// # Errors
///
/// Returns an error if the mount table cannot be read or the unmount
/// syscall fails.
#[cfg(target_os = "linux")]
pub fn unmount_overlay(merged_dir: &Path) -> Result<bool> {
    if !super::mountinfo::is_mount_point(merged_dir)? {
        tracing::debug!(path = %merged_dir.display(), "not mounted, skipping unmount");
        return Ok(false);
    }
    nix::mount::umount2(merged_dir, nix::mount::MntFlags::MNT_DETACH)
        .map_err(|e| CradleError::io(merged_dir, e.into()))?;
    tracing::info!(path = %merged_dir.display(), "overlayfs unmounted");
    Ok(true)
}

/// Stub for non-Linux platforms, where nothing can have been mounted.
///
/// # Errors
///
/// Never fails on non-Linux platforms.
#[cfg(not(target_os = "linux"))]
pub fn unmount_overlay(_merged_dir: &Path) -> Result<bool> {
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OverlayConfig {
        OverlayConfig {
            lower_dirs: vec![PathBuf::from("/img/base"), PathBuf::from("/img/app")],
            upper_dir: PathBuf::from("/c/diff"),
            work_dir: PathBuf::from("/c/work"),
            merged_dir: PathBuf::from("/c/merged"),
        }
    }

    #[test]
    fn mount_options_list_top_layer_first() {
        assert_eq!(
            config().mount_options(),
            "lowerdir=/img/app:/img/base,upperdir=/c/diff,workdir=/c/work"
        );
    }

    #[test]
    fn unmount_of_plain_directory_is_a_no_op() {
        let dir = tempfile::tempdir().expect("tempdir");
        let unmounted = unmount_overlay(dir.path()).expect("unmount");
        assert!(!unmounted);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn mount_without_lower_layers_is_rejected() {
        let mut cfg = config();
        cfg.lower_dirs.clear();
        let err = mount_overlay(&cfg).unwrap_err();
        assert!(err.to_string().contains("lower directory"));
    }
}
