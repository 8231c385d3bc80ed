//! On-disk storage backend for container root filesystems.
//!
//! Each container gets its own directory under `<root>/containers/<id>`:
//!
//! ```text
//! container.json   metadata (image, mount state, creation time)
//! diff/            writable layer; the root itself under the vfs driver
//! work/            overlay work directory (overlay driver only)
//! merged/          overlay mount point (overlay driver only)
//! lower/           empty lower layer used when no image is given
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use cradle_common::config::StorageDriver;
use cradle_common::error::CradleError;
use cradle_common::types::ContainerId;
use cradle_core::filesystem::{mountinfo, overlayfs};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};
use crate::StorageLayer;

const CONTAINERS_DIR: &str = "containers";
const METADATA_FILE: &str = "container.json";

/// Persisted description of one container's storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContainerMetadata {
    id: ContainerId,
    image: Option<PathBuf>,
    mounted: bool,
    created_at: DateTime<Utc>,
}

/// Storage layer backed by plain directories, optionally overlay-mounted.
#[derive(Debug)]
pub struct LayerStore {
    /// Root directory for all stored data.
    root: PathBuf,
    driver: StorageDriver,
}

impl LayerStore {
    /// Opens or initializes the store at the given root.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>, driver: StorageDriver) -> Result<Self> {
        let root = root.into();
        let containers = root.join(CONTAINERS_DIR);
        std::fs::create_dir_all(&containers).map_err(|e| CradleError::io(&containers, e))?;
        tracing::info!(path = %root.display(), %driver, "opened storage");
        Ok(Self { root, driver })
    }

    /// Returns the root storage path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the configured storage driver.
    #[must_use]
    pub const fn driver(&self) -> StorageDriver {
        self.driver
    }

    /// Returns the directory holding everything stored for a container.
    #[must_use]
    pub fn container_dir(&self, id: &ContainerId) -> PathBuf {
        self.root.join(CONTAINERS_DIR).join(id.as_str())
    }

    /// Returns the path the container's root filesystem is exposed at.
    #[must_use]
    pub fn rootfs_path(&self, id: &ContainerId) -> PathBuf {
        match self.driver {
            StorageDriver::Overlay => self.container_dir(id).join("merged"),
            StorageDriver::Vfs => self.container_dir(id).join("diff"),
        }
    }

    fn metadata_path(&self, id: &ContainerId) -> PathBuf {
        self.container_dir(id).join(METADATA_FILE)
    }

    fn load(&self, id: &ContainerId) -> Result<ContainerMetadata> {
        cradle_common::fs::read_json(&self.metadata_path(id))?
            .ok_or_else(|| StorageError::UnknownContainer { id: id.clone() })
    }

    fn save(&self, meta: &ContainerMetadata) -> Result<()> {
        cradle_common::fs::write_json(&self.metadata_path(&meta.id), meta)?;
        Ok(())
    }

    fn layout(&self, id: &ContainerId, image: Option<&Path>) -> Result<()> {
        let dir = self.container_dir(id);
        let diff = dir.join("diff");
        create_dir(&diff)?;
        match self.driver {
            StorageDriver::Vfs => {
                if let Some(image) = image {
                    copy_tree(image, &diff)?;
                }
            }
            StorageDriver::Overlay => {
                create_dir(&dir.join("work"))?;
                create_dir(&dir.join("merged"))?;
                if image.is_none() {
                    create_dir(&dir.join("lower"))?;
                }
            }
        }
        self.save(&ContainerMetadata {
            id: id.clone(),
            image: image.map(Path::to_path_buf),
            mounted: false,
            created_at: Utc::now(),
        })
    }

    fn overlay_config(&self, meta: &ContainerMetadata) -> overlayfs::OverlayConfig {
        let dir = self.container_dir(&meta.id);
        let lower = meta.image.clone().unwrap_or_else(|| dir.join("lower"));
        overlayfs::OverlayConfig {
            lower_dirs: vec![lower],
            upper_dir: dir.join("diff"),
            work_dir: dir.join("work"),
            merged_dir: dir.join("merged"),
        }
    }
}

impl StorageLayer for LayerStore {
    fn create(&self, id: &ContainerId, image: Option<&Path>) -> Result<()> {
        let dir = self.container_dir(id);
        if dir.exists() {
            return Err(StorageError::AlreadyExists { id: id.clone() });
        }
        if let Err(e) = self.layout(id, image) {
            let _ = std::fs::remove_dir_all(&dir);
            return Err(e);
        }
        tracing::info!(id = %id, driver = %self.driver, "container storage created");
        Ok(())
    }

    fn mount(&self, id: &ContainerId) -> Result<PathBuf> {
        let mut meta = self.load(id)?;
        let rootfs = self.rootfs_path(id);
        if meta.mounted {
            return Ok(rootfs);
        }
        if self.driver == StorageDriver::Overlay {
            overlayfs::mount_overlay(&self.overlay_config(&meta))?;
        }
        meta.mounted = true;
        self.save(&meta)?;
        tracing::debug!(id = %id, rootfs = %rootfs.display(), "container storage mounted");
        Ok(rootfs)
    }

    fn unmount(&self, id: &ContainerId) -> Result<()> {
        let mut meta = self.load(id)?;
        if self.driver == StorageDriver::Overlay {
            let _ = overlayfs::unmount_overlay(&self.rootfs_path(id))?;
        }
        if !meta.mounted {
            tracing::debug!(id = %id, "container storage already unmounted");
            return Ok(());
        }
        meta.mounted = false;
        self.save(&meta)?;
        tracing::debug!(id = %id, "container storage unmounted");
        Ok(())
    }

    fn delete(&self, id: &ContainerId) -> Result<()> {
        let dir = self.container_dir(id);
        if !dir.exists() {
            return Err(StorageError::UnknownContainer { id: id.clone() });
        }
        if let Some(meta) = cradle_common::fs::read_json::<ContainerMetadata>(&self.metadata_path(id))? {
            if meta.mounted {
                return Err(StorageError::StillMounted { id: id.clone() });
            }
        }
        if self.driver == StorageDriver::Overlay && mountinfo::is_mount_point(&self.rootfs_path(id))? {
            return Err(StorageError::StillMounted { id: id.clone() });
        }
        std::fs::remove_dir_all(&dir).map_err(|e| CradleError::io(&dir, e))?;
        tracing::info!(id = %id, "container storage deleted");
        Ok(())
    }

    fn list(&self) -> Result<Vec<ContainerId>> {
        let dir = self.root.join(CONTAINERS_DIR);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CradleError::io(&dir, e).into()),
        };
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CradleError::io(&dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            ids.push(ContainerId::new(name));
        }
        ids.sort();
        Ok(ids)
    }
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| CradleError::io(path, e).into())
}

/// Recursively copies the contents of `src` into `dst`, preserving symlinks.
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            CradleError::io(path, e.into())
        })?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);
        let file_type = entry.file_type();
        let copied = if file_type.is_dir() {
            std::fs::create_dir_all(&target)
        } else if file_type.is_symlink() {
            std::fs::read_link(entry.path())
                .and_then(|link| std::os::unix::fs::symlink(link, &target))
        } else {
            std::fs::copy(entry.path(), &target).map(|_| ())
        };
        copied.map_err(|e| CradleError::io(&target, e))?;
    }
    Ok(())
}
