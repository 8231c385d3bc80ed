//! Kernel mount table inspection.

use std::path::{Path, PathBuf};

use cradle_common::error::{CradleError, Result};

const MOUNTINFO_PATH: &str = "/proc/self/mountinfo";

/// Returns the mount points listed in a `mountinfo` document.
///
/// The fifth whitespace-separated field of each line is the mount point,
/// with spaces, tabs, newlines, and backslashes octal-escaped by the kernel.
#[must_use]
pub fn parse_mount_points(mountinfo: &str) -> Vec<PathBuf> {
    mountinfo
        .lines()
        .filter_map(|line| line.split_whitespace().nth(4))
        .map(|field| PathBuf::from(unescape(field)))
        .collect()
}

/// Returns whether `path` is currently a mount point in this mount namespace.
///
/// # Errors
///
/// Returns an error if the mount table cannot be read.
pub fn is_mount_point(path: &Path) -> Result<bool> {
    let table = std::fs::read_to_string(MOUNTINFO_PATH)
        .map_err(|e| CradleError::io(MOUNTINFO_PATH, e))?;
    Ok(parse_mount_points(&table).iter().any(|p| p == path))
}

fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            if let Some(code) = field
                .get(i + 1..i + 4)
                .and_then(|digits| u8::from_str_radix(digits, 8).ok())
            {
                out.push(code);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
22 1 8:1 / / rw,relatime shared:1 - ext4 /dev/sda1 rw
36 22 0:32 / /var/lib/cradle/storage/containers/abc/merged rw - overlay overlay rw,lowerdir=/img
37 22 0:33 / /mnt/with\\040space rw - tmpfs tmpfs rw
";

    #[test]
    fn parses_mount_point_column() {
        let points = parse_mount_points(SAMPLE);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], PathBuf::from("/"));
        assert_eq!(
            points[1],
            PathBuf::from("/var/lib/cradle/storage/containers/abc/merged")
        );
    }

    #[test]
    fn unescapes_octal_sequences() {
        let points = parse_mount_points(SAMPLE);
        assert_eq!(points[2], PathBuf::from("/mnt/with space"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn fresh_tempdir_is_not_a_mount_point() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(!is_mount_point(dir.path()).expect("read mountinfo"));
    }
}
