//! Pending files and atomic publication

use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::domain::errors::{DomainError, DomainResult};

/// Name prefix of files that are still being written
pub const PENDING_PREFIX: &str = ".pending-";

/// Reserve a hidden pending file in `dir`, removed on drop unless persisted.
///
/// The suffix keeps `extension` so tools that pick a muxer from the file
/// name still see the final format.
pub fn pending_path(dir: &Path, label: &str, extension: &str) -> DomainResult<TempPath> {
    std::fs::create_dir_all(dir).map_err(|e| {
        DomainError::FsFail(format!("Failed to create {}: {}", dir.display(), e))
    })?;

    let prefix = format!("{}{}-", PENDING_PREFIX, label);
    let suffix = if extension.is_empty() {
        String::new()
    } else {
        format!(".{}", extension)
    };

    let file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(&suffix)
        .tempfile_in(dir)
        .map_err(|e| {
            DomainError::FsFail(format!("Failed to create pending file in {}: {}", dir.display(), e))
        })?;
    Ok(file.into_temp_path())
}

/// Move a pending file to its final name
pub fn publish(pending: TempPath, target: &Path) -> DomainResult<PathBuf> {
    pending.persist(target).map_err(|e| {
        DomainError::FsFail(format!("Failed to publish {}: {}", target.display(), e.error))
    })?;
    Ok(target.to_path_buf())
}

/// Write `contents` to `target` through a pending file and a rename
pub async fn write_atomic(target: &Path, contents: Vec<u8>) -> DomainResult<()> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let label = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let pending = pending_path(dir, &label, "")?;
    tokio::fs::write(&pending, contents).await?;
    publish(pending, target)?;
    debug!(file = %target.display(), "Atomic write completed");
    Ok(())
}

/// Delete pending files left behind by interrupted jobs under `root`
pub fn sweep_pending(root: &Path) -> usize {
    let mut removed = 0;
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_string_lossy().starts_with(PENDING_PREFIX))
    {
        match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => warn!(file = %entry.path().display(), error = %e, "Failed to remove stale pending file"),
        }
    }
    if removed > 0 {
        info!("Removed {} stale pending files under {}", removed, root.display());
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pending_path_is_hidden_and_keeps_extension() {
        let dir = TempDir::new().unwrap();
        let pending = pending_path(&dir.path().join("a").join("b"), "thumb_3", "jpg").unwrap();
        let name = pending.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".pending-thumb_3-"));
        assert!(name.ends_with(".jpg"));
        assert!(pending.exists());
    }

    #[test]
    fn test_dropped_pending_file_disappears() {
        let dir = TempDir::new().unwrap();
        let path = {
            let pending = pending_path(dir.path(), "segment_0", "mp4").unwrap();
            pending.to_path_buf()
        };
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_write_atomic_replaces_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("manifest.json");
        write_atomic(&target, b"one".to_vec()).await.unwrap();
        write_atomic(&target, b"two".to_vec()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "two");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(PENDING_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_sweep_removes_only_pending_files() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("segments").join("clip.mp4");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join(".pending-segment_0-x1y2.mp4"), "partial").unwrap();
        std::fs::write(nested.join("segment_0.mp4"), "done").unwrap();

        assert_eq!(sweep_pending(dir.path()), 1);
        assert!(nested.join("segment_0.mp4").exists());
        assert_eq!(sweep_pending(dir.path()), 0);
    }
}
