//! Filesystem storage for uploaded files.
//!
//! Files live directly under a single storage root and are written atomically
//! (temp file, then a hard link that never replaces an existing file). A write
//! hands back a [`StagedFile`] guard: until it is
//! committed, dropping it removes the file again, so an upload whose database
//! insert fails does not leave a stray file behind.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use docproc_core::{is_within_root, Error, Result, UploadRejection};

/// Storage root for uploaded files.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open the store, creating the root directory if it is missing.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).await.map_err(|e| {
            warn!(root = %root.display(), error = %e, "file_storage: create_dir_all failed");
            e
        })?;
        let root = fs::canonicalize(root).await?;
        debug!(root = %root.display(), "file_storage: opened");
        Ok(Self { root })
    }

    /// Canonical storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a sanitized name onto the root and check that it stays inside.
    pub async fn resolve(&self, name: &str) -> Result<PathBuf> {
        let candidate = self.root.join(name);
        let (root, path) = (self.root.clone(), candidate.clone());
        let inside = tokio::task::spawn_blocking(move || is_within_root(&root, &path))
            .await
            .map_err(|e| Error::Internal(format!("path check task failed: {}", e)))?;
        if !inside {
            warn!(
                subsystem = "storage",
                op = "resolve",
                name,
                "Rejected storage path outside root"
            );
            return Err(UploadRejection::PathTraversalRejected.into());
        }
        Ok(candidate)
    }

    /// Write `data` under `name` and return an uncommitted guard for it.
    pub async fn stage(&self, name: &str, data: &[u8]) -> Result<StagedFile> {
        let full_path = self.resolve(name).await?;
        debug!(full_path = %full_path.display(), size = data.len(), "file_storage: write");

        let temp_path = self.root.join(format!(".{}.tmp", name));
        if let Err(e) = write_atomic(&temp_path, &full_path, data).await {
            warn!(path = %full_path.display(), error = %e, "file_storage: staged write failed");
            let _ = fs::remove_file(&temp_path).await;
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                return Err(Error::Conflict(format!("Stored file already exists: {}", name)));
            }
            return Err(e.into());
        }

        Ok(StagedFile {
            path: full_path,
            committed: false,
        })
    }

    /// Remove a stored file. Failures are logged and swallowed.
    ///
    /// A file that is already gone counts as removed.
    pub async fn remove(&self, storage_path: &str) {
        let path = Path::new(storage_path);
        if !path.starts_with(&self.root) {
            warn!(
                subsystem = "storage",
                op = "remove",
                storage_path,
                "Refusing to remove file outside storage root"
            );
            return;
        }
        match fs::remove_file(path).await {
            Ok(()) => debug!(storage_path, "file_storage: removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(storage_path, "file_storage: already absent");
            }
            Err(e) => warn!(
                subsystem = "storage",
                op = "remove",
                storage_path,
                error = %e,
                "Failed to remove stored file"
            ),
        }
    }

    /// Write, read back, and delete a probe file to catch permission or mount
    /// problems at startup.
    pub async fn validate(&self) -> Result<()> {
        let probe = self.root.join(".health-check");
        let data = b"storage-health-check";

        fs::write(&probe, data)
            .await
            .map_err(|e| Error::Config(format!("write({:?}): {}", probe, e)))?;
        let read_back = fs::read(&probe)
            .await
            .map_err(|e| Error::Config(format!("read({:?}): {}", probe, e)))?;
        let _ = fs::remove_file(&probe).await;

        if read_back != data {
            return Err(Error::Config("storage read-back mismatch".to_string()));
        }
        Ok(())
    }
}

async fn write_atomic(temp_path: &Path, full_path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)
        .await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);

    // Fails with AlreadyExists instead of replacing another upload's file.
    fs::hard_link(temp_path, full_path).await?;
    fs::remove_file(temp_path).await?;

    // rw-r--r--, no execute
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(full_path, std::fs::Permissions::from_mode(0o644)).await?;
    }
    Ok(())
}

/// A written file that is removed on drop unless committed.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    committed: bool,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Storage path as recorded in the database.
    pub fn storage_path(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// Keep the file; the guard no longer removes it.
    pub fn commit(mut self) -> PathBuf {
        self.committed = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "file_storage: discarded staged file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "file_storage: failed to discard staged file"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_open_creates_missing_root() {
        let base = tempfile::tempdir().unwrap();
        let root = base.path().join("nested").join("uploads");
        let store = FileStore::open(&root).await.unwrap();
        assert!(store.root().is_dir());
    }

    #[tokio::test]
    async fn test_commit_keeps_file() {
        let (_dir, store) = store().await;
        let staged = store.stage("abcd1234_a.pdf", b"%PDF-1.4").await.unwrap();
        let path = staged.commit();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_drop_removes_uncommitted_file() {
        let (_dir, store) = store().await;
        let staged = store.stage("abcd1234_b.pdf", b"%PDF").await.unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let (_dir, store) = store().await;
        let staged = store.stage("abcd1234_c.pdf", b"%PDF").await.unwrap();
        staged.commit();
        let names: Vec<_> = std::fs::read_dir(store.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["abcd1234_c.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_rejects_escape() {
        let (_dir, store) = store().await;
        let err = store.resolve("../outside.pdf").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Rejected(UploadRejection::PathTraversalRejected)
        ));
        assert!(store.resolve("..").await.is_err());
        assert!(store.resolve("abcd1234_ok.pdf").await.is_ok());
    }

    #[tokio::test]
    async fn test_stage_never_replaces_existing_file() {
        let (_dir, store) = store().await;
        let first = store
            .stage("abcd1234_same.pdf", b"first")
            .await
            .unwrap()
            .commit();

        let err = store.stage("abcd1234_same.pdf", b"second").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(std::fs::read(&first).unwrap(), b"first");

        let names: Vec<_> = std::fs::read_dir(store.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["abcd1234_same.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_stage_rejected_path_writes_nothing() {
        let base = tempfile::tempdir().unwrap();
        let store = FileStore::open(base.path().join("root")).await.unwrap();
        assert!(store.stage("../escaped.pdf", b"%PDF").await.is_err());
        assert!(!base.path().join("escaped.pdf").exists());
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_silent() {
        let (_dir, store) = store().await;
        let path = store.root().join("gone.pdf");
        store.remove(&path.to_string_lossy()).await;
    }

    #[tokio::test]
    async fn test_remove_ignores_paths_outside_root() {
        let (_dir, store) = store().await;
        let other = tempfile::NamedTempFile::new().unwrap();
        store.remove(&other.path().to_string_lossy()).await;
        assert!(other.path().exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_committed_file_is_not_executable() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = store().await;
        let path = store
            .stage("abcd1234_d.pdf", b"%PDF")
            .await
            .unwrap()
            .commit();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[tokio::test]
    async fn test_validate_round_trip() {
        let (_dir, store) = store().await;
        store.validate().await.unwrap();
        assert!(!store.root().join(".health-check").exists());
    }
}
