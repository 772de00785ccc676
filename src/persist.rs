//! Local persistence and validation of downloaded reports
//!
//! The body is base64-encoded with [`crate::encoding::encode`] and handed to a
//! [`CacheStore`] as text, mirroring host file APIs that accept base64 content
//! for binary files. After the write the file is stat'ed again: a missing file
//! or one below the minimum size is rejected and removed, which catches 2xx
//! responses with an empty or truncated body.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::spawn_blocking;

use crate::config::StorageConfig;
use crate::error::PersistError;
use crate::types::{EncodedArtifact, PersistedArtifact, ReportPeriod};

/// Existence and size of a stored file
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileInfo {
    /// Whether the file exists
    pub exists: bool,
    /// Size in bytes (0 when missing)
    pub size: u64,
}

/// Storage backend for cached reports
///
/// # Examples
///
/// ```no_run
/// use report_dl::persist::{CacheStore, FsCacheStore};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = FsCacheStore;
/// store.write_base64(Path::new("cache/hello.bin"), "aGVsbG8=").await?;
/// let info = store.stat(Path::new("cache/hello.bin")).await?;
/// assert_eq!(info.size, 5);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Decode base64 `content` and store the bytes at `path`, replacing any previous file
    async fn write_base64(&self, path: &Path, content: &str) -> Result<(), PersistError>;

    /// Existence and size of `path`
    async fn stat(&self, path: &Path) -> Result<FileInfo, PersistError>;

    /// Delete `path`; deleting a missing file is not an error
    async fn remove(&self, path: &Path) -> Result<(), PersistError>;
}

/// File system cache store
///
/// Every write goes to its own uniquely named temporary file next to the
/// target, which is then renamed into place. A reader never observes a
/// half-written report, and overlapping writes to the same path resolve to
/// whichever rename lands last.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsCacheStore;

impl FsCacheStore {
    fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        std::fs::create_dir_all(dir).map_err(|source| PersistError::Io {
            operation: "create directory",
            path: dir.to_path_buf(),
            source,
        })?;

        let mut prefix = std::ffi::OsString::from(".");
        prefix.push(path.file_name().unwrap_or_default());
        prefix.push(".");

        // Removed on drop unless persisted
        let mut partial = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(|source| PersistError::Io {
                operation: "create temporary file in",
                path: dir.to_path_buf(),
                source,
            })?;

        partial
            .write_all(bytes)
            .and_then(|()| partial.as_file().sync_all())
            .map_err(|source| PersistError::Io {
                operation: "write",
                path: partial.path().to_path_buf(),
                source,
            })?;

        partial.persist(path).map_err(|e| PersistError::Io {
            operation: "rename",
            path: path.to_path_buf(),
            source: e.error,
        })?;

        Ok(())
    }
}

#[async_trait]
impl CacheStore for FsCacheStore {
    async fn write_base64(&self, path: &Path, content: &str) -> Result<(), PersistError> {
        let bytes = STANDARD
            .decode(content)
            .map_err(|e| PersistError::Decode(e.to_string()))?;

        let target = path.to_path_buf();
        spawn_blocking(move || Self::write_atomic(&target, &bytes))
            .await
            .map_err(|e| PersistError::Io {
                operation: "write",
                path: path.to_path_buf(),
                source: std::io::Error::other(format!("write task panicked: {e}")),
            })?
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo, PersistError> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => Ok(FileInfo {
                exists: true,
                size: meta.len(),
            }),
            Ok(_) => Ok(FileInfo::default()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileInfo::default()),
            Err(source) => Err(PersistError::Io {
                operation: "stat",
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    async fn remove(&self, path: &Path) -> Result<(), PersistError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PersistError::Io {
                operation: "remove",
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Writes report bodies to their per-period cache path and validates them
#[derive(Clone)]
pub struct ArtifactPersister {
    store: Arc<dyn CacheStore>,
    storage: StorageConfig,
}

impl ArtifactPersister {
    /// Create a persister over the given store
    pub fn new(store: Arc<dyn CacheStore>, storage: StorageConfig) -> Self {
        Self { store, storage }
    }

    /// Cache path used for a period
    pub fn path_for(&self, period: ReportPeriod) -> PathBuf {
        self.storage.artifact_path(period)
    }

    /// Encode, write, and re-check the report for `period`
    ///
    /// Writes exactly one file, overwriting any earlier report for the same
    /// period. Fails with [`PersistError::EmptyOrCorrupt`] when the stored file
    /// is missing, smaller than `min_artifact_bytes`, or shorter than `bytes`.
    /// A rejected file, or one whose size cannot be read back, is removed.
    pub async fn persist(
        &self,
        period: ReportPeriod,
        bytes: &[u8],
    ) -> Result<PersistedArtifact, PersistError> {
        let encoded = EncodedArtifact::from_bytes(bytes);
        let path = self.path_for(period);

        self.store.write_base64(&path, &encoded.text).await?;
        let info = match self.store.stat(&path).await {
            Ok(info) => info,
            Err(e) => {
                self.discard(&path).await;
                return Err(e);
            }
        };

        let min = self.storage.min_artifact_bytes;
        let expected = encoded.byte_len as u64;
        if !info.exists || info.size < min || info.size != expected {
            tracing::warn!(
                path = %path.display(),
                size = info.size,
                expected = expected,
                min = min,
                "stored report is empty or corrupt"
            );
            if info.exists {
                self.discard(&path).await;
            }
            return Err(PersistError::EmptyOrCorrupt {
                path,
                size: info.size,
                min,
            });
        }

        tracing::info!(path = %path.display(), size = info.size, period = %period, "report saved");

        Ok(PersistedArtifact {
            path,
            exists: true,
            size: info.size,
        })
    }

    /// Remove a report that failed validation
    async fn discard(&self, path: &Path) {
        if let Err(e) = self.store.remove(path).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove rejected report");
        }
    }
}
