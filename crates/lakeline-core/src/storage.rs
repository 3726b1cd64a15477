//! Storage backend for timeline marker files.
//!
//! This module centralizes all filesystem access for `lakeline-core`. The
//! timeline layer describes *what* to persist (marker names and payload
//! bytes); this module owns *how*:
//!
//! - Listing the file names that make up a timeline directory.
//! - Creating a new file with create-if-absent semantics, which is the
//!   atomic guard behind duplicate-instant detection and transition races.
//! - Reading a marker's byte payload.
//!
//! Only the local filesystem is supported for now, but the API is shaped so
//! that an object-store adapter can be introduced without rewriting the
//! timeline logic: every operation takes a [`TableLocation`] plus a path
//! relative to it, and failures are classified into a small set of
//! [`StorageError`] variants rather than leaking `std::io` details upward.

use snafu::{Backtrace, prelude::*};
use std::{
    error::Error,
    fmt, io,
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, OpenOptions},
    io::AsyncWriteExt,
};

/// General result type used by storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Represents the location of a table root.
///
/// This enum abstracts over different storage backends, currently supporting
/// local filesystem paths with potential future support for object storage.
#[derive(Clone, Debug)]
pub enum TableLocation {
    /// A table stored on the local filesystem at the given path.
    Local(PathBuf),
    // Future:
    // S3 { bucket: String, prefix: String },
}

impl TableLocation {
    /// Creates a new `TableLocation` for a local filesystem path.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        TableLocation::Local(root.into())
    }
}

/// Errors produced by the storage backend implementation.
///
/// Backend-specific I/O errors are wrapped in this enum so higher layers can
/// map them into [`StorageError`] variants with additional context.
#[derive(Debug)]
pub enum BackendError {
    /// A local filesystem I/O error.
    Local(io::Error),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Local(e) => write!(f, "local I/O error: {e}"),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BackendError::Local(e) => Some(e),
        }
    }
}

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
pub enum StorageError {
    /// The specified path was not found.
    #[snafu(display("Path not found: {path}"))]
    NotFound {
        /// The path that was not found.
        path: String,
        /// Underlying backend error that caused the failure.
        source: BackendError,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// The specified path already exists when creation was requested with
    /// create-new semantics.
    #[snafu(display("Path already exists: {path}"))]
    AlreadyExists {
        /// The path that was found to already exist.
        path: String,
        /// Underlying backend error that indicates the existing resource.
        source: BackendError,
        /// The backtrace captured when the error occurred.
        backtrace: Backtrace,
    },

    /// An I/O error occurred on the local filesystem.
    #[snafu(display("Local I/O error at {path}: {source}"))]
    OtherIo {
        /// The path where the I/O error occurred.
        path: String,
        /// Underlying backend I/O error with platform-specific details.
        source: BackendError,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },
}

fn join_local(location: &TableLocation, rel_path: &Path) -> PathBuf {
    match location {
        TableLocation::Local(root) => root.join(rel_path),
    }
}

async fn create_parent_dir(abs: &Path) -> StorageResult<()> {
    if let Some(parent) = abs.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(BackendError::Local)
            .context(OtherIoSnafu {
                path: parent.display().to_string(),
            })?;
    }
    Ok(())
}

/// Create a *new* file at `rel_path` and write `contents`, failing if the
/// file already exists.
///
/// The create-if-absent open is atomic on the target path, so exactly one of
/// any number of concurrent writers succeeds; the losers observe
/// [`StorageError::AlreadyExists`]. The timeline layer relies on this for
/// duplicate-instant detection and for detecting lost transition races.
pub async fn write_new(
    location: &TableLocation,
    rel_path: &Path,
    contents: &[u8],
) -> StorageResult<()> {
    match location {
        TableLocation::Local(_) => {
            let abs = join_local(location, rel_path);
            create_parent_dir(&abs).await?;

            let path_str = abs.display().to_string();

            let open_result = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&abs)
                .await;

            let mut file = match open_result {
                Ok(f) => f,
                Err(e) => {
                    let backend = BackendError::Local(e);
                    // Classify AlreadyExists vs "other I/O".
                    let storage_err = match &backend {
                        BackendError::Local(inner)
                            if inner.kind() == io::ErrorKind::AlreadyExists =>
                        {
                            StorageError::AlreadyExists {
                                path: path_str,
                                source: backend,
                                backtrace: Backtrace::capture(),
                            }
                        }
                        _ => StorageError::OtherIo {
                            path: path_str,
                            source: backend,
                            backtrace: Backtrace::capture(),
                        },
                    };
                    return Err(storage_err);
                }
            };

            file.write_all(contents)
                .await
                .map_err(BackendError::Local)
                .context(OtherIoSnafu {
                    path: abs.display().to_string(),
                })?;

            file.sync_all()
                .await
                .map_err(BackendError::Local)
                .context(OtherIoSnafu {
                    path: abs.display().to_string(),
                })?;

            Ok(())
        }
    }
}

/// Read the file at `rel_path` within the given `location` and return its
/// contents as bytes.
///
/// On success this returns the full file contents; if the file cannot be
/// found a [`StorageError::NotFound`] is returned, while other filesystem
/// problems produce [`StorageError::OtherIo`].
pub async fn read_bytes(location: &TableLocation, rel_path: &Path) -> StorageResult<Vec<u8>> {
    match location {
        TableLocation::Local(_) => {
            let abs = join_local(location, rel_path);

            match fs::read(&abs).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Err(BackendError::Local(e))
                    .context(NotFoundSnafu {
                        path: abs.display().to_string(),
                    }),
                Err(e) => Err(BackendError::Local(e)).context(OtherIoSnafu {
                    path: abs.display().to_string(),
                }),
            }
        }
    }
}

/// List the names of the regular files directly under `rel_dir` within the
/// given `location`.
///
/// A missing directory reads as an empty listing: a fresh table has no
/// timeline directory until its first instant is appended, and that is not
/// an error. Entries that are not regular files are skipped. The returned
/// order is whatever the filesystem yields; callers sort as needed.
pub async fn list_file_names(
    location: &TableLocation,
    rel_dir: &Path,
) -> StorageResult<Vec<String>> {
    match location {
        TableLocation::Local(_) => {
            let abs = join_local(location, rel_dir);

            let mut entries = match fs::read_dir(&abs).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => {
                    return Err(BackendError::Local(e)).context(OtherIoSnafu {
                        path: abs.display().to_string(),
                    });
                }
            };

            let mut names = Vec::new();
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        return Err(BackendError::Local(e)).context(OtherIoSnafu {
                            path: abs.display().to_string(),
                        });
                    }
                };

                let file_type = entry
                    .file_type()
                    .await
                    .map_err(BackendError::Local)
                    .context(OtherIoSnafu {
                        path: entry.path().display().to_string(),
                    })?;
                if !file_type.is_file() {
                    continue;
                }

                names.push(entry.file_name().to_string_lossy().into_owned());
            }

            Ok(names)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn local_location(tmp: &TempDir) -> TableLocation {
        TableLocation::local(tmp.path())
    }

    // ==================== write_new tests ====================

    #[tokio::test]
    async fn write_new_creates_file_with_contents() -> TestResult {
        let tmp = TempDir::new()?;
        let location = local_location(&tmp);

        write_new(&location, Path::new("dir/marker"), b"payload").await?;

        let contents = tokio::fs::read(tmp.path().join("dir/marker")).await?;
        assert_eq!(contents, b"payload");
        Ok(())
    }

    #[tokio::test]
    async fn write_new_fails_when_file_exists() -> TestResult {
        let tmp = TempDir::new()?;
        let location = local_location(&tmp);

        write_new(&location, Path::new("marker"), b"first").await?;
        let result = write_new(&location, Path::new("marker"), b"second").await;

        assert!(matches!(result, Err(StorageError::AlreadyExists { .. })));

        // The original contents are untouched by the losing write.
        let contents = tokio::fs::read(tmp.path().join("marker")).await?;
        assert_eq!(contents, b"first");
        Ok(())
    }

    #[tokio::test]
    async fn write_new_accepts_empty_contents() -> TestResult {
        let tmp = TempDir::new()?;
        let location = local_location(&tmp);

        write_new(&location, Path::new("empty-marker"), b"").await?;

        let contents = tokio::fs::read(tmp.path().join("empty-marker")).await?;
        assert!(contents.is_empty());
        Ok(())
    }

    // ==================== read_bytes tests ====================

    #[tokio::test]
    async fn read_bytes_returns_file_contents() -> TestResult {
        let tmp = TempDir::new()?;
        let location = local_location(&tmp);
        tokio::fs::write(tmp.path().join("marker"), b"bytes").await?;

        let contents = read_bytes(&location, Path::new("marker")).await?;

        assert_eq!(contents, b"bytes");
        Ok(())
    }

    #[tokio::test]
    async fn read_bytes_returns_not_found_for_missing_file() -> TestResult {
        let tmp = TempDir::new()?;
        let location = local_location(&tmp);

        let result = read_bytes(&location, Path::new("missing")).await;

        assert!(matches!(result, Err(StorageError::NotFound { .. })));
        Ok(())
    }

    // ==================== list_file_names tests ====================

    #[tokio::test]
    async fn list_file_names_returns_empty_for_missing_dir() -> TestResult {
        let tmp = TempDir::new()?;
        let location = local_location(&tmp);

        let names = list_file_names(&location, Path::new("no-such-dir")).await?;

        assert!(names.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn list_file_names_returns_only_regular_files() -> TestResult {
        let tmp = TempDir::new()?;
        let location = local_location(&tmp);

        let dir = tmp.path().join("timeline");
        tokio::fs::create_dir_all(dir.join("subdir")).await?;
        tokio::fs::write(dir.join("a.marker"), b"").await?;
        tokio::fs::write(dir.join("b.marker"), b"x").await?;

        let mut names = list_file_names(&location, Path::new("timeline")).await?;
        names.sort();

        assert_eq!(names, vec!["a.marker".to_string(), "b.marker".to_string()]);
        Ok(())
    }
}
