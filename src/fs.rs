//! File system abstraction for saving downloads.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Abstraction over file system operations for testability.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Checks if a file exists at the given path.
    async fn file_exists(&self, path: &Path) -> bool;

    /// Creates all directories in the given path.
    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;

    /// Writes `contents` to `path`, replacing any existing file.
    async fn write_file(&self, path: &Path, contents: &[u8]) -> std::io::Result<()>;
}

/// Default file system implementation using `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    /// Creates a new `TokioFileSystem` instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn file_exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }

    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        tokio::fs::write(path, contents).await
    }
}

/// Reduces a server-provided filename to a bare file name inside `dir`.
///
/// Directory components and parent references are dropped so a download can
/// never be written outside `dir`.
#[must_use]
pub fn download_path(dir: &Path, filename: &str) -> PathBuf {
    let name = filename
        .rsplit(['/', '\\'])
        .find(|part| !part.is_empty() && *part != "." && *part != "..")
        .unwrap_or("download");
    dir.join(name)
}

/// Saves `contents` as `filename` under `dir`.
///
/// # Errors
///
/// Returns [`crate::Error::FileExists`] if the target exists and `force` is
/// false, or an I/O error if writing fails.
pub async fn save_download<F: FileSystem + ?Sized>(
    fs: &F,
    dir: &Path,
    filename: &str,
    contents: &[u8],
    force: bool,
) -> crate::Result<PathBuf> {
    let path = download_path(dir, filename);
    if !force && fs.file_exists(&path).await {
        return Err(crate::Error::FileExists {
            path: path.display().to_string(),
        });
    }
    if !dir.as_os_str().is_empty() {
        fs.create_dir_all(dir).await?;
    }
    fs.write_file(&path, contents).await?;
    log::debug!("Saved {} ({} bytes)", path.display(), contents.len());
    Ok(path)
}
