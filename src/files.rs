//! File storage collaborator: where source documents are read from and
//! rendered briefs are written to.
//!
//! The pipeline only ever touches the file system through [`FileStore`], so a
//! service can back it with object storage and tests can back it with memory.

use async_trait::async_trait;
use std::io;
use std::path::Path;
use tracing::debug;

/// Byte-level file access used by the pipeline.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write `bytes` to `path`, replacing any existing file.
    async fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Create `path` and all missing parents.
    async fn ensure_dir(&self, path: &Path) -> io::Result<()>;
}

/// [`FileStore`] on the local file system.
///
/// Writes land in a sibling temp file first and are renamed into place, so a
/// reader never observes a half-written artifact.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileStore;

#[async_trait]
impl FileStore for LocalFileStore {
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        let bytes = tokio::fs::read(path).await?;
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        Ok(bytes)
    }

    async fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let file_name = path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    async fn ensure_dir(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }
}
