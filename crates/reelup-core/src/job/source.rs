//! Live upload sources.
//!
//! A source is the process-lifetime handle to a file's bytes. It is never
//! persisted: after a restart a job has only its `FileMeta` until the caller
//! re-supplies the file.

use async_trait::async_trait;
use std::fmt;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::types::FileMeta;

const FALLBACK_MIME: &str = "application/octet-stream";

#[async_trait]
pub trait UploadSource: Send + Sync + fmt::Debug {
    fn meta(&self) -> &FileMeta;

    /// Reads exactly `len` bytes starting at `offset`.
    async fn read_part(&self, offset: u64, len: u64) -> io::Result<Vec<u8>>;
}

/// File on local disk. Each part read opens its own handle so parts can be
/// read concurrently.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    meta: FileMeta,
}

impl LocalFile {
    /// Stats the file and sniffs its MIME type from the leading bytes.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        let sniff_path = path.clone();
        let mime = tokio::task::spawn_blocking(move || infer::get_from_path(sniff_path))
            .await
            .map_err(io::Error::other)??
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| FALLBACK_MIME.to_string());

        Ok(Self {
            path,
            meta: FileMeta {
                name,
                size: metadata.len(),
                mime,
            },
        })
    }
}

#[async_trait]
impl UploadSource for LocalFile {
    fn meta(&self) -> &FileMeta {
        &self.meta
    }

    async fn read_part(&self, offset: u64, len: u64) -> io::Result<Vec<u8>> {
        let mut file = tokio::fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(offset)).await?;
        let mut buf = vec![0u8; len as usize];
        file.read_exact(&mut buf).await?;
        Ok(buf)
    }
}

/// In-memory source, for embedding callers that already hold the bytes.
#[derive(Clone)]
pub struct MemoryFile {
    meta: FileMeta,
    data: Arc<[u8]>,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            meta: FileMeta {
                name: name.into(),
                size: data.len() as u64,
                mime: mime.into(),
            },
            data: data.into(),
        }
    }
}

impl fmt::Debug for MemoryFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryFile").field("meta", &self.meta).finish()
    }
}

#[async_trait]
impl UploadSource for MemoryFile {
    fn meta(&self) -> &FileMeta {
        &self.meta
    }

    async fn read_part(&self, offset: u64, len: u64) -> io::Result<Vec<u8>> {
        let start = offset as usize;
        let end = start.saturating_add(len as usize);
        self.data
            .get(start..end)
            .map(|s| s.to_vec())
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_file_reads_ranges() {
        let f = MemoryFile::new("a.bin", "application/octet-stream", (0u8..10).collect());
        assert_eq!(f.meta().size, 10);
        assert_eq!(f.read_part(2, 3).await.unwrap(), vec![2, 3, 4]);
        assert_eq!(f.read_part(10, 0).await.unwrap(), Vec::<u8>::new());
        assert!(f.read_part(8, 5).await.is_err());
    }

    #[tokio::test]
    async fn local_file_stats_and_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.bin");
        std::fs::write(&path, (0u8..100).collect::<Vec<_>>()).unwrap();

        let f = LocalFile::open(&path).await.unwrap();
        assert_eq!(f.meta().name, "clip.bin");
        assert_eq!(f.meta().size, 100);
        assert_eq!(f.meta().mime, FALLBACK_MIME);
        assert_eq!(f.read_part(90, 10).await.unwrap(), (90u8..100).collect::<Vec<_>>());
        assert!(f.read_part(95, 10).await.is_err());
    }

    #[tokio::test]
    async fn local_file_sniffs_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still");
        let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        png.extend_from_slice(&[0u8; 32]);
        std::fs::write(&path, png).unwrap();

        let f = LocalFile::open(&path).await.unwrap();
        assert_eq!(f.meta().mime, "image/png");
    }

    #[tokio::test]
    async fn local_file_rejects_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LocalFile::open(dir.path()).await.is_err());
    }
}
