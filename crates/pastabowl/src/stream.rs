//! Streaming access to pasta payloads.
//!
//! A [`PastaWriter`] writes into a temporary file beside the payload and only
//! replaces `data` when [`close`](PastaWriter::close) succeeds. Dropping a
//! writer without closing it throws the partial write away, so readers only
//! ever see a complete payload: either the old one or the new one.
//!
//! Layout while a write is in flight:
//! ```text
//! {base_path}/{id}/
//! ├── pasta.json
//! ├── data                 # last committed payload
//! └── data.{uuid}.tmp      # in-progress write
//! ```

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{IoContext, Result};
use crate::pasta::PAYLOAD_FILE;

/// Sync a directory so that renames and creations inside it survive a crash.
///
/// Directories cannot be opened for syncing on Windows; there this is a no-op.
pub(crate) fn sync_dir(dir: &Path) -> Result<()> {
    #[cfg(unix)]
    File::open(dir)
        .and_then(|d| d.sync_all())
        .with_context(|| format!("failed to sync directory {}", dir.display()))?;
    #[cfg(not(unix))]
    let _ = dir;
    Ok(())
}

/// Write handle for a pasta's payload.
///
/// Writing replaces the whole payload. Call [`close`](Self::close) to make the
/// bytes durable and visible; a dropped writer leaves the previous payload.
#[derive(Debug)]
pub struct PastaWriter {
    id: String,
    temp_path: PathBuf,
    final_path: PathBuf,
    /// `None` once closed.
    file: Option<BufWriter<File>>,
    bytes_written: u64,
}

impl PastaWriter {
    pub(crate) fn create(id: &str, pasta_dir: &Path) -> Result<Self> {
        let temp_path = pasta_dir.join(format!("{PAYLOAD_FILE}.{}.tmp", Uuid::new_v4().simple()));
        let file = File::create(&temp_path)
            .with_context(|| format!("failed to open payload writer for pasta {id}"))?;

        debug!(id, path = %temp_path.display(), "opened payload writer");

        Ok(Self {
            id: id.to_string(),
            temp_path,
            final_path: pasta_dir.join(PAYLOAD_FILE),
            file: Some(BufWriter::new(file)),
            bytes_written: 0,
        })
    }

    /// The id of the pasta this writer belongs to.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush, sync, and publish the payload. Returns the payload size.
    pub fn close(mut self) -> Result<u64> {
        let Some(writer) = self.file.take() else {
            return Ok(self.bytes_written);
        };

        let file = writer
            .into_inner()
            .map_err(io::IntoInnerError::into_error)
            .with_context(|| format!("failed to flush payload for pasta {}", self.id))?;
        file.sync_all()
            .with_context(|| format!("failed to sync payload for pasta {}", self.id))?;
        drop(file);

        fs::rename(&self.temp_path, &self.final_path)
            .with_context(|| format!("failed to publish payload for pasta {}", self.id))?;
        if let Some(dir) = self.final_path.parent() {
            sync_dir(dir)?;
        }

        debug!(id = %self.id, bytes = self.bytes_written, "payload committed");
        Ok(self.bytes_written)
    }
}

impl Write for PastaWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::other("payload writer already closed"))?;
        let n = file.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for PastaWriter {
    fn drop(&mut self) {
        // Reached with an open file only when close() was never called or
        // failed before the rename.
        if self.file.take().is_some() || self.temp_path.exists() {
            warn!(id = %self.id, "payload writer dropped without close, discarding write");
            if let Err(e) = fs::remove_file(&self.temp_path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(id = %self.id, error = %e, "failed to remove partial payload");
                }
            }
        }
    }
}

/// Read handle over a pasta's committed payload.
#[derive(Debug)]
pub struct PastaReader {
    id: String,
    inner: BufReader<File>,
    len: u64,
}

impl PastaReader {
    pub(crate) fn open(id: &str, pasta_dir: &Path) -> Result<Self> {
        let file = File::open(pasta_dir.join(PAYLOAD_FILE))
            .with_context(|| format!("failed to open payload for pasta {id}"))?;
        let len = file
            .metadata()
            .with_context(|| format!("failed to stat payload for pasta {id}"))?
            .len();

        Ok(Self {
            id: id.to_string(),
            inner: BufReader::new(file),
            len,
        })
    }

    /// The id of the pasta this reader belongs to.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Payload size at the time the reader was opened.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the payload was empty when the reader was opened.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Read for PastaReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "tmp"))
            .collect()
    }

    #[test]
    fn test_write_close_read() -> anyhow::Result<()> {
        let dir = TempDir::new()?;

        let mut writer = PastaWriter::create("abc", dir.path())?;
        writer.write_all(b"Hello, ")?;
        writer.write_all(b"World!")?;
        assert_eq!(writer.bytes_written(), 13);
        assert_eq!(writer.close()?, 13);

        let mut reader = PastaReader::open("abc", dir.path())?;
        assert_eq!(reader.len(), 13);
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;
        assert_eq!(buf, "Hello, World!");

        assert!(temp_files(dir.path()).is_empty());
        Ok(())
    }

    #[test]
    fn test_payload_invisible_until_close() -> anyhow::Result<()> {
        let dir = TempDir::new()?;

        let mut writer = PastaWriter::create("abc", dir.path())?;
        writer.write_all(b"pending")?;
        writer.flush()?;

        assert!(!dir.path().join(PAYLOAD_FILE).exists());
        writer.close()?;
        assert!(dir.path().join(PAYLOAD_FILE).exists());
        Ok(())
    }

    #[test]
    fn test_drop_without_close_discards() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join(PAYLOAD_FILE), b"original")?;

        {
            let mut writer = PastaWriter::create("abc", dir.path())?;
            writer.write_all(b"half a payl")?;
        }

        assert_eq!(fs::read(dir.path().join(PAYLOAD_FILE))?, b"original");
        assert!(temp_files(dir.path()).is_empty());
        Ok(())
    }

    #[test]
    fn test_close_replaces_payload() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join(PAYLOAD_FILE), b"a much longer original payload")?;

        let mut writer = PastaWriter::create("abc", dir.path())?;
        writer.write_all(b"short")?;
        writer.close()?;

        assert_eq!(fs::read(dir.path().join(PAYLOAD_FILE))?, b"short");
        Ok(())
    }

    #[test]
    fn test_sync_dir() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        sync_dir(dir.path())?;

        #[cfg(unix)]
        assert!(sync_dir(&dir.path().join("missing")).unwrap_err().is_not_found());
        Ok(())
    }

    #[test]
    fn test_writer_in_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let err = PastaWriter::create("gone", &dir.path().join("gone")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_reader_missing_payload_fails() {
        let dir = TempDir::new().unwrap();
        let err = PastaReader::open("abc", dir.path()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_empty_reader() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join(PAYLOAD_FILE), b"")?;

        let mut reader = PastaReader::open("abc", dir.path())?;
        assert!(reader.is_empty());
        let mut buf = Vec::new();
        assert_eq!(reader.read_to_end(&mut buf)?, 0);
        Ok(())
    }
}
