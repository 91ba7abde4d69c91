use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::range_reader::check_range;
use super::RangeReader;
use crate::error::IoError;

/// Local-filesystem implementation of RangeReader.
///
/// The file length is read once on open. Reads are positional and run on the
/// blocking pool, so workers sharing one handle never wait on each other.
pub struct LocalFileReader {
    file: Arc<File>,
    size: u64,
    identifier: String,
}

impl LocalFileReader {
    /// Open a file for range reads.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await?.into_std().await;
        let size = file.metadata()?.len();

        Ok(Self {
            file: Arc::new(file),
            size,
            identifier: format!("file://{}", path.display()),
        })
    }
}

#[async_trait]
impl RangeReader for LocalFileReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_range(offset, len, self.size)?;

        let file = Arc::clone(&self.file);
        tokio::task::spawn_blocking(move || -> Result<Bytes, IoError> {
            let mut buf = vec![0u8; len];
            read_full_at(&file, &mut buf, offset)?;
            Ok(Bytes::from(buf))
        })
        .await
        .map_err(|e| IoError::Read(format!("read task failed: {}", e)))?
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

#[cfg(unix)]
fn read_full_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_full_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    let mut filled = 0;
    while filled < buf.len() {
        match file.seek_read(&mut buf[filled..], offset + filled as u64)? {
            0 => return Err(std::io::ErrorKind::UnexpectedEof.into()),
            n => filled += n,
        }
    }
    Ok(())
}
