use async_trait::async_trait;
use bytes::Bytes;

use crate::error::IoError;

/// Trait for reading byte ranges from a slide file.
///
/// This abstraction lets the TIFF parser and the region reader work with
/// multi-gigabyte slides without loading them. Implementations must be safe
/// to share between the worker tasks extracting one slide.
#[async_trait]
pub trait RangeReader: Send + Sync {
    /// Read `len` bytes at `offset`; a short or out-of-range read is an error.
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError>;

    /// File length in bytes.
    fn size(&self) -> u64;

    /// Path or name of the slide file, used in log fields and errors.
    fn identifier(&self) -> &str;
}

/// Reject ranges that end past `size`, including ones whose end overflows.
pub(crate) fn check_range(offset: u64, len: usize, size: u64) -> Result<(), IoError> {
    match offset.checked_add(len as u64) {
        Some(end) if end <= size => Ok(()),
        _ => Err(IoError::RangeOutOfBounds {
            offset,
            requested: len as u64,
            size,
        }),
    }
}
