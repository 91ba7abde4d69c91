use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use lru::LruCache;
use tokio::sync::{Mutex, OnceCell};

use super::range_reader::check_range;
use super::RangeReader;
use crate::error::IoError;

/// Default block size: 256KB
pub const DEFAULT_BLOCK_SIZE: usize = 256 * 1024;

/// Default cache capacity in number of blocks (64MB with the default block size).
pub const DEFAULT_BLOCK_CACHE_CAPACITY: usize = 256;

/// Block-based caching layer that wraps any RangeReader.
///
/// Neighbouring tiles of a pyramid level are usually stored close together,
/// so caching fixed-size blocks turns the many small reads of a tiling run
/// into far fewer file reads.
///
/// - LRU eviction once `capacity` blocks are held
/// - Concurrent requests for the same block share one fetch
/// - Reads spanning several blocks are stitched together
pub struct BlockCache<R> {
    inner: Arc<R>,
    block_size: usize,
    cache: Mutex<LruCache<u64, Bytes>>,
    in_flight: Mutex<HashMap<u64, Arc<OnceCell<Bytes>>>>,
}

impl<R: RangeReader> BlockCache<R> {
    /// Wrap a reader with the default block size and capacity.
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, DEFAULT_BLOCK_SIZE, DEFAULT_BLOCK_CACHE_CAPACITY)
    }

    /// Wrap a reader with a custom block size and capacity.
    ///
    /// Zero values are raised to one.
    pub fn with_capacity(inner: R, block_size: usize, capacity: usize) -> Self {
        Self {
            inner: Arc::new(inner),
            block_size: block_size.max(1),
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Number of blocks currently cached.
    pub async fn cached_blocks(&self) -> usize {
        self.cache.lock().await.len()
    }

    async fn get_block(&self, block_idx: u64) -> Result<Bytes, IoError> {
        if let Some(data) = self.cache.lock().await.get(&block_idx) {
            return Ok(data.clone());
        }

        let cell = {
            let mut in_flight = self.in_flight.lock().await;
            // A leader may have finished between the fast path and this lock
            if let Some(data) = self.cache.lock().await.get(&block_idx) {
                return Ok(data.clone());
            }
            in_flight
                .entry(block_idx)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let data = cell
            .get_or_try_init(|| self.fetch_block(block_idx))
            .await?
            .clone();

        self.cache.lock().await.put(block_idx, data.clone());
        self.in_flight.lock().await.remove(&block_idx);

        Ok(data)
    }

    async fn fetch_block(&self, block_idx: u64) -> Result<Bytes, IoError> {
        let offset = block_idx * self.block_size as u64;
        let size = self.inner.size();

        // The last block may be short
        let remaining = size.saturating_sub(offset);
        if remaining == 0 {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: self.block_size as u64,
                size,
            });
        }

        let len = remaining.min(self.block_size as u64) as usize;
        self.inner.read_exact_at(offset, len).await
    }
}

#[async_trait]
impl<R: RangeReader + 'static> RangeReader for BlockCache<R> {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_range(offset, len, self.inner.size())?;
        if len == 0 {
            return Ok(Bytes::new());
        }

        let block_size = self.block_size as u64;
        let first = offset / block_size;
        let last = (offset + len as u64 - 1) / block_size;

        if first == last {
            let block = self.get_block(first).await?;
            let start = (offset % block_size) as usize;
            return Ok(block.slice(start..start + len));
        }

        let mut out = BytesMut::with_capacity(len);
        let mut cursor = offset;
        for block_idx in first..=last {
            let block = self.get_block(block_idx).await?;
            let start = (cursor % block_size) as usize;
            let take = (block.len() - start).min(len - out.len());
            out.extend_from_slice(&block[start..start + take]);
            cursor += take as u64;
        }

        Ok(out.freeze())
    }

    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn identifier(&self) -> &str {
        self.inner.identifier()
    }
}
