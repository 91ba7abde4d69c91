//! Byte-range I/O for slide files.
//!
//! The TIFF parser never reads a whole slide into memory. It asks a
//! [`RangeReader`] for the few bytes it needs (headers, IFDs, tile payloads)
//! and a [`BlockCache`] groups those small scattered reads into larger blocks.

mod block_cache;
mod local_reader;
mod range_reader;

pub use block_cache::{BlockCache, DEFAULT_BLOCK_CACHE_CAPACITY, DEFAULT_BLOCK_SIZE};
pub use local_reader::LocalFileReader;
pub use range_reader::RangeReader;
