//! Tile pixel codec.
//!
//! Stored slide tiles are decoded to RGB with [`decode_jpeg_tile`]; extracted
//! patches are written back to disk as JPEG by [`JpegTileEncoder`].

mod encoder;

pub use encoder::{
    clamp_quality, decode_jpeg_tile, is_valid_quality, JpegTileEncoder, DEFAULT_JPEG_QUALITY,
    MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
