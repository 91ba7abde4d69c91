//! JPEG tile codec.
//!
//! # Design Decisions
//!
//! - **RGB only**: slide tiles are converted to 8-bit RGB on decode, whatever
//!   their stored color type; luminance and persistence both work on RGB.
//!
//! - **Quality control**: saved patches use a configurable JPEG quality so
//!   dataset size can be traded against fidelity.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageReader, RgbImage};

use crate::error::{SlideError, TilingError};

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

// =============================================================================
// JPEG Encoder
// =============================================================================

/// Encodes extracted patches as JPEG.
///
/// # Example
///
/// ```ignore
/// use wsi_tiler::tile::JpegTileEncoder;
///
/// let encoder = JpegTileEncoder::new(90);
/// let bytes = encoder.encode(&patch)?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct JpegTileEncoder {
    quality: u8,
}

impl Default for JpegTileEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl JpegTileEncoder {
    /// Create an encoder; quality is clamped to 1-100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: clamp_quality(quality),
        }
    }

    /// Quality used for encoding.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode an RGB patch to JPEG bytes.
    pub fn encode(&self, tile: &RgbImage) -> Result<Bytes, TilingError> {
        let mut output = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut output, self.quality);

        encoder
            .encode_image(tile)
            .map_err(|e| TilingError::Encode {
                message: e.to_string(),
            })?;

        Ok(Bytes::from(output))
    }
}

/// Decode a complete JPEG stream to 8-bit RGB.
pub fn decode_jpeg_tile(data: &[u8]) -> Result<RgbImage, SlideError> {
    let reader = ImageReader::with_format(Cursor::new(data), image::ImageFormat::Jpeg);
    let img = reader.decode().map_err(|e| SlideError::Decode {
        message: e.to_string(),
    })?;
    Ok(img.to_rgb8())
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Returns `true` if quality is in the valid range (1-100).
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality)
}

/// Clamp quality to valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
