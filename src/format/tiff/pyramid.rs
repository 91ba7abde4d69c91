//! Pyramid level identification.
//!
//! A slide file holds several images: the tiled resolution levels plus a
//! label, a macro overview and a thumbnail. Only tiled images are pyramid
//! levels; SVS and pyramidal TIFF writers store the extra images as strips.
//! The largest tiled image is level 0 and every other level's downsample is
//! its size ratio to level 0.

use bytes::Bytes;
use tracing::debug;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{
    read_ifd_chain, Ifd, TiffHeader, COMPRESSION_JPEG, TAG_COMPRESSION, TAG_IMAGE_DESCRIPTION,
    TAG_IMAGE_LENGTH, TAG_IMAGE_WIDTH, TAG_JPEG_TABLES, TAG_TILE_BYTE_COUNTS, TAG_TILE_LENGTH,
    TAG_TILE_OFFSETS, TAG_TILE_WIDTH,
};

/// A single resolution level with its tile index loaded.
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    /// Index of the IFD in the file's chain
    pub ifd_index: usize,

    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,

    /// Number of tiles in X direction
    pub tiles_x: u32,

    /// Number of tiles in Y direction
    pub tiles_y: u32,

    /// Downsample factor relative to level 0 (1.0 for level 0)
    pub downsample: f64,

    pub tile_offsets: Vec<u64>,
    pub tile_byte_counts: Vec<u64>,

    /// Shared quantization/Huffman tables for abbreviated tile streams
    pub jpeg_tables: Option<Bytes>,
}

impl PyramidLevel {
    /// File location `(offset, length)` of a stored tile.
    pub fn tile_location(&self, tile_x: u32, tile_y: u32) -> Option<(u64, u64)> {
        if tile_x >= self.tiles_x || tile_y >= self.tiles_y {
            return None;
        }
        let idx = (tile_y * self.tiles_x + tile_x) as usize;
        Some((*self.tile_offsets.get(idx)?, *self.tile_byte_counts.get(idx)?))
    }
}

/// The pyramid of a TIFF-based slide, level 0 first.
#[derive(Debug, Clone)]
pub struct TiffPyramid {
    pub header: TiffHeader,
    pub levels: Vec<PyramidLevel>,

    /// ImageDescription of the first IFD (vendor metadata, e.g. Aperio)
    pub description: Option<String>,
}

impl TiffPyramid {
    /// Parse the IFD chain and load tile indices of every JPEG pyramid level.
    pub async fn open<R: RangeReader>(reader: &R) -> Result<Self, TiffError> {
        let (header, ifds) = read_ifd_chain(reader).await?;

        let description = match ifds.first().and_then(|ifd| ifd.get(TAG_IMAGE_DESCRIPTION)) {
            Some(entry) => {
                let raw = entry.read_value(reader, &header).await?;
                Some(
                    String::from_utf8_lossy(&raw)
                        .trim_end_matches('\0')
                        .to_string(),
                )
            }
            None => None,
        };

        let mut levels = Vec::new();
        let mut rejected_compression = None;
        for (ifd_index, ifd) in ifds.iter().enumerate() {
            if ifd.get(TAG_TILE_WIDTH).is_none() {
                continue;
            }

            let compression = ifd
                .uint(TAG_COMPRESSION, header.byte_order)
                .unwrap_or(COMPRESSION_JPEG as u64) as u16;
            if compression != COMPRESSION_JPEG {
                debug!(ifd_index, compression, "skipping non-JPEG tiled image");
                rejected_compression.get_or_insert(compression);
                continue;
            }

            levels.push(Self::load_level(reader, &header, ifd, ifd_index).await?);
        }

        if levels.is_empty() {
            return Err(match rejected_compression {
                Some(compression) => TiffError::UnsupportedCompression(compression),
                None => TiffError::NoPyramid,
            });
        }

        levels.sort_by(|a, b| {
            let area_a = a.width as u64 * a.height as u64;
            let area_b = b.width as u64 * b.height as u64;
            area_b.cmp(&area_a)
        });

        let (base_width, base_height) = (levels[0].width as f64, levels[0].height as f64);
        for level in &mut levels {
            let downsample_x = base_width / level.width as f64;
            let downsample_y = base_height / level.height as f64;
            level.downsample = (downsample_x + downsample_y) / 2.0;
        }

        Ok(TiffPyramid {
            header,
            levels,
            description,
        })
    }

    async fn load_level<R: RangeReader>(
        reader: &R,
        header: &TiffHeader,
        ifd: &Ifd,
        ifd_index: usize,
    ) -> Result<PyramidLevel, TiffError> {
        let order = header.byte_order;
        let scalar = |tag: u16, name: &'static str| -> Result<u32, TiffError> {
            let value = ifd.uint(tag, order).ok_or(TiffError::MissingTag(name))?;
            u32::try_from(value)
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| TiffError::InvalidTagValue {
                    tag: name,
                    message: format!("expected a positive 32-bit value, got {}", value),
                })
        };

        let width = scalar(TAG_IMAGE_WIDTH, "ImageWidth")?;
        let height = scalar(TAG_IMAGE_LENGTH, "ImageLength")?;
        let tile_width = scalar(TAG_TILE_WIDTH, "TileWidth")?;
        let tile_height = scalar(TAG_TILE_LENGTH, "TileLength")?;

        let tile_offsets = ifd
            .get(TAG_TILE_OFFSETS)
            .ok_or(TiffError::MissingTag("TileOffsets"))?
            .read_uints(reader, header)
            .await?;
        let tile_byte_counts = ifd
            .get(TAG_TILE_BYTE_COUNTS)
            .ok_or(TiffError::MissingTag("TileByteCounts"))?
            .read_uints(reader, header)
            .await?;

        let tiles_x = width.div_ceil(tile_width);
        let tiles_y = height.div_ceil(tile_height);
        let expected = tiles_x as usize * tiles_y as usize;
        if tile_offsets.len() < expected || tile_byte_counts.len() < expected {
            return Err(TiffError::InvalidTagValue {
                tag: "TileOffsets",
                message: format!(
                    "expected {} tiles, found {} offsets and {} byte counts",
                    expected,
                    tile_offsets.len(),
                    tile_byte_counts.len()
                ),
            });
        }

        let jpeg_tables = match ifd.get(TAG_JPEG_TABLES) {
            Some(entry) => Some(entry.read_value(reader, header).await?),
            None => None,
        };

        Ok(PyramidLevel {
            ifd_index,
            width,
            height,
            tile_width,
            tile_height,
            tiles_x,
            tiles_y,
            downsample: 1.0,
            tile_offsets,
            tile_byte_counts,
            jpeg_tables,
        })
    }
}
