//! Pyramidal TIFF slide backend.
//!
//! Reads Aperio SVS and generic tiled pyramidal TIFF files whose tiles are
//! JPEG-compressed. A region read maps the level-0 origin onto the chosen
//! level, fetches every stored tile the window touches, decodes them and
//! composites the window. Stored tiles are fetched through a [`BlockCache`],
//! decoding and compositing run on the blocking pool.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use image::RgbImage;
use tracing::debug;

use crate::error::SlideError;
use crate::format::{is_tiff_header, prepare_tile_jpeg, PyramidLevel, SlideFormat, TiffPyramid};
use crate::io::{
    BlockCache, LocalFileReader, RangeReader, DEFAULT_BLOCK_CACHE_CAPACITY, DEFAULT_BLOCK_SIZE,
};
use crate::tile::decode_jpeg_tile;

use super::source::{Slide, SlideSource};

/// Bytes needed to recognize a TIFF/BigTIFF header.
const MAGIC_LEN: u64 = 4;

// =============================================================================
// TiffSlide
// =============================================================================

/// A tiled pyramidal TIFF slide.
pub struct TiffSlide<R: RangeReader + 'static> {
    reader: Arc<BlockCache<R>>,
    pyramid: TiffPyramid,
    format: SlideFormat,
}

impl<R: RangeReader + 'static> TiffSlide<R> {
    /// Open a slide with the default block cache.
    pub async fn open(reader: R) -> Result<Self, SlideError> {
        Self::open_with_cache(reader, DEFAULT_BLOCK_SIZE, DEFAULT_BLOCK_CACHE_CAPACITY).await
    }

    /// Open a slide with a custom block size and cache capacity (in blocks).
    pub async fn open_with_cache(
        reader: R,
        block_size: usize,
        capacity: usize,
    ) -> Result<Self, SlideError> {
        if reader.size() < MAGIC_LEN {
            return Err(SlideError::UnsupportedFormat {
                reason: format!("{} is too small to be a slide", reader.identifier()),
            });
        }
        let magic = reader.read_exact_at(0, MAGIC_LEN as usize).await?;
        if !is_tiff_header(&magic) {
            return Err(SlideError::UnsupportedFormat {
                reason: format!("{} is not a TIFF container", reader.identifier()),
            });
        }

        let reader = Arc::new(BlockCache::with_capacity(reader, block_size, capacity));
        let pyramid = TiffPyramid::open(reader.as_ref()).await?;
        let format = SlideFormat::from_description(pyramid.description.as_deref());

        debug!(
            slide = reader.identifier(),
            %format,
            levels = pyramid.levels.len(),
            "opened slide"
        );

        Ok(Self {
            reader,
            pyramid,
            format,
        })
    }

    /// Detected vendor format.
    pub fn format(&self) -> SlideFormat {
        self.format
    }

    /// Parsed pyramid structure.
    pub fn pyramid(&self) -> &TiffPyramid {
        &self.pyramid
    }

    /// Read one stored tile as a complete JPEG stream.
    async fn read_tile(
        &self,
        level: &PyramidLevel,
        tile_x: u32,
        tile_y: u32,
    ) -> Result<Bytes, SlideError> {
        let (offset, length) =
            level
                .tile_location(tile_x, tile_y)
                .ok_or_else(|| SlideError::Decode {
                    message: format!("tile ({}, {}) is outside the tile grid", tile_x, tile_y),
                })?;

        let data = self.reader.read_exact_at(offset, length as usize).await?;
        Ok(prepare_tile_jpeg(level.jpeg_tables.as_deref(), &data))
    }
}

#[async_trait]
impl<R: RangeReader + 'static> Slide for TiffSlide<R> {
    fn level_count(&self) -> usize {
        self.pyramid.levels.len()
    }

    fn level_dimensions(&self, level: usize) -> Option<(u64, u64)> {
        self.pyramid
            .levels
            .get(level)
            .map(|l| (l.width as u64, l.height as u64))
    }

    fn level_downsample(&self, level: usize) -> Option<f64> {
        self.pyramid.levels.get(level).map(|l| l.downsample)
    }

    async fn read_region(
        &self,
        origin: (u64, u64),
        level: usize,
        size: (u32, u32),
    ) -> Result<RgbImage, SlideError> {
        let info = self
            .pyramid
            .levels
            .get(level)
            .ok_or(SlideError::InvalidLevel {
                level,
                levels: self.pyramid.levels.len(),
            })?;

        let window = Window {
            x: (origin.0 as f64 / info.downsample) as u64,
            y: (origin.1 as f64 / info.downsample) as u64,
            width: size.0,
            height: size.1,
            level_width: info.width as u64,
            level_height: info.height as u64,
        };

        let mut fetched = Vec::new();
        if let Some((x_end, y_end)) = window.visible_end() {
            let tile_w = info.tile_width as u64;
            let tile_h = info.tile_height as u64;
            for tile_y in (window.y / tile_h)..=((y_end - 1) / tile_h) {
                for tile_x in (window.x / tile_w)..=((x_end - 1) / tile_w) {
                    let data = self.read_tile(info, tile_x as u32, tile_y as u32).await?;
                    fetched.push(FetchedTile {
                        x: tile_x * tile_w,
                        y: tile_y * tile_h,
                        data,
                    });
                }
            }
        }

        tokio::task::spawn_blocking(move || window.composite(fetched))
            .await
            .map_err(|e| SlideError::Decode {
                message: format!("region task failed: {}", e),
            })?
    }
}

// =============================================================================
// Compositing
// =============================================================================

/// A stored tile positioned in level pixel space.
struct FetchedTile {
    x: u64,
    y: u64,
    data: Bytes,
}

/// Requested region in level pixel space.
#[derive(Debug, Clone, Copy)]
struct Window {
    x: u64,
    y: u64,
    width: u32,
    height: u32,
    level_width: u64,
    level_height: u64,
}

impl Window {
    /// Exclusive end of the part of the window that lies inside the level.
    fn visible_end(&self) -> Option<(u64, u64)> {
        let x_end = (self.x + self.width as u64).min(self.level_width);
        let y_end = (self.y + self.height as u64).min(self.level_height);
        (x_end > self.x && y_end > self.y).then_some((x_end, y_end))
    }

    fn composite(&self, tiles: Vec<FetchedTile>) -> Result<RgbImage, SlideError> {
        let mut canvas = RgbImage::new(self.width, self.height);
        for tile in tiles {
            let decoded = decode_jpeg_tile(&tile.data)?;
            self.paste(&mut canvas, &decoded, tile.x, tile.y);
        }
        Ok(canvas)
    }

    /// Copy the part of `tile` (placed at `tile_x, tile_y`) that falls inside
    /// both the window and the level.
    fn paste(&self, canvas: &mut RgbImage, tile: &RgbImage, tile_x: u64, tile_y: u64) {
        let Some((x_end, y_end)) = self.visible_end() else {
            return;
        };

        let x_start = self.x.max(tile_x);
        let y_start = self.y.max(tile_y);
        let x_stop = x_end.min(tile_x + tile.width() as u64);
        let y_stop = y_end.min(tile_y + tile.height() as u64);

        for gy in y_start..y_stop {
            for gx in x_start..x_stop {
                let pixel = *tile.get_pixel((gx - tile_x) as u32, (gy - tile_y) as u32);
                canvas.put_pixel((gx - self.x) as u32, (gy - self.y) as u32, pixel);
            }
        }
    }
}

// =============================================================================
// LocalSlideSource
// =============================================================================

/// Opens slides from the local filesystem.
#[derive(Debug, Clone, Copy)]
pub struct LocalSlideSource {
    block_size: usize,
    cache_blocks: usize,
}

impl Default for LocalSlideSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSlideSource {
    pub fn new() -> Self {
        Self::with_block_cache(DEFAULT_BLOCK_SIZE, DEFAULT_BLOCK_CACHE_CAPACITY)
    }

    /// Use a custom block size and per-slide cache capacity (in blocks).
    pub fn with_block_cache(block_size: usize, cache_blocks: usize) -> Self {
        Self {
            block_size,
            cache_blocks,
        }
    }
}

#[async_trait]
impl SlideSource for LocalSlideSource {
    type Slide = TiffSlide<LocalFileReader>;

    async fn open(&self, path: &Path) -> Result<Self::Slide, SlideError> {
        let reader = LocalFileReader::open(path).await?;
        TiffSlide::open_with_cache(reader, self.block_size, self.cache_blocks).await
    }
}
