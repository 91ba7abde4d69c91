//! Test utilities for integration tests.
//!
//! This module provides an in-memory slide source whose tiles are painted by
//! origin, and a builder for small pyramidal TIFF files with JPEG tiles.

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use wsi_tiler::error::{IoError, SlideError};
use wsi_tiler::slide::{Slide, SlideSource};
use wsi_tiler::tiling::TilingSettings;

// =============================================================================
// Mock Slide
// =============================================================================

/// A slide whose every region is a solid gray patch.
///
/// The gray value is looked up by the region's level-0 origin, falling back
/// to a default. Origins can instead be painted with a one-pixel
/// checkerboard of two grays.
#[derive(Clone)]
pub struct MockSlide {
    levels: Vec<(u64, u64, f64)>,
    values: HashMap<(u64, u64), u8>,
    checkerboards: HashMap<(u64, u64), (u8, u8)>,
    default_value: u8,
    fail_origin: Option<(u64, u64)>,
    panic_origin: Option<(u64, u64)>,
    reads: Arc<AtomicUsize>,
}

impl MockSlide {
    /// Single-level slide filled with `default_value`.
    pub fn new(width: u64, height: u64, default_value: u8) -> Self {
        Self {
            levels: vec![(width, height, 1.0)],
            values: HashMap::new(),
            checkerboards: HashMap::new(),
            default_value,
            fail_origin: None,
            panic_origin: None,
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_level(mut self, width: u64, height: u64, downsample: f64) -> Self {
        self.levels.push((width, height, downsample));
        self
    }

    /// Paint the region starting at `origin` (level-0 pixels).
    pub fn with_value(mut self, origin: (u64, u64), value: u8) -> Self {
        self.values.insert(origin, value);
        self
    }

    /// Paint the region starting at `origin` with alternating `dark` and
    /// `light` pixels.
    pub fn with_checkerboard(mut self, origin: (u64, u64), dark: u8, light: u8) -> Self {
        self.checkerboards.insert(origin, (dark, light));
        self
    }

    /// Make reads at `origin` panic.
    pub fn panicking_at(mut self, origin: (u64, u64)) -> Self {
        self.panic_origin = Some(origin);
        self
    }

    /// Make reads at `origin` fail.
    pub fn failing_at(mut self, origin: (u64, u64)) -> Self {
        self.fail_origin = Some(origin);
        self
    }

    /// Shared counter of region reads, across clones.
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

#[async_trait]
impl Slide for MockSlide {
    fn level_count(&self) -> usize {
        self.levels.len()
    }

    fn level_dimensions(&self, level: usize) -> Option<(u64, u64)> {
        self.levels.get(level).map(|l| (l.0, l.1))
    }

    fn level_downsample(&self, level: usize) -> Option<f64> {
        self.levels.get(level).map(|l| l.2)
    }

    async fn read_region(
        &self,
        origin: (u64, u64),
        _level: usize,
        size: (u32, u32),
    ) -> Result<RgbImage, SlideError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if self.fail_origin == Some(origin) {
            return Err(SlideError::Decode {
                message: format!("injected failure at {:?}", origin),
            });
        }
        if self.panic_origin == Some(origin) {
            panic!("injected panic at {:?}", origin);
        }

        if let Some(&(dark, light)) = self.checkerboards.get(&origin) {
            return Ok(RgbImage::from_fn(size.0, size.1, |x, y| {
                let v = if (x + y) % 2 == 0 { dark } else { light };
                Rgb([v, v, v])
            }));
        }

        let value = self
            .values
            .get(&origin)
            .copied()
            .unwrap_or(self.default_value);
        Ok(RgbImage::from_pixel(size.0, size.1, Rgb([value, value, value])))
    }
}

// =============================================================================
// Mock Slide Source
// =============================================================================

/// Serves pre-configured [`MockSlide`]s by path.
#[derive(Clone, Default)]
pub struct MockSlideSource {
    slides: HashMap<PathBuf, MockSlide>,
}

impl MockSlideSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slide(mut self, path: impl Into<PathBuf>, slide: MockSlide) -> Self {
        self.slides.insert(path.into(), slide);
        self
    }
}

#[async_trait]
impl SlideSource for MockSlideSource {
    type Slide = MockSlide;

    async fn open(&self, path: &Path) -> Result<MockSlide, SlideError> {
        self.slides
            .get(path)
            .cloned()
            .ok_or_else(|| SlideError::Io(IoError::NotFound(path.display().to_string())))
    }
}

/// Settings with the given patch size and worker count, defaults otherwise.
pub fn settings(patch_size: u32, workers: usize) -> TilingSettings {
    TilingSettings {
        patch_size,
        workers,
        ..Default::default()
    }
}

// =============================================================================
// Test JPEG Creation
// =============================================================================

/// Encode a solid RGB square as JPEG.
pub fn solid_jpeg(size: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(size, size, Rgb(color));

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, 95);
    encoder.encode_image(&img).unwrap();
    buf
}

/// Returns `true` if two channel values are within JPEG tolerance.
pub fn close(a: u8, b: u8) -> bool {
    (a as i16 - b as i16).abs() <= 3
}

// =============================================================================
// Pyramidal TIFF Builder
// =============================================================================

/// One tiled level of a test pyramid.
pub struct TestLevel {
    width: u32,
    height: u32,
    tile_size: u32,
    /// JPEG stream per tile, row-major
    tiles: Vec<Vec<u8>>,
}

impl TestLevel {
    /// A level whose tile `(tx, ty)` is filled with `color(tx, ty)`.
    pub fn from_fn(
        width: u32,
        height: u32,
        tile_size: u32,
        color: impl Fn(u32, u32) -> [u8; 3],
    ) -> Self {
        let tiles_x = width.div_ceil(tile_size);
        let tiles_y = height.div_ceil(tile_size);

        let mut tiles = Vec::new();
        for ty in 0..tiles_y {
            for tx in 0..tiles_x {
                tiles.push(solid_jpeg(tile_size, color(tx, ty)));
            }
        }

        Self {
            width,
            height,
            tile_size,
            tiles,
        }
    }

    pub fn uniform(width: u32, height: u32, tile_size: u32, gray: u8) -> Self {
        Self::from_fn(width, height, tile_size, |_, _| [gray, gray, gray])
    }
}

/// Builds little-endian classic TIFF files holding a JPEG tile pyramid.
#[derive(Default)]
pub struct PyramidTiffBuilder {
    description: Option<String>,
    levels: Vec<TestLevel>,
    with_label: bool,
}

struct Entry {
    tag: u16,
    field_type: u16,
    count: u32,
    value: [u8; 4],
}

impl Entry {
    fn short(tag: u16, value: u16) -> Self {
        let b = value.to_le_bytes();
        Self {
            tag,
            field_type: 3,
            count: 1,
            value: [b[0], b[1], 0, 0],
        }
    }

    fn long(tag: u16, value: u32) -> Self {
        Self {
            tag,
            field_type: 4,
            count: 1,
            value: value.to_le_bytes(),
        }
    }

    fn long_array(tag: u16, count: u32, offset: u32) -> Self {
        Self {
            tag,
            field_type: 4,
            count,
            value: offset.to_le_bytes(),
        }
    }

    fn ascii(tag: u16, count: u32, offset: u32) -> Self {
        Self {
            tag,
            field_type: 2,
            count,
            value: offset.to_le_bytes(),
        }
    }
}

impl PyramidTiffBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// ImageDescription of the first IFD (e.g. "Aperio Image Library").
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn level(mut self, level: TestLevel) -> Self {
        self.levels.push(level);
        self
    }

    /// Append an untiled label image, which is not a pyramid level.
    pub fn label(mut self) -> Self {
        self.with_label = true;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut data = vec![b'I', b'I', 42, 0, 0, 0, 0, 0];
        let mut ifds: Vec<Vec<Entry>> = Vec::new();

        let description = self.description.map(|text| {
            let offset = data.len() as u32;
            data.extend(text.as_bytes());
            data.push(0);
            (offset, text.len() as u32 + 1)
        });

        for (index, level) in self.levels.iter().enumerate() {
            let mut offsets = Vec::new();
            let mut counts = Vec::new();
            for tile in &level.tiles {
                offsets.push(data.len() as u32);
                counts.push(tile.len() as u32);
                data.extend(tile);
            }

            let mut entries = vec![
                Entry::long(256, level.width),
                Entry::long(257, level.height),
                Entry::short(259, 7),
                Entry::short(277, 3),
                Entry::long(322, level.tile_size),
                Entry::long(323, level.tile_size),
            ];

            let n = level.tiles.len() as u32;
            if n == 1 {
                entries.push(Entry::long(324, offsets[0]));
                entries.push(Entry::long(325, counts[0]));
            } else {
                let offsets_at = write_u32s(&mut data, &offsets);
                let counts_at = write_u32s(&mut data, &counts);
                entries.push(Entry::long_array(324, n, offsets_at));
                entries.push(Entry::long_array(325, n, counts_at));
            }

            if index == 0 {
                if let Some((offset, len)) = description {
                    entries.push(Entry::ascii(270, len, offset));
                }
            }
            ifds.push(entries);
        }

        if self.with_label {
            ifds.push(vec![
                Entry::long(256, 64),
                Entry::long(257, 32),
                Entry::short(259, 1),
                Entry::short(277, 3),
            ]);
        }

        if data.len() % 2 == 1 {
            data.push(0);
        }
        let first_ifd = data.len() as u32;
        data[4..8].copy_from_slice(&first_ifd.to_le_bytes());

        let ifd_count = ifds.len();
        for (i, mut entries) in ifds.into_iter().enumerate() {
            entries.sort_by_key(|e| e.tag);
            let start = data.len();
            let size = 2 + entries.len() * 12 + 4;

            data.extend((entries.len() as u16).to_le_bytes());
            for entry in &entries {
                data.extend(entry.tag.to_le_bytes());
                data.extend(entry.field_type.to_le_bytes());
                data.extend(entry.count.to_le_bytes());
                data.extend(entry.value);
            }
            let next = if i + 1 < ifd_count {
                (start + size) as u32
            } else {
                0
            };
            data.extend(next.to_le_bytes());
        }

        data
    }

    /// Build and write to `dir/name`.
    pub fn write_to(self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}

fn write_u32s(data: &mut Vec<u8>, values: &[u32]) -> u32 {
    let offset = data.len() as u32;
    for value in values {
        data.extend(value.to_le_bytes());
    }
    offset
}

/// Count `.jpg` files below `dir`.
pub fn count_jpegs(dir: &Path) -> usize {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "jpg"))
        .count()
}
