//! Backend-agnostic slide traits.
//!
//! [`SlideSource`] opens a path into a [`Slide`]; a `Slide` reports its
//! pyramid geometry and reads RGB regions. The opened slide is shared
//! read-only by every worker of a tiling run, so reads take `&self`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::RgbImage;

use crate::error::{SlideError, TilingError};

use super::discovery::slide_stem;

// =============================================================================
// Slide Trait
// =============================================================================

/// An opened multi-resolution slide.
#[async_trait]
pub trait Slide: Send + Sync {
    /// Number of pyramid levels. Level 0 is full resolution.
    fn level_count(&self) -> usize;

    /// `(width, height)` in pixels of a level, or `None` if out of range.
    fn level_dimensions(&self, level: usize) -> Option<(u64, u64)>;

    /// Downsample factor of a level relative to level 0 (1.0 for level 0).
    fn level_downsample(&self, level: usize) -> Option<f64>;

    /// Read a `size` window of `level` whose top-left corner is `origin`,
    /// given in level-0 pixel coordinates.
    ///
    /// Pixels falling outside the level are black.
    async fn read_region(
        &self,
        origin: (u64, u64),
        level: usize,
        size: (u32, u32),
    ) -> Result<RgbImage, SlideError>;
}

// =============================================================================
// SlideSource Trait
// =============================================================================

/// Opens slides from a storage backend.
#[async_trait]
pub trait SlideSource: Send + Sync {
    /// The slide type this source produces.
    type Slide: Slide + 'static;

    /// Open the slide at `path`.
    async fn open(&self, path: &Path) -> Result<Self::Slide, SlideError>;
}

// =============================================================================
// SlideHandle
// =============================================================================

/// One slide resolved at the level chosen for a tiling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideHandle {
    pub path: PathBuf,

    /// File name without extension, used to name output files
    pub stem: String,

    pub level: usize,

    /// Width of `level` in pixels
    pub width: u64,

    /// Height of `level` in pixels
    pub height: u64,

    /// Level downsample rounded to the nearest integer (at least 1)
    pub scale: u64,
}

impl SlideHandle {
    /// Resolve `level` of an opened slide.
    pub fn resolve<S: Slide + ?Sized>(
        path: &Path,
        slide: &S,
        level: usize,
    ) -> Result<Self, TilingError> {
        let invalid_level = || {
            TilingError::slide(
                path,
                SlideError::InvalidLevel {
                    level,
                    levels: slide.level_count(),
                },
            )
        };

        let (width, height) = slide.level_dimensions(level).ok_or_else(invalid_level)?;
        let downsample = slide.level_downsample(level).ok_or_else(invalid_level)?;

        Ok(Self {
            path: path.to_path_buf(),
            stem: slide_stem(path),
            level,
            width,
            height,
            scale: (downsample.round() as u64).max(1),
        })
    }
}
