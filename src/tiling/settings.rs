//! Tiling run settings.

use serde::Serialize;
use tracing::warn;

use crate::error::TilingError;
use crate::tile::DEFAULT_JPEG_QUALITY;

use super::classify::TileClassifier;

// =============================================================================
// Default Values
// =============================================================================

/// Default edge length of an extracted patch, in level pixels.
pub const DEFAULT_PATCH_SIZE: u32 = 400;

/// Default pyramid level.
pub const DEFAULT_LEVEL: usize = 0;

/// Worker count used when the requested one is out of range.
pub const DEFAULT_WORKERS: usize = 3;

/// Exclusive upper bound on the worker count.
pub const MAX_WORKERS: usize = 10;

/// Default stride between tile origins when overlap is enabled.
pub const DEFAULT_OVERLAP_STRIDE: u32 = 300;

/// Default inclusive mean-luminance range of blank tiles.
pub const DEFAULT_BLANK_RANGE: (i32, i32) = (200, 225);

/// Default inclusive mean-luminance ceiling of black tiles.
pub const DEFAULT_BLACK_THRESHOLD: i32 = 10;

// =============================================================================
// TilingSettings
// =============================================================================

/// Everything that controls how slides are cut into patches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TilingSettings {
    pub patch_size: u32,
    pub level: usize,

    /// Requested worker count; see [`normalize_workers`]
    pub workers: usize,

    pub overlap: bool,
    pub overlap_stride: u32,

    pub remove_blank: bool,
    pub blank_range: (i32, i32),
    pub remove_black: bool,
    pub black_threshold: i32,

    /// JPEG quality of saved patches
    pub jpeg_quality: u8,
}

impl Default for TilingSettings {
    fn default() -> Self {
        Self {
            patch_size: DEFAULT_PATCH_SIZE,
            level: DEFAULT_LEVEL,
            workers: DEFAULT_WORKERS,
            overlap: false,
            overlap_stride: DEFAULT_OVERLAP_STRIDE,
            remove_blank: true,
            blank_range: DEFAULT_BLANK_RANGE,
            remove_black: true,
            black_threshold: DEFAULT_BLACK_THRESHOLD,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl TilingSettings {
    /// Distance between adjacent tile origins, identical on both axes.
    pub fn stride(&self) -> u32 {
        if self.overlap {
            self.overlap_stride
        } else {
            self.patch_size
        }
    }

    /// Tiles are classified only when both removals are enabled.
    pub fn filtering(&self) -> bool {
        self.remove_blank && self.remove_black
    }

    /// Worker count actually requested from the partitioner.
    pub fn effective_workers(&self) -> usize {
        normalize_workers(self.workers)
    }

    /// Check every value before any slide is opened.
    pub fn validate(&self) -> Result<(), TilingError> {
        if self.patch_size == 0 {
            return Err(TilingError::InvalidConfig(
                "patch_size must be greater than 0".to_string(),
            ));
        }
        if self.overlap && self.overlap_stride == 0 {
            return Err(TilingError::InvalidConfig(
                "overlap_stride must be greater than 0".to_string(),
            ));
        }
        TileClassifier::new(self.black_threshold, self.blank_range)?;
        Ok(())
    }

    /// The classifier to apply, or `None` when tiles are kept unfiltered.
    ///
    /// Warns when only one of the two removals is enabled, since such a run
    /// keeps every tile.
    pub fn active_classifier(&self) -> Result<Option<TileClassifier>, TilingError> {
        let classifier = TileClassifier::new(self.black_threshold, self.blank_range)?;

        if self.filtering() {
            return Ok(Some(classifier));
        }
        if self.remove_blank != self.remove_black {
            warn!(
                remove_blank = self.remove_blank,
                remove_black = self.remove_black,
                "tile filtering needs both blank and black removal; keeping every tile"
            );
        }
        Ok(None)
    }
}

/// Map a requested worker count onto `1..MAX_WORKERS`, falling back to
/// [`DEFAULT_WORKERS`].
pub fn normalize_workers(requested: usize) -> usize {
    if (1..MAX_WORKERS).contains(&requested) {
        requested
    } else {
        DEFAULT_WORKERS
    }
}
