//! Mean-luminance tile classification.

use image::RgbImage;
use serde::Serialize;

use crate::error::TilingError;

/// Outcome of classifying one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TileClass {
    Black,
    Blank,
    Valid,
}

/// A tile as delivered to consumers: pixels only when it passed filtering.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchContent {
    Black,
    Blank,
    Valid(RgbImage),
}

impl PatchContent {
    pub fn class(&self) -> TileClass {
        match self {
            PatchContent::Black => TileClass::Black,
            PatchContent::Blank => TileClass::Blank,
            PatchContent::Valid(_) => TileClass::Valid,
        }
    }

    /// Pixels of a valid tile.
    pub fn tile(&self) -> Option<&RgbImage> {
        match self {
            PatchContent::Valid(tile) => Some(tile),
            _ => None,
        }
    }

    pub fn into_tile(self) -> Option<RgbImage> {
        match self {
            PatchContent::Valid(tile) => Some(tile),
            _ => None,
        }
    }
}

/// Classifies tiles as black, blank or valid from their mean luminance.
///
/// Black is checked first: a mean that is both under the black threshold
/// and inside the blank range is black.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileClassifier {
    black_threshold: f64,
    blank_low: f64,
    blank_high: f64,
}

impl TileClassifier {
    /// `black_threshold` and both bounds of `blank_range` must lie in
    /// `0..=255`, with `low <= high`.
    pub fn new(black_threshold: i32, blank_range: (i32, i32)) -> Result<Self, TilingError> {
        let (low, high) = blank_range;

        if !(0..=255).contains(&black_threshold) {
            return Err(TilingError::InvalidConfig(format!(
                "black_threshold must be within 0..=255, got {}",
                black_threshold
            )));
        }
        if !(0..=255).contains(&low) || !(0..=255).contains(&high) || low > high {
            return Err(TilingError::InvalidConfig(format!(
                "blank_range must be an ordered pair within 0..=255, got ({}, {})",
                low, high
            )));
        }

        Ok(Self {
            black_threshold: black_threshold as f64,
            blank_low: low as f64,
            blank_high: high as f64,
        })
    }

    pub fn classify(&self, mean: f64) -> TileClass {
        if mean <= self.black_threshold {
            TileClass::Black
        } else if self.blank_low <= mean && mean <= self.blank_high {
            TileClass::Blank
        } else {
            TileClass::Valid
        }
    }

    /// Classify a tile, keeping its pixels only when it is valid.
    pub fn apply(&self, tile: RgbImage) -> PatchContent {
        match self.classify(mean_luminance(&tile)) {
            TileClass::Black => PatchContent::Black,
            TileClass::Blank => PatchContent::Blank,
            TileClass::Valid => PatchContent::Valid(tile),
        }
    }
}

/// Arithmetic mean of every R, G and B byte of the tile.
pub fn mean_luminance(tile: &RgbImage) -> f64 {
    let raw = tile.as_raw();
    if raw.is_empty() {
        return 0.0;
    }
    let sum: u64 = raw.iter().map(|&v| v as u64).sum();
    sum as f64 / raw.len() as f64
}
