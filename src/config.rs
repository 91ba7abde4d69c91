//! Configuration management for WSI Tiler.
//!
//! Settings come from command-line arguments via clap, with environment
//! variable overrides (`WSI_TILER_` prefix) and defaults for everything
//! optional.
//!
//! # Subcommands
//!
//! - `tile` - extract every slide's tiles to a batch directory tree
//! - `scan` - stream tiles in memory and report per-slide outcomes
//! - `plan` - print each slide's grid and work plan without reading tiles
//!
//! # Environment Variables
//!
//! - `WSI_TILER_SLIDES` - Input slide directory
//! - `WSI_TILER_OUTPUT` - Output directory (`tile` only)
//! - `WSI_TILER_PATCH_SIZE` - Patch edge length (default: 400)
//! - `WSI_TILER_LEVEL` - Pyramid level (default: 0)
//! - `WSI_TILER_WORKERS` - Workers per slide, 1-9 (default: 3)
//! - `WSI_TILER_OVERLAP` - Use the overlap stride (default: false)
//! - `WSI_TILER_OVERLAP_STRIDE` - Stride when overlapping (default: 300)
//! - `WSI_TILER_REMOVE_BLANK` / `WSI_TILER_REMOVE_BLACK` - Tile filters (default: true)
//! - `WSI_TILER_BLANK_LOW` / `WSI_TILER_BLANK_HIGH` - Blank range (default: 200-225)
//! - `WSI_TILER_BLACK_THRESHOLD` - Black ceiling (default: 10)
//! - `WSI_TILER_JPEG_QUALITY` - Quality of saved tiles (default: 80)

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::error::TilingError;
use crate::tile::{is_valid_quality, DEFAULT_JPEG_QUALITY};
use crate::tiling::{
    IterationMode, TilingSettings, DEFAULT_BLACK_THRESHOLD, DEFAULT_BLANK_RANGE, DEFAULT_LEVEL,
    DEFAULT_OVERLAP_STRIDE, DEFAULT_PATCH_SIZE, DEFAULT_WORKERS,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// WSI Tiler - Cut Whole Slide Images into training patches.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsi-tiler")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Extract tiles of every slide to disk
    Tile(TileConfig),

    /// Stream tiles in memory and report how many are valid
    Scan(ScanConfig),

    /// Show grid and work plan per slide without extracting
    Plan(PlanConfig),
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ExtractionArgs {
    // =========================================================================
    // Grid
    // =========================================================================
    /// Edge length of extracted patches, in level pixels.
    #[arg(long, default_value_t = DEFAULT_PATCH_SIZE, env = "WSI_TILER_PATCH_SIZE")]
    pub patch_size: u32,

    /// Pyramid level to extract from (0 is full resolution).
    #[arg(long, default_value_t = DEFAULT_LEVEL, env = "WSI_TILER_LEVEL")]
    pub level: usize,

    /// Workers per slide; values outside 1-9 fall back to 3.
    #[arg(short, long, default_value_t = DEFAULT_WORKERS, env = "WSI_TILER_WORKERS")]
    pub workers: usize,

    /// Step by the overlap stride instead of the patch size.
    #[arg(long, default_value_t = false, action = ArgAction::Set, env = "WSI_TILER_OVERLAP")]
    pub overlap: bool,

    /// Distance between tile origins when overlap is enabled.
    #[arg(long, default_value_t = DEFAULT_OVERLAP_STRIDE, env = "WSI_TILER_OVERLAP_STRIDE")]
    pub overlap_stride: u32,

    // =========================================================================
    // Filtering
    // =========================================================================
    /// Drop tiles whose mean luminance lies in the blank range.
    ///
    /// Filtering only applies when black removal is enabled too.
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "WSI_TILER_REMOVE_BLANK")]
    pub remove_blank: bool,

    /// Lower bound of the blank range (inclusive).
    #[arg(long, default_value_t = DEFAULT_BLANK_RANGE.0, env = "WSI_TILER_BLANK_LOW")]
    pub blank_low: i32,

    /// Upper bound of the blank range (inclusive).
    #[arg(long, default_value_t = DEFAULT_BLANK_RANGE.1, env = "WSI_TILER_BLANK_HIGH")]
    pub blank_high: i32,

    /// Drop tiles whose mean luminance is at most the black threshold.
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "WSI_TILER_REMOVE_BLACK")]
    pub remove_black: bool,

    /// Black threshold (inclusive).
    #[arg(long, default_value_t = DEFAULT_BLACK_THRESHOLD, env = "WSI_TILER_BLACK_THRESHOLD")]
    pub black_threshold: i32,

    // =========================================================================
    // Output
    // =========================================================================
    /// JPEG quality of saved tiles (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "WSI_TILER_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ExtractionArgs {
    /// Validate the arguments and convert them into tiling settings.
    pub fn validate(&self) -> Result<TilingSettings, TilingError> {
        if !is_valid_quality(self.jpeg_quality) {
            return Err(TilingError::InvalidConfig(
                "jpeg_quality must be between 1 and 100".to_string(),
            ));
        }

        let settings = TilingSettings {
            patch_size: self.patch_size,
            level: self.level,
            workers: self.workers,
            overlap: self.overlap,
            overlap_stride: self.overlap_stride,
            remove_blank: self.remove_blank,
            blank_range: (self.blank_low, self.blank_high),
            remove_black: self.remove_black,
            black_threshold: self.black_threshold,
            jpeg_quality: self.jpeg_quality,
        };
        settings.validate()?;

        Ok(settings)
    }
}

/// `tile` subcommand.
#[derive(Args, Debug, Clone)]
pub struct TileConfig {
    /// Directory searched recursively for slides.
    #[arg(long, env = "WSI_TILER_SLIDES")]
    pub slides: PathBuf,

    /// Directory receiving one subdirectory per slide.
    #[arg(short, long, env = "WSI_TILER_OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub extraction: ExtractionArgs,
}

/// `scan` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ScanConfig {
    /// Directory searched recursively for slides.
    #[arg(long, env = "WSI_TILER_SLIDES")]
    pub slides: PathBuf,

    /// Row order: "sequence" or "random".
    #[arg(long, default_value = "sequence")]
    pub mode: String,

    /// Seed for random row order.
    #[arg(long)]
    pub seed: Option<u64>,

    #[command(flatten)]
    pub extraction: ExtractionArgs,
}

impl ScanConfig {
    pub fn iteration_mode(&self) -> Result<IterationMode, TilingError> {
        self.mode.parse()
    }
}

/// `plan` subcommand.
#[derive(Args, Debug, Clone)]
pub struct PlanConfig {
    /// Directory searched recursively for slides.
    #[arg(long, env = "WSI_TILER_SLIDES")]
    pub slides: PathBuf,

    /// Directory of `{slide}.xml` annotation files to check against the slides.
    #[arg(long, env = "WSI_TILER_ANNOTATIONS")]
    pub annotations: Option<PathBuf>,

    #[command(flatten)]
    pub extraction: ExtractionArgs,
}

// =============================================================================
// Tests
// =============================================================================
