//! Tiling engine.
//!
//! Pure planners ([`compute_grid`], [`partition`], [`TileClassifier`]) are
//! composed by two orchestrators:
//!
//! - [`BatchExtractor`]: parallel extraction of every slide to a batch
//!   directory tree
//! - [`StreamExtractor`]: lazy, pull-based streaming of tiles to the caller
//!
//! Both build a fresh [`SlideProcessingContext`] for each slide.

mod classify;
mod context;
mod grid;
mod partition;
mod saver;
mod settings;
mod stream;

pub use classify::{mean_luminance, PatchContent, TileClass, TileClassifier};
pub use context::SlideProcessingContext;
pub use grid::{compute_grid, GridPlanner, GridSpec, TileCoordinate};
pub use partition::{partition, WorkAssignment, WorkPlan};
pub use saver::{
    ensure_dir, BatchExtractor, SlideReport, TileCounts, TilingReport, MANIFEST_FILE,
};
pub use settings::{
    normalize_workers, TilingSettings, DEFAULT_BLACK_THRESHOLD, DEFAULT_BLANK_RANGE,
    DEFAULT_LEVEL, DEFAULT_OVERLAP_STRIDE, DEFAULT_PATCH_SIZE, DEFAULT_WORKERS, MAX_WORKERS,
};
pub use stream::{IterationMode, PatchItem, PatchStream, SlideStream, StreamExtractor};
