//! # WSI Tiler
//!
//! Cuts gigapixel Whole Slide Images (WSI) into fixed-size square patches
//! for machine-learning pipelines.
//!
//! ## Features
//!
//! - **Grid planning**: tile grid from level dimensions, patch size and stride
//! - **Parallel extraction**: rows of each slide split across worker tasks,
//!   saved into one directory per row
//! - **Filtering**: black and blank tiles dropped by mean luminance
//! - **Streaming**: lazy, sequential or row-shuffled tile iteration in memory
//! - **Native slide reader**: Aperio SVS and tiled pyramidal TIFF, read by
//!   byte range through a block cache
//!
//! ## Architecture
//!
//! - [`io`] - Range reads and block caching
//! - [`mod@format`] - TIFF pyramid parsing and JPEG table handling
//! - [`slide`] - Slide traits, discovery and the TIFF backend
//! - [`tile`] - JPEG decode/encode
//! - [`tiling`] - Grid, classifier, partitioner and the two extractors
//! - [`annotation`] - Per-slide annotation records
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use wsi_tiler::{discover_slides, BatchExtractor, LocalSlideSource, TilingSettings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), wsi_tiler::TilingError> {
//!     let slides = discover_slides(Path::new("slides"))?;
//!     let extractor =
//!         BatchExtractor::new(LocalSlideSource::new(), TilingSettings::default(), "patches")?;
//!
//!     let report = extractor.tiling(&slides).await?;
//!     println!("saved {} tiles", report.totals().saved);
//!     Ok(())
//! }
//! ```

pub mod annotation;
pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod slide;
pub mod tile;
pub mod tiling;

// Re-export commonly used types
pub use annotation::{
    check_annotation_alignment, discover_annotations, load_annotations, parse_annotations,
    AnnotationRegion, SlideAnnotations,
};
pub use config::{Cli, Command, ExtractionArgs, PlanConfig, ScanConfig, TileConfig};
pub use error::{IoError, SlideError, TiffError, TilingError};
pub use format::{is_tiff_header, PyramidLevel, SlideFormat, TiffPyramid};
pub use io::{BlockCache, LocalFileReader, RangeReader};
pub use slide::{
    discover_slides, LocalSlideSource, Slide, SlideHandle, SlideSource, TiffSlide,
    SLIDE_EXTENSIONS,
};
pub use tile::{decode_jpeg_tile, JpegTileEncoder, DEFAULT_JPEG_QUALITY};
pub use tiling::{
    compute_grid, mean_luminance, partition, BatchExtractor, GridPlanner, GridSpec,
    IterationMode, PatchContent, PatchItem, PatchStream, SlideProcessingContext, SlideStream,
    StreamExtractor, TileClass, TileClassifier, TileCoordinate, TilingReport, TilingSettings,
    WorkAssignment, WorkPlan,
};
