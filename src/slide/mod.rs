//! Slide abstraction layer.
//!
//! The tiling engine only ever talks to the [`SlideSource`] and [`Slide`]
//! traits; this module also ships the local pyramidal TIFF backend that
//! implements them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │     BatchExtractor / StreamExtractor    │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │        SlideSource / Slide traits       │
//! │  (open, level geometry, read_region)    │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │     LocalSlideSource → TiffSlide        │
//! │  (BlockCache, TIFF pyramid, JPEG tiles) │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use wsi_tiler::slide::{discover_slides, LocalSlideSource, Slide, SlideSource};
//!
//! let slides = discover_slides(Path::new("slides"))?;
//! let slide = LocalSlideSource::new().open(&slides[0]).await?;
//!
//! let (width, height) = slide.level_dimensions(0).unwrap();
//! let region = slide.read_region((0, 0), 0, (400, 400)).await?;
//! ```

mod discovery;
mod source;
mod tiff_slide;

pub use discovery::{discover_slides, is_slide_file, slide_stem, SLIDE_EXTENSIONS};
pub use source::{Slide, SlideHandle, SlideSource};
pub use tiff_slide::{LocalSlideSource, TiffSlide};
