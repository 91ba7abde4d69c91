//! Slide file formats.
//!
//! - [`tiff`]: TIFF/BigTIFF parsing and pyramid level identification
//! - [`jpeg`]: JPEGTables merging for abbreviated tile streams
//! - [`detect`]: vendor detection (Aperio SVS vs generic TIFF)

pub mod detect;
pub mod jpeg;
pub mod tiff;

pub use detect::{is_tiff_header, SlideFormat};
pub use jpeg::prepare_tile_jpeg;
pub use tiff::{PyramidLevel, TiffPyramid};
