//! TIFF container parsing.
//!
//! Supports classic TIFF and BigTIFF in either byte order, and identifies the
//! tiled JPEG images that make up a slide's resolution pyramid.

mod parser;
mod pyramid;

pub use parser::{
    field_type_size, read_ifd_chain, ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE,
    COMPRESSION_JPEG, TIFF_HEADER_SIZE,
};
pub use pyramid::{PyramidLevel, TiffPyramid};
