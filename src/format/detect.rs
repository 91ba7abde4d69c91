//! Slide format detection.
//!
//! Only TIFF-based slides are read natively. Aperio SVS is recognized by the
//! "Aperio" marker at the start of the first ImageDescription; every other
//! TIFF is handled as a generic pyramidal TIFF. Other vendor formats
//! (MRXS, NDPI variants the TIFF reader cannot follow) are reported as
//! unsupported by the slide source.

use std::fmt;

/// Marker string for Aperio SVS format.
const APERIO_MARKER: &str = "Aperio";

/// Detected slide format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideFormat {
    /// Aperio SVS (TIFF with JPEGTables and abbreviated tile streams)
    AperioSvs,

    /// Standard tiled TIFF with multiple resolutions
    GenericTiff,
}

impl SlideFormat {
    /// Classify a TIFF slide from its first ImageDescription.
    pub fn from_description(description: Option<&str>) -> Self {
        match description {
            Some(desc) if desc.trim_start().starts_with(APERIO_MARKER) => SlideFormat::AperioSvs,
            _ => SlideFormat::GenericTiff,
        }
    }

    /// Human-readable format name.
    pub const fn name(&self) -> &'static str {
        match self {
            SlideFormat::AperioSvs => "Aperio SVS",
            SlideFormat::GenericTiff => "Generic Pyramidal TIFF",
        }
    }
}

impl fmt::Display for SlideFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Check whether bytes start with a TIFF or BigTIFF signature.
pub fn is_tiff_header(bytes: &[u8]) -> bool {
    matches!(
        bytes,
        [b'I', b'I', 42 | 43, 0, ..] | [b'M', b'M', 0, 42 | 43, ..]
    )
}
