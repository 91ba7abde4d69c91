use std::path::PathBuf;

use thiserror::Error;

/// I/O errors that can occur when reading byte ranges from a slide file
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// File not found
    #[error("File not found: {0}")]
    NotFound(String),

    /// Any other operating system error
    #[error("Read error: {0}")]
    Read(String),
}

impl From<std::io::Error> for IoError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => IoError::NotFound(err.to_string()),
            _ => IoError::Read(err.to_string()),
        }
    }
}

/// Errors that can occur when parsing TIFF containers
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// IFD offset points outside the file
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Required tag is missing from an IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Compression other than JPEG
    #[error("Unsupported compression: {0} (only JPEG is supported)")]
    UnsupportedCompression(u16),

    /// No tiled image found in the file
    #[error("No tiled pyramid levels found")]
    NoPyramid,
}

/// Errors raised while opening a slide or reading a region from it
#[derive(Debug, Clone, Error)]
pub enum SlideError {
    /// I/O error while reading the slide file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Container parsing error
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// The file is not a format this backend can read
    #[error("Unsupported format: {reason}")]
    UnsupportedFormat { reason: String },

    /// Requested pyramid level does not exist
    #[error("Invalid level {level}: slide has {levels} level(s)")]
    InvalidLevel { level: usize, levels: usize },

    /// A stored tile could not be decoded
    #[error("Failed to decode tile: {message}")]
    Decode { message: String },
}

/// Errors produced by the tiling engine.
#[derive(Debug, Clone, Error)]
pub enum TilingError {
    /// Input directory does not exist
    #[error("Path not found: {}", path.display())]
    PathNotFound { path: PathBuf },

    /// Input directory contains no recognized slide files
    #[error("No slides found in {}, supported extensions: {extensions}", root.display())]
    NoSlidesFound { root: PathBuf, extensions: String },

    /// Slide has a non-positive width or height at the chosen level
    #[error("Invalid slide dimensions: width {width}, height {height}")]
    InvalidDimension { width: u64, height: u64 },

    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A caller-supplied argument is not recognized
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The slide backend failed to open a slide or read a region
    #[error("Slide {}: {source}", path.display())]
    Slide {
        path: PathBuf,
        #[source]
        source: SlideError,
    },

    /// A tile could not be encoded
    #[error("Failed to encode tile: {message}")]
    Encode { message: String },

    /// Writing to the output tree failed
    #[error("Failed to write {}: {message}", path.display())]
    Persist { path: PathBuf, message: String },

    /// A worker panicked or was cancelled before finishing its rows
    #[error("Worker {worker} failed: {message}")]
    WorkerFailed { worker: usize, message: String },

    /// Annotation records could not be loaded or do not match the slides
    #[error("Annotation error: {0}")]
    Annotation(String),
}

impl TilingError {
    /// Wrap a backend error with the slide path it occurred on.
    pub fn slide(path: impl Into<PathBuf>, source: impl Into<SlideError>) -> Self {
        TilingError::Slide {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Wrap a filesystem error with the path being written.
    pub fn persist(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        TilingError::Persist {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
