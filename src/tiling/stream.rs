//! Lazy, pull-based tile streaming.
//!
//! [`StreamExtractor::stream`] yields one [`PatchStream`] per slide; each
//! `PatchStream` reads a tile only when [`PatchStream::next`] is awaited.
//! Rows are visited in order or in a shuffled order; columns always ascend
//! within a row.
//!
//! # Example
//!
//! ```ignore
//! use wsi_tiler::tiling::{IterationMode, StreamExtractor, TilingSettings};
//!
//! let extractor = StreamExtractor::new(LocalSlideSource::new(), TilingSettings::default())?;
//! let mut slides = extractor.stream(paths, IterationMode::Random, Some(7));
//!
//! while let Some(next) = slides.next_slide().await {
//!     let (index, mut patches) = next?;
//!     while let Some(item) = patches.next().await {
//!         let item = item?;
//!         if let PatchContent::Valid(tile) = item.content {
//!             train(tile, item.row, item.column);
//!         }
//!     }
//! }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::error::TilingError;
use crate::slide::{Slide, SlideSource};

use super::classify::{PatchContent, TileClassifier};
use super::context::SlideProcessingContext;
use super::grid::TileCoordinate;
use super::settings::TilingSettings;

// =============================================================================
// IterationMode
// =============================================================================

/// Order in which the rows of a slide are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IterationMode {
    /// Rows `0..rows` in order
    #[default]
    Sequence,

    /// A permutation of `0..rows`
    Random,
}

impl IterationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IterationMode::Sequence => "sequence",
            IterationMode::Random => "random",
        }
    }
}

impl FromStr for IterationMode {
    type Err = TilingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequence" => Ok(IterationMode::Sequence),
            "random" => Ok(IterationMode::Random),
            other => Err(TilingError::InvalidArgument(format!(
                "unknown iteration mode '{}', expected 'sequence' or 'random'",
                other
            ))),
        }
    }
}

impl fmt::Display for IterationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// StreamExtractor
// =============================================================================

/// One tile yielded by a [`PatchStream`].
#[derive(Debug, Clone, PartialEq)]
pub struct PatchItem {
    pub row: u64,
    pub column: u64,
    pub content: PatchContent,
}

/// Streams tiles to the caller without touching the disk.
pub struct StreamExtractor<S> {
    source: S,
    settings: TilingSettings,
    classifier: Option<TileClassifier>,
}

impl<S: SlideSource> StreamExtractor<S> {
    pub fn new(source: S, settings: TilingSettings) -> Result<Self, TilingError> {
        settings.validate()?;
        let classifier = settings.active_classifier()?;
        Ok(Self {
            source,
            settings,
            classifier,
        })
    }

    pub fn settings(&self) -> &TilingSettings {
        &self.settings
    }

    /// Start streaming `slides`.
    ///
    /// In random mode the row order is drawn from an RNG seeded with `seed`,
    /// or from OS entropy when no seed is given. Nothing is opened until
    /// [`SlideStream::next_slide`] is awaited.
    pub fn stream(
        &self,
        slides: Vec<PathBuf>,
        mode: IterationMode,
        seed: Option<u64>,
    ) -> SlideStream<'_, S> {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        SlideStream {
            extractor: self,
            slides,
            next_index: 0,
            mode,
            rng,
        }
    }

    /// Like [`stream`](Self::stream), parsing the mode name first.
    pub fn stream_with_mode(
        &self,
        slides: Vec<PathBuf>,
        mode: &str,
        seed: Option<u64>,
    ) -> Result<SlideStream<'_, S>, TilingError> {
        let mode = mode.parse()?;
        Ok(self.stream(slides, mode, seed))
    }
}

// =============================================================================
// SlideStream
// =============================================================================

/// Outer sequence: one [`PatchStream`] per slide.
pub struct SlideStream<'a, S> {
    extractor: &'a StreamExtractor<S>,
    slides: Vec<PathBuf>,
    next_index: usize,
    mode: IterationMode,
    rng: StdRng,
}

impl<S: SlideSource> SlideStream<'_, S> {
    /// Open the next slide and return its index with its tile stream.
    pub async fn next_slide(
        &mut self,
    ) -> Option<Result<(usize, PatchStream<S::Slide>), TilingError>> {
        let index = self.next_index;
        let path = self.slides.get(index)?.clone();
        self.next_index += 1;

        Some(self.open_slide(index, path).await)
    }

    /// Slides not yet handed out.
    pub fn remaining(&self) -> usize {
        self.slides.len() - self.next_index
    }

    async fn open_slide(
        &mut self,
        index: usize,
        path: PathBuf,
    ) -> Result<(usize, PatchStream<S::Slide>), TilingError> {
        let extractor = self.extractor;
        let slide = extractor
            .source
            .open(&path)
            .await
            .map_err(|e| TilingError::slide(&path, e))?;
        let ctx = SlideProcessingContext::prepare(index, &path, &slide, &extractor.settings)?;

        let mut rows: Vec<u64> = (0..ctx.grid.rows).collect();
        if self.mode == IterationMode::Random {
            rows.shuffle(&mut self.rng);
        }

        debug!(
            slide = %path.display(),
            mode = %self.mode,
            rows = ctx.grid.rows,
            columns = ctx.grid.columns,
            "streaming slide"
        );

        Ok((
            index,
            PatchStream {
                slide,
                ctx,
                classifier: extractor.classifier,
                rows,
                cursor: 0,
            },
        ))
    }
}

// =============================================================================
// PatchStream
// =============================================================================

/// Inner sequence: the tiles of one slide, read on demand.
///
/// Single pass; to restart, call [`StreamExtractor::stream`] again.
pub struct PatchStream<T> {
    slide: T,
    ctx: SlideProcessingContext,
    classifier: Option<TileClassifier>,
    rows: Vec<u64>,
    cursor: u64,
}

impl<T: Slide> PatchStream<T> {
    /// Read the next tile, or `None` once every tile has been yielded.
    pub async fn next(&mut self) -> Option<Result<PatchItem, TilingError>> {
        let coord = self.coordinate_at(self.cursor)?;
        self.cursor += 1;

        let result = self
            .ctx
            .extract(&self.slide, coord, self.classifier, self.ctx.index)
            .await
            .map(|content| PatchItem {
                row: coord.row,
                column: coord.column,
                content,
            });
        Some(result)
    }

    pub fn context(&self) -> &SlideProcessingContext {
        &self.ctx
    }

    /// Row visiting order.
    pub fn row_order(&self) -> &[u64] {
        &self.rows
    }

    /// Total number of tiles this stream yields.
    pub fn len(&self) -> u64 {
        self.rows.len() as u64 * self.ctx.grid.columns
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tiles not yet yielded.
    pub fn remaining(&self) -> u64 {
        self.len() - self.cursor
    }

    fn coordinate_at(&self, position: u64) -> Option<TileCoordinate> {
        let columns = self.ctx.grid.columns;
        if position >= self.len() {
            return None;
        }
        let row = self.rows[(position / columns) as usize];
        Some(TileCoordinate::new(row, position % columns))
    }
}
