//! Parallel extraction of tiles to disk.
//!
//! Slides are processed one at a time. Each slide's rows are partitioned
//! across worker tasks that read, classify and save their tiles; every
//! worker is joined before the next slide is opened.
//!
//! # Output Layout
//!
//! ```text
//! {save_root}/
//!   {stem}_{rows}_{columns}_x{scale}_sz{patch}/
//!     manifest.json
//!     batch0/
//!       {stem}_0_0.jpg
//!       {stem}_0_1.jpg
//!     batch1/
//!       ...
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::TilingError;
use crate::slide::{Slide, SlideSource};
use crate::tile::{decode_jpeg_tile, JpegTileEncoder};

use super::classify::{mean_luminance, PatchContent, TileClass, TileClassifier};
use super::context::SlideProcessingContext;
use super::grid::GridSpec;
use super::partition::{partition, WorkAssignment};
use super::settings::TilingSettings;

/// File written into every slide output directory.
pub const MANIFEST_FILE: &str = "manifest.json";

// =============================================================================
// Reports
// =============================================================================

/// Tile outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TileCounts {
    pub saved: u64,
    pub black: u64,
    pub blank: u64,
}

impl TileCounts {
    pub fn total(&self) -> u64 {
        self.saved + self.black + self.blank
    }

    fn add(&mut self, other: TileCounts) {
        self.saved += other.saved;
        self.black += other.black;
        self.blank += other.blank;
    }
}

/// Result of tiling one slide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideReport {
    pub slide: PathBuf,
    pub stem: String,
    pub output_dir: PathBuf,
    pub level: usize,
    pub width: u64,
    pub height: u64,
    pub grid: GridSpec,
    pub requested_workers: usize,
    pub workers: usize,
    pub filtered: bool,
    pub counts: TileCounts,
    pub elapsed_ms: u64,
}

/// Result of a whole tiling run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TilingReport {
    pub slides: Vec<SlideReport>,
}

impl TilingReport {
    pub fn totals(&self) -> TileCounts {
        let mut totals = TileCounts::default();
        for slide in &self.slides {
            totals.add(slide.counts);
        }
        totals
    }
}

// =============================================================================
// BatchExtractor
// =============================================================================

/// Extracts every slide's tiles into a batch directory tree.
///
/// # Example
///
/// ```ignore
/// use wsi_tiler::slide::{discover_slides, LocalSlideSource};
/// use wsi_tiler::tiling::{BatchExtractor, TilingSettings};
///
/// let slides = discover_slides(Path::new("slides"))?;
/// let extractor = BatchExtractor::new(LocalSlideSource::new(), TilingSettings::default(), "out")?;
/// let report = extractor.tiling(&slides).await?;
/// println!("saved {} tiles", report.totals().saved);
/// ```
pub struct BatchExtractor<S> {
    source: S,
    settings: TilingSettings,
    save_root: PathBuf,
    classifier: Option<TileClassifier>,
    encoder: JpegTileEncoder,
}

impl<S: SlideSource> BatchExtractor<S> {
    /// Validate the settings and build an extractor writing under `save_root`.
    pub fn new(
        source: S,
        settings: TilingSettings,
        save_root: impl Into<PathBuf>,
    ) -> Result<Self, TilingError> {
        settings.validate()?;
        let classifier = settings.active_classifier()?;
        let encoder = JpegTileEncoder::new(settings.jpeg_quality);

        Ok(Self {
            source,
            settings,
            save_root: save_root.into(),
            classifier,
            encoder,
        })
    }

    pub fn settings(&self) -> &TilingSettings {
        &self.settings
    }

    pub fn save_root(&self) -> &Path {
        &self.save_root
    }

    /// Tile every slide in order, stopping at the first failing slide.
    pub async fn tiling(&self, slides: &[PathBuf]) -> Result<TilingReport, TilingError> {
        let mut report = TilingReport::default();

        for (index, path) in slides.iter().enumerate() {
            let slide_report = self.tile_slide(index, path).await?;
            info!(
                slide = %path.display(),
                saved = slide_report.counts.saved,
                black = slide_report.counts.black,
                blank = slide_report.counts.blank,
                elapsed_ms = slide_report.elapsed_ms,
                "slide done ({}/{})",
                index + 1,
                slides.len()
            );
            report.slides.push(slide_report);
        }

        Ok(report)
    }

    async fn tile_slide(&self, index: usize, path: &Path) -> Result<SlideReport, TilingError> {
        let slide = self
            .source
            .open(path)
            .await
            .map_err(|e| TilingError::slide(path, e))?;
        let slide = Arc::new(slide);

        let ctx = Arc::new(SlideProcessingContext::prepare(
            index,
            path,
            slide.as_ref(),
            &self.settings,
        )?);
        let plan = partition(ctx.grid.rows, self.settings.effective_workers())?;

        info!(
            slide = %path.display(),
            width = ctx.handle.width,
            height = ctx.handle.height,
            rows = ctx.grid.rows,
            columns = ctx.grid.columns,
            scale = ctx.grid.scale,
            "tiling slide"
        );
        if plan.is_adapted() && !plan.assignments.is_empty() {
            info!(
                requested = plan.requested,
                effective = plan.effective_workers(),
                "grid too small for requested workers, using {}",
                plan.effective_workers()
            );
        }

        let slide_dir = ctx.slide_dir(&self.save_root);
        ensure_dir(&slide_dir).await?;

        let mut handles = Vec::with_capacity(plan.assignments.len());
        for assignment in plan.assignments.iter().copied() {
            let worker = Worker {
                slide: Arc::clone(&slide),
                ctx: Arc::clone(&ctx),
                assignment,
                classifier: self.classifier,
                encoder: self.encoder,
                slide_dir: slide_dir.clone(),
            };
            handles.push((assignment.worker, tokio::spawn(worker.run())));
        }

        // Join every worker before reporting, then surface the first failure
        let mut counts = TileCounts::default();
        let mut first_error = None;
        for (worker, handle) in handles {
            let outcome = handle.await.unwrap_or_else(|e| {
                Err(TilingError::WorkerFailed {
                    worker,
                    message: e.to_string(),
                })
            });
            match outcome {
                Ok(worker_counts) => counts.add(worker_counts),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let report = SlideReport {
            slide: path.to_path_buf(),
            stem: ctx.handle.stem.clone(),
            output_dir: slide_dir,
            level: ctx.handle.level,
            width: ctx.handle.width,
            height: ctx.handle.height,
            grid: ctx.grid,
            requested_workers: plan.requested,
            workers: plan.effective_workers(),
            filtered: self.classifier.is_some(),
            counts,
            elapsed_ms: ctx.started.elapsed().as_millis() as u64,
        };
        write_manifest(&report).await?;

        Ok(report)
    }
}

// =============================================================================
// Worker
// =============================================================================

/// One row range of one slide.
struct Worker<T> {
    slide: Arc<T>,
    ctx: Arc<SlideProcessingContext>,
    assignment: WorkAssignment,
    classifier: Option<TileClassifier>,
    encoder: JpegTileEncoder,
    slide_dir: PathBuf,
}

impl<T: Slide + 'static> Worker<T> {
    async fn run(self) -> Result<TileCounts, TilingError> {
        let started = Instant::now();
        let worker = self.assignment.worker;
        let mut counts = TileCounts::default();

        for row in self.assignment.rows() {
            let mut batch_ready = false;

            for coord in self.ctx.grid.row_coordinates(row) {
                let content = self
                    .ctx
                    .extract(self.slide.as_ref(), coord, self.classifier, worker)
                    .await?;

                let tile = match content {
                    PatchContent::Black => {
                        debug!(row, column = coord.column, "skipping black tile");
                        counts.black += 1;
                        continue;
                    }
                    PatchContent::Blank => {
                        debug!(row, column = coord.column, "skipping blank tile");
                        counts.blank += 1;
                        continue;
                    }
                    PatchContent::Valid(tile) => tile,
                };

                let encoder = self.encoder;
                let classifier = self.classifier;
                let encoded =
                    tokio::task::spawn_blocking(move || encode_tile(encoder, classifier, &tile))
                        .await
                        .map_err(|e| TilingError::WorkerFailed {
                            worker,
                            message: format!("encode task failed: {}", e),
                        })??;
                let data = match encoded {
                    EncodedTile::Kept(data) => data,
                    EncodedTile::Rejected(class) => {
                        debug!(row, column = coord.column, ?class, "tile filtered after encoding");
                        match class {
                            TileClass::Black => counts.black += 1,
                            _ => counts.blank += 1,
                        }
                        continue;
                    }
                };

                let batch_dir = self.ctx.batch_dir(&self.slide_dir, coord);
                if !batch_ready {
                    ensure_dir(&batch_dir).await?;
                    batch_ready = true;
                }

                let path = batch_dir.join(self.ctx.tile_file_name(coord));
                tokio::fs::write(&path, &data)
                    .await
                    .map_err(|e| TilingError::persist(&path, e))?;
                counts.saved += 1;
            }
        }

        info!(
            worker,
            rows = ?self.assignment.rows(),
            saved = counts.saved,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "worker finished"
        );
        Ok(counts)
    }
}

/// A valid tile after JPEG encoding.
#[derive(Debug)]
enum EncodedTile {
    Kept(Bytes),
    /// Compression moved the tile's mean out of the valid band
    Rejected(TileClass),
}

/// Encode a tile; with filtering on, the decoded JPEG is classified again so
/// that every written file still reads back as valid.
fn encode_tile(
    encoder: JpegTileEncoder,
    classifier: Option<TileClassifier>,
    tile: &RgbImage,
) -> Result<EncodedTile, TilingError> {
    let data = encoder.encode(tile)?;

    if let Some(classifier) = classifier {
        let decoded = decode_jpeg_tile(&data).map_err(|e| TilingError::Encode {
            message: e.to_string(),
        })?;
        let class = classifier.classify(mean_luminance(&decoded));
        if class != TileClass::Valid {
            return Ok(EncodedTile::Rejected(class));
        }
    }

    Ok(EncodedTile::Kept(data))
}

// =============================================================================
// Filesystem
// =============================================================================

/// Create a directory and its parents, succeeding if it already exists.
///
/// Safe to call concurrently for the same path.
pub async fn ensure_dir(path: &Path) -> Result<(), TilingError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| TilingError::persist(path, e))
}

async fn write_manifest(report: &SlideReport) -> Result<(), TilingError> {
    let path = report.output_dir.join(MANIFEST_FILE);
    let json = serde_json::to_vec_pretty(report).map_err(|e| TilingError::persist(&path, e))?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| TilingError::persist(&path, e))
}
