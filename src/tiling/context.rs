use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::TilingError;
use crate::slide::{Slide, SlideHandle};

use super::classify::{PatchContent, TileClassifier};
use super::grid::{GridPlanner, GridSpec, TileCoordinate};
use super::settings::TilingSettings;

/// Everything known about the slide currently being processed.
///
/// Built once per slide and never mutated; the next slide gets a new one.
#[derive(Debug, Clone)]
pub struct SlideProcessingContext {
    /// Position of the slide in the input list
    pub index: usize,
    pub handle: SlideHandle,
    pub grid: GridSpec,
    pub started: Instant,
}

impl SlideProcessingContext {
    /// Resolve the configured level of an opened slide and plan its grid.
    pub fn prepare<S: Slide + ?Sized>(
        index: usize,
        path: &Path,
        slide: &S,
        settings: &TilingSettings,
    ) -> Result<Self, TilingError> {
        let handle = SlideHandle::resolve(path, slide, settings.level)?;
        let grid = GridPlanner::new(settings).plan(&handle)?;
        Ok(Self {
            index,
            handle,
            grid,
            started: Instant::now(),
        })
    }

    /// `{stem}_{rows}_{columns}_x{scale}_sz{patch}`
    pub fn slide_dir_name(&self) -> String {
        format!(
            "{}_{}_{}_x{}_sz{}",
            self.handle.stem,
            self.grid.rows,
            self.grid.columns,
            self.grid.scale,
            self.grid.patch_size
        )
    }

    pub fn slide_dir(&self, save_root: &Path) -> PathBuf {
        save_root.join(self.slide_dir_name())
    }

    /// `batch{row}` directory under the slide directory.
    pub fn batch_dir(&self, slide_dir: &Path, coord: TileCoordinate) -> PathBuf {
        slide_dir.join(format!("batch{}", self.grid.batch_id(coord)))
    }

    /// `{stem}_{batch}_{column}.jpg`
    pub fn tile_file_name(&self, coord: TileCoordinate) -> String {
        format!(
            "{}_{}_{}.jpg",
            self.handle.stem,
            self.grid.batch_id(coord),
            coord.column
        )
    }

    /// Read one tile and, when a classifier is given, classify it.
    ///
    /// `worker` identifies the caller in errors.
    pub async fn extract<S: Slide + ?Sized>(
        &self,
        slide: &S,
        coord: TileCoordinate,
        classifier: Option<TileClassifier>,
        worker: usize,
    ) -> Result<PatchContent, TilingError> {
        let size = self.grid.patch_size;
        let tile = slide
            .read_region(self.grid.origin(coord), self.handle.level, (size, size))
            .await
            .map_err(|e| TilingError::slide(&self.handle.path, e))?;

        match classifier {
            Some(classifier) => tokio::task::spawn_blocking(move || classifier.apply(tile))
                .await
                .map_err(|e| TilingError::WorkerFailed {
                    worker,
                    message: format!("classification task failed: {}", e),
                }),
            None => Ok(PatchContent::Valid(tile)),
        }
    }
}
