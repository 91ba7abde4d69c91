//! Tile grid arithmetic.
//!
//! Rows run along the slide width and columns along its height, so a tile's
//! origin is `(stride * row * scale, stride * column * scale)` in level-0
//! pixels.

use serde::Serialize;

use crate::error::TilingError;
use crate::slide::SlideHandle;

use super::settings::TilingSettings;

/// One cell of the tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TileCoordinate {
    pub row: u64,
    pub column: u64,
}

impl TileCoordinate {
    pub fn new(row: u64, column: u64) -> Self {
        Self { row, column }
    }
}

/// Grid of one slide at the chosen level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridSpec {
    pub rows: u64,
    pub columns: u64,
    pub stride: u32,

    /// Rounded level downsample
    pub scale: u64,

    pub patch_size: u32,
}

impl GridSpec {
    pub fn tile_count(&self) -> u64 {
        self.rows * self.columns
    }

    pub fn contains(&self, coord: TileCoordinate) -> bool {
        coord.row < self.rows && coord.column < self.columns
    }

    /// Level-0 pixel origin `(x, y)` of a tile.
    pub fn origin(&self, coord: TileCoordinate) -> (u64, u64) {
        let step = self.stride as u64 * self.scale;
        (step * coord.row, step * coord.column)
    }

    /// Batch a tile is saved into; always equal to its row.
    pub fn batch_id(&self, coord: TileCoordinate) -> u64 {
        (coord.row * self.columns + coord.column) / self.columns.max(1)
    }

    /// Every coordinate of `row`, columns ascending.
    pub fn row_coordinates(&self, row: u64) -> impl Iterator<Item = TileCoordinate> {
        (0..self.columns).map(move |column| TileCoordinate::new(row, column))
    }
}

/// Floor-divide the level dimensions by `stride`, giving `(rows, columns)`.
pub fn compute_grid(width: u64, height: u64, stride: u32) -> Result<(u64, u64), TilingError> {
    if width == 0 || height == 0 {
        return Err(TilingError::InvalidDimension { width, height });
    }
    if stride == 0 {
        return Err(TilingError::InvalidConfig(
            "stride must be greater than 0".to_string(),
        ));
    }
    Ok((width / stride as u64, height / stride as u64))
}

/// Builds [`GridSpec`]s from slide handles.
#[derive(Debug, Clone, Copy)]
pub struct GridPlanner {
    patch_size: u32,
    stride: u32,
}

impl GridPlanner {
    pub fn new(settings: &TilingSettings) -> Self {
        Self {
            patch_size: settings.patch_size,
            stride: settings.stride(),
        }
    }

    pub fn plan(&self, handle: &SlideHandle) -> Result<GridSpec, TilingError> {
        let (rows, columns) = compute_grid(handle.width, handle.height, self.stride)?;
        Ok(GridSpec {
            rows,
            columns,
            stride: self.stride,
            scale: handle.scale,
            patch_size: self.patch_size,
        })
    }
}
