//! Mosaic types and errors

use thiserror::Error;

use crate::coord::{CoordError, GeoBounds};
use crate::raster::Raster;

use super::grid::TileGrid;

/// Default zoom level for mosaics.
pub const DEFAULT_ZOOM: u8 = 17;

/// Default ground extent along each axis, in meters.
pub const DEFAULT_EXTENT_M: f64 = 1000.0;

/// Default cap on tiles per axis.
pub const DEFAULT_MAX_TILES_PER_AXIS: u32 = 8;

/// Default number of concurrent tile fetches.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Errors that prevent a mosaic from being built.
///
/// Tile download failures never appear here; they degrade to black tiles
/// and are counted in [`FetchStats`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AreaExtractionError {
    /// Center longitude or latitude is NaN or infinite.
    #[error("Center point is not finite: lon={lon}, lat={lat}")]
    NonFiniteCenter { lon: f64, lat: f64 },

    /// Center is outside the Web Mercator range, or the zoom is invalid.
    #[error("Invalid mosaic center: {0}")]
    InvalidCenter(#[from] CoordError),

    /// Requested ground extent is negative or not finite.
    #[error("Invalid extent {width_m} m × {height_m} m")]
    InvalidExtent { width_m: f64, height_m: f64 },

    /// The tile grid has no tiles on some axis.
    #[error("Tile grid is empty ({tiles_x}×{tiles_y} tiles)")]
    EmptyGrid { tiles_x: u32, tiles_y: u32 },

    /// The build was cancelled before all tiles were fetched.
    #[error("Mosaic build cancelled after {fetched} of {total} tiles")]
    Cancelled { fetched: usize, total: usize },
}

/// Statistics about the tile fetches of one mosaic build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchStats {
    /// Number of tiles in the grid
    pub total: usize,
    /// Tiles downloaded and decoded successfully
    pub successful: usize,
    /// Tiles replaced by black after an error
    pub failed: usize,
    /// Tiles not attempted because the build was cancelled
    pub skipped: usize,
    /// Wall-clock time spent fetching, in seconds
    pub elapsed_secs: f64,
}

impl FetchStats {
    /// Whether every tile was fetched.
    pub fn is_complete(&self) -> bool {
        self.successful == self.total
    }
}

/// Fetch settings for [`MosaicBuilder`](super::MosaicBuilder).
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicConfig {
    /// Upper bound on tiles per axis
    pub max_tiles_per_axis: u32,
    /// Number of tiles fetched concurrently
    pub concurrency: usize,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            max_tiles_per_axis: DEFAULT_MAX_TILES_PER_AXIS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl MosaicConfig {
    pub fn with_max_tiles_per_axis(mut self, max_tiles: u32) -> Self {
        self.max_tiles_per_axis = max_tiles;
        self
    }

    /// Sets the fetch concurrency (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// A stitched satellite mosaic and its geographic extent.
///
/// Pixel (0, 0) is the (west, north) corner and pixel (width, height) the
/// (east, south) corner. Longitude and latitude are treated as linear in
/// pixel space between those corners.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMosaic {
    /// Stitched RGB pixels
    pub raster: Raster<u8>,
    /// Geographic extent of the raster
    pub bounds: GeoBounds,
    /// The tile grid the raster was built from
    pub grid: TileGrid,
    /// Fetch statistics (all zero for a mosaic loaded from disk)
    pub stats: FetchStats,
}

impl TileMosaic {
    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }
}
