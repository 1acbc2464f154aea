//! Coordinate types shared by the area extractor and the mosaic builder.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Southern limit of the Web Mercator projection in degrees.
pub const MIN_LAT: f64 = -85.05112878;
/// Northern limit of the Web Mercator projection in degrees.
pub const MAX_LAT: f64 = 85.05112878;
/// Western limit of longitude in degrees.
pub const MIN_LON: f64 = -180.0;
/// Eastern limit of longitude in degrees.
pub const MAX_LON: f64 = 180.0;
/// Lowest zoom level of the slippy-map pyramid.
pub const MIN_ZOOM: u8 = 0;
/// Highest zoom level any supported tile source serves.
pub const MAX_ZOOM: u8 = 22;
/// Edge length of one slippy-map tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Errors raised by coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude outside the Web Mercator range or not finite.
    #[error("Invalid latitude {0}: must be within -85.05112878..=85.05112878")]
    InvalidLatitude(f64),

    /// Longitude outside -180..=180 or not finite.
    #[error("Invalid longitude {0}: must be within -180..=180")]
    InvalidLongitude(f64),

    /// Zoom level beyond what the pyramid supports.
    #[error("Invalid zoom level {0}: must be within 0..=22")]
    InvalidZoom(u8),
}

/// A geographic position in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude in degrees, positive east.
    pub lon: f64,
    /// Latitude in degrees, positive north.
    pub lat: f64,
}

impl GeoPoint {
    /// Creates a point from longitude and latitude, in that order.
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// True when both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

/// Geographic extent of a raster in degrees.
///
/// Pixel (0, 0) of the raster sits at (`west`, `north`) and pixel
/// (width, height) at (`east`, `south`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBounds {
    /// Creates bounds in (west, south, east, north) order.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Longitude span in degrees.
    pub fn width_deg(&self) -> f64 {
        self.east - self.west
    }

    /// Latitude span in degrees.
    pub fn height_deg(&self) -> f64 {
        self.north - self.south
    }

    /// True when the bounds are finite and enclose a non-empty area.
    pub fn is_valid(&self) -> bool {
        [self.west, self.south, self.east, self.north]
            .iter()
            .all(|v| v.is_finite())
            && self.west < self.east
            && self.south < self.north
    }

    /// Center of the bounds (arithmetic midpoint).
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.west + self.east) / 2.0,
            (self.south + self.north) / 2.0,
        )
    }
}

/// One 256×256 tile of the Web Mercator pyramid.
///
/// `col` is the slippy-map X index (west to east) and `row` the Y index
/// (north to south). Both are valid only in `0..2^zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Tile row (Y index, increases southward)
    pub row: u32,
    /// Tile column (X index, increases eastward)
    pub col: u32,
    /// Zoom level
    pub zoom: u8,
}

impl TileCoord {
    /// Creates a tile coordinate from slippy-map (x, y, zoom).
    pub fn from_xyz(x: u32, y: u32, zoom: u8) -> Self {
        Self {
            row: y,
            col: x,
            zoom,
        }
    }

    /// Slippy-map X index.
    pub fn x(&self) -> u32 {
        self.col
    }

    /// Slippy-map Y index.
    pub fn y(&self) -> u32 {
        self.row
    }

    /// Number of tiles along one axis at this tile's zoom.
    pub fn tiles_per_axis(&self) -> u64 {
        1u64 << self.zoom
    }

    /// True when row and col lie inside the pyramid at this zoom.
    pub fn is_valid(&self) -> bool {
        self.zoom <= MAX_ZOOM
            && (self.row as u64) < self.tiles_per_axis()
            && (self.col as u64) < self.tiles_per_axis()
    }
}
