//! Tile grid sizing and geographic bounds.

use serde::{Deserialize, Serialize};

use crate::coord::{self, GeoBounds, GeoPoint, TileCoord, TILE_SIZE};

use super::AreaExtractionError;

/// A rectangular block of tiles at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    /// Column of the top-left tile
    pub start_x: u32,
    /// Row of the top-left tile
    pub start_y: u32,
    /// Tiles across
    pub tiles_x: u32,
    /// Tiles down
    pub tiles_y: u32,
    pub zoom: u8,
}

impl TileGrid {
    /// Sizes a grid around `center` covering at least `width_m × height_m`.
    ///
    /// Each axis gets `ceil(extent / tile_ground_size) + 2` tiles, capped at
    /// `max_tiles_per_axis`. The grid starts `n / 2` tiles before the center
    /// tile (integer division, so even counts sit one tile toward lower
    /// indices) and is then shifted to lie inside the tile pyramid.
    pub fn around(
        center: GeoPoint,
        width_m: f64,
        height_m: f64,
        zoom: u8,
        max_tiles_per_axis: u32,
    ) -> Result<Self, AreaExtractionError> {
        if !center.is_finite() {
            return Err(AreaExtractionError::NonFiniteCenter {
                lon: center.lon,
                lat: center.lat,
            });
        }
        if !(width_m.is_finite() && height_m.is_finite() && width_m >= 0.0 && height_m >= 0.0) {
            return Err(AreaExtractionError::InvalidExtent { width_m, height_m });
        }

        let center_tile = coord::to_tile_coords(center.lat, center.lon, zoom)?;

        let tile_ground_m = TILE_SIZE as f64 * coord::meters_per_pixel(center.lat, zoom);
        let world = 1u64 << zoom;

        let (start_x, tiles_x) = fit_axis(
            center_tile.col,
            tiles_for_extent(width_m, tile_ground_m),
            max_tiles_per_axis,
            world,
        );
        let (start_y, tiles_y) = fit_axis(
            center_tile.row,
            tiles_for_extent(height_m, tile_ground_m),
            max_tiles_per_axis,
            world,
        );

        if tiles_x == 0 || tiles_y == 0 {
            return Err(AreaExtractionError::EmptyGrid { tiles_x, tiles_y });
        }

        Ok(Self {
            start_x,
            start_y,
            tiles_x,
            tiles_y,
            zoom,
        })
    }

    /// Number of tiles in the grid.
    pub fn len(&self) -> usize {
        self.tiles_x as usize * self.tiles_y as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raster width in pixels.
    pub fn pixel_width(&self) -> u32 {
        self.tiles_x * TILE_SIZE
    }

    /// Raster height in pixels.
    pub fn pixel_height(&self) -> u32 {
        self.tiles_y * TILE_SIZE
    }

    /// Tiles in row-major order: ascending row, then ascending column.
    pub fn tiles(&self) -> Vec<TileCoord> {
        let mut tiles = Vec::with_capacity(self.len());
        for y in self.start_y..self.start_y + self.tiles_y {
            for x in self.start_x..self.start_x + self.tiles_x {
                tiles.push(TileCoord::from_xyz(x, y, self.zoom));
            }
        }
        tiles
    }

    /// Geographic extent of the grid, derived from its global pixel extent.
    pub fn bounds(&self) -> GeoBounds {
        let left = self.start_x as f64 * TILE_SIZE as f64;
        let right = (self.start_x + self.tiles_x) as f64 * TILE_SIZE as f64;
        let top = self.start_y as f64 * TILE_SIZE as f64;
        let bottom = (self.start_y + self.tiles_y) as f64 * TILE_SIZE as f64;

        GeoBounds::new(
            coord::pixel_x_to_lon(left, self.zoom),
            coord::pixel_y_to_lat(bottom, self.zoom),
            coord::pixel_x_to_lon(right, self.zoom),
            coord::pixel_y_to_lat(top, self.zoom),
        )
    }
}

/// Wanted tile count for an extent; huge extents saturate at `u32::MAX`.
fn tiles_for_extent(extent_m: f64, tile_ground_m: f64) -> u64 {
    let tiles = (extent_m / tile_ground_m).ceil().min(u32::MAX as f64);
    (tiles as u64).saturating_add(2)
}

/// Caps the tile count and shifts the start so the axis fits in `[0, world)`.
fn fit_axis(center: u32, wanted: u64, cap: u32, world: u64) -> (u32, u32) {
    let count = wanted.min(cap as u64).min(world);
    let start = center as i64 - (count / 2) as i64;
    let start = start.clamp(0, (world - count) as i64);
    (start as u32, count as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn center() -> GeoPoint {
        GeoPoint::new(12.34, 56.78)
    }

    #[test]
    fn test_default_extent_grid() {
        // At zoom 17 and 56.78°N a tile covers about 167 m: ceil(1000/167) + 2 = 8
        let grid = TileGrid::around(center(), 1000.0, 1000.0, 17, 8).unwrap();
        assert_eq!((grid.tiles_x, grid.tiles_y), (8, 8));

        let tile = coord::to_tile_coords(56.78, 12.34, 17).unwrap();
        assert_eq!(grid.start_x, tile.col - 4);
        assert_eq!(grid.start_y, tile.row - 4);
        assert_eq!(grid.pixel_width(), 2048);
    }

    #[test]
    fn test_zero_extent_gives_two_tiles() {
        let grid = TileGrid::around(center(), 0.0, 0.0, 17, 8).unwrap();
        assert_eq!((grid.tiles_x, grid.tiles_y), (2, 2));

        let tile = coord::to_tile_coords(56.78, 12.34, 17).unwrap();
        assert_eq!(grid.start_x, tile.col - 1);
        assert_eq!(grid.start_y, tile.row - 1);
    }

    #[test]
    fn test_cap_applies_per_axis() {
        let grid = TileGrid::around(center(), 100.0, 5000.0, 17, 3).unwrap();
        assert_eq!((grid.tiles_x, grid.tiles_y), (3, 3));
    }

    #[test]
    fn test_tiles_are_row_major() {
        let grid = TileGrid {
            start_x: 10,
            start_y: 20,
            tiles_x: 2,
            tiles_y: 2,
            zoom: 5,
        };
        let tiles: Vec<(u32, u32)> = grid.tiles().iter().map(|t| (t.x(), t.y())).collect();
        assert_eq!(tiles, vec![(10, 20), (11, 20), (10, 21), (11, 21)]);
    }

    #[test]
    fn test_grid_clamped_at_world_edge() {
        // Near the antimeridian and the northern limit the grid shifts inward
        let grid = TileGrid::around(GeoPoint::new(179.999, 85.0), 0.0, 0.0, 3, 8).unwrap();
        assert_eq!((grid.tiles_x, grid.tiles_y), (2, 2));
        assert_eq!(grid.start_x + grid.tiles_x, 8);
        assert_eq!(grid.start_y, 0);
    }

    #[test]
    fn test_grid_clamped_at_zoom_zero() {
        let grid = TileGrid::around(GeoPoint::new(0.0, 0.0), 1000.0, 1000.0, 0, 8).unwrap();
        assert_eq!((grid.start_x, grid.start_y, grid.tiles_x, grid.tiles_y), (0, 0, 1, 1));

        let bounds = grid.bounds();
        assert!((bounds.west + 180.0).abs() < 1e-9);
        assert!((bounds.east - 180.0).abs() < 1e-9);
        assert!((bounds.north - coord::MAX_LAT).abs() < 1e-6);
    }

    #[test]
    fn test_huge_extent_hits_cap() {
        let grid = TileGrid::around(center(), 1e300, 100.0, 17, 8).unwrap();
        assert_eq!((grid.tiles_x, grid.tiles_y), (8, 3));

        let grid = TileGrid::around(center(), f64::MAX, f64::MAX, 17, 8).unwrap();
        assert_eq!((grid.tiles_x, grid.tiles_y), (8, 8));
        assert_eq!(tiles_for_extent(1e300, 1.0), u32::MAX as u64 + 2);
    }

    #[test]
    fn test_zero_cap_is_empty_grid() {
        let result = TileGrid::around(center(), 1000.0, 1000.0, 17, 0);
        assert!(matches!(result, Err(AreaExtractionError::EmptyGrid { .. })));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            TileGrid::around(GeoPoint::new(f64::NAN, 0.0), 10.0, 10.0, 17, 8),
            Err(AreaExtractionError::NonFiniteCenter { .. })
        ));
        assert!(matches!(
            TileGrid::around(GeoPoint::new(0.0, 88.0), 10.0, 10.0, 17, 8),
            Err(AreaExtractionError::InvalidCenter(_))
        ));
        assert!(matches!(
            TileGrid::around(center(), 10.0, 10.0, 30, 8),
            Err(AreaExtractionError::InvalidCenter(_))
        ));
        assert!(matches!(
            TileGrid::around(center(), -1.0, 10.0, 17, 8),
            Err(AreaExtractionError::InvalidExtent { .. })
        ));
    }

    #[test]
    fn test_bounds_match_original_formula() {
        let grid = TileGrid::around(center(), 0.0, 0.0, 17, 8).unwrap();
        let bounds = grid.bounds();
        let deg_per_px = 360.0 / (256.0 * 2f64.powi(17));

        assert!((bounds.west - (grid.start_x as f64 * 256.0 * deg_per_px - 180.0)).abs() < 1e-12);
        assert!(
            ((bounds.east - bounds.west) / grid.pixel_width() as f64 - deg_per_px).abs() < 1e-14
        );
        assert!(bounds.west < 12.34 && 12.34 < bounds.east);
        assert!(bounds.south < 56.78 && 56.78 < bounds.north);
    }

    proptest! {
        #[test]
        fn prop_bounds_are_ordered_and_scaled(
            lon in -179.9f64..179.9,
            lat in -85.0f64..85.0,
            zoom in 1u8..=20,
            extent in 0.0f64..5000.0,
        ) {
            let grid = TileGrid::around(GeoPoint::new(lon, lat), extent, extent, zoom, 8).unwrap();
            let bounds = grid.bounds();

            prop_assert!(bounds.west < bounds.east);
            prop_assert!(bounds.south < bounds.north);

            let expected = 360.0 / (256.0 * 2f64.powi(zoom as i32));
            let actual = (bounds.east - bounds.west) / grid.pixel_width() as f64;
            prop_assert!((actual - expected).abs() <= expected * 1e-9);

            prop_assert!((grid.start_x + grid.tiles_x) as u64 <= 1u64 << zoom);
            prop_assert!((grid.start_y + grid.tiles_y) as u64 <= 1u64 << zoom);
        }
    }
}
