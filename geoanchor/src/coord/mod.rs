//! Web Mercator math for slippy-map tiles.
//!
//! Maps WGS84 latitude/longitude to tile indices and global pixel positions
//! and back.
//!
//! Global pixel coordinates are measured in tile pixels at a given zoom:
//! pixel `p` along an axis lies in tile `p / 256`.

mod types;

pub use types::{
    CoordError, GeoBounds, GeoPoint, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON,
    MIN_ZOOM, TILE_SIZE,
};

use std::f64::consts::PI;

/// Equatorial ground resolution at zoom 0 in meters per pixel.
pub const EQUATOR_METERS_PER_PIXEL: f64 = 156543.03392;

/// Tile containing `lat`/`lon` at `zoom`.
///
/// Latitude must lie within the Mercator limits (±85.0511°), longitude within
/// ±180° and zoom at most [`MAX_ZOOM`]; NaN is rejected.
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    // NaN fails both range checks
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let n = 2.0_f64.powi(zoom as i32);
    let last = (n as u32).saturating_sub(1);

    let col = ((lon + 180.0) / 360.0 * n).floor() as u32;

    let lat_rad = lat.to_radians();
    let row = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor() as u32;

    // lon = 180 and the Mercator limits land exactly on the far edge
    Ok(TileCoord {
        row: row.min(last),
        col: col.min(last),
        zoom,
    })
}

/// `(lat, lon)` of the tile's north-west corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.zoom as i32);

    let lon = tile.col as f64 / n * 360.0 - 180.0;

    let y = tile.row as f64 / n;
    let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();

    (lat, lon)
}

/// Ground resolution in meters per pixel at the given latitude and zoom.
///
/// Uses the standard Web Mercator formula
/// `156543.03392 × cos(lat) / 2^zoom`.
#[inline]
pub fn meters_per_pixel(lat: f64, zoom: u8) -> f64 {
    EQUATOR_METERS_PER_PIXEL * lat.to_radians().cos() / 2.0_f64.powi(zoom as i32)
}

/// Longitude degrees spanned by one pixel at the given zoom.
#[inline]
pub fn degrees_per_pixel(zoom: u8) -> f64 {
    360.0 / (TILE_SIZE as f64 * 2.0_f64.powi(zoom as i32))
}

/// Longitude of a global pixel column at the given zoom.
#[inline]
pub fn pixel_x_to_lon(x_pixel: f64, zoom: u8) -> f64 {
    x_pixel * degrees_per_pixel(zoom) - 180.0
}

/// Latitude of a global pixel row at the given zoom (inverse Web Mercator).
#[inline]
pub fn pixel_y_to_lat(y_pixel: f64, zoom: u8) -> f64 {
    let world = TILE_SIZE as f64 * 2.0_f64.powi(zoom as i32);
    let n = PI - 2.0 * PI * y_pixel / world;
    n.sinh().atan().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zurich_tile_at_zoom_16() {
        let tile = to_tile_coords(47.3769, 8.5417, 16).unwrap();
        assert_eq!((tile.row, tile.col, tile.zoom), (22949, 34322, 16));
    }

    #[test]
    fn test_invalid_latitude() {
        let result = to_tile_coords(90.0, 0.0, 10);
        assert!(matches!(
            result.unwrap_err(),
            CoordError::InvalidLatitude(_)
        ));
    }

    #[test]
    fn test_nan_is_rejected() {
        assert!(matches!(
            to_tile_coords(f64::NAN, 0.0, 10),
            Err(CoordError::InvalidLatitude(_))
        ));
        assert!(matches!(
            to_tile_coords(0.0, f64::NAN, 10),
            Err(CoordError::InvalidLongitude(_))
        ));
    }

    #[test]
    fn test_invalid_zoom() {
        assert_eq!(
            to_tile_coords(0.0, 0.0, 23).unwrap_err(),
            CoordError::InvalidZoom(23)
        );
    }

    #[test]
    fn test_antimeridian_clamps_to_last_column() {
        let tile = to_tile_coords(0.0, 180.0, 4).unwrap();
        assert_eq!(tile.col, 15);
        assert!(tile.is_valid());
    }

    #[test]
    fn test_tile_corner_is_north_west_of_point() {
        let tile = TileCoord {
            row: 22949,
            col: 34322,
            zoom: 16,
        };
        let (lat, lon) = tile_to_lat_lon(&tile);

        // corner sits within one tile (~0.0055 deg) north-west of 47.3769, 8.5417
        assert!(lat >= 47.3769 && lat - 47.3769 < 0.004);
        assert!(lon <= 8.5417 && 8.5417 - lon < 0.0055);
    }

    #[test]
    fn test_meters_per_pixel_at_equator() {
        let mpp = meters_per_pixel(0.0, 0);
        assert!((mpp - EQUATOR_METERS_PER_PIXEL).abs() < 1e-9);

        // Halves with every zoom step
        let z17 = meters_per_pixel(0.0, 17);
        assert!((z17 - EQUATOR_METERS_PER_PIXEL / 131072.0).abs() < 1e-12);
    }

    #[test]
    fn test_meters_per_pixel_shrinks_with_latitude() {
        assert!(meters_per_pixel(60.0, 17) < meters_per_pixel(0.0, 17));
        let ratio = meters_per_pixel(60.0, 17) / meters_per_pixel(0.0, 17);
        assert!((ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_pixel_to_geo_matches_tile_corner() {
        let tile = to_tile_coords(56.78, 12.34, 17).unwrap();
        let (lat, lon) = tile_to_lat_lon(&tile);

        let px = (tile.col * TILE_SIZE) as f64;
        let py = (tile.row * TILE_SIZE) as f64;
        assert!((pixel_x_to_lon(px, 17) - lon).abs() < 1e-9);
        assert!((pixel_y_to_lat(py, 17) - lat).abs() < 1e-9);
    }

    #[test]
    fn test_pixel_y_extremes() {
        assert!((pixel_y_to_lat(0.0, 0) - MAX_LAT).abs() < 1e-6);
        assert!((pixel_y_to_lat(256.0, 0) - MIN_LAT).abs() < 1e-6);
        assert!(pixel_y_to_lat(128.0, 0).abs() < 1e-9);
    }

    #[test]
    fn test_degrees_per_pixel() {
        assert!((degrees_per_pixel(0) - 360.0 / 256.0).abs() < 1e-12);
        assert!((degrees_per_pixel(17) * 256.0 * 131072.0 - 360.0).abs() < 1e-9);
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_tile_x_monotonic_in_longitude(
                lat in -85.0..85.0_f64,
                lon_a in -180.0..180.0_f64,
                lon_b in -180.0..180.0_f64,
                zoom in 0u8..=22
            ) {
                let (west, east) = if lon_a <= lon_b { (lon_a, lon_b) } else { (lon_b, lon_a) };
                let a = to_tile_coords(lat, west, zoom)?;
                let b = to_tile_coords(lat, east, zoom)?;
                prop_assert!(
                    a.col <= b.col,
                    "col decreased from {} to {} moving east ({} -> {})",
                    a.col, b.col, west, east
                );
            }

            #[test]
            fn test_tile_y_monotonic_in_latitude(
                lon in -180.0..180.0_f64,
                lat_a in -85.0..85.0_f64,
                lat_b in -85.0..85.0_f64,
                zoom in 0u8..=22
            ) {
                let (south, north) = if lat_a <= lat_b { (lat_a, lat_b) } else { (lat_b, lat_a) };
                let s = to_tile_coords(south, lon, zoom)?;
                let n = to_tile_coords(north, lon, zoom)?;
                prop_assert!(
                    n.row <= s.row,
                    "row increased from {} to {} moving north ({} -> {})",
                    s.row, n.row, south, north
                );
            }

            #[test]
            fn test_tile_coords_in_bounds(
                lat in -85.05..85.05_f64,
                lon in -180.0..=180.0_f64,
                zoom in 0u8..=22
            ) {
                let tile = to_tile_coords(lat, lon, zoom)?;
                prop_assert!(tile.is_valid(), "tile {:?} outside pyramid", tile);
            }
        }
    }
}
