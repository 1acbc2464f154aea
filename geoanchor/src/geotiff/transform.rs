//! Affine pixel-to-geographic transform.

use serde::{Deserialize, Serialize};

use crate::coord::{GeoBounds, GeoPoint};

/// Axis-aligned affine mapping from raster pixel edges to (lon, lat).
///
/// Pixel corner `(0, 0)` maps to (`origin_lon`, `origin_lat`) and corner
/// `(width, height)` maps to the opposite corner of the bounds.
/// `pixel_height` is negative because rows grow southward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_lon: f64,
    pub origin_lat: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Builds the transform that stretches a `width × height` raster over
    /// `bounds`.
    ///
    /// Returns `None` for a zero-sized raster.
    pub fn from_bounds(bounds: &GeoBounds, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            origin_lon: bounds.west,
            origin_lat: bounds.north,
            pixel_width: (bounds.east - bounds.west) / width as f64,
            pixel_height: -(bounds.north - bounds.south) / height as f64,
        })
    }

    /// Geographic position of pixel corner (`col`, `row`).
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> GeoPoint {
        GeoPoint::new(
            self.origin_lon + col * self.pixel_width,
            self.origin_lat + row * self.pixel_height,
        )
    }

    /// GDAL-ordered coefficients
    /// `[origin_x, pixel_width, 0, origin_y, 0, pixel_height]`.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_lon,
            self.pixel_width,
            0.0,
            self.origin_lat,
            0.0,
            self.pixel_height,
        ]
    }

    /// `ModelPixelScaleTag` values (always positive).
    pub(super) fn pixel_scale(&self) -> [f64; 3] {
        [self.pixel_width, -self.pixel_height, 0.0]
    }

    /// `ModelTiepointTag` values tying raster (0, 0) to the origin.
    pub(super) fn tiepoint(&self) -> [f64; 6] {
        [0.0, 0.0, 0.0, self.origin_lon, self.origin_lat, 0.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> GeoBounds {
        GeoBounds::new(10.0, 50.0, 12.0, 51.0)
    }

    #[test]
    fn test_corners_map_to_bounds() {
        let t = GeoTransform::from_bounds(&bounds(), 400, 100).unwrap();

        assert_eq!(t.pixel_to_geo(0.0, 0.0), GeoPoint::new(10.0, 51.0));
        let far = t.pixel_to_geo(400.0, 100.0);
        assert!((far.lon - 12.0).abs() < 1e-12);
        assert!((far.lat - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_pixel_size() {
        let t = GeoTransform::from_bounds(&bounds(), 400, 100).unwrap();
        assert!((t.pixel_width - 0.005).abs() < 1e-15);
        assert!((t.pixel_height + 0.01).abs() < 1e-15);
        assert_eq!(t.pixel_scale()[1], 0.01);
        assert_eq!(t.to_gdal()[5], t.pixel_height);
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(GeoTransform::from_bounds(&bounds(), 0, 10).is_none());
        assert!(GeoTransform::from_bounds(&bounds(), 10, 0).is_none());
    }
}
