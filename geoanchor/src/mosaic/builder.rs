//! Mosaic assembly.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::coord::{GeoPoint, TILE_SIZE};
use crate::provider::Provider;
use crate::raster::Raster;

use super::fetch::{fetch_tiles, TileOutcome};
use super::{AreaExtractionError, MosaicConfig, TileGrid, TileMosaic};

/// Builds satellite mosaics from a tile provider.
///
/// # Example
///
/// ```no_run
/// use geoanchor::coord::GeoPoint;
/// use geoanchor::mosaic::MosaicBuilder;
/// use geoanchor::provider::{ProviderConfig, ReqwestClient};
///
/// let provider = ProviderConfig::Google.build(ReqwestClient::new()?)?;
/// let mosaic = MosaicBuilder::new(provider).build(GeoPoint::new(12.34, 56.78), 1000.0, 1000.0, 17)?;
/// println!("{}×{} px, bounds {:?}", mosaic.width(), mosaic.height(), mosaic.bounds);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct MosaicBuilder {
    provider: Arc<dyn Provider>,
    config: MosaicConfig,
    cancellation: Option<CancellationToken>,
}

impl MosaicBuilder {
    /// Creates a builder with default fetch settings.
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            config: MosaicConfig::default(),
            cancellation: None,
        }
    }

    pub fn with_config(mut self, config: MosaicConfig) -> Self {
        self.config = config;
        self
    }

    /// Stops fetching remaining tiles once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn config(&self) -> &MosaicConfig {
        &self.config
    }

    /// Fetches and stitches the tiles covering `width_m × height_m` around
    /// `center` at `zoom`.
    ///
    /// Failed tiles are left black; the call still succeeds.
    ///
    /// # Errors
    ///
    /// Returns `AreaExtractionError` for an invalid center, extent or zoom,
    /// an empty grid, or when cancelled.
    pub fn build(
        &self,
        center: GeoPoint,
        width_m: f64,
        height_m: f64,
        zoom: u8,
    ) -> Result<TileMosaic, AreaExtractionError> {
        let grid = TileGrid::around(
            center,
            width_m,
            height_m,
            zoom,
            self.config.max_tiles_per_axis,
        )?;
        let tiles = grid.tiles();

        tracing::info!(
            provider = self.provider.name(),
            zoom,
            start_x = grid.start_x,
            start_y = grid.start_y,
            tiles_x = grid.tiles_x,
            tiles_y = grid.tiles_y,
            "Building satellite mosaic"
        );

        let (outcomes, stats) = fetch_tiles(
            &self.provider,
            &tiles,
            self.config.concurrency,
            self.cancellation.as_ref(),
        );

        if stats.skipped > 0 {
            return Err(AreaExtractionError::Cancelled {
                fetched: stats.successful + stats.failed,
                total: stats.total,
            });
        }

        let mut raster = Raster::new(grid.pixel_width(), grid.pixel_height(), 3);
        for (index, outcome) in outcomes.iter().enumerate() {
            if let TileOutcome::Fetched(tile) = outcome {
                let col = (index % grid.tiles_x as usize) as u32;
                let row = (index / grid.tiles_x as usize) as u32;
                raster.blit(tile, col * TILE_SIZE, row * TILE_SIZE);
            }
        }

        if stats.failed > 0 {
            tracing::warn!(
                failed = stats.failed,
                total = stats.total,
                "Mosaic contains black tiles"
            );
        }
        tracing::info!(
            width = raster.width(),
            height = raster.height(),
            successful = stats.successful,
            elapsed_secs = stats.elapsed_secs,
            "Mosaic built"
        );

        Ok(TileMosaic {
            raster,
            bounds: grid.bounds(),
            grid,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{GoogleSatelliteProvider, MockHttpClient};
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn tile_png() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        RgbImage::from_pixel(256, 256, Rgb([90, 120, 60]))
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn builder(client: MockHttpClient) -> MosaicBuilder {
        MosaicBuilder::new(Arc::new(GoogleSatelliteProvider::new(client)))
    }

    #[test]
    fn test_full_mosaic() {
        let mosaic = builder(MockHttpClient::ok(tile_png()))
            .build(GeoPoint::new(12.34, 56.78), 0.0, 0.0, 17)
            .unwrap();

        assert_eq!((mosaic.width(), mosaic.height()), (512, 512));
        assert_eq!(mosaic.raster.channels(), 3);
        assert!(mosaic.stats.is_complete());
        assert_eq!(mosaic.raster.pixel(511, 511).unwrap(), &[90, 120, 60]);
    }

    #[test]
    fn test_single_failed_tile_is_black() {
        let grid = TileGrid::around(GeoPoint::new(12.34, 56.78), 0.0, 0.0, 17, 8).unwrap();
        let failing = format!("x={}&y={}", grid.start_x + 1, grid.start_y);
        let client = MockHttpClient::ok(tile_png()).failing_on(failing);

        let mosaic = builder(client)
            .build(GeoPoint::new(12.34, 56.78), 0.0, 0.0, 17)
            .unwrap();

        assert_eq!((mosaic.width(), mosaic.height()), (512, 512));
        assert_eq!(mosaic.stats.failed, 1);
        for y in 0..512 {
            for x in 0..512 {
                let pixel = mosaic.raster.pixel(x, y).unwrap();
                if (256..512).contains(&x) && y < 256 {
                    assert_eq!(pixel, &[0, 0, 0], "pixel ({}, {}) should be black", x, y);
                } else {
                    assert_eq!(pixel, &[90, 120, 60], "pixel ({}, {}) should be imagery", x, y);
                }
            }
        }
    }

    #[test]
    fn test_all_tiles_failing_still_succeeds() {
        let mosaic = builder(MockHttpClient::err("connection refused"))
            .build(GeoPoint::new(12.34, 56.78), 0.0, 0.0, 17)
            .unwrap();

        assert_eq!(mosaic.stats.failed, 4);
        assert!(mosaic.raster.as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_undecodable_body_is_black() {
        let mosaic = builder(MockHttpClient::ok(b"<html>quota exceeded</html>".to_vec()))
            .build(GeoPoint::new(12.34, 56.78), 0.0, 0.0, 17)
            .unwrap();
        assert_eq!(mosaic.stats.failed, 4);
    }

    #[test]
    fn test_bounds_follow_grid() {
        let mosaic = builder(MockHttpClient::ok(tile_png()))
            .with_config(MosaicConfig::default().with_max_tiles_per_axis(2))
            .build(GeoPoint::new(12.34, 56.78), 1000.0, 1000.0, 17)
            .unwrap();

        assert_eq!((mosaic.grid.tiles_x, mosaic.grid.tiles_y), (2, 2));
        assert_eq!(mosaic.bounds, mosaic.grid.bounds());
        assert!(mosaic.bounds.is_valid());
    }

    #[test]
    fn test_cancelled_build() {
        let token = CancellationToken::new();
        token.cancel();

        let result = builder(MockHttpClient::ok(tile_png()))
            .with_cancellation(token)
            .build(GeoPoint::new(12.34, 56.78), 0.0, 0.0, 17);

        assert_eq!(
            result,
            Err(AreaExtractionError::Cancelled {
                fetched: 0,
                total: 4
            })
        );
    }

    #[test]
    fn test_invalid_center_rejected_before_fetch() {
        let client = Arc::new(MockHttpClient::ok(tile_png()));
        let builder =
            MosaicBuilder::new(Arc::new(GoogleSatelliteProvider::new(Arc::clone(&client))));

        let result = builder.build(GeoPoint::new(0.0, 89.0), 1000.0, 1000.0, 17);

        assert!(matches!(result, Err(AreaExtractionError::InvalidCenter(_))));
        assert!(client.requested().is_empty());
    }
}
