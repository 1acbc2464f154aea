//! Georeferencing session state.
//!
//! A [`GeorefSession`] owns everything that lives across user requests:
//! the current mosaic, the source image and the two correspondence point
//! lists. The pipeline stages themselves are stateless functions called
//! with snapshots of this state.
//!
//! ```ignore
//! let provider = ProviderConfig::Google.build(ReqwestClient::new()?)?;
//! let mut session = GeorefSession::new(MosaicBuilder::new(provider));
//!
//! session.load_area(&std::fs::read("area.kmz")?)?;
//! session.load_source_image("scan.png".as_ref())?;
//! for (src, dst) in picked_points {
//!     session.add_source_point(src.0, src.1);
//!     session.add_mosaic_point(dst.0, dst.1);
//! }
//! let report = session.apply("scan_georef.tif".as_ref())?;
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::area::{self, FormatError};
use crate::coord::GeoBounds;
use crate::geotiff::{GeoTiffCompression, GeoTiffWriter, WriteError};
use crate::mosaic::{
    AreaExtractionError, MosaicBuilder, TileMosaic, DEFAULT_EXTENT_M, DEFAULT_ZOOM,
};
use crate::raster::{self, DynRaster, RasterError};
use crate::solver::{self, GeometryError, PixelPoint, RansacConfig, SolveReport, SolveStrategy, MIN_POINTS};
use crate::warp;

/// Errors surfaced by session operations.
///
/// Each unmet precondition has its own variant.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Area(#[from] AreaExtractionError),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("No satellite mosaic loaded; load an area first")]
    NoMosaic,

    #[error("No source image loaded")]
    NoSourceImage,
}

/// Readiness of the correspondence lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointStatus {
    /// The lists differ in length.
    Mismatch { source: usize, mosaic: usize },
    /// Equal lengths, but this many more pairs are needed.
    NeedMore(usize),
    /// This many complete pairs; enough to solve.
    Ready(usize),
}

impl PointStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, PointStatus::Ready(_))
    }
}

impl std::fmt::Display for PointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointStatus::Mismatch { source, mosaic } => write!(
                f,
                "{} source points vs {} mosaic points; counts must match",
                source, mosaic
            ),
            PointStatus::NeedMore(n) => write!(f, "{} more point pair(s) needed", n),
            PointStatus::Ready(n) => write!(f, "{} point pairs ready", n),
        }
    }
}

/// Outcome of [`GeorefSession::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeorefReport {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub bounds: GeoBounds,
    pub points: usize,
    pub inliers: usize,
    pub rms_error: f64,
    pub strategy: SolveStrategy,
}

/// Mutable state of one georeferencing session.
pub struct GeorefSession {
    builder: MosaicBuilder,
    zoom: u8,
    width_m: f64,
    height_m: f64,
    ransac: RansacConfig,
    compression: GeoTiffCompression,
    mosaic: Option<TileMosaic>,
    source: Option<DynRaster>,
    source_points: Vec<PixelPoint>,
    mosaic_points: Vec<PixelPoint>,
}

impl GeorefSession {
    /// Creates an empty session fetching mosaics with `builder`.
    pub fn new(builder: MosaicBuilder) -> Self {
        Self {
            builder,
            zoom: DEFAULT_ZOOM,
            width_m: DEFAULT_EXTENT_M,
            height_m: DEFAULT_EXTENT_M,
            ransac: RansacConfig::default(),
            compression: GeoTiffCompression::default(),
            mosaic: None,
            source: None,
            source_points: Vec::new(),
            mosaic_points: Vec::new(),
        }
    }

    pub fn with_zoom(mut self, zoom: u8) -> Self {
        self.zoom = zoom;
        self
    }

    /// Ground extent of the mosaic in meters.
    pub fn with_extent(mut self, width_m: f64, height_m: f64) -> Self {
        self.width_m = width_m;
        self.height_m = height_m;
        self
    }

    pub fn with_ransac_config(mut self, config: RansacConfig) -> Self {
        self.ransac = config;
        self
    }

    pub fn with_compression(mut self, compression: GeoTiffCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Extracts the area from a KML/KMZ document and builds its mosaic.
    ///
    /// Replaces any previous mosaic and clears the point lists, since
    /// mosaic pixel positions no longer refer to the same ground.
    pub fn load_area(&mut self, document: &[u8]) -> Result<&TileMosaic, SessionError> {
        let center = area::extract_center(document)?;
        tracing::info!(lon = center.lon, lat = center.lat, "Area center");

        let mosaic = self
            .builder
            .build(center, self.width_m, self.height_m, self.zoom)?;
        Ok(self.replace_mosaic(mosaic))
    }

    /// Reads a KML/KMZ file and calls [`Self::load_area`].
    pub fn load_area_from_path(&mut self, path: &Path) -> Result<&TileMosaic, SessionError> {
        let document = std::fs::read(path).map_err(|e| FormatError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        self.load_area(&document)
    }

    /// Uses an already built (or reloaded) mosaic.
    pub fn set_mosaic(&mut self, mosaic: TileMosaic) -> &TileMosaic {
        self.replace_mosaic(mosaic)
    }

    pub fn mosaic(&self) -> Option<&TileMosaic> {
        self.mosaic.as_ref()
    }

    /// Loads and normalises the image to georeference.
    ///
    /// Replacing an earlier image clears the point lists.
    pub fn load_source_image(&mut self, path: &Path) -> Result<&DynRaster, SessionError> {
        let image = raster::load_source_image(path)?;
        Ok(self.set_source_image(image))
    }

    pub fn set_source_image(&mut self, image: DynRaster) -> &DynRaster {
        if self.source.is_some() {
            self.clear_points();
        }
        self.source.insert(image)
    }

    pub fn source_image(&self) -> Option<&DynRaster> {
        self.source.as_ref()
    }

    /// Appends a point in source-image pixels; returns its index.
    pub fn add_source_point(&mut self, x: f64, y: f64) -> usize {
        self.source_points.push((x, y));
        self.source_points.len() - 1
    }

    /// Appends a point in mosaic pixels; returns its index.
    pub fn add_mosaic_point(&mut self, x: f64, y: f64) -> usize {
        self.mosaic_points.push((x, y));
        self.mosaic_points.len() - 1
    }

    pub fn clear_points(&mut self) {
        self.source_points.clear();
        self.mosaic_points.clear();
    }

    pub fn source_points(&self) -> &[PixelPoint] {
        &self.source_points
    }

    pub fn mosaic_points(&self) -> &[PixelPoint] {
        &self.mosaic_points
    }

    pub fn point_status(&self) -> PointStatus {
        let (source, mosaic) = (self.source_points.len(), self.mosaic_points.len());
        if source != mosaic {
            PointStatus::Mismatch { source, mosaic }
        } else if source < MIN_POINTS {
            PointStatus::NeedMore(MIN_POINTS - source)
        } else {
            PointStatus::Ready(source)
        }
    }

    /// Solves the source → mosaic transform from the current points.
    pub fn solve(&self) -> Result<SolveReport, SessionError> {
        self.require_inputs()?;
        Ok(solver::solve_transform_detailed(
            &self.source_points,
            &self.mosaic_points,
            &self.ransac,
        )?)
    }

    /// Solves, resamples the source onto the mosaic grid and writes a
    /// GeoTIFF to `output`.
    ///
    /// # Errors
    ///
    /// Preconditions are checked in order before any work: `NoMosaic`,
    /// `NoSourceImage`, then the point-count errors of
    /// [`solver::solve_transform`].
    pub fn apply(&self, output: &Path) -> Result<GeorefReport, SessionError> {
        let (mosaic, source) = self.require_inputs()?;

        let report = solver::solve_transform_detailed(
            &self.source_points,
            &self.mosaic_points,
            &self.ransac,
        )?;

        let warped = warp::resample_dyn(
            source,
            &report.homography,
            mosaic.width(),
            mosaic.height(),
        )?;

        GeoTiffWriter::new(&warped, mosaic.bounds)
            .with_compression(self.compression)
            .write(output)?;

        let result = GeorefReport {
            output: output.to_path_buf(),
            width: warped.width(),
            height: warped.height(),
            bounds: mosaic.bounds,
            points: self.source_points.len(),
            inliers: report.inlier_count(),
            rms_error: report.rms_error,
            strategy: report.strategy,
        };
        tracing::info!(
            output = %output.display(),
            points = result.points,
            inliers = result.inliers,
            rms_error = result.rms_error,
            "Georeferencing applied"
        );
        Ok(result)
    }

    fn require_inputs(&self) -> Result<(&TileMosaic, &DynRaster), SessionError> {
        let mosaic = self.mosaic.as_ref().ok_or(SessionError::NoMosaic)?;
        let source = self.source.as_ref().ok_or(SessionError::NoSourceImage)?;
        Ok((mosaic, source))
    }

    fn replace_mosaic(&mut self, mosaic: TileMosaic) -> &TileMosaic {
        self.clear_points();
        self.mosaic.insert(mosaic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mosaic::TileGrid;
    use crate::provider::{MockHttpClient, ProviderConfig};
    use crate::raster::Raster;
    use tempfile::TempDir;

    fn session() -> GeorefSession {
        let provider = ProviderConfig::Google
            .build(MockHttpClient::err("offline"))
            .unwrap();
        GeorefSession::new(MosaicBuilder::new(provider))
    }

    fn mosaic() -> TileMosaic {
        let grid = TileGrid {
            start_x: 70_000,
            start_y: 40_000,
            tiles_x: 1,
            tiles_y: 1,
            zoom: 17,
        };
        TileMosaic {
            raster: Raster::new(256, 256, 3),
            bounds: grid.bounds(),
            grid,
            stats: Default::default(),
        }
    }

    fn add_pairs(session: &mut GeorefSession, n: usize) {
        for i in 0..n {
            let (x, y) = ((i % 2) as f64 * 50.0, (i / 2) as f64 * 50.0 + (i % 3) as f64);
            session.add_source_point(x, y);
            session.add_mosaic_point(x + 20.0, y + 30.0);
        }
    }

    #[test]
    fn test_point_status() {
        let mut s = session();
        assert_eq!(s.point_status(), PointStatus::NeedMore(4));

        s.add_source_point(1.0, 1.0);
        assert_eq!(
            s.point_status(),
            PointStatus::Mismatch {
                source: 1,
                mosaic: 0
            }
        );

        s.add_mosaic_point(2.0, 2.0);
        assert_eq!(s.point_status(), PointStatus::NeedMore(3));

        add_pairs(&mut s, 3);
        assert_eq!(s.point_status(), PointStatus::Ready(4));
        assert!(s.point_status().is_ready());

        s.clear_points();
        assert!(s.source_points().is_empty() && s.mosaic_points().is_empty());
    }

    #[test]
    fn test_apply_checks_mosaic_first() {
        let s = session();
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            s.apply(&dir.path().join("out.tif")),
            Err(SessionError::NoMosaic)
        ));
    }

    #[test]
    fn test_apply_checks_source_second() {
        let mut s = session();
        s.set_mosaic(mosaic());
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            s.apply(&dir.path().join("out.tif")),
            Err(SessionError::NoSourceImage)
        ));
    }

    #[test]
    fn test_apply_checks_counts() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.tif");

        let mut s = session();
        s.set_mosaic(mosaic());
        s.set_source_image(DynRaster::U8(Raster::new(10, 10, 3)));
        add_pairs(&mut s, 3);
        s.add_source_point(5.0, 5.0);

        assert!(matches!(
            s.apply(&out),
            Err(SessionError::Geometry(GeometryError::CountMismatch { .. }))
        ));

        s.clear_points();
        add_pairs(&mut s, 3);
        assert!(matches!(
            s.apply(&out),
            Err(SessionError::Geometry(GeometryError::InsufficientPoints(3)))
        ));
        assert!(!out.exists());
    }

    #[test]
    fn test_apply_writes_output() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.tif");

        let mut s = session();
        s.set_mosaic(mosaic());
        s.set_source_image(DynRaster::U8(Raster::new(60, 60, 3)));
        add_pairs(&mut s, 4);

        let report = s.apply(&out).unwrap();
        assert!(out.exists());
        assert_eq!((report.width, report.height), (256, 256));
        assert_eq!(report.points, 4);
        assert_eq!(report.strategy, SolveStrategy::Exact);
        assert_eq!(report.bounds, mosaic().bounds);
    }

    #[test]
    fn test_new_mosaic_clears_points() {
        let mut s = session();
        add_pairs(&mut s, 4);
        s.set_mosaic(mosaic());
        assert_eq!(s.point_status(), PointStatus::NeedMore(4));
    }

    #[test]
    fn test_load_area_with_all_tiles_failing() {
        let kml = br#"<kml xmlns="http://www.opengis.net/kml/2.2"><Placemark><Polygon>
            <outerBoundaryIs><LinearRing><coordinates>
            12.33,56.77,0 12.35,56.77,0 12.35,56.79,0 12.33,56.79,0
            </coordinates></LinearRing></outerBoundaryIs></Polygon></Placemark></kml>"#;

        let mut s = session().with_extent(0.0, 0.0);
        let mosaic = s.load_area(kml).unwrap();
        assert_eq!(mosaic.stats.failed, mosaic.stats.total);
        assert!(mosaic.raster.as_slice().iter().all(|&v| v == 0));
        assert!(s.mosaic().is_some());
    }

    #[test]
    fn test_load_area_bad_document() {
        let mut s = session();
        assert!(matches!(
            s.load_area(b"<kml></kml>"),
            Err(SessionError::Format(FormatError::NoCoordinates))
        ));
        assert!(s.mosaic().is_none());
    }
}
