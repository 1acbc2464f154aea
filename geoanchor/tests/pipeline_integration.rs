//! Integration tests for the full georeferencing pipeline.
//!
//! These tests run every stage against an in-process tile server:
//! - KML → center → 2×2 tile mosaic
//! - point pairs → homography → resample → GeoTIFF
//! - reading the GeoTIFF back and checking georeferencing and pixels
//!
//! Run with: `cargo test --test pipeline_integration`

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::{ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use geoanchor::mosaic::MosaicConfig;
use geoanchor::provider::{HttpClient, ProviderConfig, ProviderError};
use geoanchor::raster::Sample;
use geoanchor::{
    resample, solve_transform, write_georeferenced, DynRaster, GeoPoint, GeorefSession,
    MosaicBuilder, Raster, SessionError, TileMosaic,
};

// ============================================================================
// Helper Functions
// ============================================================================

const MOSAIC_COLOR: [u8; 3] = [40, 80, 120];

const CORNER_COLORS: [[u8; 3]; 4] = [
    [255, 0, 0],   // top-left
    [0, 255, 0],   // top-right
    [0, 0, 255],   // bottom-right
    [255, 255, 0], // bottom-left
];

/// Serves the same encoded PNG tile for every request.
struct StaticTileServer {
    tile: Vec<u8>,
    requests: AtomicUsize,
}

impl StaticTileServer {
    fn new() -> Self {
        let image = RgbImage::from_pixel(256, 256, Rgb(MOSAIC_COLOR));
        let mut tile = Cursor::new(Vec::new());
        image.write_to(&mut tile, ImageFormat::Png).unwrap();
        Self {
            tile: tile.into_inner(),
            requests: AtomicUsize::new(0),
        }
    }
}

impl HttpClient for StaticTileServer {
    fn get(&self, _url: &str) -> Result<Vec<u8>, ProviderError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.tile.clone())
    }
}

fn builder(server: Arc<StaticTileServer>) -> MosaicBuilder {
    let provider = ProviderConfig::Google.build(server).unwrap();
    MosaicBuilder::new(provider).with_config(MosaicConfig::default().with_max_tiles_per_axis(2))
}

/// 100×100 gray image with a 10×10 coloured block in each corner.
fn source_image() -> Raster<u8> {
    let mut data = vec![128u8; 100 * 100 * 3];
    for y in 0..100usize {
        for x in 0..100usize {
            let corner = match (x < 10, x >= 90, y < 10, y >= 90) {
                (true, _, true, _) => Some(0),
                (_, true, true, _) => Some(1),
                (_, true, _, true) => Some(2),
                (true, _, _, true) => Some(3),
                _ => None,
            };
            if let Some(c) = corner {
                let i = (y * 100 + x) * 3;
                data[i..i + 3].copy_from_slice(&CORNER_COLORS[c]);
            }
        }
    }
    Raster::from_vec(100, 100, 3, data).unwrap()
}

const SOURCE_CORNERS: [(f64, f64); 4] = [(0.0, 0.0), (99.0, 0.0), (99.0, 99.0), (0.0, 99.0)];
const MOSAIC_CORNERS: [(f64, f64); 4] = [(100.0, 120.0), (380.0, 90.0), (400.0, 410.0), (80.0, 380.0)];

const KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document><Placemark><Polygon><outerBoundaryIs><LinearRing>
    <coordinates>
      12.335,56.775,0 12.345,56.775,0 12.345,56.785,0 12.335,56.785,0
    </coordinates>
  </LinearRing></outerBoundaryIs></Polygon></Placemark></Document>
</kml>"#;

struct GeoTiffContents {
    width: u32,
    height: u32,
    tiepoint: Vec<f64>,
    scale: Vec<f64>,
    pixels: Vec<u8>,
}

impl GeoTiffContents {
    fn read(path: &Path) -> Self {
        let bytes = std::fs::read(path).unwrap();
        let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
        let (width, height) = decoder.dimensions().unwrap();
        let tiepoint = decoder.get_tag_f64_vec(Tag::Unknown(33922)).unwrap();
        let scale = decoder.get_tag_f64_vec(Tag::Unknown(33550)).unwrap();
        let pixels = match decoder.read_image().unwrap() {
            DecodingResult::U8(data) => data,
            _ => panic!("expected 8-bit output"),
        };
        Self {
            width,
            height,
            tiepoint,
            scale,
            pixels,
        }
    }

    fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * 3;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }
}

fn assert_color_near(actual: [u8; 3], expected: [u8; 3]) {
    for c in 0..3 {
        let diff = (actual[c] as i32 - expected[c] as i32).abs();
        assert!(diff <= 2, "colour {:?} != {:?}", actual, expected);
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

/// The stages called one by one, as an external UI would.
#[test]
fn test_end_to_end_corner_mapping() {
    let server = Arc::new(StaticTileServer::new());
    let mosaic: TileMosaic = builder(server.clone())
        .build(GeoPoint::new(12.34, 56.78), 1000.0, 1000.0, 17)
        .unwrap();

    assert_eq!(server.requests.load(Ordering::SeqCst), 4);
    assert_eq!((mosaic.width(), mosaic.height()), (512, 512));
    assert!(mosaic.stats.is_complete());
    let deg_per_px = 360.0 / (256.0 * 2f64.powi(17));
    let measured = (mosaic.bounds.east - mosaic.bounds.west) / mosaic.width() as f64;
    assert!((measured - deg_per_px).abs() < 1e-12);

    let transform = solve_transform(&SOURCE_CORNERS, &MOSAIC_CORNERS).unwrap();
    let warped = resample(&source_image(), &transform, mosaic.width(), mosaic.height()).unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("georef.tif");
    write_georeferenced(&DynRaster::U8(warped), &mosaic.bounds, &path).unwrap();

    let out = GeoTiffContents::read(&path);
    assert_eq!((out.width, out.height), (512, 512));
    assert_eq!(out.tiepoint[3], mosaic.bounds.west);
    assert_eq!(out.tiepoint[4], mosaic.bounds.north);
    assert!((out.scale[0] - deg_per_px).abs() < 1e-12);

    for (&(x, y), &color) in MOSAIC_CORNERS.iter().zip(&CORNER_COLORS) {
        assert_color_near(out.pixel(x as u32, y as u32), color);
    }
    // Interior maps to the gray body of the source, outside stays black
    assert_color_near(out.pixel(240, 250), [128, 128, 128]);
    assert_eq!(out.pixel(5, 5), [0, 0, 0]);
    assert_eq!(out.pixel(510, 510), [0, 0, 0]);
}

/// The same flow through the session, with a fifth, deliberately wrong pair.
#[test]
fn test_session_tolerates_outlier() {
    let dir = TempDir::new().unwrap();
    let image_path = dir.path().join("scan.png");
    source_image()
        .to_rgb_image()
        .unwrap()
        .save(&image_path)
        .unwrap();

    let server = Arc::new(StaticTileServer::new());
    let mut session = GeorefSession::new(builder(server));

    let mosaic = session.load_area(KML.as_bytes()).unwrap();
    assert_eq!((mosaic.width(), mosaic.height()), (512, 512));
    session.load_source_image(&image_path).unwrap();

    // Pure translation by (150, 200) plus one outlier
    let src = [(0.0, 0.0), (99.0, 0.0), (99.0, 99.0), (0.0, 99.0), (50.0, 30.0), (20.0, 70.0)];
    for (i, &(x, y)) in src.iter().enumerate() {
        session.add_source_point(x, y);
        if i == 5 {
            session.add_mosaic_point(10.0, 500.0);
        } else {
            session.add_mosaic_point(x + 150.0, y + 200.0);
        }
    }
    assert!(session.point_status().is_ready());

    let out_path = dir.path().join("scan.tif");
    let report = session.apply(&out_path).unwrap();
    assert_eq!(report.points, 6);
    assert_eq!(report.inliers, 5);
    assert!(report.rms_error < 1e-6);

    let out = GeoTiffContents::read(&out_path);
    assert_color_near(out.pixel(150, 200), CORNER_COLORS[0]);
    assert_color_near(out.pixel(249, 299), CORNER_COLORS[2]);
    assert_eq!(out.tiepoint[3], report.bounds.west);
    assert_eq!(out.tiepoint[4], report.bounds.north);
}

/// Preconditions fail before anything is fetched or written.
#[test]
fn test_session_precondition_order() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("never.tif");

    let server = Arc::new(StaticTileServer::new());
    let mut session = GeorefSession::new(builder(server.clone()));
    assert!(matches!(session.apply(&out), Err(SessionError::NoMosaic)));

    session.load_area(KML.as_bytes()).unwrap();
    assert!(matches!(session.apply(&out), Err(SessionError::NoSourceImage)));

    session.set_source_image(DynRaster::U8(source_image()));
    assert!(matches!(session.apply(&out), Err(SessionError::Geometry(_))));
    assert!(!out.exists());
}

/// A 16-bit source stays 16-bit in the output.
#[test]
fn test_sixteen_bit_source_preserved() {
    let server = Arc::new(StaticTileServer::new());
    let mosaic = builder(server)
        .build(GeoPoint::new(12.34, 56.78), 0.0, 0.0, 17)
        .unwrap();

    let source = Raster::from_vec(4, 4, 3, vec![u16::MAX; 48]).unwrap();
    let transform = solve_transform(
        &[(0.0, 0.0), (3.0, 0.0), (3.0, 3.0), (0.0, 3.0)],
        &[(10.0, 10.0), (40.0, 10.0), (40.0, 40.0), (10.0, 40.0)],
    )
    .unwrap();
    let warped = resample(&source, &transform, mosaic.width(), mosaic.height()).unwrap();
    assert_eq!(warped.pixel(25, 25).unwrap(), &[u16::MAX; 3]);

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("deep.tif");
    write_georeferenced(&DynRaster::U16(warped), &mosaic.bounds, &path).unwrap();

    let mut decoder = Decoder::new(Cursor::new(std::fs::read(&path).unwrap())).unwrap();
    assert_eq!(
        decoder.colortype().unwrap(),
        tiff::ColorType::RGB(<u16 as Sample>::BIT_DEPTH as u8)
    );
}
