//! GeoAnchor - Georeference images against satellite imagery
//!
//! The pipeline takes an area of interest from a KML/KMZ document, builds a
//! satellite mosaic around it from a slippy-map tile source, estimates a
//! homography from user-picked point pairs, warps the source image onto the
//! mosaic grid and writes the result as an EPSG:4326 GeoTIFF.
//!
//! ```text
//! area ──center──▶ mosaic ──raster+bounds──▶ [point picking] ──▶ solver
//!                                                                  │
//!                          geotiff ◀──aligned raster── warp ◀──────┘
//! ```
//!
//! [`session::GeorefSession`] ties the stages together; each stage is also
//! usable on its own.

pub mod area;
pub mod config;
pub mod coord;
pub mod geotiff;
pub mod logging;
pub mod mosaic;
pub mod provider;
pub mod raster;
pub mod session;
pub mod solver;
pub mod warp;

pub use area::{extract_area, FormatError, Polygon};
pub use coord::{GeoBounds, GeoPoint};
pub use geotiff::{write_georeferenced, GeoTransform, WriteError};
pub use mosaic::{AreaExtractionError, MosaicBuilder, TileMosaic};
pub use raster::{DynRaster, Raster};
pub use session::{GeorefReport, GeorefSession, PointStatus, SessionError};
pub use solver::{solve_transform, GeometryError, Homography};
pub use warp::resample;
