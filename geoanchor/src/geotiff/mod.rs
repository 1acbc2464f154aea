//! GeoTIFF output.
//!
//! Writes a raster with EPSG:4326 georeferencing: `ModelPixelScaleTag`,
//! `ModelTiepointTag` and a `GeoKeyDirectoryTag` declaring a geographic
//! model with pixel-is-area rasters.
//!
//! # Example
//!
//! ```no_run
//! use geoanchor::coord::GeoBounds;
//! use geoanchor::geotiff::write_georeferenced;
//! use geoanchor::raster::{DynRaster, Raster};
//!
//! let raster = DynRaster::U8(Raster::new(512, 512, 3));
//! let bounds = GeoBounds::new(12.3, 56.7, 12.4, 56.8);
//! write_georeferenced(&raster, &bounds, "out.tif".as_ref()).unwrap();
//! ```

mod transform;
mod writer;

pub use transform::GeoTransform;
pub use writer::{write_georeferenced, GeoTiffWriter};

use std::path::PathBuf;

use thiserror::Error;

/// EPSG code of the output coordinate system (WGS84 lat/lon).
pub const EPSG_WGS84: u16 = 4326;

/// Compression applied to the image data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeoTiffCompression {
    #[default]
    None,
    Lzw,
    Deflate,
}

impl std::str::FromStr for GeoTiffCompression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "lzw" => Ok(Self::Lzw),
            "deflate" | "zip" => Ok(Self::Deflate),
            other => Err(format!(
                "Unknown compression '{}': expected none, lzw or deflate",
                other
            )),
        }
    }
}

impl std::fmt::Display for GeoTiffCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Lzw => write!(f, "lzw"),
            Self::Deflate => write!(f, "deflate"),
        }
    }
}

/// Errors raised while writing a GeoTIFF.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TIFF encoding failed: {0}")]
    Encode(String),

    #[error("Cannot write an empty {width}×{height} raster")]
    EmptyRaster { width: u32, height: u32 },
}

impl From<tiff::TiffError> for WriteError {
    fn from(e: tiff::TiffError) -> Self {
        match e {
            tiff::TiffError::IoError(source) => WriteError::Io {
                path: PathBuf::new(),
                source,
            },
            other => WriteError::Encode(other.to_string()),
        }
    }
}
