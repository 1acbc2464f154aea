//! Mosaic export for external point picking.
//!
//! A mosaic is saved as a PNG plus a `.json` sidecar holding its bounds and
//! tile grid, so it can be reloaded later without fetching tiles again.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::GeoBounds;
use crate::raster::Raster;

use super::{FetchStats, TileGrid, TileMosaic};

/// Errors from saving or loading an exported mosaic.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image error on {path}: {message}")]
    Image { path: PathBuf, message: String },

    #[error("Invalid mosaic metadata in {path}: {message}")]
    Metadata { path: PathBuf, message: String },
}

/// Contents of the `.json` sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MosaicMetadata {
    pub bounds: GeoBounds,
    pub grid: TileGrid,
    pub width: u32,
    pub height: u32,
    pub crs: String,
}

/// Path of the sidecar for an image path (`mosaic.png` → `mosaic.json`).
pub fn sidecar_path(image_path: &Path) -> PathBuf {
    image_path.with_extension("json")
}

impl TileMosaic {
    /// Writes the mosaic as PNG and its metadata next to it.
    ///
    /// Returns the sidecar path.
    pub fn save(&self, path: &Path) -> Result<PathBuf, ExportError> {
        let image = self.raster.to_rgb_image().ok_or_else(|| ExportError::Image {
            path: path.to_path_buf(),
            message: "mosaic is not a 3-channel raster".to_string(),
        })?;
        image
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| ExportError::Image {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let metadata = MosaicMetadata {
            bounds: self.bounds,
            grid: self.grid,
            width: self.width(),
            height: self.height(),
            crs: "EPSG:4326".to_string(),
        };
        let sidecar = sidecar_path(path);
        let json = serde_json::to_string_pretty(&metadata).map_err(|e| ExportError::Metadata {
            path: sidecar.clone(),
            message: e.to_string(),
        })?;
        fs::write(&sidecar, json).map_err(|source| ExportError::Io {
            path: sidecar.clone(),
            source,
        })?;

        tracing::info!(
            image = %path.display(),
            sidecar = %sidecar.display(),
            "Saved mosaic"
        );
        Ok(sidecar)
    }

    /// Loads a mosaic saved by [`TileMosaic::save`].
    pub fn open(path: &Path) -> Result<Self, ExportError> {
        let sidecar = sidecar_path(path);
        let json = fs::read_to_string(&sidecar).map_err(|source| ExportError::Io {
            path: sidecar.clone(),
            source,
        })?;
        let metadata: MosaicMetadata =
            serde_json::from_str(&json).map_err(|e| ExportError::Metadata {
                path: sidecar.clone(),
                message: e.to_string(),
            })?;

        let image = image::open(path).map_err(|e| ExportError::Image {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let raster = Raster::from_rgb_image(image.to_rgb8());

        if (raster.width(), raster.height()) != (metadata.width, metadata.height) {
            return Err(ExportError::Metadata {
                path: sidecar,
                message: format!(
                    "image is {}×{} but metadata says {}×{}",
                    raster.width(),
                    raster.height(),
                    metadata.width,
                    metadata.height
                ),
            });
        }

        Ok(TileMosaic {
            raster,
            bounds: metadata.bounds,
            grid: metadata.grid,
            stats: FetchStats::default(),
        })
    }
}
