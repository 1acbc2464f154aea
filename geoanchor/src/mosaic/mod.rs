//! Satellite mosaic assembly
//!
//! Converts a geographic center and ground extent into a grid of Web
//! Mercator tiles, fetches them concurrently from a [`Provider`], and
//! stitches them into one RGB raster with analytically derived bounds.
//!
//! Tile failures are never fatal: a tile that cannot be downloaded or
//! decoded is left black and counted in [`FetchStats`].
//!
//! [`Provider`]: crate::provider::Provider

mod builder;
mod export;
mod fetch;
mod grid;
mod types;

pub use builder::MosaicBuilder;
pub use export::{sidecar_path, ExportError, MosaicMetadata};
pub use grid::TileGrid;
pub use types::{
    AreaExtractionError, FetchStats, MosaicConfig, TileMosaic, DEFAULT_CONCURRENCY,
    DEFAULT_EXTENT_M, DEFAULT_MAX_TILES_PER_AXIS, DEFAULT_ZOOM,
};
