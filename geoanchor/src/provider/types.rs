//! Provider trait and error type.

use thiserror::Error;

/// Errors raised while downloading a single tile.
///
/// These never escape the mosaic builder: a failed tile is replaced by a
/// black one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Transport failure, timeout or non-success status.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The provider does not serve this zoom level.
    #[error("Unsupported zoom level: {0}")]
    UnsupportedZoom(u8),

    /// Invalid provider configuration.
    #[error("Invalid provider configuration: {0}")]
    InvalidConfig(String),
}

/// A source of 256×256 slippy-map imagery tiles.
///
/// Implementations must be thread-safe: the mosaic builder calls
/// [`Provider::download_tile`] from a pool of worker threads.
pub trait Provider: Send + Sync {
    /// Downloads the encoded image bytes of one tile.
    ///
    /// # Arguments
    ///
    /// * `row` - Tile row (slippy-map Y)
    /// * `col` - Tile column (slippy-map X)
    /// * `zoom` - Zoom level
    fn download_tile(&self, row: u32, col: u32, zoom: u8) -> Result<Vec<u8>, ProviderError>;

    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Lowest zoom level served.
    fn min_zoom(&self) -> u8;

    /// Highest zoom level served.
    fn max_zoom(&self) -> u8;

    /// True when `zoom` lies within the served range.
    fn supports_zoom(&self, zoom: u8) -> bool {
        zoom >= self.min_zoom() && zoom <= self.max_zoom()
    }
}
