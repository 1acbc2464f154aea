//! Google satellite imagery via the public tile servers.
//!
//! # URL Pattern
//!
//! `https://mt{server}.google.com/vt/lyrs=s&x={x}&y={y}&z={z}`
//!
//! - `lyrs=s` selects the satellite layer without labels
//! - No API key is required
//! - Servers `mt0`..`mt3` serve identical content
//!
//! # Coordinate System
//!
//! Standard Web Mercator XYZ tile coordinates:
//! - X: Column (0 to 2^zoom - 1, west to east)
//! - Y: Row (0 to 2^zoom - 1, north to south)
//! - Z: Zoom level (0 to 22)

use crate::provider::{HttpClient, Provider, ProviderError};

const MIN_ZOOM: u8 = 0;
const MAX_ZOOM: u8 = 22;

/// Server used when rotation is disabled.
const DEFAULT_SERVER: u32 = 1;

/// Google satellite tile provider.
///
/// # Example
///
/// ```no_run
/// use geoanchor::provider::{GoogleSatelliteProvider, Provider, ReqwestClient};
///
/// let client = ReqwestClient::new().unwrap();
/// let provider = GoogleSatelliteProvider::new(client);
/// let bytes = provider.download_tile(40000, 70000, 17);
/// ```
pub struct GoogleSatelliteProvider<C: HttpClient> {
    http_client: C,
    rotate_servers: bool,
}

impl<C: HttpClient> GoogleSatelliteProvider<C> {
    /// Creates a provider that always requests from `mt1`.
    pub fn new(http_client: C) -> Self {
        Self {
            http_client,
            rotate_servers: false,
        }
    }

    /// Creates a provider that spreads requests across `mt0`..`mt3`.
    pub fn with_server_rotation(http_client: C) -> Self {
        Self {
            http_client,
            rotate_servers: true,
        }
    }

    /// Builds the tile URL for the given coordinates.
    fn build_url(&self, row: u32, col: u32, zoom: u8) -> String {
        let server = if self.rotate_servers {
            (row.wrapping_add(col)) % 4
        } else {
            DEFAULT_SERVER
        };
        format!(
            "https://mt{}.google.com/vt/lyrs=s&x={}&y={}&z={}",
            server, col, row, zoom
        )
    }
}

impl<C: HttpClient> Provider for GoogleSatelliteProvider<C> {
    fn download_tile(&self, row: u32, col: u32, zoom: u8) -> Result<Vec<u8>, ProviderError> {
        if !self.supports_zoom(zoom) {
            return Err(ProviderError::UnsupportedZoom(zoom));
        }

        let url = self.build_url(row, col, zoom);
        self.http_client.get(&url)
    }

    fn name(&self) -> &str {
        "Google Satellite"
    }

    fn min_zoom(&self) -> u8 {
        MIN_ZOOM
    }

    fn max_zoom(&self) -> u8 {
        MAX_ZOOM
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockHttpClient;

    #[test]
    fn test_provider_name() {
        let provider = GoogleSatelliteProvider::new(MockHttpClient::ok(vec![]));
        assert_eq!(provider.name(), "Google Satellite");
    }

    #[test]
    fn test_supports_zoom() {
        let provider = GoogleSatelliteProvider::new(MockHttpClient::ok(vec![]));
        assert!(provider.supports_zoom(0));
        assert!(provider.supports_zoom(17));
        assert!(provider.supports_zoom(22));
        assert!(!provider.supports_zoom(23));
    }

    #[test]
    fn test_default_url_uses_mt1() {
        let provider = GoogleSatelliteProvider::new(MockHttpClient::ok(vec![]));

        let url = provider.build_url(100, 200, 10);
        assert_eq!(url, "https://mt1.google.com/vt/lyrs=s&x=200&y=100&z=10");
    }

    #[test]
    fn test_rotated_url_server_distribution() {
        let provider = GoogleSatelliteProvider::with_server_rotation(MockHttpClient::ok(vec![]));

        assert!(provider.build_url(0, 0, 5).starts_with("https://mt0."));
        assert!(provider.build_url(0, 1, 5).starts_with("https://mt1."));
        assert!(provider.build_url(1, 1, 5).starts_with("https://mt2."));
        assert!(provider.build_url(1, 2, 5).starts_with("https://mt3."));
    }

    #[test]
    fn test_download_passes_through_body() {
        let provider = GoogleSatelliteProvider::new(MockHttpClient::ok(vec![1, 2, 3]));
        assert_eq!(provider.download_tile(1, 2, 3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_unsupported_zoom_does_not_request() {
        let mock = std::sync::Arc::new(MockHttpClient::ok(vec![]));
        let provider = GoogleSatelliteProvider::new(mock.clone());

        let result = provider.download_tile(0, 0, 30);
        assert_eq!(result.unwrap_err(), ProviderError::UnsupportedZoom(30));
        assert!(mock.requested().is_empty());
    }
}
