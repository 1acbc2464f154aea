//! Generic XYZ provider driven by a URL template.
//!
//! The template must contain `{x}`, `{y}` and `{z}` placeholders, e.g.
//! `https://tiles.example.com/{z}/{x}/{y}.jpg`.
//!
//! Esri World Imagery is served this way too; see [`TemplateProvider::arcgis`].
//! Its public tier needs no key and is subject to Esri's terms of use.

use crate::provider::{HttpClient, Provider, ProviderError};

const PLACEHOLDERS: [&str; 3] = ["{x}", "{y}", "{z}"];

/// Esri World Imagery tiles (`{z}/{y}/{x}` order).
pub const ARCGIS_TEMPLATE: &str =
    "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}";

/// World Imagery is generally available up to zoom 19.
const ARCGIS_MAX_ZOOM: u8 = 19;

/// Tile provider for any server following the XYZ URL convention.
pub struct TemplateProvider<C: HttpClient> {
    http_client: C,
    template: String,
    name: String,
    max_zoom: u8,
}

impl<C: HttpClient> TemplateProvider<C> {
    /// Creates a provider for `template`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::InvalidConfig` if a placeholder is missing.
    pub fn new(http_client: C, template: impl Into<String>) -> Result<Self, ProviderError> {
        let template = template.into();
        if let Some(missing) = PLACEHOLDERS.iter().find(|p| !template.contains(*p)) {
            return Err(ProviderError::InvalidConfig(format!(
                "URL template '{}' is missing {}",
                template, missing
            )));
        }

        Ok(Self {
            http_client,
            template,
            name: "Custom XYZ".to_string(),
            max_zoom: crate::coord::MAX_ZOOM,
        })
    }

    /// Esri ArcGIS World Imagery.
    pub fn arcgis(http_client: C) -> Result<Self, ProviderError> {
        Ok(Self::new(http_client, ARCGIS_TEMPLATE)?
            .with_name("ArcGIS")
            .with_max_zoom(ARCGIS_MAX_ZOOM))
    }

    /// Display name reported by [`Provider::name`].
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Limits the highest zoom level requested from this server.
    pub fn with_max_zoom(mut self, max_zoom: u8) -> Self {
        self.max_zoom = max_zoom;
        self
    }

    fn build_url(&self, row: u32, col: u32, zoom: u8) -> String {
        self.template
            .replace("{x}", &col.to_string())
            .replace("{y}", &row.to_string())
            .replace("{z}", &zoom.to_string())
    }
}

impl<C: HttpClient> Provider for TemplateProvider<C> {
    fn download_tile(&self, row: u32, col: u32, zoom: u8) -> Result<Vec<u8>, ProviderError> {
        if !self.supports_zoom(zoom) {
            return Err(ProviderError::UnsupportedZoom(zoom));
        }

        let url = self.build_url(row, col, zoom);
        self.http_client.get(&url)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn min_zoom(&self) -> u8 {
        0
    }

    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockHttpClient;

    #[test]
    fn test_template_substitution() {
        let provider = TemplateProvider::new(
            MockHttpClient::ok(vec![]),
            "https://tiles.example.com/{z}/{x}/{y}.png",
        )
        .unwrap();

        assert_eq!(
            provider.build_url(7, 9, 4),
            "https://tiles.example.com/4/9/7.png"
        );
    }

    #[test]
    fn test_missing_placeholder_rejected() {
        let result = TemplateProvider::new(MockHttpClient::ok(vec![]), "https://t/{z}/{x}.png");
        match result {
            Err(ProviderError::InvalidConfig(msg)) => assert!(msg.contains("{y}")),
            _ => panic!("expected InvalidConfig"),
        }
    }

    #[test]
    fn test_arcgis_preset() {
        let provider = TemplateProvider::arcgis(MockHttpClient::ok(vec![])).unwrap();
        assert_eq!(provider.name(), "ArcGIS");
        assert!(provider.build_url(100, 200, 15).ends_with("/tile/15/100/200"));
        assert!(matches!(
            provider.download_tile(0, 0, 20),
            Err(ProviderError::UnsupportedZoom(20))
        ));
    }

    #[test]
    fn test_max_zoom_override() {
        let provider = TemplateProvider::new(MockHttpClient::ok(vec![]), "http://t/{z}/{x}/{y}")
            .unwrap()
            .with_max_zoom(12);
        assert!(provider.supports_zoom(12));
        assert!(!provider.supports_zoom(13));
    }
}
