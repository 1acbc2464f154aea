//! Provider selection.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::{GoogleSatelliteProvider, HttpClient, Provider, ProviderError, TemplateProvider};

/// Which tile source to build a mosaic from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProviderConfig {
    /// Google satellite public tiles (no API key).
    #[default]
    Google,
    /// Esri ArcGIS World Imagery.
    ArcGis,
    /// Any XYZ server described by a URL template.
    Template { url: String },
}

impl ProviderConfig {
    /// Short identifier used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            ProviderConfig::Google => "google",
            ProviderConfig::ArcGis => "arcgis",
            ProviderConfig::Template { .. } => "template",
        }
    }

    /// Builds the provider over the given HTTP client.
    pub fn build<C>(&self, http_client: C) -> Result<Arc<dyn Provider>, ProviderError>
    where
        C: HttpClient + 'static,
    {
        let provider: Arc<dyn Provider> = match self {
            ProviderConfig::Google => Arc::new(GoogleSatelliteProvider::new(http_client)),
            ProviderConfig::ArcGis => Arc::new(TemplateProvider::arcgis(http_client)?),
            ProviderConfig::Template { url } => {
                Arc::new(TemplateProvider::new(http_client, url.clone())?)
            }
        };
        Ok(provider)
    }

    /// Resolves a provider from its config name and optional URL template.
    pub fn from_parts(name: &str, url_template: Option<&str>) -> Result<Self, ProviderError> {
        match name.trim().to_lowercase().as_str() {
            "google" => Ok(ProviderConfig::Google),
            "arcgis" => Ok(ProviderConfig::ArcGis),
            "template" => url_template
                .filter(|u| !u.trim().is_empty())
                .map(|u| ProviderConfig::Template { url: u.to_string() })
                .ok_or_else(|| {
                    ProviderError::InvalidConfig(
                        "template provider requires a url_template".to_string(),
                    )
                }),
            other => Err(ProviderError::InvalidConfig(format!(
                "unknown provider '{}'",
                other
            ))),
        }
    }
}

impl FromStr for ProviderConfig {
    type Err = ProviderError;

    /// Accepts `google`, `arcgis`, or a URL template containing `{x}`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains("{x}") {
            return Ok(ProviderConfig::Template { url: s.to_string() });
        }
        Self::from_parts(s, None)
    }
}

impl fmt::Display for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderConfig::Template { url } => write!(f, "template ({})", url),
            other => write!(f, "{}", other.name()),
        }
    }
}
