//! Satellite imagery provider abstraction
//!
//! This module provides traits and implementations for downloading slippy-map
//! imagery tiles from various sources (Google, ArcGIS, custom XYZ servers).
//!
//! # Factory
//!
//! ```ignore
//! use geoanchor::provider::{ProviderConfig, ReqwestClient};
//!
//! let http_client = ReqwestClient::new()?;
//! let provider = ProviderConfig::Google.build(http_client)?;
//! let jpeg = provider.download_tile(40000, 70000, 17)?;
//! ```

mod factory;
mod google;
mod http;
mod template;
mod types;

pub use factory::ProviderConfig;
pub use google::GoogleSatelliteProvider;
pub use http::{HttpClient, ReqwestClient, DEFAULT_TIMEOUT};
pub use template::{TemplateProvider, ARCGIS_TEMPLATE};
pub use types::{Provider, ProviderError};

#[cfg(test)]
pub use http::tests::MockHttpClient;
