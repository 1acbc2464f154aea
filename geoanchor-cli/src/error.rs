//! CLI error type.

use thiserror::Error;

use geoanchor::config::ConfigError;
use geoanchor::logging::LoggingError;
use geoanchor::mosaic::ExportError;
use geoanchor::provider::ProviderError;
use geoanchor::SessionError;

/// Every failure a command can report. All map to exit code 1.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(#[from] LoggingError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Mosaic export failed: {0}")]
    Export(#[from] ExportError),

    #[error("Invalid points file: {0}")]
    Points(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        1
    }
}
