//! Shared startup for commands that run the pipeline.

use geoanchor::config::ConfigFile;
use geoanchor::logging::{init_logging, LoggingGuard};

use crate::error::CliError;

/// Loads configuration and sets up logging.
pub struct CliRunner {
    config: ConfigFile,
    _logging: LoggingGuard,
}

impl CliRunner {
    pub fn new(verbose: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;
        let level = if verbose {
            "debug"
        } else {
            config.logging.level.as_str()
        };
        let logging = init_logging(&config.logging.log_dir(), level)?;
        Ok(Self {
            config,
            _logging: logging,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Logs the command and the settings it runs with.
    pub fn log_startup(&self, command: &str) {
        tracing::info!(
            command,
            version = env!("CARGO_PKG_VERSION"),
            provider = %self.config.provider.provider_type,
            zoom = self.config.mosaic.zoom,
            "geoanchor starting"
        );
    }
}
