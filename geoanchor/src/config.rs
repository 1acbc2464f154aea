//! Persistent user configuration.
//!
//! Settings live in an INI file at `~/.geoanchor/config.ini`. A missing
//! file or missing keys fall back to defaults; unknown keys are ignored.
//!
//! ```ini
//! [provider]
//! type = google
//! url_template =
//!
//! [mosaic]
//! zoom = 17
//! width_m = 1000
//! height_m = 1000
//! max_tiles_per_axis = 8
//!
//! [download]
//! timeout_secs = 10
//! concurrency = 8
//!
//! [output]
//! compression = none
//!
//! [logging]
//! level = info
//! directory =
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::geotiff::GeoTiffCompression;
use crate::mosaic::{
    MosaicConfig, DEFAULT_CONCURRENCY, DEFAULT_EXTENT_M, DEFAULT_MAX_TILES_PER_AXIS,
    DEFAULT_ZOOM,
};
use crate::provider::{ProviderConfig, DEFAULT_TIMEOUT};

/// Directory under the home directory holding the config file.
const CONFIG_DIR: &str = ".geoanchor";
const CONFIG_FILE: &str = "config.ini";

/// Errors raised while reading or writing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// Path of the user config file (`~/.geoanchor/config.ini`).
pub fn config_file_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    /// `google`, `arcgis` or `template`.
    pub provider_type: String,
    /// Required when `provider_type` is `template`.
    pub url_template: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            provider_type: ProviderConfig::default().name().to_string(),
            url_template: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MosaicSettings {
    pub zoom: u8,
    pub width_m: f64,
    pub height_m: f64,
    pub max_tiles_per_axis: u32,
}

impl Default for MosaicSettings {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            width_m: DEFAULT_EXTENT_M,
            height_m: DEFAULT_EXTENT_M,
            max_tiles_per_axis: DEFAULT_MAX_TILES_PER_AXIS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSettings {
    pub timeout_secs: u64,
    pub concurrency: usize,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl DownloadSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputSettings {
    pub compression: GeoTiffCompression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// Log file directory. `None` means `~/.geoanchor/logs`.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl LoggingSettings {
    /// Directory log files are written to.
    pub fn log_dir(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(|| {
            config_file_path()
                .parent()
                .map(|p| p.join("logs"))
                .unwrap_or_else(|| PathBuf::from("logs"))
        })
    }
}

/// All user settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub provider: ProviderSettings,
    pub mosaic: MosaicSettings,
    pub download: DownloadSettings,
    pub output: OutputSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Loads the user config file, or defaults if it does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Loads from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Parses INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Writes to the user config file, creating its directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        self.to_ini().write_to_file(path).map_err(write_err)?;
        tracing::debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Provider selected by `[provider]`.
    pub fn provider_config(&self) -> Result<ProviderConfig, ConfigError> {
        ProviderConfig::from_parts(
            &self.provider.provider_type,
            self.provider.url_template.as_deref(),
        )
        .map_err(|e| ConfigError::InvalidValue {
            key: ConfigKey::ProviderType.name(),
            value: self.provider.provider_type.clone(),
            reason: e.to_string(),
        })
    }

    /// Mosaic builder settings from `[mosaic]` and `[download]`.
    pub fn mosaic_config(&self) -> MosaicConfig {
        MosaicConfig::default()
            .with_max_tiles_per_axis(self.mosaic.max_tiles_per_axis)
            .with_concurrency(self.download.concurrency)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|s| s.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            ini.with_section(Some(key.section()))
                .set(key.key_name(), key.get(self));
        }
        ini
    }
}

/// A settable configuration key, addressed as `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ProviderType,
    ProviderUrlTemplate,
    MosaicZoom,
    MosaicWidthM,
    MosaicHeightM,
    MosaicMaxTilesPerAxis,
    DownloadTimeoutSecs,
    DownloadConcurrency,
    OutputCompression,
    LoggingLevel,
    LoggingDirectory,
}

impl ConfigKey {
    /// Every key, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::ProviderType,
            ConfigKey::ProviderUrlTemplate,
            ConfigKey::MosaicZoom,
            ConfigKey::MosaicWidthM,
            ConfigKey::MosaicHeightM,
            ConfigKey::MosaicMaxTilesPerAxis,
            ConfigKey::DownloadTimeoutSecs,
            ConfigKey::DownloadConcurrency,
            ConfigKey::OutputCompression,
            ConfigKey::LoggingLevel,
            ConfigKey::LoggingDirectory,
        ]
    }

    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::ProviderType | ConfigKey::ProviderUrlTemplate => "provider",
            ConfigKey::MosaicZoom
            | ConfigKey::MosaicWidthM
            | ConfigKey::MosaicHeightM
            | ConfigKey::MosaicMaxTilesPerAxis => "mosaic",
            ConfigKey::DownloadTimeoutSecs | ConfigKey::DownloadConcurrency => "download",
            ConfigKey::OutputCompression => "output",
            ConfigKey::LoggingLevel | ConfigKey::LoggingDirectory => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::ProviderType => "type",
            ConfigKey::ProviderUrlTemplate => "url_template",
            ConfigKey::MosaicZoom => "zoom",
            ConfigKey::MosaicWidthM => "width_m",
            ConfigKey::MosaicHeightM => "height_m",
            ConfigKey::MosaicMaxTilesPerAxis => "max_tiles_per_axis",
            ConfigKey::DownloadTimeoutSecs => "timeout_secs",
            ConfigKey::DownloadConcurrency => "concurrency",
            ConfigKey::OutputCompression => "compression",
            ConfigKey::LoggingLevel => "level",
            ConfigKey::LoggingDirectory => "directory",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as text; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::ProviderType => config.provider.provider_type.clone(),
            ConfigKey::ProviderUrlTemplate => {
                config.provider.url_template.clone().unwrap_or_default()
            }
            ConfigKey::MosaicZoom => config.mosaic.zoom.to_string(),
            ConfigKey::MosaicWidthM => config.mosaic.width_m.to_string(),
            ConfigKey::MosaicHeightM => config.mosaic.height_m.to_string(),
            ConfigKey::MosaicMaxTilesPerAxis => config.mosaic.max_tiles_per_axis.to_string(),
            ConfigKey::DownloadTimeoutSecs => config.download.timeout_secs.to_string(),
            ConfigKey::DownloadConcurrency => config.download.concurrency.to_string(),
            ConfigKey::OutputCompression => config.output.compression.to_string(),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
            ConfigKey::LoggingDirectory => config
                .logging
                .directory
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Validates and stores `value`.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            ConfigKey::ProviderType => {
                let name = value.to_lowercase();
                if !matches!(name.as_str(), "google" | "arcgis" | "template") {
                    return Err(self.invalid(value, "expected google, arcgis or template"));
                }
                config.provider.provider_type = name;
            }
            ConfigKey::ProviderUrlTemplate => {
                if !value.is_empty() && !value.contains("{x}") {
                    return Err(self.invalid(value, "template must contain {x}, {y} and {z}"));
                }
                config.provider.url_template = non_empty(value);
            }
            ConfigKey::MosaicZoom => {
                let zoom: u8 = self.parse(value)?;
                if zoom > crate::coord::MAX_ZOOM {
                    return Err(self.invalid(value, "zoom must be within 0..=22"));
                }
                config.mosaic.zoom = zoom;
            }
            ConfigKey::MosaicWidthM => config.mosaic.width_m = self.parse_extent(value)?,
            ConfigKey::MosaicHeightM => config.mosaic.height_m = self.parse_extent(value)?,
            ConfigKey::MosaicMaxTilesPerAxis => {
                config.mosaic.max_tiles_per_axis = self.parse_positive(value)?
            }
            ConfigKey::DownloadTimeoutSecs => {
                config.download.timeout_secs = self.parse_positive(value)?
            }
            ConfigKey::DownloadConcurrency => {
                config.download.concurrency = self.parse_positive(value)?
            }
            ConfigKey::OutputCompression => {
                config.output.compression = value
                    .parse()
                    .map_err(|reason: String| self.invalid(value, &reason))?;
            }
            ConfigKey::LoggingLevel => {
                config.logging.level = if value.is_empty() {
                    LoggingSettings::default().level
                } else {
                    value.to_string()
                };
            }
            ConfigKey::LoggingDirectory => config.logging.directory = non_empty(value).map(PathBuf::from),
        }
        Ok(())
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn parse<T: FromStr>(&self, value: &str) -> Result<T, ConfigError>
    where
        T::Err: fmt::Display,
    {
        value
            .parse()
            .map_err(|e: T::Err| self.invalid(value, &e.to_string()))
    }

    fn parse_positive<T>(&self, value: &str) -> Result<T, ConfigError>
    where
        T: FromStr + Default + PartialOrd,
        T::Err: fmt::Display,
    {
        let parsed: T = self.parse(value)?;
        if parsed <= T::default() {
            return Err(self.invalid(value, "must be greater than zero"));
        }
        Ok(parsed)
    }

    fn parse_extent(&self, value: &str) -> Result<f64, ConfigError> {
        let parsed: f64 = self.parse(value)?;
        if !parsed.is_finite() || parsed < 0.0 {
            return Err(self.invalid(value, "must be a non-negative number of meters"));
        }
        Ok(parsed)
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&dir.path().join("nope.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.mosaic.zoom, 17);
        assert_eq!(config.download.concurrency, 8);
        assert_eq!(config.download.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub").join("config.ini");

        let mut config = ConfigFile::default();
        ConfigKey::MosaicZoom.set(&mut config, "18").unwrap();
        ConfigKey::OutputCompression.set(&mut config, "lzw").unwrap();
        ConfigKey::ProviderType.set(&mut config, "template").unwrap();
        ConfigKey::ProviderUrlTemplate
            .set(&mut config, "https://tiles.example/{z}/{x}/{y}.png")
            .unwrap();
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(
            loaded.provider_config().unwrap(),
            ProviderConfig::Template {
                url: "https://tiles.example/{z}/{x}/{y}.png".to_string()
            }
        );
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = ConfigFile::parse("[mosaic]\nwidth_m = 2500\n\n[unknown]\nfoo = bar\n").unwrap();
        assert_eq!(config.mosaic.width_m, 2500.0);
        assert_eq!(config.mosaic.height_m, DEFAULT_EXTENT_M);
        assert_eq!(config.provider.provider_type, "google");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::MosaicZoom.set(&mut config, "23").is_err());
        assert!(ConfigKey::MosaicZoom.set(&mut config, "abc").is_err());
        assert!(ConfigKey::DownloadConcurrency.set(&mut config, "0").is_err());
        assert!(ConfigKey::MosaicWidthM.set(&mut config, "-5").is_err());
        assert!(ConfigKey::ProviderType.set(&mut config, "bing").is_err());
        assert!(ConfigKey::ProviderUrlTemplate.set(&mut config, "https://x").is_err());
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_invalid_file_value_is_error() {
        assert!(matches!(
            ConfigFile::parse("[download]\nconcurrency = lots\n"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_template_without_url_is_error() {
        let mut config = ConfigFile::default();
        config.provider.provider_type = "template".to_string();
        assert!(config.provider_config().is_err());
    }

    #[test]
    fn test_key_names() {
        assert_eq!(
            "mosaic.zoom".parse::<ConfigKey>().unwrap(),
            ConfigKey::MosaicZoom
        );
        assert_eq!(ConfigKey::LoggingDirectory.name(), "logging.directory");
        assert!(matches!(
            "mosaic.colour".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_mosaic_config_from_settings() {
        let config = ConfigFile::parse("[mosaic]\nmax_tiles_per_axis = 4\n[download]\nconcurrency = 2\n")
            .unwrap();
        let mosaic = config.mosaic_config();
        assert_eq!(mosaic.max_tiles_per_axis, 4);
        assert_eq!(mosaic.concurrency, 2);
    }
}
