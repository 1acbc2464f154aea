//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, ValueEnum};
use geoanchor::config::ConfigFile;
use geoanchor::geotiff::GeoTiffCompression;
use geoanchor::mosaic::MosaicBuilder;
use geoanchor::provider::{ProviderConfig, ReqwestClient};
use geoanchor::solver::{PixelPoint, RansacConfig};

use crate::error::CliError;

/// Imagery provider selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ProviderType {
    /// Google satellite public tile servers (no API key required)
    Google,
    /// Esri ArcGIS World Imagery
    Arcgis,
    /// Custom XYZ server given by --url-template
    Template,
}

impl ProviderType {
    fn config_name(&self) -> &'static str {
        match self {
            ProviderType::Google => "google",
            ProviderType::Arcgis => "arcgis",
            ProviderType::Template => "template",
        }
    }
}

/// GeoTIFF compression selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Compression {
    None,
    Lzw,
    Deflate,
}

impl From<Compression> for GeoTiffCompression {
    fn from(compression: Compression) -> Self {
        match compression {
            Compression::None => GeoTiffCompression::None,
            Compression::Lzw => GeoTiffCompression::Lzw,
            Compression::Deflate => GeoTiffCompression::Deflate,
        }
    }
}

/// Options controlling how the satellite mosaic is built.
#[derive(Debug, Clone, Default, Args)]
pub struct MosaicOptions {
    /// Slippy-map zoom level [config: mosaic.zoom]
    #[arg(long)]
    pub zoom: Option<u8>,

    /// Ground width of the mosaic in meters [config: mosaic.width_m]
    #[arg(long)]
    pub width_m: Option<f64>,

    /// Ground height of the mosaic in meters [config: mosaic.height_m]
    #[arg(long)]
    pub height_m: Option<f64>,

    /// Imagery provider [config: provider.type]
    #[arg(long, value_enum)]
    pub provider: Option<ProviderType>,

    /// URL template with {x}, {y} and {z} for the template provider
    #[arg(long)]
    pub url_template: Option<String>,

    /// Per-tile download timeout in seconds [config: download.timeout_secs]
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Concurrent tile downloads [config: download.concurrency]
    #[arg(long)]
    pub parallel: Option<usize>,
}

/// Mosaic settings after merging CLI flags over the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMosaic {
    pub provider: ProviderConfig,
    pub zoom: u8,
    pub width_m: f64,
    pub height_m: f64,
    pub timeout: Duration,
    pub concurrency: usize,
}

impl MosaicOptions {
    /// CLI takes precedence, then config.
    pub fn resolve(&self, config: &ConfigFile) -> Result<ResolvedMosaic, CliError> {
        let provider = resolve_provider(self.provider, self.url_template.as_deref(), config)?;
        Ok(ResolvedMosaic {
            provider,
            zoom: self.zoom.unwrap_or(config.mosaic.zoom),
            width_m: self.width_m.unwrap_or(config.mosaic.width_m),
            height_m: self.height_m.unwrap_or(config.mosaic.height_m),
            timeout: self
                .timeout
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.download.timeout()),
            concurrency: self.parallel.unwrap_or(config.download.concurrency),
        })
    }
}

impl ResolvedMosaic {
    /// Builds a mosaic builder over a real HTTP client.
    pub fn builder(&self, config: &ConfigFile) -> Result<MosaicBuilder, CliError> {
        let http_client = ReqwestClient::with_timeout(self.timeout)?;
        let provider = self.provider.build(http_client)?;
        let mosaic_config = config.mosaic_config().with_concurrency(self.concurrency);
        Ok(MosaicBuilder::new(provider).with_config(mosaic_config))
    }
}

/// Resolve the provider from CLI args and config.
pub fn resolve_provider(
    cli_provider: Option<ProviderType>,
    cli_url_template: Option<&str>,
    config: &ConfigFile,
) -> Result<ProviderConfig, CliError> {
    // A template on the command line implies the template provider
    let name = match (cli_provider, cli_url_template) {
        (Some(p), _) => p.config_name(),
        (None, Some(_)) => "template",
        (None, None) => config.provider.provider_type.as_str(),
    };
    let template = cli_url_template.or(config.provider.url_template.as_deref());
    ProviderConfig::from_parts(name, template).map_err(|e| {
        CliError::Config(format!(
            "{}. Set provider.url_template in config.ini or use --url-template",
            e
        ))
    })
}

/// RANSAC options for commands that solve a transform.
#[derive(Debug, Clone, Default, Args)]
pub struct SolveOptions {
    /// Inlier distance threshold in mosaic pixels (more than 4 points)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// RANSAC random seed
    #[arg(long)]
    pub seed: Option<u64>,
}

impl SolveOptions {
    pub fn ransac_config(&self) -> RansacConfig {
        let mut config = RansacConfig::default();
        if let Some(threshold) = self.threshold {
            config = config.with_inlier_threshold(threshold);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        config
    }
}

/// Correspondences read from a points file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointPairs {
    pub source: Vec<PixelPoint>,
    pub mosaic: Vec<PixelPoint>,
}

impl PointPairs {
    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

/// Reads a points file; see [`parse_points`].
pub fn read_points(path: &Path) -> Result<PointPairs, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::Points(format!("{}: {}", path.display(), e)))?;
    parse_points(&text).map_err(|e| CliError::Points(format!("{}: {}", path.display(), e)))
}

/// Parses `src_x,src_y,dst_x,dst_y` lines.
///
/// Blank lines and lines starting with `#` are skipped. A first line
/// whose fields are not numbers is treated as a header.
pub fn parse_points(text: &str) -> Result<PointPairs, String> {
    let mut pairs = PointPairs::default();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 4 {
            return Err(format!(
                "line {}: expected 4 comma-separated values, found {}",
                index + 1,
                fields.len()
            ));
        }

        let values: Result<Vec<f64>, _> = fields.iter().map(|f| f.parse::<f64>()).collect();
        match values {
            Ok(v) if v.iter().all(|x| x.is_finite()) => {
                pairs.source.push((v[0], v[1]));
                pairs.mosaic.push((v[2], v[3]));
            }
            Ok(_) => return Err(format!("line {}: non-finite coordinate", index + 1)),
            Err(_) if pairs.is_empty() && fields.iter().all(|f| f.parse::<f64>().is_err()) => {
                continue;
            }
            Err(e) => return Err(format!("line {}: {}", index + 1, e)),
        }
    }

    Ok(pairs)
}

/// Default output path: the input with `suffix` and `extension`.
pub fn derive_output(input: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}{}.{}", stem, suffix, extension))
}
