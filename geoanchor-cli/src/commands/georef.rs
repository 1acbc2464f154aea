//! Georef command - anchor an image to the mosaic and write a GeoTIFF.

use std::path::PathBuf;

use geoanchor::geotiff::GeoTiffCompression;
use geoanchor::{GeorefSession, TileMosaic};

use super::common::{derive_output, read_points, Compression, MosaicOptions, SolveOptions};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Where the mosaic comes from.
pub enum MosaicSource {
    /// Build it from an area document.
    Area(PathBuf),
    /// Reload one saved by the mosaic command.
    Saved(PathBuf),
}

/// Arguments for the georef command.
pub struct GeorefArgs {
    pub image: PathBuf,
    pub mosaic: MosaicSource,
    pub points: PathBuf,
    pub output: Option<PathBuf>,
    pub compression: Option<Compression>,
    pub options: MosaicOptions,
    pub solve: SolveOptions,
    pub verbose: bool,
}

/// Run the georef command.
pub fn run(args: GeorefArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.verbose)?;
    runner.log_startup("georef");
    let config = runner.config();

    let settings = args.options.resolve(config)?;
    let compression = args
        .compression
        .map(GeoTiffCompression::from)
        .unwrap_or(config.output.compression);
    let output = args
        .output
        .unwrap_or_else(|| derive_output(&args.image, "_georef", "tif"));

    // Read points first so a bad file fails before any download
    let pairs = read_points(&args.points)?;

    let mut session = GeorefSession::new(settings.builder(config)?)
        .with_zoom(settings.zoom)
        .with_extent(settings.width_m, settings.height_m)
        .with_ransac_config(args.solve.ransac_config())
        .with_compression(compression);

    let mosaic = match &args.mosaic {
        MosaicSource::Area(kml) => {
            println!("Fetching {} imagery at zoom {}...", settings.provider, settings.zoom);
            session.load_area_from_path(kml)?
        }
        MosaicSource::Saved(png) => session.set_mosaic(TileMosaic::open(png)?),
    };
    println!("Mosaic: {} × {} px", mosaic.width(), mosaic.height());
    if mosaic.stats.failed > 0 {
        println!(
            "Warning: {} of {} tile(s) failed and were left black",
            mosaic.stats.failed, mosaic.stats.total
        );
    }

    let source = session.load_source_image(&args.image)?;
    println!(
        "Source: {} × {} px, {}-bit",
        source.width(),
        source.height(),
        source.bit_depth()
    );

    for (&(sx, sy), &(dx, dy)) in pairs.source.iter().zip(&pairs.mosaic) {
        session.add_source_point(sx, sy);
        session.add_mosaic_point(dx, dy);
    }
    println!("Points: {}", session.point_status());

    let report = session.apply(&output)?;

    println!(
        "Transform: {:?} fit, {} of {} points inliers, RMS error {:.3} px",
        report.strategy, report.inliers, report.points, report.rms_error
    );
    println!(
        "Wrote {} ({} × {} px, EPSG:4326)",
        report.output.display(),
        report.width,
        report.height
    );

    Ok(())
}
