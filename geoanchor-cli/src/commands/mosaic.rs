//! Mosaic command - build and save the satellite mosaic for an area.

use std::path::PathBuf;

use geoanchor::area::extract_area_from_path;
use geoanchor::SessionError;

use super::common::{derive_output, MosaicOptions};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the mosaic command.
pub struct MosaicArgs {
    pub kml: PathBuf,
    pub output: Option<PathBuf>,
    pub options: MosaicOptions,
    pub verbose: bool,
}

/// Run the mosaic command.
pub fn run(args: MosaicArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.verbose)?;
    runner.log_startup("mosaic");
    let config = runner.config();

    let settings = args.options.resolve(config)?;
    let output = args
        .output
        .unwrap_or_else(|| derive_output(&args.kml, "_mosaic", "png"));

    let polygon = extract_area_from_path(&args.kml).map_err(SessionError::from)?;
    let center = polygon.centroid().map_err(SessionError::from)?;
    println!(
        "Area: {} vertices, center {:.6}, {:.6}",
        polygon.len(),
        center.lon,
        center.lat
    );

    println!(
        "Fetching {} imagery at zoom {} ({} × {} m)...",
        settings.provider, settings.zoom, settings.width_m, settings.height_m
    );
    let mosaic = settings
        .builder(config)?
        .build(center, settings.width_m, settings.height_m, settings.zoom)
        .map_err(SessionError::from)?;

    let sidecar = mosaic.save(&output)?;

    println!(
        "Mosaic: {} × {} px, {} of {} tiles fetched",
        mosaic.width(),
        mosaic.height(),
        mosaic.stats.successful,
        mosaic.stats.total
    );
    if mosaic.stats.failed > 0 {
        println!(
            "Warning: {} tile(s) failed and were left black",
            mosaic.stats.failed
        );
    }
    println!(
        "Bounds: W {:.6}  S {:.6}  E {:.6}  N {:.6}",
        mosaic.bounds.west, mosaic.bounds.south, mosaic.bounds.east, mosaic.bounds.north
    );
    println!("Saved {} (metadata: {})", output.display(), sidecar.display());

    Ok(())
}
