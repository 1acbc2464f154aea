//! GeoAnchor CLI - Command-line interface
//!
//! Builds satellite mosaics for an area, solves transforms from picked
//! point pairs and writes georeferenced GeoTIFFs.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;
use std::process;

use clap::{ArgGroup, Parser, Subcommand};

use commands::common::{Compression, MosaicOptions, SolveOptions};
use commands::config::ConfigCommands;
use commands::georef::{GeorefArgs, MosaicSource};
use commands::mosaic::MosaicArgs;
use commands::solve::SolveArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "geoanchor")]
#[command(version, about = "Georeference images against satellite imagery", long_about = None)]
struct Cli {
    /// Log at debug level (overrides logging.level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build the satellite mosaic for a KML/KMZ area and save it as PNG
    Mosaic {
        /// KML or KMZ file describing the area of interest
        kml: PathBuf,

        /// Output PNG (a .json bounds file is written next to it)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: MosaicOptions,
    },

    /// Georeference an image using point pairs picked against the mosaic
    #[command(group(ArgGroup::new("area").required(true).args(["kml", "mosaic"])))]
    Georef {
        /// Image to georeference (JPEG, PNG or TIFF)
        image: PathBuf,

        /// Build the mosaic from this KML or KMZ file
        #[arg(long)]
        kml: Option<PathBuf>,

        /// Reuse a mosaic PNG saved by `geoanchor mosaic`
        #[arg(long)]
        mosaic: Option<PathBuf>,

        /// Point pairs file with src_x,src_y,dst_x,dst_y lines
        #[arg(short, long)]
        points: PathBuf,

        /// Output GeoTIFF
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// GeoTIFF compression [config: output.compression]
        #[arg(long, value_enum)]
        compression: Option<Compression>,

        #[command(flatten)]
        options: MosaicOptions,

        #[command(flatten)]
        solve: SolveOptions,
    },

    /// Solve the transform for a points file and print the fit
    Solve {
        /// Point pairs file with src_x,src_y,dst_x,dst_y lines
        #[arg(short, long)]
        points: PathBuf,

        #[command(flatten)]
        solve: SolveOptions,
    },

    /// View or change settings in ~/.geoanchor/config.ini
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let verbose = cli.verbose;
    match cli.command {
        Commands::Mosaic {
            kml,
            output,
            options,
        } => commands::mosaic::run(MosaicArgs {
            kml,
            output,
            options,
            verbose,
        }),
        Commands::Georef {
            image,
            kml,
            mosaic,
            points,
            output,
            compression,
            options,
            solve,
        } => {
            let mosaic = match (kml, mosaic) {
                (Some(kml), _) => MosaicSource::Area(kml),
                (None, Some(png)) => MosaicSource::Saved(png),
                (None, None) => {
                    return Err(CliError::Config(
                        "either --kml or --mosaic is required".to_string(),
                    ))
                }
            };
            commands::georef::run(GeorefArgs {
                image,
                mosaic,
                points,
                output,
                compression,
                options,
                solve,
                verbose,
            })
        }
        Commands::Solve { points, solve } => commands::solve::run(SolveArgs { points, solve }),
        Commands::Config { command } => commands::config::run(command),
    }
}
