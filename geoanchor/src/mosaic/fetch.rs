//! Bounded-concurrency tile fetching.
//!
//! Tiles are fetched on a dedicated rayon pool. Results are collected in
//! grid order so the stitched mosaic does not depend on completion order.

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::coord::{TileCoord, TILE_SIZE};
use crate::provider::Provider;
use crate::raster::Raster;

use super::FetchStats;

/// Outcome of fetching one tile.
#[derive(Debug)]
pub(super) enum TileOutcome {
    Fetched(Raster<u8>),
    Failed,
    Skipped,
}

/// Fetches `tiles`, returning one outcome per tile in input order.
pub(super) fn fetch_tiles(
    provider: &Arc<dyn Provider>,
    tiles: &[TileCoord],
    concurrency: usize,
    cancellation: Option<&CancellationToken>,
) -> (Vec<TileOutcome>, FetchStats) {
    let start = Instant::now();
    let fetch = |tile: &TileCoord| fetch_one(provider.as_ref(), tile, cancellation);

    let outcomes: Vec<TileOutcome> = match rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency.max(1))
        .thread_name(|i| format!("geoanchor-fetch-{}", i))
        .build()
    {
        Ok(pool) => pool.install(|| tiles.par_iter().map(fetch).collect()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to build fetch pool, fetching sequentially");
            tiles.iter().map(fetch).collect()
        }
    };

    let mut stats = FetchStats {
        total: tiles.len(),
        elapsed_secs: start.elapsed().as_secs_f64(),
        ..FetchStats::default()
    };
    for outcome in &outcomes {
        match outcome {
            TileOutcome::Fetched(_) => stats.successful += 1,
            TileOutcome::Failed => stats.failed += 1,
            TileOutcome::Skipped => stats.skipped += 1,
        }
    }

    (outcomes, stats)
}

fn fetch_one(
    provider: &dyn Provider,
    tile: &TileCoord,
    cancellation: Option<&CancellationToken>,
) -> TileOutcome {
    if cancellation.is_some_and(|token| token.is_cancelled()) {
        return TileOutcome::Skipped;
    }

    let bytes = match provider.download_tile(tile.row, tile.col, tile.zoom) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                x = tile.col,
                y = tile.row,
                zoom = tile.zoom,
                error = %e,
                "Tile download failed, using black tile"
            );
            return TileOutcome::Failed;
        }
    };

    match decode_tile(&bytes) {
        Ok(raster) => TileOutcome::Fetched(raster),
        Err(reason) => {
            tracing::warn!(
                x = tile.col,
                y = tile.row,
                zoom = tile.zoom,
                reason = %reason,
                "Tile could not be used, using black tile"
            );
            TileOutcome::Failed
        }
    }
}

/// Decodes a tile body into a 256×256 RGB raster.
pub(super) fn decode_tile(bytes: &[u8]) -> Result<Raster<u8>, String> {
    let image = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    if image.width() != TILE_SIZE || image.height() != TILE_SIZE {
        return Err(format!(
            "unexpected tile size {}×{}",
            image.width(),
            image.height()
        ));
    }
    Ok(Raster::from_rgb_image(image.to_rgb8()))
}
