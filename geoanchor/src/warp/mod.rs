//! Perspective resampling
//!
//! Warps a source raster into the mosaic's pixel grid. Each output pixel
//! is mapped back through the inverse transform and sampled bilinearly.
//!
//! Pixel `(x, y)` has its center at coordinate `(x, y)`, the same
//! convention used for correspondence points. A source pixel covers
//! `[x - 0.5, x + 0.5)`; output pixels whose preimage falls outside the
//! covered area are zero.

use rayon::prelude::*;

use crate::raster::{DynRaster, Raster, Sample};
use crate::solver::{GeometryError, Homography};

/// Rows handed to each rayon task.
const ROWS_PER_CHUNK: usize = 8;

/// Warps `source` through `transform` into a `width × height` raster.
///
/// The output has the same channel count and sample type as the source.
///
/// # Errors
///
/// Returns `GeometryError::Degenerate` if `transform` is not invertible.
pub fn resample<T: Sample>(
    source: &Raster<T>,
    transform: &Homography,
    width: u32,
    height: u32,
) -> Result<Raster<T>, GeometryError> {
    let inverse = transform.inverse().ok_or(GeometryError::Degenerate)?;

    let channels = source.channels();
    let mut output = Raster::new(width, height, channels);
    let row_stride = output.row_stride();
    if row_stride == 0 || height == 0 || source.width() == 0 || source.height() == 0 {
        return Ok(output);
    }

    output
        .as_mut_slice()
        .par_chunks_mut(row_stride * ROWS_PER_CHUNK)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            let start_y = chunk_idx * ROWS_PER_CHUNK;
            for (row_in_chunk, row) in chunk.chunks_exact_mut(row_stride).enumerate() {
                let y = (start_y + row_in_chunk) as f64;
                for (x, pixel) in row.chunks_exact_mut(channels).enumerate() {
                    let (sx, sy) = inverse.project(x as f64, y);
                    sample_bilinear(source, sx, sy, pixel);
                }
            }
        });

    tracing::debug!(
        source_width = source.width(),
        source_height = source.height(),
        width,
        height,
        channels,
        "Resampled raster"
    );

    Ok(output)
}

/// [`resample`] for either sample type.
pub fn resample_dyn(
    source: &DynRaster,
    transform: &Homography,
    width: u32,
    height: u32,
) -> Result<DynRaster, GeometryError> {
    Ok(match source {
        DynRaster::U8(r) => DynRaster::U8(resample(r, transform, width, height)?),
        DynRaster::U16(r) => DynRaster::U16(resample(r, transform, width, height)?),
    })
}

/// Writes the bilinear sample at (`x`, `y`) into `out`; leaves it untouched
/// outside the source.
#[inline]
fn sample_bilinear<T: Sample>(source: &Raster<T>, x: f64, y: f64, out: &mut [T]) {
    let max_x = source.width() as f64 - 1.0;
    let max_y = source.height() as f64 - 1.0;

    // Also rejects NaN
    if !(x >= -0.5 && x < max_x + 0.5 && y >= -0.5 && y < max_y + 0.5) {
        return;
    }

    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);
    let x0 = x.floor();
    let y0 = y.floor();
    let dx = x - x0;
    let dy = y - y0;

    let x0 = x0 as u32;
    let y0 = y0 as u32;
    let x1 = (x0 + 1).min(source.width() - 1);
    let y1 = (y0 + 1).min(source.height() - 1);

    let (Some(p00), Some(p10), Some(p01), Some(p11)) = (
        source.pixel(x0, y0),
        source.pixel(x1, y0),
        source.pixel(x0, y1),
        source.pixel(x1, y1),
    ) else {
        return;
    };

    for (c, slot) in out.iter_mut().enumerate() {
        let value = p00[c].to_f64() * (1.0 - dx) * (1.0 - dy)
            + p10[c].to_f64() * dx * (1.0 - dy)
            + p01[c].to_f64() * (1.0 - dx) * dy
            + p11[c].to_f64() * dx * dy;
        *slot = T::from_f64(value);
    }
}
