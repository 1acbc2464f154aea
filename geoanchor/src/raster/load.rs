//! Source image loading.
//!
//! JPEG/PNG and friends are decoded with `image`; TIFF goes through the
//! `tiff` decoder so multi-band files (more than four samples per pixel)
//! load as well. Any CRS embedded in a TIFF is ignored.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use image::DynamicImage;
use thiserror::Error;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::ColorType;

use super::{DynRaster, Raster, Sample};

const TIFF_MAGIC_LE: [u8; 4] = [b'I', b'I', 42, 0];
const TIFF_MAGIC_BE: [u8; 4] = [b'M', b'M', 0, 42];

/// Errors raised while loading a source image.
#[derive(Debug, Error)]
pub enum RasterError {
    /// The file could not be opened or read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file content could not be decoded.
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// Decoded fine, but the pixel layout is not supported.
    #[error("Unsupported pixel format in {path}: {reason}")]
    UnsupportedFormat { path: PathBuf, reason: String },

    /// The image has no pixels.
    #[error("Image {0} is empty")]
    Empty(PathBuf),
}

/// Loads a source image and normalises it to three channels.
///
/// 8-bit and 16-bit samples are preserved; anything else is converted to
/// 8-bit RGB.
pub fn load_source_image(path: &Path) -> Result<DynRaster, RasterError> {
    let raster = if is_tiff(path)? {
        load_tiff(path)?
    } else {
        load_with_image(path)?
    };

    if raster.width() == 0 || raster.height() == 0 {
        return Err(RasterError::Empty(path.to_path_buf()));
    }

    tracing::debug!(
        path = %path.display(),
        width = raster.width(),
        height = raster.height(),
        channels = raster.channels(),
        bits = raster.bit_depth(),
        "Loaded source image"
    );

    Ok(match raster {
        DynRaster::U8(r) => DynRaster::U8(normalize_channels(r)),
        DynRaster::U16(r) => DynRaster::U16(normalize_channels(r)),
    })
}

/// Normalises a raster to exactly three channels.
///
/// - 1 channel: broadcast to three
/// - 2 channels (gray + alpha): gray broadcast, alpha dropped
/// - 3 channels: unchanged
/// - 4+ channels: first three kept
pub fn normalize_channels<T: Sample>(raster: Raster<T>) -> Raster<T> {
    let channels = raster.channels();
    if channels == 3 {
        return raster;
    }

    let (width, height) = (raster.width(), raster.height());
    let mut out = Vec::with_capacity(width as usize * height as usize * 3);
    for pixel in raster.as_slice().chunks_exact(channels) {
        if channels < 3 {
            out.extend_from_slice(&[pixel[0]; 3]);
        } else {
            out.extend_from_slice(&pixel[..3]);
        }
    }

    // Length is width × height × 3 by construction
    Raster::from_vec(width, height, 3, out).unwrap_or_else(|| Raster::new(width, height, 3))
}

fn is_tiff(path: &Path) -> Result<bool, RasterError> {
    let mut file = File::open(path).map_err(|source| RasterError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == TIFF_MAGIC_LE || magic == TIFF_MAGIC_BE),
        // Too short to be a TIFF; let the generic decoder report it
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(source) => Err(RasterError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn load_tiff(path: &Path) -> Result<DynRaster, RasterError> {
    let decode_err = |e: tiff::TiffError| RasterError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let file = File::open(path).map_err(|source| RasterError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut decoder = Decoder::new(BufReader::new(file)).map_err(decode_err)?;
    let (width, height) = decoder.dimensions().map_err(decode_err)?;
    let colortype = decoder.colortype().map_err(decode_err)?;
    let channels = samples_per_pixel(colortype).ok_or_else(|| RasterError::UnsupportedFormat {
        path: path.to_path_buf(),
        reason: format!("{:?}", colortype),
    })?;

    let unsupported = |reason: String| RasterError::UnsupportedFormat {
        path: path.to_path_buf(),
        reason,
    };

    let raster = match decoder.read_image().map_err(decode_err)? {
        DecodingResult::U8(data) => Raster::from_vec(width, height, channels, data)
            .map(DynRaster::U8)
            .ok_or_else(|| unsupported(format!("unexpected sample count for {:?}", colortype))),
        DecodingResult::U16(data) => Raster::from_vec(width, height, channels, data)
            .map(DynRaster::U16)
            .ok_or_else(|| unsupported(format!("unexpected sample count for {:?}", colortype))),
        _ => Err(unsupported(format!(
            "only 8-bit and 16-bit unsigned samples are supported, found {:?}",
            colortype
        ))),
    }?;

    if !matches!(colortype, ColorType::CMYK(_)) {
        return Ok(raster);
    }
    Ok(match raster {
        DynRaster::U8(r) => DynRaster::U8(cmyk_to_rgb(r)),
        DynRaster::U16(r) => DynRaster::U16(cmyk_to_rgb(r)),
    })
}

/// Converts ink coverage to RGB: `R = (1 - C)(1 - K)` and likewise for G, B.
fn cmyk_to_rgb<T: Sample>(raster: Raster<T>) -> Raster<T> {
    let (width, height) = (raster.width(), raster.height());
    let full = ((1u32 << T::BIT_DEPTH) - 1) as f64;

    let mut out = Vec::with_capacity(width as usize * height as usize * 3);
    for pixel in raster.as_slice().chunks_exact(4) {
        let key = 1.0 - pixel[3].to_f64() / full;
        for &ink in &pixel[..3] {
            out.push(T::from_f64(full * (1.0 - ink.to_f64() / full) * key));
        }
    }

    Raster::from_vec(width, height, 3, out).unwrap_or_else(|| Raster::new(width, height, 3))
}

fn samples_per_pixel(colortype: ColorType) -> Option<usize> {
    match colortype {
        ColorType::Gray(_) => Some(1),
        ColorType::GrayA(_) => Some(2),
        ColorType::RGB(_) | ColorType::YCbCr(_) => Some(3),
        ColorType::RGBA(_) | ColorType::CMYK(_) => Some(4),
        ColorType::Multiband { num_samples, .. } if num_samples > 0 => Some(num_samples as usize),
        _ => None,
    }
}

fn load_with_image(path: &Path) -> Result<DynRaster, RasterError> {
    let image = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(source) => RasterError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => RasterError::Decode {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    })?;

    Ok(dynamic_to_raster(image))
}

fn dynamic_to_raster(image: DynamicImage) -> DynRaster {
    let (width, height) = (image.width(), image.height());
    let wrap8 = |channels: usize, data: Vec<u8>| {
        Raster::from_vec(width, height, channels, data)
            .unwrap_or_else(|| Raster::new(width, height, channels))
    };
    let wrap16 = |channels: usize, data: Vec<u16>| {
        Raster::from_vec(width, height, channels, data)
            .unwrap_or_else(|| Raster::new(width, height, channels))
    };

    match image {
        DynamicImage::ImageLuma8(buf) => DynRaster::U8(wrap8(1, buf.into_raw())),
        DynamicImage::ImageLumaA8(buf) => DynRaster::U8(wrap8(2, buf.into_raw())),
        DynamicImage::ImageRgb8(buf) => DynRaster::U8(wrap8(3, buf.into_raw())),
        DynamicImage::ImageRgba8(buf) => DynRaster::U8(wrap8(4, buf.into_raw())),
        DynamicImage::ImageLuma16(buf) => DynRaster::U16(wrap16(1, buf.into_raw())),
        DynamicImage::ImageLumaA16(buf) => DynRaster::U16(wrap16(2, buf.into_raw())),
        DynamicImage::ImageRgb16(buf) => DynRaster::U16(wrap16(3, buf.into_raw())),
        DynamicImage::ImageRgba16(buf) => DynRaster::U16(wrap16(4, buf.into_raw())),
        other => DynRaster::U8(Raster::from_rgb_image(other.to_rgb8())),
    }
}
