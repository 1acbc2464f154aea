//! GeoTIFF encoding.

use std::fs;
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use tiff::encoder::colortype::{self, ColorType};
use tiff::encoder::{Compression, DeflateLevel, DirectoryEncoder, TiffEncoder, TiffKind, TiffValue};
use tiff::tags::Tag;

use crate::coord::GeoBounds;
use crate::raster::{DynRaster, Raster, Sample};

use super::{GeoTiffCompression, GeoTransform, WriteError, EPSG_WGS84};

// GeoTIFF tag IDs
const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
const MODEL_TIEPOINT_TAG: u16 = 33922;
const GEO_KEY_DIRECTORY_TAG: u16 = 34735;

// GeoKey IDs
const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;

const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Sample types with matching TIFF colour types.
trait TiffSample: Sample {
    type Gray: ColorType<Inner = Self>;
    type Rgb: ColorType<Inner = Self>;
    type Rgba: ColorType<Inner = Self>;
}

impl TiffSample for u8 {
    type Gray = colortype::Gray8;
    type Rgb = colortype::RGB8;
    type Rgba = colortype::RGBA8;
}

impl TiffSample for u16 {
    type Gray = colortype::Gray16;
    type Rgb = colortype::RGB16;
    type Rgba = colortype::RGBA16;
}

/// Writes a georeferenced raster.
///
/// Band count and sample type follow the raster: one band per channel in
/// channel order.
pub struct GeoTiffWriter<'a> {
    raster: &'a DynRaster,
    bounds: GeoBounds,
    compression: GeoTiffCompression,
}

impl<'a> GeoTiffWriter<'a> {
    pub fn new(raster: &'a DynRaster, bounds: GeoBounds) -> Self {
        Self {
            raster,
            bounds,
            compression: GeoTiffCompression::default(),
        }
    }

    pub fn with_compression(mut self, compression: GeoTiffCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Transform the file will carry.
    pub fn transform(&self) -> Result<GeoTransform, WriteError> {
        GeoTransform::from_bounds(&self.bounds, self.raster.width(), self.raster.height()).ok_or(
            WriteError::EmptyRaster {
                width: self.raster.width(),
                height: self.raster.height(),
            },
        )
    }

    /// Writes to `path`, replacing any existing file.
    pub fn write(&self, path: &Path) -> Result<(), WriteError> {
        let bytes = self.to_bytes()?;
        fs::write(path, &bytes).map_err(|source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(
            path = %path.display(),
            width = self.raster.width(),
            height = self.raster.height(),
            bands = self.raster.channels(),
            bits = self.raster.bit_depth(),
            compression = %self.compression,
            bytes = bytes.len(),
            "Wrote GeoTIFF"
        );
        Ok(())
    }

    /// Encodes the GeoTIFF in memory.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WriteError> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Encodes into any seekable writer.
    ///
    /// # Errors
    ///
    /// Besides encoder failures, rasters with other than 1, 3 or 4 bands are
    /// only written uncompressed; requesting LZW or Deflate for them fails
    /// with `WriteError::Encode`.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<(), WriteError> {
        let transform = self.transform()?;
        let bands = self.raster.channels();
        if !matches!(bands, 1 | 3 | 4) && self.compression != GeoTiffCompression::None {
            return Err(WriteError::Encode(format!(
                "{} compression is not supported for {}-band rasters",
                self.compression, bands
            )));
        }
        let compression = match self.compression {
            GeoTiffCompression::None => Compression::Uncompressed,
            GeoTiffCompression::Lzw => Compression::Lzw,
            GeoTiffCompression::Deflate => Compression::Deflate(DeflateLevel::Balanced),
        };
        let encoder = TiffEncoder::new(writer)?.with_compression(compression);

        match self.raster {
            DynRaster::U8(r) => write_image(encoder, r, &transform),
            DynRaster::U16(r) => write_image(encoder, r, &transform),
        }
    }
}

/// Writes `raster` to `path` as an uncompressed EPSG:4326 GeoTIFF whose
/// pixel (0, 0) sits at (west, north) and pixel (width, height) at
/// (east, south).
pub fn write_georeferenced(
    raster: &DynRaster,
    bounds: &GeoBounds,
    path: &Path,
) -> Result<(), WriteError> {
    GeoTiffWriter::new(raster, *bounds).write(path)
}

fn write_image<W, T>(
    mut encoder: TiffEncoder<W>,
    raster: &Raster<T>,
    transform: &GeoTransform,
) -> Result<(), WriteError>
where
    W: Write + Seek,
    T: TiffSample,
    [T]: TiffValue,
{
    let (width, height) = (raster.width(), raster.height());

    // Colour types cover 1, 3 and 4 bands; anything else goes through the
    // directory encoder directly.
    match raster.channels() {
        1 => {
            let mut image = encoder.new_image::<T::Gray>(width, height)?;
            write_geo_tags(image.encoder(), transform)?;
            image.write_data(raster.as_slice())?;
        }
        3 => {
            let mut image = encoder.new_image::<T::Rgb>(width, height)?;
            write_geo_tags(image.encoder(), transform)?;
            image.write_data(raster.as_slice())?;
        }
        4 => {
            let mut image = encoder.new_image::<T::Rgba>(width, height)?;
            write_geo_tags(image.encoder(), transform)?;
            image.write_data(raster.as_slice())?;
        }
        _ => write_multiband(&mut encoder, raster, transform)?,
    }
    Ok(())
}

/// Single uncompressed strip with `channels` interleaved bands.
fn write_multiband<W, T>(
    encoder: &mut TiffEncoder<W>,
    raster: &Raster<T>,
    transform: &GeoTransform,
) -> Result<(), WriteError>
where
    W: Write + Seek,
    T: TiffSample,
    [T]: TiffValue,
{
    let bands = raster.channels();
    let mut dir = encoder.image_directory()?;

    dir.write_tag(Tag::ImageWidth, raster.width())?;
    dir.write_tag(Tag::ImageLength, raster.height())?;
    dir.write_tag(Tag::BitsPerSample, vec![T::BIT_DEPTH; bands].as_slice())?;
    dir.write_tag(Tag::Compression, 1u16)?;
    // BlackIsZero
    dir.write_tag(Tag::PhotometricInterpretation, 1u16)?;
    dir.write_tag(Tag::SamplesPerPixel, bands as u16)?;
    // Unsigned integer
    dir.write_tag(Tag::SampleFormat, vec![1u16; bands].as_slice())?;
    // Chunky
    dir.write_tag(Tag::PlanarConfiguration, 1u16)?;
    dir.write_tag(Tag::RowsPerStrip, raster.height())?;
    if bands > 1 {
        dir.write_tag(Tag::ExtraSamples, vec![0u16; bands - 1].as_slice())?;
    }

    write_geo_tags(&mut dir, transform)?;

    let byte_count = std::mem::size_of_val(raster.as_slice());
    let offset = dir.write_data(raster.as_slice())?;
    let offset = u32::try_from(offset)
        .map_err(|_| WriteError::Encode("strip offset exceeds 4 GiB".to_string()))?;
    let byte_count = u32::try_from(byte_count)
        .map_err(|_| WriteError::Encode("strip exceeds 4 GiB".to_string()))?;
    dir.write_tag(Tag::StripOffsets, offset)?;
    dir.write_tag(Tag::StripByteCounts, byte_count)?;

    dir.finish()?;
    Ok(())
}

fn write_geo_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<W, K>,
    transform: &GeoTransform,
) -> Result<(), WriteError> {
    dir.write_tag(
        Tag::Unknown(MODEL_PIXEL_SCALE_TAG),
        transform.pixel_scale().as_slice(),
    )?;
    dir.write_tag(
        Tag::Unknown(MODEL_TIEPOINT_TAG),
        transform.tiepoint().as_slice(),
    )?;
    dir.write_tag(
        Tag::Unknown(GEO_KEY_DIRECTORY_TAG),
        geo_key_directory().as_slice(),
    )?;
    Ok(())
}

/// `[version, revision, minor, count, (key, location, count, value)...]`
fn geo_key_directory() -> [u16; 16] {
    [
        1,
        1,
        0,
        3,
        GT_MODEL_TYPE_GEO_KEY,
        0,
        1,
        MODEL_TYPE_GEOGRAPHIC,
        GT_RASTER_TYPE_GEO_KEY,
        0,
        1,
        RASTER_PIXEL_IS_AREA,
        GEOGRAPHIC_TYPE_GEO_KEY,
        0,
        1,
        EPSG_WGS84,
    ]
}
