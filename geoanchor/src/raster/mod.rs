//! In-memory rasters.
//!
//! A [`Raster`] stores interleaved samples row-major (`y`, `x`, channel).
//! Source images are normalised to three channels on load: single-band
//! images are broadcast and alpha is dropped.

mod load;

pub use load::{load_source_image, normalize_channels, RasterError};

use image::RgbImage;

/// A pixel sample type that can be interpolated.
pub trait Sample: Copy + Default + PartialEq + Send + Sync + std::fmt::Debug + 'static {
    /// Bits per sample.
    const BIT_DEPTH: u16;

    fn to_f64(self) -> f64;

    /// Rounds and saturates an interpolated value back into range.
    fn from_f64(value: f64) -> Self;
}

impl Sample for u8 {
    const BIT_DEPTH: u16 = 8;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value.round().clamp(0.0, u8::MAX as f64) as u8
    }
}

impl Sample for u16 {
    const BIT_DEPTH: u16 = 16;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value.round().clamp(0.0, u16::MAX as f64) as u16
    }
}

/// A raster of `width × height` pixels with `channels` interleaved samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T = u8> {
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<T>,
}

impl<T: Sample> Raster<T> {
    /// Creates a zero-filled raster.
    pub fn new(width: u32, height: u32, channels: usize) -> Self {
        let len = width as usize * height as usize * channels;
        Self {
            width,
            height,
            channels,
            data: vec![T::default(); len],
        }
    }

    /// Wraps existing interleaved samples.
    ///
    /// Returns `None` if `data` does not hold exactly
    /// `width × height × channels` samples or `channels` is zero.
    pub fn from_vec(width: u32, height: u32, channels: usize, data: Vec<T>) -> Option<Self> {
        if channels == 0 || data.len() != width as usize * height as usize * channels {
            return None;
        }
        Some(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Interleaved samples, row-major.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Samples of one row.
    pub fn row(&self, y: u32) -> &[T] {
        let stride = self.row_stride();
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    /// Samples per row.
    pub fn row_stride(&self) -> usize {
        self.width as usize * self.channels
    }

    /// Samples of the pixel at (`x`, `y`), or `None` outside the raster.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[T]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y as usize * self.width as usize + x as usize) * self.channels;
        Some(&self.data[start..start + self.channels])
    }

    /// Copies `src` into this raster with its top-left corner at (`x0`, `y0`).
    ///
    /// Parts of `src` falling outside this raster are clipped. Channel
    /// counts must match.
    pub fn blit(&mut self, src: &Raster<T>, x0: u32, y0: u32) {
        debug_assert_eq!(self.channels, src.channels);
        if x0 >= self.width || y0 >= self.height {
            return;
        }
        let copy_w = src.width.min(self.width - x0) as usize * self.channels;
        let copy_h = src.height.min(self.height - y0);
        let dst_stride = self.row_stride();
        for row in 0..copy_h {
            let dst_start = (y0 + row) as usize * dst_stride + x0 as usize * self.channels;
            let src_row = src.row(row);
            self.data[dst_start..dst_start + copy_w].copy_from_slice(&src_row[..copy_w]);
        }
    }
}

impl Raster<u8> {
    /// Converts an RGB image buffer into a three-channel raster.
    pub fn from_rgb_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            channels: 3,
            data: image.into_raw(),
        }
    }

    /// Converts a three-channel raster into an RGB image buffer.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        if self.channels != 3 {
            return None;
        }
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }
}

/// A raster of either supported sample type.
#[derive(Debug, Clone, PartialEq)]
pub enum DynRaster {
    U8(Raster<u8>),
    U16(Raster<u16>),
}

impl DynRaster {
    pub fn width(&self) -> u32 {
        match self {
            DynRaster::U8(r) => r.width(),
            DynRaster::U16(r) => r.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            DynRaster::U8(r) => r.height(),
            DynRaster::U16(r) => r.height(),
        }
    }

    pub fn channels(&self) -> usize {
        match self {
            DynRaster::U8(r) => r.channels(),
            DynRaster::U16(r) => r.channels(),
        }
    }

    /// Bits per sample.
    pub fn bit_depth(&self) -> u16 {
        match self {
            DynRaster::U8(_) => <u8 as Sample>::BIT_DEPTH,
            DynRaster::U16(_) => <u16 as Sample>::BIT_DEPTH,
        }
    }
}

impl From<Raster<u8>> for DynRaster {
    fn from(raster: Raster<u8>) -> Self {
        DynRaster::U8(raster)
    }
}

impl From<Raster<u16>> for DynRaster {
    fn from(raster: Raster<u16>) -> Self {
        DynRaster::U16(raster)
    }
}
