//! Frame types: the borrowed grayscale input and the owned RGBA output.

use image::{GrayImage, RgbaImage};
use ndarray::{ArrayView1, ArrayView2, ShapeBuilder};

use crate::error::{FrameError, Result};

/// Bytes per output pixel (R, G, B, A).
pub const RGBA_CHANNELS: usize = 4;

/// Validated frame dimensions and row stride, all in bytes/pixels of an
/// 8-bit single-channel image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    width: usize,
    height: usize,
    row_stride: usize,
}

impl FrameGeometry {
    pub fn new(width: usize, height: usize, row_stride: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(FrameError::invalid(format!(
                "frame dimensions must be positive, got {width}x{height}"
            )));
        }
        if row_stride < width {
            return Err(FrameError::invalid(format!(
                "row stride {row_stride} is smaller than width {width}"
            )));
        }
        if u32::try_from(width).is_err() || u32::try_from(height).is_err() {
            return Err(FrameError::invalid(format!(
                "frame dimensions {width}x{height} exceed u32"
            )));
        }
        if row_stride.checked_mul(height).is_none() {
            return Err(FrameError::invalid(format!(
                "input size {row_stride}x{height} overflows"
            )));
        }
        if width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(RGBA_CHANNELS))
            .is_none()
        {
            return Err(FrameError::invalid(format!(
                "output size for {width}x{height} overflows"
            )));
        }

        Ok(Self {
            width,
            height,
            row_stride,
        })
    }

    /// Build from the signed 32-bit values a managed host passes in.
    pub fn from_raw(width: i32, height: i32, row_stride: i32) -> Result<Self> {
        let to_usize = |name: &str, value: i32| {
            usize::try_from(value)
                .map_err(|_| FrameError::invalid(format!("{name} must not be negative, got {value}")))
        };
        Self::new(
            to_usize("width", width)?,
            to_usize("height", height)?,
            to_usize("row stride", row_stride)?,
        )
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Minimum length of the input region: `row_stride * height`.
    #[inline]
    pub fn required_input_len(&self) -> usize {
        self.row_stride * self.height
    }

    /// Exact length of the RGBA output: `width * height * 4`.
    #[inline]
    pub fn output_len(&self) -> usize {
        self.pixel_count() * RGBA_CHANNELS
    }

    /// Bytes actually addressed by the view: the last row carries no padding.
    #[inline]
    fn addressed_len(&self) -> usize {
        self.row_stride * (self.height - 1) + self.width
    }
}

/// A borrowed 8-bit grayscale frame.
///
/// Wraps caller-owned memory without copying. Padding bytes between the end
/// of a row and the next row start are never read.
#[derive(Debug, Clone, Copy)]
pub struct GrayFrame<'a> {
    view: ArrayView2<'a, u8>,
    geometry: FrameGeometry,
}

impl<'a> GrayFrame<'a> {
    pub fn new(data: &'a [u8], geometry: FrameGeometry) -> Result<Self> {
        let required = geometry.required_input_len();
        if data.len() < required {
            return Err(FrameError::invalid(format!(
                "input region holds {} bytes, {}x{} at stride {} needs {}",
                data.len(),
                geometry.width,
                geometry.height,
                geometry.row_stride,
                required
            )));
        }

        let shape = (geometry.height, geometry.width).strides((geometry.row_stride, 1));
        let view = ArrayView2::from_shape(shape, &data[..geometry.addressed_len()])
            .map_err(|e| FrameError::invalid(format!("cannot view input region: {e}")))?;

        Ok(Self { view, geometry })
    }

    /// Validate raw host arguments and wrap `data`, in the argument order of
    /// the boundary call.
    pub fn from_raw(width: i32, height: i32, data: &'a [u8], row_stride: i32) -> Result<Self> {
        Self::new(data, FrameGeometry::from_raw(width, height, row_stride)?)
    }

    #[inline]
    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.geometry.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.geometry.height
    }

    #[inline]
    pub fn row_stride(&self) -> usize {
        self.geometry.row_stride
    }

    /// The strided 2D view, indexed `[row, column]`.
    pub fn view(&self) -> ArrayView2<'a, u8> {
        self.view
    }

    /// Logical rows, padding excluded.
    pub fn rows(&self) -> impl Iterator<Item = ArrayView1<'_, u8>> + '_ {
        self.view.outer_iter()
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        self.view.get((y, x)).copied()
    }

    /// Copy the logical pixels into a tightly packed `GrayImage`.
    pub fn to_gray_image(&self) -> Result<GrayImage> {
        let mut packed = try_alloc(self.geometry.pixel_count())?;
        for row in self.rows() {
            match row.as_slice() {
                Some(slice) => packed.extend_from_slice(slice),
                None => packed.extend(row.iter().copied()),
            }
        }
        GrayImage::from_raw(self.width() as u32, self.height() as u32, packed)
            .ok_or_else(|| FrameError::invalid("packed frame does not match its dimensions"))
    }
}

/// Owned, tightly packed RGBA output frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaFrame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl RgbaFrame {
    /// Expand a single-channel map into RGBA by writing each intensity into all
    /// four channels. The output buffer is reserved fallibly and sized exactly.
    pub fn from_gray_replicated(gray: &GrayImage) -> Result<Self> {
        let width = gray.width() as usize;
        let height = gray.height() as usize;
        let len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(RGBA_CHANNELS))
            .ok_or_else(|| FrameError::invalid(format!("output size for {width}x{height} overflows")))?;

        let mut data = try_alloc(len)?;
        for pixel in gray.pixels() {
            data.extend_from_slice(&[pixel[0]; RGBA_CHANNELS]);
        }

        Ok(Self { width, height, data })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Hand the buffer over to the caller.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// RGBA value at (x, y).
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * RGBA_CHANNELS;
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    /// Copy into an `image` buffer, e.g. for encoding.
    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width as u32, self.height as u32, self.data.clone())
    }
}

/// Reserve exactly `bytes` without aborting on failure.
pub(crate) fn try_alloc(bytes: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(bytes)
        .map_err(|_| FrameError::AllocationFailure { bytes })?;
    Ok(buf)
}

/// Owned grayscale frame with optional row padding, used for synthetic input.
#[derive(Debug, Clone)]
pub struct GrayFrameBuf {
    pub data: Vec<u8>,
    pub geometry: FrameGeometry,
}

/// Byte written into row padding of synthetic frames.
pub const PADDING_BYTE: u8 = 0xA5;

impl GrayFrameBuf {
    /// Create a frame with specific data and geometry
    pub fn new_with_data(geometry: FrameGeometry, data: Vec<u8>) -> Result<Self> {
        if data.len() < geometry.required_input_len() {
            return Err(FrameError::invalid(format!(
                "buffer holds {} bytes, geometry needs {}",
                data.len(),
                geometry.required_input_len()
            )));
        }
        Ok(Self { data, geometry })
    }

    /// Create a test pattern frame; padding bytes are filled with [`PADDING_BYTE`].
    pub fn test_pattern(geometry: FrameGeometry, pattern: TestPattern) -> Self {
        let width = geometry.width();
        let stride = geometry.row_stride();
        let data = (0..geometry.required_input_len())
            .map(|i| {
                let x = i % stride;
                let y = i / stride;
                if x >= width {
                    PADDING_BYTE
                } else {
                    pattern.sample(x, y)
                }
            })
            .collect();

        Self { data, geometry }
    }

    /// Same pixels, re-laid out with a different row stride.
    pub fn with_stride(&self, row_stride: usize) -> Result<Self> {
        let geometry = FrameGeometry::new(self.geometry.width(), self.geometry.height(), row_stride)?;
        let mut data = vec![PADDING_BYTE; geometry.required_input_len()];
        let width = geometry.width();
        let source = self.view()?;
        for (y, row) in source.rows().enumerate() {
            let start = y * row_stride;
            for (dst, src) in data[start..start + width].iter_mut().zip(row.iter()) {
                *dst = *src;
            }
        }
        Ok(Self { data, geometry })
    }

    pub fn view(&self) -> Result<GrayFrame<'_>> {
        GrayFrame::new(&self.data, self.geometry)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestPattern {
    /// Uniform intensity
    Flat(u8),
    /// Diagonal ramp `(x + y) mod 256`
    Gradient,
    /// 32-pixel black/white squares
    Checkerboard,
    /// Hash-derived pseudo-random intensities, repeatable within a build
    Noise,
    /// 0 left of `column`, 255 from `column` on
    Step { column: usize },
}

impl TestPattern {
    pub fn sample(&self, x: usize, y: usize) -> u8 {
        match *self {
            TestPattern::Flat(v) => v,
            TestPattern::Gradient => ((x + y) % 256) as u8,
            TestPattern::Checkerboard => {
                if (x / 32 + y / 32) % 2 == 0 {
                    255
                } else {
                    0
                }
            }
            TestPattern::Noise => {
                use std::collections::hash_map::DefaultHasher;
                use std::hash::{Hash, Hasher};

                let mut hasher = DefaultHasher::new();
                (x, y).hash(&mut hasher);
                (hasher.finish() % 256) as u8
            }
            TestPattern::Step { column } => {
                if x < column {
                    0
                } else {
                    255
                }
            }
        }
    }
}
