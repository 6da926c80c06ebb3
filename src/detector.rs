//! Edge detection capability.
//!
//! The filter never computes edges itself; it asks an [`EdgeDetector`] for a
//! single-channel edge map. [`CannyDetector`] runs Canny on top of
//! `imageproc`'s Sobel gradients.

use image::{GrayImage, Luma};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

use crate::config::FilterConfig;
use crate::error::{FrameError, Result};
use crate::frame::GrayFrame;

/// Grayscale frame in, single-channel edge map of the same size out.
///
/// Implementations must be deterministic and must not keep any reference to
/// the frame after returning.
pub trait EdgeDetector: Send + Sync {
    fn detect(&self, frame: &GrayFrame<'_>) -> Result<GrayImage>;
}

/// Canny edge detector.
///
/// 3x3 Sobel gradients with replicated borders, L1 magnitude `|gx| + |gy|`,
/// non-maximum suppression along the quantised gradient direction, then
/// hysteresis over 8-connected neighbours. No pre-blur is applied.
///
/// Suppression is one-sided on ties: a pixel must beat its predecessor and
/// only match its successor along the gradient axis. A sharp step between two
/// columns therefore yields a one-pixel line on the darker-index side.
///
/// Produces 0 for background and 255 for edge pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CannyDetector {
    low_threshold: f32,
    high_threshold: f32,
}

impl CannyDetector {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            low_threshold: config.low_threshold,
            high_threshold: config.high_threshold,
        }
    }

    pub fn thresholds(&self) -> (f32, f32) {
        (self.low_threshold, self.high_threshold)
    }
}

impl Default for CannyDetector {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}

impl EdgeDetector for CannyDetector {
    fn detect(&self, frame: &GrayFrame<'_>) -> Result<GrayImage> {
        // imageproc wants a contiguous buffer; the view itself stays borrowed.
        let packed = frame.to_gray_image()?;
        let (width, height) = packed.dimensions();
        let gx = horizontal_sobel(&packed);
        let gy = vertical_sobel(&packed);

        let grid = PaddedGrid::new(width as usize, height as usize);
        let magnitude = grid.magnitude(gx.as_raw(), gy.as_raw())?;
        let mut labels = try_filled(grid.len(), Label::Suppressed)?;
        let mut strong = Vec::new();

        for y in 0..grid.height {
            for x in 0..grid.width {
                let i = grid.index(x, y);
                let m = magnitude[i];
                if m as f32 <= self.low_threshold {
                    continue;
                }
                let packed_index = y * grid.width + x;
                let (dx, dy) = (gx.as_raw()[packed_index], gy.as_raw()[packed_index]);
                if !is_local_maximum(&magnitude, i, grid.stride(), dx, dy) {
                    continue;
                }
                if m as f32 > self.high_threshold {
                    labels[i] = Label::Edge;
                    strong.push(i);
                } else {
                    labels[i] = Label::Candidate;
                }
            }
        }

        // Hysteresis: grow strong pixels through connected candidates.
        let neighbours = grid.neighbour_offsets();
        while let Some(i) = strong.pop() {
            for offset in neighbours {
                let j = i.wrapping_add_signed(offset);
                if labels[j] == Label::Candidate {
                    labels[j] = Label::Edge;
                    strong.push(j);
                }
            }
        }

        Ok(GrayImage::from_fn(width, height, |x, y| {
            if labels[grid.index(x as usize, y as usize)] == Label::Edge {
                Luma([255])
            } else {
                Luma([0])
            }
        }))
    }
}

/// `imageproc::edges::canny`: Gaussian pre-blur (sigma 1.4), Sobel, then
/// suppression and hysteresis.
///
/// Smoother on noisy input than [`CannyDetector`], but suppression keeps ties,
/// so a sharp step between two columns comes out two pixels wide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianCannyDetector {
    low_threshold: f32,
    high_threshold: f32,
}

impl GaussianCannyDetector {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            low_threshold: config.low_threshold,
            high_threshold: config.high_threshold,
        }
    }
}

impl Default for GaussianCannyDetector {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}

impl EdgeDetector for GaussianCannyDetector {
    fn detect(&self, frame: &GrayFrame<'_>) -> Result<GrayImage> {
        let packed = frame.to_gray_image()?;
        Ok(imageproc::edges::canny(&packed, self.low_threshold, self.high_threshold))
    }
}

/// tan(22.5 deg) in Q15.
const TAN_22_5_Q15: i64 = 13573;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Suppressed,
    Candidate,
    Edge,
}

/// Image-sized grid with a one-pixel border on every side.
///
/// Border cells hold zero magnitude and are never labelled, so neighbour
/// lookups need no bounds checks.
#[derive(Debug, Clone, Copy)]
struct PaddedGrid {
    width: usize,
    height: usize,
}

impl PaddedGrid {
    fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    fn stride(&self) -> usize {
        self.width + 2
    }

    fn len(&self) -> usize {
        self.stride() * (self.height + 2)
    }

    fn index(&self, x: usize, y: usize) -> usize {
        (y + 1) * self.stride() + x + 1
    }

    fn neighbour_offsets(&self) -> [isize; 8] {
        let row = self.stride() as isize;
        [-row - 1, -row, -row + 1, -1, 1, row - 1, row, row + 1]
    }

    fn magnitude(&self, gx: &[i16], gy: &[i16]) -> Result<Vec<i32>> {
        let mut out = try_filled(self.len(), 0i32)?;
        for y in 0..self.height {
            for x in 0..self.width {
                let packed = y * self.width + x;
                out[self.index(x, y)] = i32::from(gx[packed]).abs() + i32::from(gy[packed]).abs();
            }
        }
        Ok(out)
    }
}

fn is_local_maximum(magnitude: &[i32], i: usize, row: usize, dx: i16, dy: i16) -> bool {
    let m = magnitude[i];
    let ax = i64::from(dx).abs();
    let ay = i64::from(dy).abs() << 15;
    let tg22 = ax * TAN_22_5_Q15;

    if ay < tg22 {
        // Mostly horizontal gradient: compare left and right.
        m > magnitude[i - 1] && m >= magnitude[i + 1]
    } else if ay > tg22 + (ax << 16) {
        // Mostly vertical gradient: compare above and below.
        m > magnitude[i - row] && m >= magnitude[i + row]
    } else if (dx < 0) != (dy < 0) {
        m > magnitude[i - row + 1] && m > magnitude[i + row - 1]
    } else {
        m > magnitude[i - row - 1] && m > magnitude[i + row + 1]
    }
}

fn try_filled<T: Copy>(len: usize, value: T) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| FrameError::AllocationFailure {
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    buf.resize(len, value);
    Ok(buf)
}

impl<D: EdgeDetector + ?Sized> EdgeDetector for &D {
    fn detect(&self, frame: &GrayFrame<'_>) -> Result<GrayImage> {
        (**self).detect(frame)
    }
}

impl<D: EdgeDetector + ?Sized> EdgeDetector for Box<D> {
    fn detect(&self, frame: &GrayFrame<'_>) -> Result<GrayImage> {
        (**self).detect(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FrameGeometry, GrayFrameBuf, TestPattern};

    #[test]
    fn canny_output_is_binary() {
        let geometry = FrameGeometry::new(64, 48, 64).unwrap();
        let frame = GrayFrameBuf::test_pattern(geometry, TestPattern::Checkerboard);
        let edges = CannyDetector::default().detect(&frame.view().unwrap()).unwrap();

        assert_eq!(edges.dimensions(), (64, 48));
        assert!(edges.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert!(edges.pixels().any(|p| p[0] == 255));
    }

    fn step_frame(width: usize, height: usize, column: usize, low: u8, high: u8) -> GrayFrameBuf {
        let geometry = FrameGeometry::new(width, height, width).unwrap();
        let data = (0..width * height)
            .map(|i| if i % width < column { low } else { high })
            .collect();
        GrayFrameBuf::new_with_data(geometry, data).unwrap()
    }

    fn edge_columns(edges: &GrayImage, y: u32) -> Vec<u32> {
        (0..edges.width()).filter(|&x| edges.get_pixel(x, y)[0] == 255).collect()
    }

    #[test]
    fn vertical_step_gives_one_pixel_line() {
        let frame = step_frame(32, 24, 16, 0, 255);
        let edges = CannyDetector::default().detect(&frame.view().unwrap()).unwrap();
        for y in 0..24 {
            assert_eq!(edge_columns(&edges, y), vec![15], "row {y}");
        }
    }

    #[test]
    fn horizontal_step_gives_one_pixel_line() {
        let geometry = FrameGeometry::new(20, 16, 24).unwrap();
        let frame = GrayFrameBuf::test_pattern(geometry, TestPattern::Flat(0));
        let mut data = frame.data.clone();
        for (i, b) in data.iter_mut().enumerate() {
            if i / 24 >= 8 && i % 24 < 20 {
                *b = 255;
            }
        }
        let frame = GrayFrameBuf::new_with_data(geometry, data).unwrap();
        let edges = CannyDetector::default().detect(&frame.view().unwrap()).unwrap();
        for y in 0..16 {
            let expected: Vec<u32> = if y == 7 { (0..20).collect() } else { Vec::new() };
            assert_eq!(edge_columns(&edges, y), expected, "row {y}");
        }
    }

    #[test]
    fn faint_step_is_dropped() {
        // |gx| = 40 at the step: below the low threshold.
        let frame = step_frame(16, 16, 8, 0, 10);
        let edges = CannyDetector::default().detect(&frame.view().unwrap()).unwrap();
        assert!(edges.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn weak_step_needs_strong_support() {
        // |gx| = 80 at the step: a candidate under 50/150, strong under 50/60.
        let frame = step_frame(16, 16, 8, 0, 20);
        let view = frame.view().unwrap();

        let edges = CannyDetector::default().detect(&view).unwrap();
        assert!(edges.pixels().all(|p| p[0] == 0));

        let relaxed = CannyDetector::new(&FilterConfig::new(50.0, 60.0).unwrap());
        let edges = relaxed.detect(&view).unwrap();
        for y in 0..16 {
            assert_eq!(edge_columns(&edges, y), vec![7], "row {y}");
        }
    }

    #[test]
    fn single_pixel_frame_has_no_edges() {
        let frame = step_frame(1, 1, 0, 0, 200);
        let edges = CannyDetector::default().detect(&frame.view().unwrap()).unwrap();
        assert_eq!(edges.as_raw(), &vec![0]);
    }

    #[test]
    fn gaussian_variant_is_binary_and_near_the_step() {
        let frame = step_frame(32, 24, 16, 0, 255);
        let edges = GaussianCannyDetector::default().detect(&frame.view().unwrap()).unwrap();
        assert_eq!(edges.dimensions(), (32, 24));
        for y in 1..23 {
            let cols = edge_columns(&edges, y);
            assert!(!cols.is_empty(), "row {y}");
            assert!(cols.iter().all(|&x| x == 15 || x == 16), "row {y}: {cols:?}");
        }
    }

    #[test]
    fn thresholds_come_from_config() {
        let config = FilterConfig::new(10.0, 30.0).unwrap();
        assert_eq!(CannyDetector::new(&config).thresholds(), (10.0, 30.0));
        assert_eq!(CannyDetector::default().thresholds(), (50.0, 150.0));
    }
}
