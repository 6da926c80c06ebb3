//! The frame edge filter: borrowed grayscale frame in, owned RGBA edge map out.

use crate::config::FilterConfig;
use crate::detector::{CannyDetector, EdgeDetector};
use crate::error::{FrameError, Result};
use crate::frame::{GrayFrame, RgbaFrame};

/// Runs a fixed edge detector over grayscale frames.
///
/// Holds no per-frame state, so one filter can serve any number of threads.
#[derive(Debug, Clone, Default)]
pub struct FrameEdgeFilter<D = CannyDetector> {
    detector: D,
}

impl FrameEdgeFilter<CannyDetector> {
    /// Canny with the default 50/150 thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Canny with caller-chosen thresholds.
    pub fn with_config(config: FilterConfig) -> std::result::Result<Self, crate::ConfigError> {
        config.validate()?;
        Ok(Self {
            detector: CannyDetector::new(&config),
        })
    }
}

impl<D: EdgeDetector> FrameEdgeFilter<D> {
    pub fn with_detector(detector: D) -> Self {
        Self { detector }
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Detect edges in `frame` and return them as a fresh RGBA buffer of
    /// exactly `width * height * 4` bytes, R = G = B = A = edge value.
    pub fn process(&self, frame: &GrayFrame<'_>) -> Result<RgbaFrame> {
        let edges = self.detector.detect(frame)?;

        let expected = (frame.width() as u32, frame.height() as u32);
        if edges.dimensions() != expected {
            return Err(FrameError::invalid(format!(
                "detector returned a {}x{} edge map for a {}x{} frame",
                edges.width(),
                edges.height(),
                expected.0,
                expected.1
            )));
        }

        let rgba = RgbaFrame::from_gray_replicated(&edges)?;
        tracing::trace!(
            width = frame.width(),
            height = frame.height(),
            stride = frame.row_stride(),
            "frame filtered"
        );
        Ok(rgba)
    }

    /// Raw-argument form of [`FrameEdgeFilter::process`]; geometry is validated
    /// before `gray` is read.
    pub fn process_raw(&self, width: i32, height: i32, gray: &[u8], row_stride: i32) -> Result<Vec<u8>> {
        let frame = GrayFrame::from_raw(width, height, gray, row_stride)?;
        Ok(self.process(&frame)?.into_vec())
    }
}

/// Filter one frame with the default Canny thresholds (50, 150).
///
/// `gray` is borrowed for the duration of the call only. On success the
/// returned buffer is `width * height * 4` bytes of tightly packed RGBA.
pub fn process_frame(width: i32, height: i32, gray: &[u8], row_stride: i32) -> Result<Vec<u8>> {
    FrameEdgeFilter::new().process_raw(width, height, gray, row_stride)
}
