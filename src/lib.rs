//! Native edge-detection bridge.
//!
//! A managed host hands over a borrowed 8-bit grayscale frame (width, height,
//! row stride); the crate runs a fixed Canny edge detector on it and returns a
//! freshly allocated, tightly packed RGBA buffer that the host owns.

extern crate self as edgeframe;

pub mod boundary;
pub mod capture;
pub mod config;
pub mod detector;
pub mod error;
pub mod filter;
pub mod frame;
pub mod logging;
pub mod stats;

#[cfg(feature = "capi")]
pub mod capi;
#[cfg(feature = "jni")]
pub mod jni;

pub use edgeframe_macros::jni_export;

// Re-export main types for convenience
pub use crate::config::FilterConfig;
pub use crate::detector::{CannyDetector, EdgeDetector, GaussianCannyDetector};
pub use crate::error::{CaptureError, ConfigError, FrameError, Result};
pub use crate::filter::{process_frame, FrameEdgeFilter};
pub use crate::frame::{FrameGeometry, GrayFrame, RgbaFrame, TestPattern};
