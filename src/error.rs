//! Error handling for the edge-detection bridge

use thiserror::Error;

/// Result type for frame processing
pub type Result<T> = std::result::Result<T, FrameError>;

/// Errors that can occur while turning a grayscale frame into an RGBA edge map.
///
/// Processing is all-or-nothing: when one of these is returned no output
/// buffer exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Malformed geometry or an input region too short for it
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A working or output buffer could not be reserved
    #[error("allocation failure: could not reserve {bytes} bytes")]
    AllocationFailure { bytes: usize },
}

impl FrameError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        FrameError::InvalidArgument(msg.into())
    }

    /// Numeric code reported across the C ABI.
    pub fn code(&self) -> i32 {
        match self {
            FrameError::InvalidArgument(_) => 1,
            FrameError::AllocationFailure { .. } => 2,
        }
    }
}

/// Errors raised while loading or validating a [`crate::FilterConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid thresholds: low {low}, high {high} (need 0 <= low <= high, both finite)")]
    InvalidThresholds { low: f32, high: f32 },
}

/// Errors raised while saving a processed frame to disk.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("image encode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("capture io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported capture format: {0}")]
    UnsupportedFormat(String),

    #[error("frame buffer does not match {width}x{height} RGBA")]
    BadFrame { width: usize, height: usize },
}
