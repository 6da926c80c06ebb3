//! Saving processed frames to disk.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};

use crate::error::CaptureError;
use crate::frame::RgbaFrame;

/// JPEG quality used for captures.
pub const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    /// Lossless, alpha kept
    Png,
    /// Quality [`JPEG_QUALITY`], alpha dropped
    Jpeg,
}

impl CaptureFormat {
    pub fn from_path(path: &Path) -> Result<Self, CaptureError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => Ok(CaptureFormat::Png),
            "jpg" | "jpeg" => Ok(CaptureFormat::Jpeg),
            other => Err(CaptureError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// File name for a capture taken at `unix_millis`.
pub fn capture_file_name(unix_millis: u128) -> String {
    format!("EdgeFrame_Capture_{unix_millis}.jpg")
}

/// Encode `frame` to `path`, choosing the format from the extension.
pub fn save_frame(frame: &RgbaFrame, path: impl AsRef<Path>) -> Result<(), CaptureError> {
    let path = path.as_ref();
    let format = CaptureFormat::from_path(path)?;
    save_frame_as(frame, path, format)
}

pub fn save_frame_as(frame: &RgbaFrame, path: &Path, format: CaptureFormat) -> Result<(), CaptureError> {
    let image = frame.to_image().ok_or(CaptureError::BadFrame {
        width: frame.width(),
        height: frame.height(),
    })?;

    match format {
        CaptureFormat::Png => image.save_with_format(path, ImageFormat::Png)?,
        CaptureFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
            let mut writer = BufWriter::new(File::create(path)?);
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY))?;
        }
    }

    tracing::info!(path = %path.display(), ?format, "frame saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(CaptureFormat::from_path(Path::new("a.PNG")).unwrap(), CaptureFormat::Png);
        assert_eq!(CaptureFormat::from_path(Path::new("a.jpeg")).unwrap(), CaptureFormat::Jpeg);
        assert_eq!(CaptureFormat::from_path(Path::new("dir/a.jpg")).unwrap(), CaptureFormat::Jpeg);
        assert!(matches!(
            CaptureFormat::from_path(Path::new("a.bmp")),
            Err(CaptureError::UnsupportedFormat(ext)) if ext == "bmp"
        ));
        assert!(CaptureFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn capture_names_carry_timestamp() {
        assert_eq!(capture_file_name(1_700_000_000_123), "EdgeFrame_Capture_1700000000123.jpg");
    }
}
