//! Image decoding with a fast JPEG path.
//!
//! JPEGs go through zune-jpeg (1.5-2x faster than the image crate); every
//! other format falls back to the image crate.

use crate::error::HashError;
use image::{DynamicImage, ImageBuffer, Rgb};
use std::fs;
use std::path::Path;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

fn is_jpeg(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref(),
        Some("jpg" | "jpeg")
    )
}

/// Decode an image from a file path using the fastest available decoder.
pub fn decode(path: &Path) -> Result<DynamicImage, HashError> {
    if is_jpeg(path) {
        decode_jpeg(path).or_else(|_| decode_fallback(path))
    } else {
        decode_fallback(path)
    }
}

/// Fast JPEG decoding using zune-jpeg, forced to RGB output.
fn decode_jpeg(path: &Path) -> Result<DynamicImage, HashError> {
    let bytes = fs::read(path).map_err(|e| HashError::Compute {
        path: path.to_path_buf(),
        source: e,
    })?;

    let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGB);
    let mut decoder = JpegDecoder::new_with_options(&bytes, options);

    let pixels = decoder.decode().map_err(|e| HashError::Decode {
        path: path.to_path_buf(),
        reason: format!("zune-jpeg decode failed: {:?}", e),
    })?;

    let info = decoder.info().ok_or_else(|| HashError::Decode {
        path: path.to_path_buf(),
        reason: "missing image info after decode".to_string(),
    })?;

    if decoder.get_output_colorspace() != Some(ColorSpace::RGB) {
        // Unexpected colorspace; let the image crate handle it
        return decode_fallback(path);
    }

    let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_raw(info.width as u32, info.height as u32, pixels).ok_or_else(|| {
            HashError::Decode {
                path: path.to_path_buf(),
                reason: "pixel buffer does not match reported dimensions".to_string(),
            }
        })?;

    Ok(DynamicImage::ImageRgb8(buffer))
}

/// Fallback to the image crate for non-JPEG formats.
fn decode_fallback(path: &Path) -> Result<DynamicImage, HashError> {
    image::open(path).map_err(|e| HashError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_extension_detection() {
        assert!(is_jpeg(Path::new("photo.jpg")));
        assert!(is_jpeg(Path::new("photo.JPEG")));
        assert!(!is_jpeg(Path::new("photo.png")));
        assert!(!is_jpeg(Path::new("photo")));
    }

    #[test]
    fn unreadable_file_is_a_decode_error() {
        let result = decode(Path::new("/nonexistent/image.png"));
        assert!(matches!(result, Err(HashError::Decode { .. })));
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.png");
        fs::write(&path, b"not an image at all").unwrap();

        let result = decode(&path);
        assert!(matches!(result, Err(HashError::Decode { .. })));
    }
}
