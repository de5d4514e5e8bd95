//! SIMD-accelerated grayscale reduction for fingerprinting.
//!
//! Every perceptual fingerprint starts from the same normalization: decode,
//! convert to grayscale, shrink to a small fixed grid. fast_image_resize is
//! 5-14x faster than the image crate here and uses AVX2/NEON when available.

use crate::error::HashError;
use fast_image_resize::{images::Image, PixelType, ResizeOptions, Resizer};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};

/// Resize an image to the given dimensions and convert to grayscale.
pub fn reduce_to_gray(
    image: &DynamicImage,
    width: u32,
    height: u32,
) -> Result<GrayImage, HashError> {
    let gray = image.to_luma8();
    let (src_width, src_height) = gray.dimensions();

    if src_width == 0 || src_height == 0 || width == 0 || height == 0 {
        return Err(HashError::Resize {
            reason: format!(
                "invalid dimensions {}x{} -> {}x{}",
                src_width, src_height, width, height
            ),
        });
    }

    let src = Image::from_vec_u8(src_width, src_height, gray.into_raw(), PixelType::U8)
        .map_err(|e| HashError::Resize {
            reason: format!("source buffer: {}", e),
        })?;

    let mut dst = Image::new(width, height, PixelType::U8);

    // Bilinear is plenty for hashing grids and fast
    let options = ResizeOptions::new().resize_alg(fast_image_resize::ResizeAlg::Convolution(
        fast_image_resize::FilterType::Bilinear,
    ));

    Resizer::new()
        .resize(&src, &mut dst, &options)
        .map_err(|e| HashError::Resize {
            reason: e.to_string(),
        })?;

    let buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
        ImageBuffer::from_raw(width, height, dst.into_vec()).ok_or_else(|| HashError::Resize {
            reason: "result buffer does not match requested dimensions".to_string(),
        })?;

    Ok(buffer)
}
