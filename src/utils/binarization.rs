//! Locally adaptive binarization for ink segmentation

use image::{GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;

/// Foreground value in binary masks.
pub const FOREGROUND: u8 = 255;

/// Gaussian sigma matching a square smoothing window of `ksize` pixels.
///
/// Same rule image libraries use when a kernel size is given without a sigma.
pub fn sigma_for_kernel(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Inverted adaptive threshold with a Gaussian-weighted local mean.
///
/// A pixel becomes foreground (255) when it is at least `c` darker than the
/// Gaussian-weighted mean of its `block_size` neighbourhood, so dark ink on
/// light paper ends up as foreground. Uniform regions are always background
/// for `c > 0`.
pub fn adaptive_threshold_inv(gray: &GrayImage, block_size: u32, c: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut binary = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return binary;
    }

    let local_mean = gaussian_blur_f32(gray, sigma_for_kernel(block_size).max(0.1));

    for (x, y, p) in gray.enumerate_pixels() {
        let threshold = local_mean.get_pixel(x, y).0[0] as f32 - c;
        if p.0[0] as f32 <= threshold {
            binary.put_pixel(x, y, Luma([FOREGROUND]));
        }
    }

    binary
}

/// Count foreground pixels in a binary mask
pub fn foreground_count(binary: &GrayImage) -> usize {
    binary.pixels().filter(|p| p.0[0] != 0).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_image_is_background() {
        let gray = GrayImage::from_pixel(40, 40, Luma([128]));
        let binary = adaptive_threshold_inv(&gray, 11, 2.0);
        assert_eq!(foreground_count(&binary), 0);
    }

    #[test]
    fn test_dark_square_edge_is_foreground() {
        let mut gray = GrayImage::from_pixel(60, 60, Luma([250]));
        for y in 20..40 {
            for x in 20..40 {
                gray.put_pixel(x, y, Luma([20]));
            }
        }
        let binary = adaptive_threshold_inv(&gray, 11, 2.0);
        // Ink just inside the edge is darker than its neighbourhood.
        assert_eq!(binary.get_pixel(20, 30).0[0], FOREGROUND);
        // Paper just outside the edge is lighter than its neighbourhood.
        assert_eq!(binary.get_pixel(18, 30).0[0], 0);
        // Far background stays background.
        assert_eq!(binary.get_pixel(2, 2).0[0], 0);
    }

    #[test]
    fn test_sigma_for_kernel() {
        assert!((sigma_for_kernel(5) - 1.1).abs() < 1e-6);
        assert!((sigma_for_kernel(21) - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_empty_image() {
        let gray = GrayImage::new(0, 0);
        assert_eq!(adaptive_threshold_inv(&gray, 21, 7.0).dimensions(), (0, 0));
    }
}
