//! Convert RGB images to 8-bit luminance
//! Y = 0.299*R + 0.587*G + 0.114*B
//! Uses fast integer arithmetic: Y = (76*R + 150*G + 29*B) >> 8

use image::buffer::ConvertBuffer;
use image::{GrayImage, RgbImage};
use rayon::prelude::*;

/// Coefficients for grayscale conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

#[inline]
fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let lum = (COEF_R * r as u32 + COEF_G * g as u32 + COEF_B * b as u32) >> 8;
    lum.min(255) as u8
}

/// Convert an RGB image to grayscale, processing rows in parallel
pub fn rgb_to_gray(rgb: &RgbImage) -> GrayImage {
    let (width, height) = rgb.dimensions();
    let w = width as usize;
    let src = rgb.as_raw();
    let mut gray = vec![0u8; w * height as usize];

    if w > 0 {
        gray.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
            let row_start = y * w * 3;
            for (x, out) in row.iter_mut().enumerate() {
                let idx = row_start + x * 3;
                *out = luminance(src[idx], src[idx + 1], src[idx + 2]);
            }
        });
    }

    // Buffer length always matches the dimensions.
    GrayImage::from_raw(width, height, gray).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Expand a grayscale image back to RGB (for drawing coloured overlays)
pub fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    gray.convert()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_rgb_to_gray() {
        // Pure white
        let white = RgbImage::from_pixel(1, 1, Rgb([255, 255, 255]));
        assert!(rgb_to_gray(&white).get_pixel(0, 0).0[0] >= 254);

        // Pure black
        let black = RgbImage::from_pixel(1, 1, Rgb([0, 0, 0]));
        assert_eq!(rgb_to_gray(&black).get_pixel(0, 0).0[0], 0);

        // Pure red
        let red = RgbImage::from_pixel(1, 1, Rgb([255, 0, 0]));
        let v = rgb_to_gray(&red).get_pixel(0, 0).0[0];
        assert!(v > 0 && v < 255);

        // Pure green dominates luminance
        let green = RgbImage::from_pixel(1, 1, Rgb([0, 255, 0]));
        assert!(rgb_to_gray(&green).get_pixel(0, 0).0[0] > 100);
    }

    #[test]
    fn test_dimensions_preserved() {
        let img = RgbImage::from_pixel(7, 3, Rgb([10, 20, 30]));
        let gray = rgb_to_gray(&img);
        assert_eq!(gray.dimensions(), (7, 3));
        assert_eq!(gray_to_rgb(&gray).dimensions(), (7, 3));
    }

    #[test]
    fn test_gray_to_rgb_replicates_channels() {
        let mut gray = GrayImage::new(2, 1);
        gray.put_pixel(1, 0, image::Luma([77]));
        let rgb = gray_to_rgb(&gray);
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([77, 77, 77]));
    }

    #[test]
    fn test_empty_image() {
        let img = RgbImage::new(0, 0);
        assert_eq!(rgb_to_gray(&img).dimensions(), (0, 0));
    }
}
