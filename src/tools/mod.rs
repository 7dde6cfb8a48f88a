//! Helpers shared by the library, the `sheettool` binary and the benches.

use crate::error::{Result, ScanError};
use crate::utils::binarization::foreground_count;
use image::{DynamicImage, GenericImageView, GrayImage, RgbImage};
use std::env;
use std::path::Path;

fn max_dim_from_env() -> Option<u32> {
    match env::var("OMR_MAX_DIM") {
        Ok(value) => match value.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(v) => Some(v),
            Err(_) => None,
        },
        Err(_) => None,
    }
}

fn open<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|source| ScanError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;

    // Very large photos are shrunk first when OMR_MAX_DIM is set.
    if let Some(max_dim) = max_dim_from_env() {
        let (w, h) = img.dimensions();
        if w.max(h) > max_dim {
            return Ok(img.resize(max_dim, max_dim, image::imageops::FilterType::Triangle));
        }
    }
    Ok(img)
}

/// Load a photo as RGB.
pub fn load_rgb<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    open(path).map(|img| img.to_rgb8())
}

/// Load an image as 8-bit grayscale (e.g. a single row crop).
pub fn load_gray<P: AsRef<Path>>(path: P) -> Result<GrayImage> {
    open(path).map(|img| img.to_luma8())
}

/// Save an image, mapping encoder failures to [`ScanError::ImageWrite`].
pub fn save_image<P: AsRef<Path>>(image: impl Into<DynamicImage>, path: P) -> Result<()> {
    let path = path.as_ref();
    image
        .into()
        .save(path)
        .map_err(|source| ScanError::ImageWrite {
            path: path.to_path_buf(),
            source,
        })
}

/// Summary statistics for grayscale data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrayStats {
    /// Minimum grayscale value.
    pub min: u8,
    /// Maximum grayscale value.
    pub max: u8,
    /// Average grayscale value.
    pub avg: u8,
}

/// Compute min/max/avg for grayscale values.
pub fn grayscale_stats(gray: &GrayImage) -> GrayStats {
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    let mut sum: u64 = 0;
    for p in gray.pixels() {
        let v = p.0[0];
        min = min.min(v);
        max = max.max(v);
        sum += v as u64;
    }
    let count = gray.width() as u64 * gray.height() as u64;
    if count == 0 {
        return GrayStats { min: 0, max: 0, avg: 0 };
    }
    GrayStats {
        min,
        max,
        avg: (sum / count) as u8,
    }
}

/// Fraction of foreground pixels in an ink mask.
pub fn ink_ratio(binary: &GrayImage) -> f64 {
    let total = binary.width() as u64 * binary.height() as u64;
    if total == 0 {
        0.0
    } else {
        foreground_count(binary) as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_missing_file_is_image_load_error() {
        let err = load_rgb("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, ScanError::ImageLoad { .. }));
        assert!(err.to_string().contains("/definitely/not/here.png"));
    }

    #[test]
    fn test_grayscale_stats() {
        let mut gray = GrayImage::from_pixel(2, 2, Luma([100]));
        gray.put_pixel(0, 0, Luma([0]));
        gray.put_pixel(1, 1, Luma([200]));
        let stats = grayscale_stats(&gray);
        assert_eq!(stats, GrayStats { min: 0, max: 200, avg: 100 });
        assert_eq!(grayscale_stats(&GrayImage::new(0, 0)).avg, 0);
    }

    #[test]
    fn test_ink_ratio() {
        let mut mask = GrayImage::new(4, 1);
        mask.put_pixel(0, 0, Luma([255]));
        assert_eq!(ink_ratio(&mask), 0.25);
    }

    #[test]
    fn test_save_and_reload_gray() {
        let path = std::env::temp_dir()
            .join(format!("bubble_sheet_tools_{}.png", std::process::id()));
        let gray = GrayImage::from_pixel(3, 2, Luma([77]));
        save_image(gray.clone(), &path).unwrap();
        let back = load_gray(&path).unwrap();
        assert_eq!(back, gray);
        let _ = std::fs::remove_file(path);
    }
}
