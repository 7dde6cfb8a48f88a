//! Denoise, contrast and sharpening applied to every rectified sheet

use crate::config::CanvasConfig;
use crate::utils::contrast::equalize_local;
use image::{GrayImage, Luma};
use imageproc::filter::{gaussian_blur_f32, median_filter};

/// Absolute 4-neighbour Laplacian, saturated to 0..=255.
///
/// Borders are reflected without repeating the edge pixel.
pub fn abs_laplacian(gray: &GrayImage) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut out = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return out;
    }

    let reflect = |v: i64, len: u32| -> u32 {
        let max = len as i64 - 1;
        if max == 0 {
            return 0;
        }
        let r = if v < 0 { -v } else if v > max { 2 * max - v } else { v };
        r.clamp(0, max) as u32
    };
    let at = |x: i64, y: i64| gray.get_pixel(reflect(x, width), reflect(y, height)).0[0] as i32;

    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let lap = at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4 * at(x, y);
            out.put_pixel(x as u32, y as u32, Luma([lap.unsigned_abs().min(255) as u8]));
        }
    }
    out
}

/// Enhance a rectified grayscale sheet.
///
/// 3x3 median, local contrast equalization, unsharp mask
/// (`2·img − gaussian(σ)`), then `laplacian_weight·|Laplacian|` added on top.
/// The output keeps the input size.
pub fn enhance(gray: &GrayImage, config: &CanvasConfig) -> GrayImage {
    if gray.width() == 0 || gray.height() == 0 {
        return gray.clone();
    }

    let denoised = median_filter(gray, 1, 1);
    let equalized = equalize_local(&denoised, config.contrast_clip_limit, config.contrast_tiles);

    let blurred = gaussian_blur_f32(&equalized, config.unsharp_sigma);
    let mut sharpened = GrayImage::new(gray.width(), gray.height());
    for ((out, src), blur) in sharpened
        .pixels_mut()
        .zip(equalized.pixels())
        .zip(blurred.pixels())
    {
        let v = 2.0 * src.0[0] as f32 - blur.0[0] as f32;
        *out = Luma([v.round().clamp(0.0, 255.0) as u8]);
    }

    let edges = abs_laplacian(&sharpened);
    for (out, edge) in sharpened.pixels_mut().zip(edges.pixels()) {
        let v = out.0[0] as f32 + config.laplacian_weight * edge.0[0] as f32;
        *out = Luma([v.round().clamp(0.0, 255.0) as u8]);
    }

    sharpened
}
