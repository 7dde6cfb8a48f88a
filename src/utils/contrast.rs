//! Contrast-limited local histogram equalization
//!
//! The image is split into a grid of equally sized tiles. Each tile gets its
//! own equalization curve built from a clipped histogram (the clipped excess
//! is spread evenly over all bins), and every pixel is mapped through the
//! bilinear blend of the four nearest tile curves so tile seams do not show.
//! When the grid does not divide the image, the last tiles read past the
//! edge by mirroring (reflect-101), so every histogram covers the same area.

use image::{GrayImage, Luma};

/// Smallest tile side. Short images get fewer tiles along that axis, which
/// keeps 37 px question rows from collapsing into 5 px tiles.
pub const MIN_TILE_SIDE: u32 = 8;

type Lut = [u8; 256];

fn reflect_101(i: u32, len: u32) -> u32 {
    if i < len {
        i
    } else {
        (2 * (len - 1)).saturating_sub(i)
    }
}

/// Tile count and tile side along an axis of `len` pixels.
fn grid(len: u32, tiles: u32) -> (u32, u32) {
    let count = tiles.min(len / MIN_TILE_SIDE).max(1);
    (count, len.div_ceil(count))
}

fn tile_lut(gray: &GrayImage, x0: u32, y0: u32, tile_w: u32, tile_h: u32, clip_limit: f32) -> Lut {
    let (width, height) = gray.dimensions();
    let mut hist = [0u32; 256];
    for y in y0..y0 + tile_h {
        let sy = reflect_101(y, height);
        for x in x0..x0 + tile_w {
            hist[gray.get_pixel(reflect_101(x, width), sy).0[0] as usize] += 1;
        }
    }

    let area = tile_w * tile_h;

    // Clip the histogram and spread the excess evenly
    let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let share = excess / 256;
    let remainder = (excess % 256) as usize;
    let step = if remainder > 0 { 256 / remainder } else { 0 };
    for (i, bin) in hist.iter_mut().enumerate() {
        *bin += share;
        if step > 0 && i % step == 0 && i / step < remainder {
            *bin += 1;
        }
    }

    let scale = 255.0 / area as f32;
    let mut lut = [0u8; 256];
    let mut cdf = 0u32;
    for (i, bin) in hist.iter().enumerate() {
        cdf += bin;
        lut[i] = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Locate a pixel between tile centres: (lower tile, upper tile, weight of upper).
fn tile_coord(pos: u32, tile: u32, count: u32) -> (usize, usize, f32) {
    let f = (pos as f32 + 0.5) / tile as f32 - 0.5;
    if f <= 0.0 {
        return (0, 0, 0.0);
    }
    let lo = (f.floor() as u32).min(count - 1);
    let hi = (lo + 1).min(count - 1);
    let w = if hi == lo { 0.0 } else { (f - lo as f32).clamp(0.0, 1.0) };
    (lo as usize, hi as usize, w)
}

/// Equalize contrast locally with up to a `tiles` x `tiles` grid and the given clip limit.
///
/// Along an axis shorter than `tiles * MIN_TILE_SIDE` the grid has fewer tiles.
pub fn equalize_local(gray: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 || tiles == 0 {
        return gray.clone();
    }

    let (tiles_x, tile_w) = grid(width, tiles);
    let (tiles_y, tile_h) = grid(height, tiles);

    let mut luts: Vec<Lut> = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            luts.push(tile_lut(gray, tx * tile_w, ty * tile_h, tile_w, tile_h, clip_limit));
        }
    }

    let mut out = GrayImage::new(width, height);
    for y in 0..height {
        let (ty0, ty1, wy) = tile_coord(y, tile_h, tiles_y);
        for x in 0..width {
            let (tx0, tx1, wx) = tile_coord(x, tile_w, tiles_x);
            let v = gray.get_pixel(x, y).0[0] as usize;
            let at = |ty: usize, tx: usize| luts[ty * tiles_x as usize + tx][v] as f32;
            let top = at(ty0, tx0) * (1.0 - wx) + at(ty0, tx1) * wx;
            let bottom = at(ty1, tx0) * (1.0 - wx) + at(ty1, tx1) * wx;
            let value = top * (1.0 - wy) + bottom * wy;
            out.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_preserved() {
        let gray = GrayImage::from_pixel(37, 11, Luma([90]));
        let out = equalize_local(&gray, 2.0, 8);
        assert_eq!(out.dimensions(), (37, 11));
    }

    #[test]
    fn test_dark_ink_stays_dark() {
        let mut gray = GrayImage::from_pixel(64, 64, Luma([250]));
        for y in 24..40 {
            for x in 24..40 {
                gray.put_pixel(x, y, Luma([30]));
            }
        }
        let out = equalize_local(&gray, 2.0, 8);
        assert!(out.get_pixel(32, 32).0[0] < 120);
        assert!(out.get_pixel(2, 2).0[0] > 200);
    }

    #[test]
    fn test_monotonic_within_tile() {
        let mut gray = GrayImage::new(16, 16);
        for (x, y, p) in gray.enumerate_pixels_mut() {
            *p = Luma([((x + y * 16) as u8).wrapping_mul(1)]);
        }
        let out = equalize_local(&gray, 2.0, 1);
        let a = out.get_pixel(0, 0).0[0];
        let b = out.get_pixel(15, 15).0[0];
        assert!(a <= b);
    }

    #[test]
    fn test_tiny_image_with_many_tiles() {
        let gray = GrayImage::from_pixel(3, 2, Luma([10]));
        let out = equalize_local(&gray, 2.0, 8);
        assert_eq!(out.dimensions(), (3, 2));
    }

    #[test]
    fn test_grid_keeps_tiles_tall_enough() {
        assert_eq!(grid(600, 8), (8, 75));
        assert_eq!(grid(266, 8), (8, 34));
        assert_eq!(grid(42, 8), (5, 9));
        assert_eq!(grid(37, 8), (4, 10));
        assert_eq!(grid(3, 8), (1, 3));
    }

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect_101(4, 10), 4);
        assert_eq!(reflect_101(10, 10), 8);
        assert_eq!(reflect_101(12, 10), 6);
        assert_eq!(reflect_101(3, 1), 0);
    }

    #[test]
    fn test_partial_tail_tile_keeps_dark_band_dark() {
        // 37 rows split into 4 tiles of 10; the tail tile mirrors rows 33 to 35.
        let mut short = GrayImage::from_pixel(40, 37, Luma([230]));
        for x in 0..40 {
            for y in 33..37 {
                short.put_pixel(x, y, Luma([40]));
            }
        }
        let out = equalize_local(&short, 2.0, 8);
        assert_eq!(out.dimensions(), (40, 37));
        assert!(out.get_pixel(20, 36).0[0] < out.get_pixel(20, 20).0[0]);
        assert!(out.get_pixel(20, 2).0[0] > 200);
    }
}
