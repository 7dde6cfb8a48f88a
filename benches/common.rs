#![allow(dead_code)]

use image::{GrayImage, Luma};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};

/// A row of four bubbles; `filled[k]` fills the k-th bubble from the left.
pub fn synthetic_row(width: u32, height: u32, filled: [bool; 4]) -> GrayImage {
    let mut row = GrayImage::from_pixel(width, height, Luma([235]));
    let y = height as i32 / 2;
    let step = width as i32 / 5;
    for (k, &fill) in filled.iter().enumerate() {
        let x = step * (k as i32 + 1);
        if fill {
            draw_filled_circle_mut(&mut row, (x, y), 20, Luma([30]));
        } else {
            for r in 18..=20 {
                draw_hollow_circle_mut(&mut row, (x, y), r, Luma([30]));
            }
        }
    }
    row
}

/// A grey gradient with some noise-like texture, for filter benchmarks.
pub fn textured(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        Luma([((x * 7 + y * 13) % 97 + (x + y) % 128) as u8])
    })
}
