use bubble_sheet::utils::grayscale::rgb_to_gray;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{Rgb, RgbImage};

fn bench_rgb_to_gray_medium(c: &mut Criterion) {
    let image = RgbImage::from_pixel(640, 480, Rgb([128, 64, 200]));
    c.bench_function("rgb_to_gray_640x480", |b| {
        b.iter(|| rgb_to_gray(black_box(&image)))
    });
}

fn bench_rgb_to_gray_large(c: &mut Criterion) {
    let image = RgbImage::from_pixel(1920, 1080, Rgb([128, 64, 200]));
    c.bench_function("rgb_to_gray_1920x1080", |b| {
        b.iter(|| rgb_to_gray(black_box(&image)))
    });
}

criterion_group!(benches, bench_rgb_to_gray_medium, bench_rgb_to_gray_large);
criterion_main!(benches);
