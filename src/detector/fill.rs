//! Fill measurement and marked-position selection

use crate::config::FillConfig;
use crate::models::MarkCandidate;
use image::{GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point as PixelPoint;

/// Fill statistics for one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillMeasurement {
    /// Candidate position (0 = rightmost).
    pub position: usize,
    /// Pixels inside the contour.
    pub mask_pixels: usize,
    /// Mask pixels darker than the threshold.
    pub dark_pixels: usize,
    /// `dark_pixels / mask_pixels`, 0 for an empty mask.
    pub fill_ratio: f32,
    /// Mean intensity inside the mask, 0 for an empty mask.
    pub mean_intensity: f32,
}

/// Outcome of classifying one row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FillDecision {
    /// One measurement per candidate, in position order.
    pub measurements: Vec<FillMeasurement>,
    /// Marked positions, highest fill ratio first.
    pub marked_positions: Vec<usize>,
}

/// Rasterize the interior of a contour (boundary included).
pub fn contour_mask(contour: &[PixelPoint<i32>], width: u32, height: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);

    let mut polygon = contour.to_vec();
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }

    if polygon.len() >= 3 {
        draw_polygon_mut(&mut mask, &polygon, Luma([255]));
    } else {
        for p in &polygon {
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < width && (p.y as u32) < height {
                mask.put_pixel(p.x as u32, p.y as u32, Luma([255]));
            }
        }
    }
    mask
}

/// Measure how much of a contour's interior is dark in `enhanced`.
pub fn measure_fill(
    contour: &[PixelPoint<i32>],
    enhanced: &GrayImage,
    dark_threshold: u8,
    position: usize,
) -> FillMeasurement {
    let mask = contour_mask(contour, enhanced.width(), enhanced.height());

    let mut mask_pixels = 0usize;
    let mut dark_pixels = 0usize;
    let mut sum = 0u64;
    for (m, p) in mask.pixels().zip(enhanced.pixels()) {
        if m.0[0] == 0 {
            continue;
        }
        mask_pixels += 1;
        sum += p.0[0] as u64;
        if p.0[0] < dark_threshold {
            dark_pixels += 1;
        }
    }

    let (fill_ratio, mean_intensity) = if mask_pixels == 0 {
        (0.0, 0.0)
    } else {
        (
            dark_pixels as f32 / mask_pixels as f32,
            sum as f32 / mask_pixels as f32,
        )
    };

    FillMeasurement {
        position,
        mask_pixels,
        dark_pixels,
        fill_ratio,
        mean_intensity,
    }
}

/// Positions whose fill ratio exceeds the threshold, highest ratio first.
///
/// Equal ratios keep position order.
pub fn select_marked(measurements: &[FillMeasurement], threshold: f32) -> Vec<usize> {
    let mut marked: Vec<&FillMeasurement> = measurements
        .iter()
        .filter(|m| m.fill_ratio > threshold)
        .collect();
    marked.sort_by(|a, b| b.fill_ratio.total_cmp(&a.fill_ratio));
    marked.into_iter().map(|m| m.position).collect()
}

/// Decides which candidates of a row are filled in.
pub struct FillClassifier;

impl FillClassifier {
    /// Measure every candidate (already in position order) and select the marked ones.
    pub fn classify(
        candidates: &[MarkCandidate],
        enhanced: &GrayImage,
        config: &FillConfig,
    ) -> FillDecision {
        let measurements: Vec<FillMeasurement> = candidates
            .iter()
            .enumerate()
            .map(|(position, c)| {
                measure_fill(&c.contour, enhanced, config.dark_threshold, position)
            })
            .collect();
        let marked_positions = select_marked(&measurements, config.fill_ratio_threshold);
        FillDecision {
            measurements,
            marked_positions,
        }
    }
}
