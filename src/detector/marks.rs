//! Bubble candidate detection within one question row
//!
//! Ink is segmented with an inverted adaptive threshold, external contours
//! are measured, and contours with a plausible bubble size and shape are
//! kept. Survivors are ordered right to left (see [`POSITION_ORDER`]).

use crate::config::MarkConfig;
use crate::layout::QuestionRowImage;
use crate::models::{BoundingBox, MarkCandidate, Point, RejectedContour, RejectionReason};
use crate::normalize::border::external_contours;
use crate::utils::binarization::adaptive_threshold_inv;
use crate::utils::contrast::equalize_local;
use crate::utils::geometry::{centroid, closed_perimeter, polygon_area};
use image::GrayImage;
use imageproc::filter::{box_filter, gaussian_blur_f32, median_filter};
use imageproc::point::Point as PixelPoint;
use log::trace;
use std::f32::consts::PI;
use std::ops::Range;

/// Candidate position convention shared by the detector and the classifier.
///
/// Position 0 is the rightmost mark of a row and position 3 the leftmost:
/// candidates are ordered by centroid x descending, ties keep discovery
/// order. Reported answers use these positions.
pub const POSITION_ORDER: &str = "right-to-left";

/// Sigma of the light blur applied before ink segmentation (3x3 equivalent).
const PRE_THRESHOLD_SIGMA: f32 = 0.8;

/// Everything found in one row image.
#[derive(Debug, Clone)]
pub struct RowDetection {
    /// Accepted candidates in position order, at most `marks_per_row`.
    pub candidates: Vec<MarkCandidate>,
    /// Contours that failed the acceptance rule.
    pub rejected: Vec<RejectedContour>,
    /// Accepted candidates before truncation.
    pub accepted_count: usize,
    /// Denoised, contrast-equalized row; fill is measured on this.
    pub enhanced: GrayImage,
    /// Ink mask the contours were traced on.
    pub binary: GrayImage,
}

/// Shape measurements of one contour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourShape {
    /// Enclosed area in px².
    pub area: f32,
    /// Closed boundary length.
    pub perimeter: f32,
    /// 4π·area / perimeter², 0 for a zero perimeter.
    pub circularity: f32,
    /// Bounding box long side over short side.
    pub aspect_ratio: f32,
    /// Diameter of the disc with the same area.
    pub diameter: f32,
    /// Area centroid.
    pub centroid: Point,
    /// Inclusive pixel bounding box.
    pub bbox: BoundingBox,
}

impl ContourShape {
    /// Measure a traced contour.
    pub fn measure(contour: &[PixelPoint<i32>]) -> Self {
        let vertices: Vec<Point> = contour.iter().copied().map(Point::from).collect();
        let area = polygon_area(&vertices);
        let perimeter = closed_perimeter(&vertices);
        let circularity = if perimeter > 0.0 {
            4.0 * PI * area / (perimeter * perimeter)
        } else {
            0.0
        };
        let bbox = pixel_bbox(contour);

        Self {
            area,
            perimeter,
            circularity,
            aspect_ratio: bbox.aspect_ratio(),
            diameter: 2.0 * (area / PI).sqrt(),
            centroid: centroid(&vertices),
            bbox,
        }
    }
}

fn pixel_bbox(contour: &[PixelPoint<i32>]) -> BoundingBox {
    let Some(first) = contour.first() else {
        return BoundingBox::default();
    };
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in contour {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    BoundingBox {
        x: x0,
        y: y0,
        width: (x1 - x0 + 1) as u32,
        height: (y1 - y0 + 1) as u32,
    }
}

/// Every acceptance rule `shape` fails.
pub fn rejection_reasons(shape: &ContourShape, config: &MarkConfig) -> Vec<RejectionReason> {
    let mut reasons = Vec::new();
    if shape.area <= config.min_area() {
        reasons.push(RejectionReason::TooSmall);
    }
    if shape.area >= config.max_area() {
        reasons.push(RejectionReason::TooLarge);
    }
    if shape.circularity <= config.circularity_threshold {
        reasons.push(RejectionReason::LowCircularity);
    }
    if shape.aspect_ratio >= config.aspect_ratio_threshold {
        reasons.push(RejectionReason::HighAspectRatio);
    }
    reasons
}

/// Stable sort into position order: centroid x descending.
pub fn order_by_position(candidates: &mut [MarkCandidate]) {
    candidates.sort_by(|a, b| b.centroid.x.total_cmp(&a.centroid.x));
}

/// Finds bubble candidates in row images.
pub struct MarkDetector;

impl MarkDetector {
    /// Denoise and equalize a row, returning `(enhanced, ink mask)`.
    pub fn preprocess(row: &GrayImage, config: &MarkConfig) -> (GrayImage, GrayImage) {
        if row.width() == 0 || row.height() == 0 {
            return (row.clone(), GrayImage::new(row.width(), row.height()));
        }
        let denoised = median_filter(row, 1, 1);
        let smoothed = box_filter(&denoised, 2, 2);
        let enhanced = equalize_local(&smoothed, config.contrast_clip_limit, config.contrast_tiles);
        let blurred = gaussian_blur_f32(&enhanced, PRE_THRESHOLD_SIGMA);
        let binary =
            adaptive_threshold_inv(&blurred, config.threshold_block_size, config.threshold_c);
        (enhanced, binary)
    }

    /// Detect candidates in a partitioned row, honouring its core band.
    pub fn detect_row(row: &QuestionRowImage, config: &MarkConfig) -> RowDetection {
        let core = config.restrict_to_row_core.then(|| row.core.clone());
        Self::detect(&row.image, core, config)
    }

    /// Detect candidates in a row image.
    ///
    /// When `core` is given, an otherwise acceptable contour whose centroid
    /// row lies outside it is rejected, so a bubble visible in two
    /// overlapping crops is only counted by the row that owns it.
    pub fn detect(row: &GrayImage, core: Option<Range<u32>>, config: &MarkConfig) -> RowDetection {
        let (enhanced, binary) = Self::preprocess(row, config);

        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for (discovery_index, contour) in external_contours(&binary).into_iter().enumerate() {
            let shape = ContourShape::measure(&contour);
            let mut reasons = rejection_reasons(&shape, config);

            if reasons.is_empty() {
                if let Some(core) = &core {
                    let cy = shape.centroid.y;
                    if cy < core.start as f32 || cy >= core.end as f32 {
                        reasons.push(RejectionReason::OutsideRowCore);
                    }
                }
            }

            if reasons.is_empty() {
                accepted.push(MarkCandidate {
                    contour,
                    discovery_index,
                    area: shape.area,
                    perimeter: shape.perimeter,
                    circularity: shape.circularity,
                    aspect_ratio: shape.aspect_ratio,
                    diameter: shape.diameter,
                    centroid: shape.centroid,
                    bbox: shape.bbox,
                });
            } else {
                let rejection = RejectedContour {
                    contour,
                    area: shape.area,
                    circularity: shape.circularity,
                    aspect_ratio: shape.aspect_ratio,
                    diameter: shape.diameter,
                    reasons,
                };
                trace!(
                    "rejected contour at ({:.1}, {:.1}): {}",
                    shape.centroid.x,
                    shape.centroid.y,
                    rejection.reason_text()
                );
                rejected.push(rejection);
            }
        }

        let accepted_count = accepted.len();
        order_by_position(&mut accepted);
        accepted.truncate(config.marks_per_row);

        RowDetection {
            candidates: accepted,
            rejected,
            accepted_count,
            enhanced,
            binary,
        }
    }
}
