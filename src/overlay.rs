//! Diagnostic drawings for rows and sections
//!
//! Nothing here feeds back into decisions; the images are for humans looking
//! at why a row was read the way it was.

use crate::config::LayoutConfig;
use crate::detector::{FillDecision, RowDetection};
use crate::layout::{SectionImage, row_bounds};
use crate::models::BoundingBox;
use crate::utils::grayscale::gray_to_rgb;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::point::Point as PixelPoint;
use imageproc::rect::Rect;

/// Selected mark.
pub const SELECTED: Rgb<u8> = Rgb([0, 200, 0]);
/// Retained but unselected mark.
pub const UNSELECTED: Rgb<u8> = Rgb([140, 140, 140]);
/// Rejected contour.
pub const REJECTED: Rgb<u8> = Rgb([255, 200, 0]);
/// Selected mark that disagrees with the answer key.
pub const WRONG: Rgb<u8> = Rgb([220, 0, 0]);
/// Row division line.
pub const CUT: Rgb<u8> = Rgb([220, 0, 0]);
/// Overlap margin line.
pub const OVERLAP: Rgb<u8> = Rgb([0, 90, 230]);

fn draw_contour(image: &mut RgbImage, contour: &[PixelPoint<i32>], color: Rgb<u8>) {
    match contour {
        [] => {}
        [p] => {
            if p.x >= 0
                && p.y >= 0
                && (p.x as u32) < image.width()
                && (p.y as u32) < image.height()
            {
                image.put_pixel(p.x as u32, p.y as u32, color);
            }
        }
        _ => {
            for (i, a) in contour.iter().enumerate() {
                let b = &contour[(i + 1) % contour.len()];
                draw_line_segment_mut(
                    image,
                    (a.x as f32, a.y as f32),
                    (b.x as f32, b.y as f32),
                    color,
                );
            }
        }
    }
}

fn draw_box(image: &mut RgbImage, bbox: &BoundingBox, margin: i32, color: Rgb<u8>) {
    let rect = Rect::at(bbox.x - margin, bbox.y - margin)
        .of_size(bbox.width + 2 * margin as u32, bbox.height + 2 * margin as u32);
    draw_hollow_rect_mut(image, rect, color);
}

/// Draw a row's contours over its enhanced image.
///
/// Selected marks are green, unselected grey, rejected contours yellow.
/// With an answer key position, that mark gets a green box and any selected
/// mark that is not the key is drawn red instead.
pub fn draw_row_overlay(
    detection: &RowDetection,
    fill: &FillDecision,
    answer_key: Option<usize>,
) -> RgbImage {
    let mut image = gray_to_rgb(&detection.enhanced);

    for rejected in &detection.rejected {
        draw_contour(&mut image, &rejected.contour, REJECTED);
    }

    for (position, candidate) in detection.candidates.iter().enumerate() {
        let selected = fill.marked_positions.contains(&position);
        let color = match (selected, answer_key) {
            (true, Some(key)) if key != position => WRONG,
            (true, _) => SELECTED,
            (false, _) => UNSELECTED,
        };
        draw_contour(&mut image, &candidate.contour, color);
    }

    if let Some(candidate) = answer_key.and_then(|key| detection.candidates.get(key)) {
        draw_box(&mut image, &candidate.bbox, 3, SELECTED);
    }

    image
}

/// Draw row division lines and overlap margins over a section.
pub fn draw_row_cuts(section: &SectionImage, layout: &LayoutConfig) -> RgbImage {
    let mut image = gray_to_rgb(&section.image);
    let (width, height) = section.image.dimensions();
    let right = width.saturating_sub(1) as f32;

    let hline = |image: &mut RgbImage, y: u32, color: Rgb<u8>| {
        if y < height {
            draw_line_segment_mut(image, (0.0, y as f32), (right, y as f32), color);
        }
    };

    let bounds = row_bounds(height, layout.rows_per_section);
    for row in bounds.iter().skip(1) {
        let cut = row.start;
        hline(&mut image, cut.saturating_sub(layout.row_overlap), OVERLAP);
        hline(&mut image, cut + layout.row_overlap, OVERLAP);
        hline(&mut image, cut, CUT);
    }

    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarkConfig;
    use crate::detector::MarkDetector;
    use crate::detector::fill::FillMeasurement;
    use crate::models::Section;
    use image::{GrayImage, Luma};
    use imageproc::drawing::draw_filled_circle_mut;

    #[test]
    fn test_row_overlay_colours_selected_and_wrong() {
        let mut row = GrayImage::from_pixel(420, 70, Luma([255]));
        for x in [60, 160, 260, 360] {
            draw_filled_circle_mut(&mut row, (x, 35), 20, Luma([30]));
        }
        let detection = MarkDetector::detect(&row, None, &MarkConfig::default());
        assert_eq!(detection.candidates.len(), 4);
        let measurements = (0..4)
            .map(|position| FillMeasurement {
                position,
                mask_pixels: 1,
                dark_pixels: 1,
                fill_ratio: 1.0,
                mean_intensity: 0.0,
            })
            .collect();
        let fill = FillDecision {
            measurements,
            marked_positions: vec![0, 1],
        };

        let overlay = draw_row_overlay(&detection, &fill, Some(0));
        let has = |color: Rgb<u8>| overlay.pixels().any(|p| *p == color);
        assert!(has(SELECTED));
        assert!(has(WRONG));
        assert!(has(UNSELECTED));
        assert_eq!(overlay.dimensions(), (420, 70));
    }

    #[test]
    fn test_row_cuts_drawn_between_rows() {
        let section = SectionImage {
            section: Section::Left,
            image: GrayImage::from_pixel(100, 150, Luma([255])),
            canvas_x: 0,
            canvas_y: 60,
        };
        let layout = LayoutConfig::default();
        let image = draw_row_cuts(&section, &layout);
        // Rows are 10px high: first cut at y=10, overlap lines at 5 and 15
        assert_eq!(*image.get_pixel(50, 10), CUT);
        assert_eq!(*image.get_pixel(50, 5), OVERLAP);
        assert_eq!(*image.get_pixel(50, 15), OVERLAP);
        assert_eq!(*image.get_pixel(50, 2), Rgb([255, 255, 255]));
    }
}
