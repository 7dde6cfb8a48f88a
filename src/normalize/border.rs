//! Sheet border search and edge checks

use crate::config::CanvasConfig;
use crate::models::Point;
use crate::utils::binarization::adaptive_threshold_inv;
use crate::utils::geometry::polygon_area;
use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::filter::gaussian_blur_f32;
use imageproc::point::Point as PixelPoint;
use serde::Serialize;

/// Largest external ink contour of the photo, assumed to be the printed frame.
#[derive(Debug, Clone)]
pub struct BorderContour {
    /// Boundary pixels in tracing order.
    pub points: Vec<PixelPoint<i32>>,
    /// Enclosed area in px².
    pub area: f32,
}

impl BorderContour {
    /// Boundary as floating point vertices.
    pub fn vertices(&self) -> Vec<Point> {
        self.points.iter().copied().map(Point::from).collect()
    }
}

/// External contours of a binary mask, i.e. outer borders with no parent.
pub fn external_contours(binary: &GrayImage) -> Vec<Vec<PixelPoint<i32>>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points)
        .collect()
}

/// Find the largest external contour after blur and inverted adaptive threshold.
pub fn find_border_contour(gray: &GrayImage, config: &CanvasConfig) -> Option<BorderContour> {
    let blurred = gaussian_blur_f32(gray, config.border_blur_sigma);
    let binary = adaptive_threshold_inv(
        &blurred,
        config.border_block_size,
        config.border_threshold_c,
    );

    external_contours(&binary)
        .into_iter()
        .map(|points| {
            let vertices: Vec<Point> = points.iter().copied().map(Point::from).collect();
            let area = polygon_area(&vertices);
            BorderContour { points, area }
        })
        .max_by(|a, b| a.area.total_cmp(&b.area))
}

/// Which edge strip of the image a statistic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    /// First rows.
    Top,
    /// Last rows.
    Bottom,
    /// First columns.
    Left,
    /// Last columns.
    Right,
}

/// Dark pixel statistics for one edge strip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeStats {
    /// Edge the strip belongs to.
    pub edge: Edge,
    /// Pixels below the darkness threshold.
    pub dark_pixels: usize,
    /// Pixels in the strip.
    pub total_pixels: usize,
    /// `dark_pixels / total_pixels` in percent.
    pub dark_percentage: f32,
    /// At least half of the strip is dark.
    pub has_border: bool,
}

/// Result of [`has_dark_border`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BorderReport {
    /// Strip thickness in pixels.
    pub thickness: u32,
    /// Pixels strictly below this value are dark.
    pub threshold: u8,
    /// Statistics for top, bottom, left and right, in that order.
    pub edges: Vec<EdgeStats>,
    /// Every edge is at least half dark.
    pub has_border: bool,
}

/// Check whether all four edge strips of `gray` are mostly dark.
///
/// A cropped sheet that still shows its printed frame has dark strips on
/// every side; one that lost the frame does not. An empty image has no border.
pub fn has_dark_border(gray: &GrayImage, thickness: u32, threshold: u8) -> BorderReport {
    let (width, height) = gray.dimensions();
    let tx = thickness.clamp(1, width.max(1));
    let ty = thickness.clamp(1, height.max(1));

    let strip = |edge: Edge, x0: u32, y0: u32, x1: u32, y1: u32| {
        let mut dark = 0usize;
        let mut total = 0usize;
        for y in y0..y1 {
            for x in x0..x1 {
                total += 1;
                if gray.get_pixel(x, y).0[0] < threshold {
                    dark += 1;
                }
            }
        }
        let dark_percentage = if total == 0 {
            0.0
        } else {
            dark as f32 * 100.0 / total as f32
        };
        EdgeStats {
            edge,
            dark_pixels: dark,
            total_pixels: total,
            dark_percentage,
            has_border: total > 0 && dark_percentage >= 50.0,
        }
    };

    let edges = vec![
        strip(Edge::Top, 0, 0, width, ty.min(height)),
        strip(Edge::Bottom, 0, height.saturating_sub(ty), width, height),
        strip(Edge::Left, 0, 0, tx.min(width), height),
        strip(Edge::Right, width.saturating_sub(tx), 0, width, height),
    ];
    let has_border = edges.iter().all(|e| e.has_border);

    BorderReport {
        thickness,
        threshold,
        edges,
        has_border,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn framed(width: u32, height: u32, frame: u32) -> GrayImage {
        let mut gray = GrayImage::from_pixel(width, height, Luma([240]));
        for (x, y, p) in gray.enumerate_pixels_mut() {
            if x < frame || y < frame || x >= width - frame || y >= height - frame {
                *p = Luma([5]);
            }
        }
        gray
    }

    #[test]
    fn test_framed_image_has_border() {
        let report = has_dark_border(&framed(50, 40, 3), 1, 10);
        assert!(report.has_border);
        assert_eq!(report.edges.len(), 4);
        assert!(report.edges.iter().all(|e| e.dark_percentage == 100.0));
    }

    #[test]
    fn test_one_light_edge_fails() {
        let mut gray = framed(50, 40, 3);
        for y in 0..40 {
            for x in 47..50 {
                gray.put_pixel(x, y, Luma([200]));
            }
        }
        let report = has_dark_border(&gray, 1, 10);
        assert!(!report.has_border);
        let right = &report.edges[3];
        assert_eq!(right.edge, Edge::Right);
        assert!(!right.has_border);
        assert!(report.edges[0].dark_percentage < 100.0);
    }

    #[test]
    fn test_empty_image_has_no_border() {
        let report = has_dark_border(&GrayImage::new(0, 0), 1, 10);
        assert!(!report.has_border);
    }

    #[test]
    fn test_largest_contour_is_the_frame() {
        let mut gray = framed(120, 160, 4);
        // Some ink inside the frame
        for y in 60..70 {
            for x in 50..60 {
                gray.put_pixel(x, y, Luma([5]));
            }
        }
        let border = find_border_contour(&gray, &CanvasConfig::default()).unwrap();
        assert!(border.area > 120.0 * 160.0 * 0.8);
    }

    #[test]
    fn test_blank_page_has_no_contour() {
        let gray = GrayImage::from_pixel(80, 60, Luma([230]));
        assert!(find_border_contour(&gray, &CanvasConfig::default()).is_none());
    }
}
