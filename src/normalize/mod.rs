//! Geometric normalization of a sheet photo
//!
//! A raw photo goes through four steps:
//! 1. Rotate to portrait when the photo is wider than tall
//! 2. Find the printed frame (largest external ink contour)
//! 3. Rectify: perspective warp when the frame simplifies to four corners,
//!    otherwise deskew around the minimum-area rectangle and crop
//! 4. Enhance and resize to the canonical canvas
//!
//! Failing to find a frame is not an error: the enhanced, uncropped photo is
//! used instead and the [`NormalizeReport`] says so.

pub mod border;
pub mod enhance;

pub use border::{BorderReport, Edge, EdgeStats, has_dark_border};
pub use enhance::enhance;

use crate::config::CanvasConfig;
use crate::models::Point;
use crate::utils::geometry::{
    MinAreaRect, approximate_closed_polygon, bounds, closed_perimeter, order_corners,
    rotate_about, warp_quad,
};
use crate::utils::grayscale::rgb_to_gray;
use border::{BorderContour, find_border_contour};
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use log::{debug, warn};
use serde::Serialize;

/// The canonical, fixed-size grayscale sheet every later stage consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct RectifiedCanvas {
    image: GrayImage,
}

impl RectifiedCanvas {
    /// Wrap `gray`, resizing it (bilinear) to the configured canvas size if needed.
    pub fn from_gray(gray: GrayImage, config: &CanvasConfig) -> Self {
        let (w, h) = (config.width, config.height);
        if gray.dimensions() == (w, h) {
            return Self { image: gray };
        }
        if gray.width() == 0 || gray.height() == 0 {
            return Self {
                image: GrayImage::from_pixel(w, h, Luma([255])),
            };
        }
        Self {
            image: imageops::resize(&gray, w, h, FilterType::Triangle),
        }
    }

    /// Canvas pixels.
    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    /// Canvas width.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Canvas height.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Take the pixels out.
    pub fn into_inner(self) -> GrayImage {
        self.image
    }
}

/// How the sheet was rectified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizePath {
    /// Frame simplified to four corners, perspective warped.
    Quadrilateral,
    /// Frame deskewed around its minimum-area rectangle and cropped.
    MinAreaRect,
    /// No frame found, photo used uncropped.
    NoContour,
}

/// What the normalizer did to a photo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizeReport {
    /// Rectification path taken.
    pub path: NormalizePath,
    /// Photo was landscape and turned 90° clockwise first.
    pub rotated_to_portrait: bool,
    /// Input photo size.
    pub source_size: (u32, u32),
    /// Frame corners (TL, TR, BR, BL) on the quadrilateral path.
    pub corners: Option<[(f32, f32); 4]>,
    /// Deskew rotation in degrees on the rectangle path.
    pub deskew_degrees: Option<f32>,
    /// Area of the frame contour in px², 0 when none was found.
    pub border_area: f32,
    /// Size of the rectified sheet before resizing.
    pub rectified_size: (u32, u32),
}

/// Normalize a raw photo into the canonical canvas.
pub fn normalize_sheet(
    raw: &RgbImage,
    config: &CanvasConfig,
) -> (RectifiedCanvas, NormalizeReport) {
    normalize_gray(rgb_to_gray(raw), config)
}

/// Same as [`normalize_sheet`] for a photo that is already grayscale.
pub fn normalize_gray(
    gray: GrayImage,
    config: &CanvasConfig,
) -> (RectifiedCanvas, NormalizeReport) {
    let source_size = gray.dimensions();
    let rotated_to_portrait = gray.height() < gray.width();
    let gray = if rotated_to_portrait {
        imageops::rotate90(&gray)
    } else {
        gray
    };

    let mut report = NormalizeReport {
        path: NormalizePath::NoContour,
        rotated_to_portrait,
        source_size,
        corners: None,
        deskew_degrees: None,
        border_area: 0.0,
        rectified_size: gray.dimensions(),
    };

    let rectified = match find_border_contour(&gray, config) {
        Some(border) => {
            report.border_area = border.area;
            rectify(&gray, &border, config, &mut report)
        }
        None => {
            warn!("no sheet border found, using the uncropped photo");
            gray
        }
    };
    report.rectified_size = rectified.dimensions();

    debug!(
        "normalized {}x{} photo via {:?} to {}x{}",
        source_size.0, source_size.1, report.path, report.rectified_size.0, report.rectified_size.1
    );

    let enhanced = enhance(&rectified, config);
    (RectifiedCanvas::from_gray(enhanced, config), report)
}

fn rectify(
    gray: &GrayImage,
    border: &BorderContour,
    config: &CanvasConfig,
    report: &mut NormalizeReport,
) -> GrayImage {
    let vertices = border.vertices();
    let epsilon = config.polygon_epsilon_fraction * closed_perimeter(&vertices);
    let polygon = approximate_closed_polygon(&vertices, epsilon);

    if let [a, b, c, d] = polygon[..] {
        let corners = order_corners(&[a, b, c, d]);
        if let Some(warped) = warp_corners(gray, &corners, config.border_padding) {
            report.path = NormalizePath::Quadrilateral;
            report.corners = Some(corners.map(|p| (p.x, p.y)));
            return warped;
        }
        debug!("four-corner border could not be warped, falling back to rectangle");
    } else {
        debug!("border simplified to {} vertices, using rectangle", polygon.len());
    }

    match deskew_and_crop(gray, border, config.border_padding, report) {
        Some(cropped) => {
            report.path = NormalizePath::MinAreaRect;
            cropped
        }
        None => {
            warn!("border rectangle is degenerate, using the uncropped photo");
            report.path = NormalizePath::NoContour;
            gray.clone()
        }
    }
}

fn warp_corners(gray: &GrayImage, corners: &[Point; 4], padding: u32) -> Option<GrayImage> {
    let [tl, tr, br, bl] = corners;
    let width = (br.distance(bl) as u32).max(tr.distance(tl) as u32);
    let height = (tr.distance(br) as u32).max(tl.distance(bl) as u32);
    if width < 2 || height < 2 {
        return None;
    }

    let warped = warp_quad(gray, corners, width, height)?;
    let mut padded = GrayImage::from_pixel(width + 2 * padding, height + 2 * padding, Luma([255]));
    imageops::replace(&mut padded, &warped, padding as i64, padding as i64);
    Some(padded)
}

fn deskew_and_crop(
    gray: &GrayImage,
    border: &BorderContour,
    padding: u32,
    report: &mut NormalizeReport,
) -> Option<GrayImage> {
    let rect = MinAreaRect::from_contour(&border.points)?;
    let deskew = rect.deskew_angle();
    report.deskew_degrees = Some(deskew);

    let theta = -deskew.to_radians();
    let rotated = rotate_about(gray, &rect.center, theta, 255);

    let turned: Vec<Point> = border
        .vertices()
        .iter()
        .map(|p| p.rotate_about(&rect.center, theta))
        .collect();
    let (min_x, min_y, max_x, max_y) = bounds(&turned)?;

    let (w, h) = rotated.dimensions();
    let pad = padding as f32;
    let x0 = (min_x.floor() - pad).max(0.0) as u32;
    let y0 = (min_y.floor() - pad).max(0.0) as u32;
    let x1 = ((max_x.ceil() + pad) as u32).min(w.saturating_sub(1));
    let y1 = ((max_y.ceil() + pad) as u32).min(h.saturating_sub(1));
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(imageops::crop_imm(&rotated, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use imageproc::drawing::draw_polygon_mut;
    use imageproc::point::Point as PixelPoint;

    fn framed_photo(width: u32, height: u32, margin: u32, frame: u32) -> RgbImage {
        let mut img = RgbImage::from_pixel(width, height, Rgb([235, 235, 235]));
        for (x, y, p) in img.enumerate_pixels_mut() {
            let inside_outer =
                x >= margin && y >= margin && x < width - margin && y < height - margin;
            let inside_inner = x >= margin + frame
                && y >= margin + frame
                && x < width - margin - frame
                && y < height - margin - frame;
            if inside_outer && !inside_inner {
                *p = Rgb([10, 10, 10]);
            }
        }
        img
    }

    /// Solid 240x340 sheet outline with a 60x60 notch cut from its top-right
    /// corner, turned clockwise by `degrees` about the centre of a 500x600 photo.
    fn notched_photo(degrees: f32) -> RgbImage {
        let (width, height) = (500, 600);
        let center = Point::new(width as f32 / 2.0, height as f32 / 2.0);
        let outline = [
            (-120.0, -170.0),
            (60.0, -170.0),
            (60.0, -110.0),
            (120.0, -110.0),
            (120.0, 170.0),
            (-120.0, 170.0),
        ];
        let points: Vec<PixelPoint<i32>> = outline
            .iter()
            .map(|&(dx, dy)| {
                let p = Point::new(center.x + dx, center.y + dy)
                    .rotate_about(&center, degrees.to_radians());
                PixelPoint::new(p.x.round() as i32, p.y.round() as i32)
            })
            .collect();
        let mut img = RgbImage::from_pixel(width, height, Rgb([235, 235, 235]));
        draw_polygon_mut(&mut img, &points, Rgb([10, 10, 10]));
        img
    }

    #[test]
    fn test_framed_photo_takes_quadrilateral_path() {
        let config = CanvasConfig::default();
        let (canvas, report) = normalize_sheet(&framed_photo(300, 400, 30, 6), &config);
        assert_eq!(report.path, NormalizePath::Quadrilateral);
        assert!(!report.rotated_to_portrait);
        assert_eq!((canvas.width(), canvas.height()), (800, 600));
        let (w, h) = report.rectified_size;
        // Frame is ~240x340 plus padding on each side
        assert!((255..=265).contains(&w), "width {w}");
        assert!((355..=365).contains(&h), "height {h}");
    }

    #[test]
    fn test_landscape_photo_is_turned_to_portrait() {
        let config = CanvasConfig::default();
        let (_, report) = normalize_sheet(&framed_photo(400, 300, 30, 6), &config);
        assert!(report.rotated_to_portrait);
        assert_eq!(report.source_size, (400, 300));
        let (w, h) = report.rectified_size;
        assert!(h > w);
    }

    #[test]
    fn test_blank_photo_is_returned_uncropped() {
        let config = CanvasConfig::default();
        let blank = RgbImage::from_pixel(200, 300, Rgb([240, 240, 240]));
        let (canvas, report) = normalize_sheet(&blank, &config);
        assert_eq!(report.path, NormalizePath::NoContour);
        assert_eq!(report.rectified_size, (200, 300));
        assert_eq!(canvas.image().dimensions(), (800, 600));
    }

    #[test]
    fn test_canvas_from_exact_size_is_untouched() {
        let config = CanvasConfig::default();
        let gray = GrayImage::from_pixel(800, 600, Luma([9]));
        let canvas = RectifiedCanvas::from_gray(gray.clone(), &config);
        assert_eq!(canvas.into_inner(), gray);
    }

    #[test]
    fn test_tilted_notched_frame_takes_rectangle_path() {
        let config = CanvasConfig::default();
        let (canvas, report) = normalize_sheet(&notched_photo(7.0), &config);

        assert_eq!(report.path, NormalizePath::MinAreaRect);
        assert!(report.corners.is_none());
        let deskew = report.deskew_degrees.unwrap();
        assert!((deskew - 7.0).abs() < 1.0, "deskew {deskew}");
        // Outline is 240x340 plus padding on each side
        let (w, h) = report.rectified_size;
        assert!((255..=268).contains(&w), "width {w}");
        assert!((355..=368).contains(&h), "height {h}");
        assert_eq!((canvas.width(), canvas.height()), (800, 600));
    }

    #[test]
    fn test_counter_clockwise_tilt_gives_negative_deskew() {
        let config = CanvasConfig::default();
        let (_, report) = normalize_sheet(&notched_photo(-5.0), &config);
        assert_eq!(report.path, NormalizePath::MinAreaRect);
        let deskew = report.deskew_degrees.unwrap();
        assert!((deskew + 5.0).abs() < 1.0, "deskew {deskew}");
    }

    #[test]
    fn test_deskewed_crop_is_level() {
        let config = CanvasConfig::default();
        let gray = rgb_to_gray(&notched_photo(7.0));
        let border = find_border_contour(&gray, &config).unwrap();
        let mut report = NormalizeReport {
            path: NormalizePath::NoContour,
            rotated_to_portrait: false,
            source_size: gray.dimensions(),
            corners: None,
            deskew_degrees: None,
            border_area: border.area,
            rectified_size: gray.dimensions(),
        };

        let crop = deskew_and_crop(&gray, &border, config.border_padding, &mut report).unwrap();
        let (w, h) = crop.dimensions();
        let value = |x: u32, y: u32| crop.get_pixel(x, y).0[0];

        // 10 px inside the top edge at both ends of its straight part
        assert!(value(20, 20) < 100);
        assert!(value(170, 20) < 100);
        assert!(value(20, h - 20) < 100);
        // The notch stays paper
        assert!(value(w - 30, 30) > 200);
        // The padding stays paper
        assert!(value(2, h / 2) > 200);
    }
}
