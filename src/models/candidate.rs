use super::Point;
use std::fmt;

/// Axis-aligned pixel bounding box (inclusive of both edge pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingBox {
    /// Leftmost column.
    pub x: i32,
    /// Topmost row.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl BoundingBox {
    /// Long side over short side; 0 for a degenerate box.
    pub fn aspect_ratio(&self) -> f32 {
        let long = self.width.max(self.height);
        let short = self.width.min(self.height);
        if short == 0 {
            0.0
        } else {
            long as f32 / short as f32
        }
    }
}

/// One accepted bubble candidate within a row image.
#[derive(Debug, Clone)]
pub struct MarkCandidate {
    /// Boundary pixels, in tracing order.
    pub contour: Vec<imageproc::point::Point<i32>>,
    /// Position of the contour in discovery order among all row contours.
    pub discovery_index: usize,
    /// Enclosed polygon area in px².
    pub area: f32,
    /// Closed boundary length in px.
    pub perimeter: f32,
    /// 4π·area / perimeter².
    pub circularity: f32,
    /// Bounding box long side over short side.
    pub aspect_ratio: f32,
    /// Diameter of the disc with the same area.
    pub diameter: f32,
    /// Area-weighted centroid.
    pub centroid: Point,
    /// Bounding box.
    pub bbox: BoundingBox,
}

/// Why a contour was not accepted as a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// Area at or below the minimum.
    TooSmall,
    /// Area at or above the maximum.
    TooLarge,
    /// Circularity at or below the threshold.
    LowCircularity,
    /// Aspect ratio at or above the threshold.
    HighAspectRatio,
    /// Centroid inside the overlap margin borrowed from a neighbouring row.
    OutsideRowCore,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectionReason::TooSmall => "Too small",
            RejectionReason::TooLarge => "Too large",
            RejectionReason::LowCircularity => "Low circularity",
            RejectionReason::HighAspectRatio => "High aspect ratio",
            RejectionReason::OutsideRowCore => "Outside row core",
        };
        f.write_str(text)
    }
}

/// A contour that failed the acceptance rule, kept for diagnostics only.
#[derive(Debug, Clone)]
pub struct RejectedContour {
    /// Boundary pixels, in tracing order.
    pub contour: Vec<imageproc::point::Point<i32>>,
    /// Enclosed polygon area in px².
    pub area: f32,
    /// Circularity.
    pub circularity: f32,
    /// Bounding box aspect ratio.
    pub aspect_ratio: f32,
    /// Equivalent diameter.
    pub diameter: f32,
    /// Every rule the contour failed.
    pub reasons: Vec<RejectionReason>,
}

impl RejectedContour {
    /// Human-readable reason tag, e.g. `"Too small & Low circularity"`.
    pub fn reason_text(&self) -> String {
        self.reasons
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(" & ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio() {
        let b = BoundingBox {
            x: 0,
            y: 0,
            width: 10,
            height: 40,
        };
        assert_eq!(b.aspect_ratio(), 4.0);
        let degenerate = BoundingBox::default();
        assert_eq!(degenerate.aspect_ratio(), 0.0);
    }

    #[test]
    fn test_reason_text_joins_all_reasons() {
        let r = RejectedContour {
            contour: Vec::new(),
            area: 10.0,
            circularity: 0.1,
            aspect_ratio: 3.0,
            diameter: 3.5,
            reasons: vec![
                RejectionReason::TooSmall,
                RejectionReason::LowCircularity,
                RejectionReason::HighAspectRatio,
            ],
        };
        assert_eq!(
            r.reason_text(),
            "Too small & Low circularity & High aspect ratio"
        );
    }
}
