//! Scanner configuration
//!
//! Every tunable threshold of the pipeline lives here. A [`ScanConfig`] is
//! built once (defaults, optionally a JSON file, optionally `OMR_*`
//! environment overrides), validated, and then passed by reference into each
//! stage. Nothing in the pipeline mutates it.

use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::path::Path;

fn parse_env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn parse_env_f32(name: &str, default: f32) -> f32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

fn parse_env_u8(name: &str, default: u8) -> u8 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .unwrap_or(default)
}

fn parse_env_bool_u8(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .map(|v| v != 0)
        .unwrap_or(default)
}

/// Top-level configuration for a sheet scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScanConfig {
    /// Border detection, enhancement and canonical canvas size.
    pub canvas: CanvasConfig,
    /// Section and row partitioning.
    pub layout: LayoutConfig,
    /// Mark candidate segmentation and shape filtering.
    pub marks: MarkConfig,
    /// Fill classification.
    pub fill: FillConfig,
}

/// Geometric normalizer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Canonical canvas width in pixels.
    pub width: u32,
    /// Canonical canvas height in pixels.
    pub height: u32,
    /// White padding added around the rectified sheet.
    pub border_padding: u32,
    /// Gaussian sigma used before border thresholding (5x5 kernel equivalent).
    pub border_blur_sigma: f32,
    /// Adaptive threshold window for border detection (odd).
    pub border_block_size: u32,
    /// Constant subtracted from the local mean for border detection.
    pub border_threshold_c: f32,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    pub polygon_epsilon_fraction: f32,
    /// Local contrast clip limit.
    pub contrast_clip_limit: f32,
    /// Local contrast tile grid (tiles per side).
    pub contrast_tiles: u32,
    /// Sigma of the blur used by the unsharp mask.
    pub unsharp_sigma: f32,
    /// Weight of the absolute Laplacian added for edge emphasis.
    pub laplacian_weight: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            border_padding: 10,
            border_blur_sigma: 1.1,
            border_block_size: 11,
            border_threshold_c: 2.0,
            polygon_epsilon_fraction: 0.02,
            contrast_clip_limit: 2.0,
            contrast_tiles: 8,
            unsharp_sigma: 1.5,
            laplacian_weight: 0.3,
        }
    }
}

/// Global question offsets per physical section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionOffsets {
    /// Offset of the rightmost section (questions 1-15 by default).
    pub right: u32,
    /// Offset of the middle section (questions 16-30 by default).
    pub middle: u32,
    /// Offset of the leftmost section (questions 31-45 by default).
    pub left: u32,
}

impl Default for SectionOffsets {
    fn default() -> Self {
        Self {
            right: 0,
            middle: 15,
            left: 30,
        }
    }
}

/// Partitioner parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Question rows per section.
    pub rows_per_section: u32,
    /// Extra pixels included above and below each row crop.
    pub row_overlap: u32,
    /// Pixels trimmed from the top of every section.
    pub trim_top: u32,
    /// Pixels trimmed from the bottom of every section.
    pub trim_bottom: u32,
    /// Section to global question number offsets.
    pub offsets: SectionOffsets,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            rows_per_section: 15,
            row_overlap: 5,
            trim_top: 60,
            trim_bottom: 60,
            offsets: SectionOffsets::default(),
        }
    }
}

/// Mark candidate detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkConfig {
    /// Smallest accepted equivalent diameter in pixels.
    pub min_diameter: f32,
    /// Largest accepted equivalent diameter in pixels.
    pub max_diameter: f32,
    /// Circularity must be strictly above this.
    pub circularity_threshold: f32,
    /// Bounding box aspect ratio must be strictly below this.
    pub aspect_ratio_threshold: f32,
    /// Number of marks retained per row.
    pub marks_per_row: usize,
    /// Adaptive threshold window for ink segmentation (odd).
    pub threshold_block_size: u32,
    /// Constant subtracted from the local mean for ink segmentation.
    pub threshold_c: f32,
    /// Local contrast clip limit.
    pub contrast_clip_limit: f32,
    /// Local contrast tile grid (tiles per side).
    pub contrast_tiles: u32,
    /// Reject candidates whose centroid lies in the overlap margin of a row.
    pub restrict_to_row_core: bool,
}

impl Default for MarkConfig {
    fn default() -> Self {
        Self {
            min_diameter: 25.0,
            max_diameter: 100.0,
            circularity_threshold: 0.20,
            aspect_ratio_threshold: 2.5,
            marks_per_row: 4,
            threshold_block_size: 21,
            threshold_c: 7.0,
            contrast_clip_limit: 2.0,
            contrast_tiles: 8,
            restrict_to_row_core: true,
        }
    }
}

impl MarkConfig {
    /// Area of a disc with the minimum diameter.
    pub fn min_area(&self) -> f32 {
        disc_area(self.min_diameter)
    }

    /// Area of a disc with the maximum diameter.
    pub fn max_area(&self) -> f32 {
        disc_area(self.max_diameter)
    }
}

fn disc_area(diameter: f32) -> f32 {
    PI * (diameter / 2.0).powi(2)
}

/// Fill classifier parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillConfig {
    /// Pixels strictly below this intensity count as ink.
    pub dark_threshold: u8,
    /// A mark is selected when its fill ratio is strictly above this.
    pub fill_ratio_threshold: f32,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            dark_threshold: 120,
            fill_ratio_threshold: 0.46,
        }
    }
}

impl ScanConfig {
    /// Load a configuration from a JSON file. Missing fields keep defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: ScanConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `OMR_*` environment overrides on top of this configuration.
    ///
    /// Unset or unparsable variables leave the current value untouched.
    pub fn with_env_overrides(mut self) -> Self {
        let c = &mut self.canvas;
        c.width = parse_env_u32("OMR_CANVAS_WIDTH", c.width);
        c.height = parse_env_u32("OMR_CANVAS_HEIGHT", c.height);
        c.border_padding = parse_env_u32("OMR_BORDER_PADDING", c.border_padding);

        let l = &mut self.layout;
        l.rows_per_section = parse_env_u32("OMR_ROWS_PER_SECTION", l.rows_per_section);
        l.row_overlap = parse_env_u32("OMR_ROW_OVERLAP", l.row_overlap);
        l.trim_top = parse_env_u32("OMR_TRIM_TOP", l.trim_top);
        l.trim_bottom = parse_env_u32("OMR_TRIM_BOTTOM", l.trim_bottom);

        let m = &mut self.marks;
        m.min_diameter = parse_env_f32("OMR_MIN_DIAMETER", m.min_diameter);
        m.max_diameter = parse_env_f32("OMR_MAX_DIAMETER", m.max_diameter);
        m.circularity_threshold = parse_env_f32("OMR_CIRCULARITY", m.circularity_threshold);
        m.aspect_ratio_threshold = parse_env_f32("OMR_ASPECT_RATIO", m.aspect_ratio_threshold);
        m.restrict_to_row_core = parse_env_bool_u8("OMR_ROW_CORE_ONLY", m.restrict_to_row_core);

        let f = &mut self.fill;
        f.dark_threshold = parse_env_u8("OMR_DARK_THRESHOLD", f.dark_threshold);
        f.fill_ratio_threshold = parse_env_f32("OMR_FILL_RATIO", f.fill_ratio_threshold);

        self
    }

    /// Check that the configuration is internally consistent.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ScanError::InvalidConfig(msg));

        let c = &self.canvas;
        if c.width < 3 || c.height == 0 {
            return invalid(format!("canvas {}x{} is too small", c.width, c.height));
        }
        if c.border_block_size < 3 || c.border_block_size % 2 == 0 {
            return invalid(format!(
                "border_block_size must be odd and >= 3, got {}",
                c.border_block_size
            ));
        }
        if c.border_blur_sigma <= 0.0 || c.unsharp_sigma <= 0.0 {
            return invalid("blur sigmas must be positive".to_string());
        }
        if !(c.polygon_epsilon_fraction > 0.0 && c.polygon_epsilon_fraction < 1.0) {
            return invalid(format!(
                "polygon_epsilon_fraction must be in (0, 1), got {}",
                c.polygon_epsilon_fraction
            ));
        }
        if c.contrast_tiles == 0 || c.contrast_clip_limit <= 0.0 {
            return invalid("contrast tiles and clip limit must be positive".to_string());
        }

        let l = &self.layout;
        if l.rows_per_section == 0 {
            return invalid("rows_per_section must be positive".to_string());
        }
        let trimmed = l.trim_top as u64 + l.trim_bottom as u64;
        if trimmed >= c.height as u64 {
            return invalid(format!(
                "trim margins {}+{} leave no section height on a {}px canvas",
                l.trim_top, l.trim_bottom, c.height
            ));
        }
        let section_height = c.height - l.trim_top - l.trim_bottom;
        if section_height < l.rows_per_section {
            return invalid(format!(
                "{} rows do not fit in a {}px section",
                l.rows_per_section, section_height
            ));
        }

        let m = &self.marks;
        if !(m.min_diameter > 0.0 && m.min_diameter < m.max_diameter) {
            return invalid(format!(
                "diameter bounds must satisfy 0 < min < max, got {}..{}",
                m.min_diameter, m.max_diameter
            ));
        }
        if m.circularity_threshold < 0.0 || m.aspect_ratio_threshold < 1.0 {
            return invalid("shape thresholds out of range".to_string());
        }
        if m.marks_per_row == 0 {
            return invalid("marks_per_row must be positive".to_string());
        }
        if m.threshold_block_size < 3 || m.threshold_block_size % 2 == 0 {
            return invalid(format!(
                "threshold_block_size must be odd and >= 3, got {}",
                m.threshold_block_size
            ));
        }
        if m.contrast_tiles == 0 || m.contrast_clip_limit <= 0.0 {
            return invalid("contrast tiles and clip limit must be positive".to_string());
        }

        let f = &self.fill;
        if !(0.0..1.0).contains(&f.fill_ratio_threshold) {
            return invalid(format!(
                "fill_ratio_threshold must be in [0, 1), got {}",
                f.fill_ratio_threshold
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScanConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.canvas.width, 800);
        assert_eq!(config.canvas.height, 600);
        assert_eq!(config.layout.rows_per_section, 15);
        assert_eq!(config.fill.dark_threshold, 120);
    }

    #[test]
    fn test_area_bounds_from_diameters() {
        let marks = MarkConfig::default();
        assert!((marks.min_area() - 490.87).abs() < 0.1);
        assert!((marks.max_area() - 7853.98).abs() < 0.1);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "fill": { "fill_ratio_threshold": 0.5 }, "layout": { "row_overlap": 3 } }"#;
        let config: ScanConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.fill.fill_ratio_threshold, 0.5);
        assert_eq!(config.fill.dark_threshold, 120);
        assert_eq!(config.layout.row_overlap, 3);
        assert_eq!(config.layout.trim_top, 60);
        assert_eq!(config.marks, MarkConfig::default());
    }

    #[test]
    fn test_validate_rejects_inverted_diameters() {
        let mut config = ScanConfig::default();
        config.marks.min_diameter = 120.0;
        assert!(matches!(
            config.validate(),
            Err(ScanError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_even_block() {
        let mut config = ScanConfig::default();
        config.marks.threshold_block_size = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_trim() {
        let mut config = ScanConfig::default();
        config.layout.trim_top = 300;
        config.layout.trim_bottom = 300;
        assert!(config.validate().is_err());
    }
}
