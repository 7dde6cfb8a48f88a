//! End-to-end sheet scanning
//!
//! Normalize the photo, partition the canvas into question rows, then detect
//! and classify every row in parallel. Each row yields at most one
//! [`QuestionDecision`]; the decisions merge into a [`SheetResult`] ordered
//! by question number.

use crate::config::ScanConfig;
use crate::debug::debug_dump_dir;
use crate::detector::{FillClassifier, FillDecision, MarkDetector, RowDetection};
use crate::error::{Result, ScanError};
use crate::layout::{QuestionRowImage, partition_canvas, slice_rows};
use crate::models::{QuestionDecision, Section, SheetResult};
use crate::normalize::{NormalizeReport, RectifiedCanvas, normalize_sheet};
use crate::overlay::{draw_row_cuts, draw_row_overlay};
use image::RgbImage;
use log::{debug, warn};
use rayon::prelude::*;
use std::path::Path;

/// Everything learned about one row, for diagnostics.
#[derive(Debug, Clone)]
pub struct RowReport {
    /// Section of the row.
    pub section: Section,
    /// 1-based row within the section.
    pub local_row: u32,
    /// Global question number, `None` when the row is outside the numbering.
    pub question: Option<u32>,
    /// Candidates, rejections and the enhanced row image.
    pub detection: RowDetection,
    /// Fill measurements and selected positions.
    pub fill: FillDecision,
}

impl RowReport {
    /// The decision this row contributes to the sheet result, if numbered.
    pub fn decision(&self) -> Option<QuestionDecision> {
        let question = self.question?;
        Some(QuestionDecision {
            question,
            marked_positions: self.fill.marked_positions.clone(),
            fill_ratios: self.fill.measurements.iter().map(|m| m.fill_ratio).collect(),
            mean_intensities: self.fill.measurements.iter().map(|m| m.mean_intensity).collect(),
            candidate_count: self.detection.candidates.len(),
            accepted_count: self.detection.accepted_count,
        })
    }
}

/// Diagnostics of a full scan.
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// What the normalizer did.
    pub normalize: NormalizeReport,
    /// One report per row, in section then row order.
    pub rows: Vec<RowReport>,
}

/// Reads answer sheets with a fixed configuration.
#[derive(Debug, Clone)]
pub struct SheetScanner {
    config: ScanConfig,
}

impl SheetScanner {
    /// Create a scanner; the configuration is validated once here.
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Total questions on a sheet under this configuration.
    pub fn question_count(&self) -> u32 {
        Section::ALL.len() as u32 * self.config.layout.rows_per_section
    }

    /// Load a photo from disk and scan it.
    pub fn scan_path<P: AsRef<Path>>(&self, path: P) -> Result<SheetResult> {
        let raw = crate::tools::load_rgb(path)?;
        self.scan(&raw)
    }

    /// Scan a photo.
    pub fn scan(&self, raw: &RgbImage) -> Result<SheetResult> {
        self.scan_with_report(raw).map(|(result, _)| result)
    }

    /// Scan a photo and keep per-row diagnostics.
    pub fn scan_with_report(&self, raw: &RgbImage) -> Result<(SheetResult, ScanReport)> {
        let (width, height) = raw.dimensions();
        if width == 0 || height == 0 {
            return Err(ScanError::EmptyImage { width, height });
        }

        let (canvas, normalize) = normalize_sheet(raw, &self.config.canvas);
        let rows = self.analyze_canvas(&canvas);
        let result = SheetResult::from_decisions(rows.iter().filter_map(RowReport::decision));

        debug!(
            "scanned sheet: {} of {} questions decided",
            result.len(),
            self.question_count()
        );
        Ok((result, ScanReport { normalize, rows }))
    }

    /// Scan an already rectified canvas.
    pub fn scan_canvas(&self, canvas: &RectifiedCanvas) -> SheetResult {
        let rows = self.analyze_canvas(canvas);
        SheetResult::from_decisions(rows.iter().filter_map(RowReport::decision))
    }

    /// Decide a set of partitioned rows. Rows outside the numbering are omitted.
    pub fn scan_rows(&self, rows: &[QuestionRowImage]) -> SheetResult {
        let reports: Vec<RowReport> = rows.par_iter().map(|row| self.analyze_row(row)).collect();
        SheetResult::from_decisions(reports.iter().filter_map(RowReport::decision))
    }

    /// Detect and classify one row.
    pub fn analyze_row(&self, row: &QuestionRowImage) -> RowReport {
        let layout = &self.config.layout;
        let question = row
            .section
            .global_question(row.local_row, layout.rows_per_section, &layout.offsets);

        let detection = MarkDetector::detect_row(row, &self.config.marks);
        let fill = FillClassifier::classify(
            &detection.candidates,
            &detection.enhanced,
            &self.config.fill,
        );

        let expected = self.config.marks.marks_per_row;
        let label = question.map_or_else(|| "unnumbered".to_string(), |q| format!("Q{q}"));
        if detection.candidates.len() < expected {
            warn!(
                "{label} ({} row {}): {} of {expected} marks found",
                row.section,
                row.local_row,
                detection.candidates.len()
            );
        } else if detection.accepted_count > expected {
            warn!(
                "{label} ({} row {}): {} marks accepted, kept the {expected} rightmost",
                row.section, row.local_row, detection.accepted_count
            );
        }
        debug!(
            "{label}: marked {:?}, {} rejected contours",
            fill.marked_positions,
            detection.rejected.len()
        );

        RowReport {
            section: row.section,
            local_row: row.local_row,
            question,
            detection,
            fill,
        }
    }

    fn analyze_canvas(&self, canvas: &RectifiedCanvas) -> Vec<RowReport> {
        let layout = &self.config.layout;
        let sections = partition_canvas(canvas, layout);
        let rows: Vec<QuestionRowImage> = sections
            .iter()
            .flat_map(|section| slice_rows(section, layout))
            .collect();
        debug!("partitioned canvas into {} rows", rows.len());

        let reports: Vec<RowReport> = rows.par_iter().map(|row| self.analyze_row(row)).collect();

        if let Some(dir) = debug_dump_dir() {
            dump_diagnostics(dir, canvas, &sections, &reports, layout);
        }
        reports
    }
}

fn dump_diagnostics(
    dir: &Path,
    canvas: &RectifiedCanvas,
    sections: &[crate::layout::SectionImage],
    reports: &[RowReport],
    layout: &crate::config::LayoutConfig,
) {
    if let Err(err) = std::fs::create_dir_all(dir) {
        warn!("cannot create debug dir {}: {err}", dir.display());
        return;
    }

    let save = |name: String, result: image::ImageResult<()>| {
        if let Err(err) = result {
            warn!("failed to write debug image {name}: {err}");
        }
    };

    save("canvas.png".into(), canvas.image().save(dir.join("canvas.png")));
    for section in sections {
        let name = format!("cuts_{}.png", section.section);
        save(name.clone(), draw_row_cuts(section, layout).save(dir.join(&name)));
    }
    for report in reports {
        let name = format!("row_{}_{:02}.png", report.section, report.local_row);
        let overlay = draw_row_overlay(&report.detection, &report.fill, None);
        save(name.clone(), overlay.save(dir.join(&name)));
    }
    debug!("wrote diagnostics to {}", dir.display());
}

/// Scan a photo with the default configuration.
pub fn scan_sheet(raw: &RgbImage) -> Result<SheetResult> {
    SheetScanner::new(ScanConfig::default())?.scan(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};

    fn row_image() -> GrayImage {
        let mut row = GrayImage::from_pixel(420, 70, Luma([255]));
        // Filled at x = 60, 160, 360; open circle at x = 260
        for x in [60, 160, 360] {
            draw_filled_circle_mut(&mut row, (x, 35), 20, Luma([30]));
        }
        for r in 18..=20 {
            draw_hollow_circle_mut(&mut row, (260, 35), r, Luma([30]));
        }
        row
    }

    #[test]
    fn test_three_filled_one_open() {
        let scanner = SheetScanner::new(ScanConfig::default()).unwrap();
        let row = QuestionRowImage::standalone(Section::Middle, 7, row_image());
        let report = scanner.analyze_row(&row);
        let decision = report.decision().unwrap();

        assert_eq!(decision.question, 22);
        assert_eq!(decision.candidate_count, 4);
        assert!(decision.is_reliable(4));
        // Open circle at x=260 is position 1 (second from the right)
        let mut marked = decision.marked_positions.clone();
        marked.sort();
        assert_eq!(marked, vec![0, 2, 3]);
        assert!(decision.fill_ratios[1] < 0.46);
        assert_eq!(decision.fill_ratios.len(), 4);
    }

    #[test]
    fn test_blank_row_gives_empty_decision() {
        let scanner = SheetScanner::new(ScanConfig::default()).unwrap();
        let row = QuestionRowImage::standalone(
            Section::Right,
            15,
            GrayImage::from_pixel(420, 70, Luma([245])),
        );
        let decision = scanner.analyze_row(&row).decision().unwrap();
        assert_eq!(decision.question, 15);
        assert_eq!(decision.candidate_count, 0);
        assert!(decision.marked_positions.is_empty());
        assert!(decision.fill_ratios.is_empty());
    }

    #[test]
    fn test_short_row_is_not_padded() {
        let scanner = SheetScanner::new(ScanConfig::default()).unwrap();
        let mut image = GrayImage::from_pixel(420, 70, Luma([255]));
        draw_filled_circle_mut(&mut image, (160, 35), 20, Luma([30]));
        for r in 18..=20 {
            draw_hollow_circle_mut(&mut image, (360, 35), r, Luma([30]));
        }
        let row = QuestionRowImage::standalone(Section::Right, 3, image);
        let decision = scanner.analyze_row(&row).decision().unwrap();

        assert_eq!(decision.candidate_count, 2);
        assert_eq!(decision.fill_ratios.len(), 2);
        assert_eq!(decision.mean_intensities.len(), 2);
        assert!(!decision.is_reliable(4));
        // Open ring on the right is position 0, the filled disc position 1
        assert_eq!(decision.marked_positions, vec![1]);
    }

    #[test]
    fn test_rows_outside_numbering_are_omitted() {
        let scanner = SheetScanner::new(ScanConfig::default()).unwrap();
        let rows = vec![
            QuestionRowImage::standalone(Section::Left, 1, row_image()),
            QuestionRowImage::standalone(Section::Left, 16, row_image()),
        ];
        let result = scanner.scan_rows(&rows);
        assert_eq!(result.len(), 1);
        assert!(result.get(31).is_some());
    }

    #[test]
    fn test_empty_image_is_an_error() {
        let scanner = SheetScanner::new(ScanConfig::default()).unwrap();
        assert!(matches!(
            scanner.scan(&RgbImage::new(0, 0)),
            Err(ScanError::EmptyImage { .. })
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected_up_front() {
        let mut config = ScanConfig::default();
        config.fill.fill_ratio_threshold = 1.5;
        assert!(matches!(
            SheetScanner::new(config),
            Err(ScanError::InvalidConfig(_))
        ));
    }
}
