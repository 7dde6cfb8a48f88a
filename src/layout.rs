//! Section and row partitioning of the rectified canvas
//!
//! The canvas is split into three vertical bands (the remainder of the
//! integer division goes to the rightmost band), each band is trimmed by
//! fixed top and bottom margins, and each trimmed section is sliced into
//! equal-height question rows. Row crops borrow `row_overlap` pixels from
//! their neighbours; the part that belongs to the row alone is kept as its
//! core.

use crate::config::LayoutConfig;
use crate::models::Section;
use crate::models::section::SECTION_COUNT;
use crate::normalize::RectifiedCanvas;
use image::GrayImage;
use image::imageops;
use std::ops::Range;

/// One trimmed section of the canvas.
#[derive(Debug, Clone)]
pub struct SectionImage {
    /// Which column this is.
    pub section: Section,
    /// Section pixels.
    pub image: GrayImage,
    /// Left edge of the section on the canvas.
    pub canvas_x: u32,
    /// Top edge of the section on the canvas (the top trim).
    pub canvas_y: u32,
}

/// One question row of a section, including the overlap margins.
#[derive(Debug, Clone)]
pub struct QuestionRowImage {
    /// Section the row belongs to.
    pub section: Section,
    /// 1-based row number within the section.
    pub local_row: u32,
    /// Row pixels, overlap margins included.
    pub image: GrayImage,
    /// Top of the crop within the section.
    pub crop_top: u32,
    /// Rows of `image` that belong to this row alone.
    pub core: Range<u32>,
}

impl QuestionRowImage {
    /// Wrap a standalone row image; the whole image is its core.
    pub fn standalone(section: Section, local_row: u32, image: GrayImage) -> Self {
        let height = image.height();
        Self {
            section,
            local_row,
            image,
            crop_top: 0,
            core: 0..height,
        }
    }
}

/// Horizontal extent `(x, width)` of the band at `index` (0 = leftmost).
fn band_extent(width: u32, index: usize) -> (u32, u32) {
    let band = width / SECTION_COUNT as u32;
    let x = band * index as u32;
    if index + 1 == SECTION_COUNT {
        (x, width - x)
    } else {
        (x, band)
    }
}

/// Split the canvas into its three trimmed sections, in question order.
pub fn partition_canvas(canvas: &RectifiedCanvas, layout: &LayoutConfig) -> Vec<SectionImage> {
    let image = canvas.image();
    let height = image.height();
    let top = layout.trim_top.min(height);
    let bottom = height.saturating_sub(layout.trim_bottom).max(top);

    Section::ALL
        .iter()
        .map(|&section| {
            let (x, w) = band_extent(image.width(), section.band_index());
            let pixels = imageops::crop_imm(image, x, top, w, bottom - top).to_image();
            SectionImage {
                section,
                image: pixels,
                canvas_x: x,
                canvas_y: top,
            }
        })
        .collect()
}

/// Natural (non-overlapping) bounds of every row of a section of `height` px.
///
/// Rows have `height / rows` pixels each; the last row runs to the bottom.
pub fn row_bounds(height: u32, rows: u32) -> Vec<Range<u32>> {
    if rows == 0 {
        return Vec::new();
    }
    let row_height = height / rows;
    (0..rows)
        .map(|i| {
            let start = i * row_height;
            let end = if i + 1 == rows { height } else { start + row_height };
            start..end
        })
        .collect()
}

/// Slice a section into its overlapping question rows.
pub fn slice_rows(section: &SectionImage, layout: &LayoutConfig) -> Vec<QuestionRowImage> {
    let height = section.image.height();
    let width = section.image.width();
    let overlap = layout.row_overlap;

    row_bounds(height, layout.rows_per_section)
        .into_iter()
        .enumerate()
        .map(|(i, natural)| {
            let top = natural.start.saturating_sub(overlap);
            let bottom = (natural.end + overlap).min(height);
            let image = imageops::crop_imm(&section.image, 0, top, width, bottom - top).to_image();
            QuestionRowImage {
                section: section.section,
                local_row: i as u32 + 1,
                image,
                crop_top: top,
                core: (natural.start - top)..(natural.end - top),
            }
        })
        .collect()
}

/// Partition a canvas straight into all of its question rows.
pub fn partition_rows(canvas: &RectifiedCanvas, layout: &LayoutConfig) -> Vec<QuestionRowImage> {
    partition_canvas(canvas, layout)
        .iter()
        .flat_map(|section| slice_rows(section, layout))
        .collect()
}
