use crate::config::SectionOffsets;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three physical answer columns of the sheet.
///
/// The printed layout numbers questions right-to-left across columns: the
/// rightmost column holds questions 1-15, the middle 16-30 and the leftmost
/// 31-45.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// Rightmost column.
    Right,
    /// Middle column.
    Middle,
    /// Leftmost column.
    Left,
}

/// Number of sections on a sheet.
pub const SECTION_COUNT: usize = 3;

impl Section {
    /// All sections in question-number order.
    pub const ALL: [Section; SECTION_COUNT] = [Section::Right, Section::Middle, Section::Left];

    /// Index of the vertical band holding this section, counted from the left edge.
    pub fn band_index(self) -> usize {
        match self {
            Section::Left => 0,
            Section::Middle => 1,
            Section::Right => 2,
        }
    }

    /// Global question offset of this section.
    pub fn offset(self, offsets: &SectionOffsets) -> u32 {
        match self {
            Section::Right => offsets.right,
            Section::Middle => offsets.middle,
            Section::Left => offsets.left,
        }
    }

    /// Map a 1-based local row to its global question number.
    ///
    /// Returns `None` when `local_row` is outside `1..=rows_per_section`.
    pub fn global_question(
        self,
        local_row: u32,
        rows_per_section: u32,
        offsets: &SectionOffsets,
    ) -> Option<u32> {
        if local_row == 0 || local_row > rows_per_section {
            return None;
        }
        Some(self.offset(offsets) + local_row)
    }

    /// Lower-case name, as used in file names and reports.
    pub fn name(self) -> &'static str {
        match self {
            Section::Right => "right",
            Section::Middle => "middle",
            Section::Left => "left",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
