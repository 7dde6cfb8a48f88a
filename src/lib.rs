//! bubble_sheet - read photographed multiple-choice answer sheets
//!
//! A sheet holds 45 questions in three columns of 15 rows, each row with
//! four circular answer marks. A photo is normalized to a fixed-size canvas,
//! cut into question rows, and every row is scanned for marks and their
//! fill.
//!
//! ```no_run
//! use bubble_sheet::{ScanConfig, SheetScanner};
//!
//! let scanner = SheetScanner::new(ScanConfig::default().with_env_overrides())?;
//! let result = scanner.scan_path("sheet.jpg")?;
//! for decision in result.iter() {
//!     println!("Q{}: {:?}", decision.question, decision.marked_positions);
//! }
//! # Ok::<(), bubble_sheet::ScanError>(())
//! ```
//!
//! Mark positions count from the right: position 0 is the rightmost mark
//! of a row.

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Tunable thresholds and their sources
pub mod config;
mod debug;
/// Per-row mark detection and fill classification
pub mod detector;
/// Error type and result alias
pub mod error;
/// Section and row partitioning
pub mod layout;
/// Core data structures (Section, MarkCandidate, QuestionDecision, etc.)
pub mod models;
/// Photo rectification and enhancement
pub mod normalize;
/// Diagnostic drawings
pub mod overlay;
/// End-to-end scanning
pub mod pipeline;
/// Shared helpers for the binary and benches
pub mod tools;
/// Utility functions (grayscale, binarization, contrast, geometry)
pub mod utils;

pub use config::ScanConfig;
pub use error::{Result, ScanError};
pub use models::{QuestionDecision, Section, SheetResult};
pub use normalize::{NormalizeReport, RectifiedCanvas, normalize_sheet};
pub use pipeline::{RowReport, ScanReport, SheetScanner, scan_sheet};
