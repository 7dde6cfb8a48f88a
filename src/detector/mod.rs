//! Bubble detection modules
//!
//! This module contains the per-row logic of the scanner:
//! - Mark candidate detection (ink segmentation, contour shape filtering)
//! - Fill classification (dark pixel ratio per candidate)
//!
//! Both stages agree on the right-to-left position order documented at
//! [`marks::POSITION_ORDER`].

/// Fill ratio measurement and marked-position selection
pub mod fill;
/// Contour-based bubble candidate detection
pub mod marks;

pub use fill::{FillClassifier, FillDecision, FillMeasurement};
pub use marks::{MarkDetector, RowDetection};
