//! Utility functions for image processing
//!
//! Pixel-level helpers shared by the sheet normalizer and the mark detector:
//! - Grayscale conversion (RGB to luminance and back)
//! - Binarization (Gaussian-weighted adaptive threshold, inverted)
//! - Contrast (contrast-limited local histogram equalization)
//! - Geometry (perspective transforms, resampling, polygon measures)

pub mod binarization;
pub mod contrast;
pub mod geometry;
pub mod grayscale;
