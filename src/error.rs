use std::path::PathBuf;

/// Errors returned by the sheet scanner.
///
/// Only sheet-scoped failures are errors. Row-level problems (missing border,
/// short candidate counts, ambiguous marks) are carried in the result instead.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The input image could not be opened or decoded.
    #[error("failed to load image {path}: {source}")]
    ImageLoad {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying decoder error.
        #[source]
        source: image::ImageError,
    },
    /// The input image has no pixels.
    #[error("input image is empty ({width}x{height})")]
    EmptyImage {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },
    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Reading or writing a file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A JSON configuration or result could not be (de)serialized.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
    /// Writing a diagnostic image failed.
    #[error("failed to write image {path}: {source}")]
    ImageWrite {
        /// Destination path.
        path: PathBuf,
        /// Underlying encoder error.
        #[source]
        source: image::ImageError,
    },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ScanError>;
