use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static DEBUG_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Directory for diagnostic image dumps, from `OMR_DEBUG_DIR`.
pub(crate) fn debug_dump_dir() -> Option<&'static Path> {
    DEBUG_DIR
        .get_or_init(|| {
            std::env::var_os("OMR_DEBUG_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        })
        .as_deref()
}
