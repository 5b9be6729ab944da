//! Path helpers

use std::path::{Path, PathBuf};

/// Expand `~` and `$VAR` / `${VAR}` in a path.
///
/// Paths that fail to expand (unknown variable) are returned unchanged.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}
