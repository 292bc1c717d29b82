//! Repository root resolution.
//!
//! The runner lives one directory below the repository root
//! (`<root>/scripts/refresh`), so the root is two levels above the runner's own
//! path. The result is computed once and handed to every step as its working
//! directory.

use std::path::{Path, PathBuf};

/// Return the directory two levels above `runner_path`.
///
/// Never fails: when `runner_path` has fewer than two ancestors the topmost
/// available ancestor is returned (the filesystem root for absolute paths, the
/// empty path for short relative ones).
pub fn resolve_root(runner_path: &Path) -> PathBuf {
    runner_path
        .ancestors()
        .nth(2)
        .or_else(|| runner_path.ancestors().last())
        .map(Path::to_path_buf)
        .unwrap_or_default()
}
