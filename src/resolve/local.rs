use std::io;
use std::path::{Path, PathBuf};

use crate::cache::absolutize;

/// Look for a sibling checkout `../<name>` next to `search_root`.
///
/// Anything at that path that is not a regular file counts, including a
/// symlink to a directory. Returns the override's absolute path.
pub fn find_local_override(search_root: &Path, name: &str) -> io::Result<Option<PathBuf>> {
    if name.is_empty() {
        return Ok(None);
    }

    let candidate = search_root.join("..").join(name);
    match std::fs::metadata(&candidate) {
        Ok(meta) if !meta.is_file() => absolutize(&candidate).map(Some),
        _ => Ok(None),
    }
}
