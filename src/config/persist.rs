use std::path::{Path, PathBuf};

use super::{ConfigError, write_config};
use crate::types::{DependencySet, LibrarySpec};

/// Write back every config file that owns a modified dependency.
///
/// Dependencies are grouped by the file they were read from, in first-seen
/// order. A group is written when any member is modified, or always when
/// `force` is set; other files are left untouched. Returns the files written.
pub fn save_modified(deps: &DependencySet, force: bool) -> Result<Vec<PathBuf>, ConfigError> {
    let mut written = Vec::new();

    for (config, libraries) in group_by_config(deps) {
        if !force && !libraries.iter().any(|lib| lib.modified) {
            continue;
        }
        log::info!("{}: Writing", config.display());
        write_config(config, libraries.iter().copied())?;
        written.push(config.to_path_buf());
    }

    Ok(written)
}

fn group_by_config(deps: &DependencySet) -> Vec<(&Path, Vec<&LibrarySpec>)> {
    let mut groups: Vec<(&Path, Vec<&LibrarySpec>)> = Vec::new();
    for lib in deps.iter() {
        let config = lib.source_config.as_path();
        match groups.iter_mut().find(|(path, _)| *path == config) {
            Some((_, members)) => members.push(lib),
            None => groups.push((config, vec![lib])),
        }
    }
    groups
}
