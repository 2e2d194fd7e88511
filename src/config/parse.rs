use std::path::{Path, PathBuf};

use super::ConfigError;
use crate::types::{LibrarySpec, Pin};

const MAX_FIELDS: usize = 4;
const RECURSE_TOKEN: &str = "recurse";

/// Parse one config line.
///
/// Returns `None` for blank lines and `#` comments. Missing trailing fields
/// take their defaults; a line with too many fields keeps only its first
/// field and an unset pin.
pub fn parse_line(source_config: &Path, line: &str) -> Option<LibrarySpec> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    let spec = LibrarySpec::new(source_config, fields[0]);

    if fields.len() > MAX_FIELDS {
        log::warn!(
            "{}: malformed line ({} fields), ignoring everything after {}",
            source_config.display(),
            fields.len(),
            fields[0]
        );
        return Some(spec);
    }

    let mut spec = spec;
    if let Some(version) = fields.get(1) {
        spec = spec.with_pin(Pin::from(*version));
    }
    if let Some(subpath) = fields.get(2) {
        spec = spec.with_subpath(*subpath);
    }
    if let Some(flag) = fields.get(3) {
        spec = spec.with_recurse(*flag == RECURSE_TOKEN);
    }
    Some(spec)
}

/// Read every dependency declared in a config file.
pub fn read_config(path: impl Into<PathBuf>) -> Result<Vec<LibrarySpec>, ConfigError> {
    let path = path.into();
    let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;

    Ok(contents
        .lines()
        .filter_map(|line| parse_line(&path, line))
        .collect())
}
