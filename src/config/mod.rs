//! Dependency config files: parsing, formatting and write-back.
//!
//! One dependency per line:
//!
//! ```text
//! <url-or-path> [<version>] [<relative-subpath>] [<recurse|norecurse>]
//! ```

mod parse;
mod persist;
mod write;

use std::path::PathBuf;

use thiserror::Error;

pub use parse::{parse_line, read_config};
pub use persist::save_modified;
pub use write::{format_line, write_config};

use crate::types::DependencySet;

/// Errors returned while reading or writing config files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An updated config file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DependencySet {
    /// Read a config file and append its dependencies in line order.
    pub fn read(&mut self, path: impl Into<PathBuf>) -> Result<(), ConfigError> {
        let libraries = read_config(path)?;
        self.extend(libraries);
        Ok(())
    }
}
