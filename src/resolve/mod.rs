//! Dependency resolution: local overrides and the two-tier sync engine.

mod engine;
mod local;

use std::path::PathBuf;

use thiserror::Error;

pub use engine::Resolver;
pub use local::find_local_override;

use crate::cache::GitError;

/// Default per-project working-copy directory.
pub const DEFAULT_WORKING_DIR: &str = "./gitdeps";

/// Errors that abort a resolution run.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// A clone, pull, fetch, open or checkout failed.
    #[error("{name}: {source}")]
    Sync {
        name: String,
        #[source]
        source: GitError,
    },
    /// Another process held the cache entry for too long.
    #[error("{name}: timed out waiting for cache lock {}", path.display())]
    Lock { name: String, path: PathBuf },
    /// A filesystem operation failed.
    #[error("{name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Knobs for one resolution run.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Root of the per-project working copies.
    pub working_dir: PathBuf,
    /// Pull both tiers and record the observed heads as new pins.
    pub use_head: bool,
    /// Check for `../<name>` overrides.
    pub allow_local: bool,
    /// Lay out working copies by URL path instead of by name.
    pub nested_layout: bool,
    /// Directory overrides and local paths are resolved against.
    pub search_root: PathBuf,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from(DEFAULT_WORKING_DIR),
            use_head: false,
            allow_local: true,
            nested_layout: false,
            search_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

/// How a dependency's directory was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    /// A sibling `../<name>` checkout.
    Override,
    /// A local directory named in the config.
    Directory,
    /// A working copy synced from the cache.
    Checkout,
}

/// Where a dependency ended up on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    pub name: String,
    /// Absolute library root, including the configured subpath.
    pub path: PathBuf,
    pub recursive: bool,
    pub kind: ResolutionKind,
}
