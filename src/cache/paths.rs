//! Cache and working-copy path management
//!
//! ```text
//! ~/.simple-deps/                 # global cache, shared by every project
//! ├── <name>/                     # canonical clone of one dependency
//! └── <name>.lock                 # flock-based locking
//!
//! <working-dir>/                  # per-project working copies
//! ├── <name>/                     # flat layout
//! └── <url-path>/                 # nested layout, e.g. libs/foo
//! ```

use std::io;
use std::path::{Component, Path, PathBuf};

use crate::types::LibrarySpec;

/// Directory under the home directory holding the global cache
pub const CACHE_DIR_NAME: &str = ".simple-deps";

/// Manages the filesystem paths of the global cache
#[derive(Debug, Clone)]
pub struct CachePaths {
    root: PathBuf,
}

impl CachePaths {
    /// Creates a new CachePaths with the specified root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root cache directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the canonical clone for a dependency: `{root}/{name}`
    pub fn clone_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Returns the lock file guarding a clone: `{root}/{name}.lock`
    pub fn lock_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.lock", name))
    }

    /// Create the cache root if it is missing, private to the current user.
    pub fn ensure_root(&self) -> io::Result<()> {
        if self.root.is_dir() {
            return Ok(());
        }

        let mut builder = std::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(&self.root)
    }
}

impl Default for CachePaths {
    /// Creates a CachePaths at `~/.simple-deps`
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(CACHE_DIR_NAME))
    }
}

/// Where per-project working copies live.
#[derive(Debug, Clone)]
pub struct WorkingLayout {
    root: PathBuf,
    nested: bool,
}

impl WorkingLayout {
    pub fn new(root: impl Into<PathBuf>, nested: bool) -> Self {
        Self {
            root: root.into(),
            nested,
        }
    }

    /// Working copy for a dependency: `{root}/{name}`, or `{root}/{url-path}`
    /// in the nested layout.
    pub fn working_copy(&self, lib: &LibrarySpec) -> PathBuf {
        match lib.url_path() {
            Some(url_path) if self.nested && !url_path.is_empty() => self.root.join(url_path),
            _ => self.root.join(lib.name()),
        }
    }
}

/// Make a path absolute against the current directory and drop `.`/`..`
/// components lexically, without touching symlinks.
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize(path))
    } else {
        Ok(normalize(&std::env::current_dir()?.join(path)))
    }
}

/// Lexically clean a path.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
