//! Per-dependency sync state machine.
//!
//! For a URL dependency:
//! 1. Decide whether the global cache clone needs a pull.
//! 2. Clone or pull the cache clone from upstream (under the entry's lock).
//! 3. Clone or fetch (pull in use-head mode) the working copy from the cache.
//! 4. Make sure the working copy has an `upstream` remote.
//! 5. Record the working copy's HEAD as the new pin in use-head mode.
//! 6. Force-checkout the pin, if there is one.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use super::local::find_local_override;
use super::{ResolutionKind, ResolveError, ResolveOptions, ResolvedDependency};
use crate::cache::{
    CacheLock, CachePaths, DEFAULT_LOCK_TIMEOUT, GitError, UPSTREAM, Update, VersionControl,
    WorkingLayout, absolutize, normalize,
};
use crate::types::{DependencySet, LibrarySpec, Pin};

/// Resolves dependencies to directories on disk.
pub struct Resolver<V> {
    vcs: V,
    cache: CachePaths,
    layout: WorkingLayout,
    options: ResolveOptions,
    lock_timeout: Duration,
}

impl<V: VersionControl> Resolver<V> {
    pub fn new(vcs: V, cache: CachePaths, options: ResolveOptions) -> Self {
        let layout = WorkingLayout::new(options.working_dir.clone(), options.nested_layout);
        Self {
            vcs,
            cache,
            layout,
            options,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Set how long to wait for another process holding a cache entry.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Resolve every dependency in order, stopping at the first failure.
    ///
    /// Pins may be updated in place; see [`LibrarySpec::modified`].
    pub fn resolve_all(
        &self,
        deps: &mut DependencySet,
    ) -> Result<Vec<ResolvedDependency>, ResolveError> {
        let mut resolved = Vec::with_capacity(deps.len());
        for lib in deps.iter_mut() {
            resolved.push(self.resolve(lib)?);
        }
        Ok(resolved)
    }

    /// Resolve one dependency to an absolute directory.
    pub fn resolve(&self, lib: &mut LibrarySpec) -> Result<ResolvedDependency, ResolveError> {
        let (root, kind) = self.locate(lib)?;
        let path = match lib.relative_subpath() {
            Some(subpath) => root.join(subpath),
            None => root,
        };

        log::info!("{} {}", lib.url_or_path, path.display());

        Ok(ResolvedDependency {
            name: lib.name().to_string(),
            path,
            recursive: lib.recurse,
            kind,
        })
    }

    fn locate(&self, lib: &mut LibrarySpec) -> Result<(PathBuf, ResolutionKind), ResolveError> {
        if self.options.allow_local {
            let found = find_local_override(&self.options.search_root, lib.name())
                .map_err(|source| io_error(lib.name(), source))?;
            if let Some(path) = found {
                log::info!("{}: Using local override {}", lib.name(), path.display());
                return Ok((path, ResolutionKind::Override));
            }
        }

        match lib.url.clone() {
            Some(url) => {
                let path = self.sync_checkout(lib, &url)?;
                Ok((path, ResolutionKind::Checkout))
            }
            None => Ok((self.local_directory(lib)?, ResolutionKind::Directory)),
        }
    }

    fn local_directory(&self, lib: &LibrarySpec) -> Result<PathBuf, ResolveError> {
        let path = absolutize(&self.options.search_root.join(&lib.url_or_path))
            .map_err(|source| io_error(lib.name(), source))?;

        if !path.is_dir() {
            log::warn!("{}: {} is not a directory", lib.name(), path.display());
            return Ok(path);
        }

        match self.vcs.enclosing_head(&path) {
            Ok(head) => log::info!("Using directory {} ({})", lib.url_or_path, head),
            Err(e) => {
                log::debug!("{}: no repository head for {}: {}", lib.name(), path.display(), e);
                log::info!("Using directory {}", lib.url_or_path);
            }
        }
        Ok(path)
    }

    /// Whether the cache clone must be pulled before use.
    ///
    /// A concrete pin already present in the cache never causes a pull unless
    /// running in use-head mode.
    pub fn needs_cache_refresh(&self, lib: &LibrarySpec, cache_path: &Path) -> bool {
        if self.options.use_head {
            return true;
        }
        match lib.pin.commit() {
            Some(commit) => !self.vcs.has_commit(cache_path, commit),
            None => true,
        }
    }

    fn sync_checkout(&self, lib: &mut LibrarySpec, url: &Url) -> Result<PathBuf, ResolveError> {
        let name = lib.name().to_string();
        let sync_error = |source: GitError| ResolveError::Sync {
            name: name.clone(),
            source,
        };

        let cache_path = self.cache.clone_dir(&name);
        let working_path =
            absolutize(&self.layout.working_copy(lib)).map_err(|source| io_error(&name, source))?;

        {
            self.cache
                .ensure_root()
                .map_err(|source| io_error(&name, source))?;
            let _lock = self.lock_entry(&name)?;

            let update = if self.needs_cache_refresh(lib, &cache_path) {
                log::info!("{}: Version mismatch, pulling", name);
                Update::Pull
            } else {
                log::info!("{}: Cache looks good", name);
                Update::Keep
            };
            self.vcs
                .sync_repository(&name, url.as_str(), &cache_path, update)
                .map_err(sync_error)?;
        }

        let cache_source = normalize(&cache_path);
        let update = Update::from_flags(self.options.use_head, true);
        self.vcs
            .sync_repository(&name, &cache_source.to_string_lossy(), &working_path, update)
            .map_err(sync_error)?;

        if self
            .vcs
            .ensure_remote(&working_path, UPSTREAM, url.as_str())
            .map_err(sync_error)?
        {
            log::debug!("{}: Added {} remote {}", name, UPSTREAM, url);
        }

        let head = self.vcs.head(&working_path).map_err(sync_error)?;

        if self.options.use_head && !lib.pin.is_latest() && lib.pin.commit() != Some(head.as_str())
        {
            log::info!("{}: Version changed: {}", name, head);
            lib.update_pin(Pin::Commit(head.clone()));
        }

        if let Some(commit) = lib.pin.commit() {
            log::info!("{}: Checking out {} (head = {})", name, commit, head);
            self.vcs
                .force_checkout(&working_path, commit)
                .map_err(sync_error)?;
        }

        Ok(working_path)
    }

    fn lock_entry(&self, name: &str) -> Result<CacheLock, ResolveError> {
        let lock_path = self.cache.lock_path(name);
        match CacheLock::acquire_with_timeout(&lock_path, self.lock_timeout) {
            Ok(lock) => Ok(lock),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Err(ResolveError::Lock {
                name: name.to_string(),
                path: lock_path,
            }),
            Err(e) => Err(io_error(name, e)),
        }
    }
}

fn io_error(name: &str, source: io::Error) -> ResolveError {
    ResolveError::Io {
        name: name.to_string(),
        source,
    }
}
