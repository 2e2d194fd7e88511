//! Version-control capability used by the resolver.
//!
//! Every working copy carries two remotes: `origin` is the global cache clone
//! it was cloned from, [`UPSTREAM`] is the dependency's real URL. Only the
//! cache tier ever syncs from the network.

use std::path::Path;

use super::git::{
    self, GitCli, GitError, attach_branch, ensure_remote, force_checkout, head_commit,
    locate_repository_root, open_repository, pull_branch,
};

/// Remote in a working copy that points at the true upstream URL.
pub const UPSTREAM: &str = "upstream";

/// How an existing repository should be brought up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    /// Open it and leave it as is.
    Keep,
    /// Fetch from origin without touching the checkout.
    Fetch,
    /// Fast-forward the checked-out branch from origin.
    Pull,
}

impl Update {
    /// Pull wins over fetch.
    pub fn from_flags(pull: bool, fetch: bool) -> Self {
        match (pull, fetch) {
            (true, _) => Update::Pull,
            (false, true) => Update::Fetch,
            (false, false) => Update::Keep,
        }
    }
}

/// What [`VersionControl::sync_repository`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Cloned,
    Pulled,
    Fetched,
    Opened,
}

/// Repository operations the resolver relies on.
pub trait VersionControl {
    /// Clone `source` into `dest` if it is missing, otherwise open `dest` and
    /// apply `update`. A fresh clone is never pulled or fetched.
    fn sync_repository(
        &self,
        name: &str,
        source: &str,
        dest: &Path,
        update: Update,
    ) -> Result<SyncOutcome, GitError>;

    /// Whether `commit` resolves in the repository at `path`. Never fails.
    fn has_commit(&self, path: &Path, commit: &str) -> bool;

    /// HEAD commit of the repository at `path`.
    fn head(&self, path: &Path) -> Result<String, GitError>;

    /// HEAD commit of the closest repository enclosing `path`.
    fn enclosing_head(&self, path: &Path) -> Result<String, GitError>;

    /// Add remote `name` unless present. Returns true when it was added.
    fn ensure_remote(&self, path: &Path, name: &str, url: &str) -> Result<bool, GitError>;

    /// Check out `commit` detached, discarding local modifications.
    fn force_checkout(&self, path: &Path, commit: &str) -> Result<String, GitError>;
}

/// [`VersionControl`] backed by the git CLI and libgit2.
#[derive(Debug, Clone, Default)]
pub struct GitProvider {
    git: GitCli,
}

impl GitProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VersionControl for GitProvider {
    fn sync_repository(
        &self,
        name: &str,
        source: &str,
        dest: &Path,
        update: Update,
    ) -> Result<SyncOutcome, GitError> {
        if !dest.exists() {
            log::info!("{}: Cloning {} {}", name, source, dest.display());
            self.git.clone(source, dest)?;
            open_repository(dest)?;
            return Ok(SyncOutcome::Cloned);
        }

        let repo = open_repository(dest)?;
        match update {
            Update::Keep => Ok(SyncOutcome::Opened),
            Update::Fetch => {
                log::info!("{}: Fetch {}", name, dest.display());
                self.git.fetch(dest)?;
                Ok(SyncOutcome::Fetched)
            }
            Update::Pull => {
                log::info!("{}: Pull {}", name, dest.display());
                let branch = pull_branch(&repo)?;
                if repo.head_detached()? {
                    log::debug!("{}: Reattaching {} to {}", name, dest.display(), branch);
                    attach_branch(&repo, &branch)?;
                }
                self.git.pull(dest, &branch)?;
                Ok(SyncOutcome::Pulled)
            }
        }
    }

    fn has_commit(&self, path: &Path, commit: &str) -> bool {
        git::has_commit(path, commit)
    }

    fn head(&self, path: &Path) -> Result<String, GitError> {
        head_commit(&open_repository(path)?)
    }

    fn enclosing_head(&self, path: &Path) -> Result<String, GitError> {
        let root = locate_repository_root(path)
            .ok_or_else(|| GitError::NotFound(path.display().to_string()))?;
        head_commit(&open_repository(&root)?)
    }

    fn ensure_remote(&self, path: &Path, name: &str, url: &str) -> Result<bool, GitError> {
        ensure_remote(&open_repository(path)?, name, url)
    }

    fn force_checkout(&self, path: &Path, commit: &str) -> Result<String, GitError> {
        force_checkout(&open_repository(path)?, commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{commit_file, file_url, init_upstream, require_git};
    use tempfile::tempdir;

    #[test]
    fn update_from_flags() {
        assert_eq!(Update::from_flags(true, true), Update::Pull);
        assert_eq!(Update::from_flags(true, false), Update::Pull);
        assert_eq!(Update::from_flags(false, true), Update::Fetch);
        assert_eq!(Update::from_flags(false, false), Update::Keep);
    }

    #[test]
    fn sync_existing_non_repository_fails() {
        let temp_dir = tempdir().unwrap();
        let result = GitProvider::new().sync_repository(
            "foo",
            "https://example.com/foo.git",
            temp_dir.path(),
            Update::Keep,
        );
        assert!(matches!(result, Err(GitError::NotFound(_))));
    }

    #[test]
    fn enclosing_head_of_plain_directory_fails() {
        let temp_dir = tempdir().unwrap();
        let plain = temp_dir.path().join("plain");
        std::fs::create_dir_all(&plain).unwrap();
        if locate_repository_root(temp_dir.path()).is_none() {
            assert!(GitProvider::new().enclosing_head(&plain).is_err());
        }
    }

    #[test]
    fn enclosing_head_from_subdirectory() {
        let temp_dir = tempdir().unwrap();
        let (_repo, first) = init_upstream(temp_dir.path());
        let sub = temp_dir.path().join("include");
        std::fs::create_dir_all(&sub).unwrap();

        assert_eq!(
            GitProvider::new().enclosing_head(&sub).unwrap(),
            first.to_string()
        );
    }

    #[test]
    fn sync_repository_clone_then_update() {
        if !require_git() {
            return;
        }
        let temp_dir = tempdir().unwrap();
        let upstream_path = temp_dir.path().join("foo.git");
        let (upstream, _) = init_upstream(&upstream_path);
        let dest = temp_dir.path().join("cache").join("foo");
        let source = file_url(&upstream_path);
        let provider = GitProvider::new();

        let outcome = provider
            .sync_repository("foo", &source, &dest, Update::Pull)
            .unwrap();
        assert_eq!(outcome, SyncOutcome::Cloned);

        let second = commit_file(&upstream, "b.txt", "b", "second");

        let outcome = provider
            .sync_repository("foo", &source, &dest, Update::Keep)
            .unwrap();
        assert_eq!(outcome, SyncOutcome::Opened);
        assert!(!provider.has_commit(&dest, &second.to_string()));

        let outcome = provider
            .sync_repository("foo", &source, &dest, Update::Fetch)
            .unwrap();
        assert_eq!(outcome, SyncOutcome::Fetched);
        assert!(provider.has_commit(&dest, &second.to_string()));
        assert_ne!(provider.head(&dest).unwrap(), second.to_string());

        let outcome = provider
            .sync_repository("foo", &source, &dest, Update::Pull)
            .unwrap();
        assert_eq!(outcome, SyncOutcome::Pulled);
        assert_eq!(provider.head(&dest).unwrap(), second.to_string());
    }

    #[test]
    fn pull_after_pinned_checkout_reaches_latest() {
        if !require_git() {
            return;
        }
        let temp_dir = tempdir().unwrap();
        let upstream_path = temp_dir.path().join("foo.git");
        let (upstream, first) = init_upstream(&upstream_path);
        let dest = temp_dir.path().join("work").join("foo");
        let source = file_url(&upstream_path);
        let provider = GitProvider::new();

        provider
            .sync_repository("foo", &source, &dest, Update::Keep)
            .unwrap();
        provider.force_checkout(&dest, &first.to_string()).unwrap();
        let second = commit_file(&upstream, "b.txt", "b", "second");

        provider
            .sync_repository("foo", &source, &dest, Update::Pull)
            .unwrap();
        assert_eq!(provider.head(&dest).unwrap(), second.to_string());
    }
}
