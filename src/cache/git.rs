//! Git operations using a hybrid CLI + libgit2 approach.
//!
//! **CLI (with hardening) for operations that talk to a remote:**
//! - `clone` - any transport the system git supports (https, ssh, file)
//! - `pull` - fast-forward only
//! - `fetch`
//!
//! **libgit2 for local operations:**
//! - `open_repository`, `repository_exists`, `locate_repository_root`
//! - `head_commit`, `has_commit` - ref/commit reading
//! - `ensure_remote`, `attach_branch`, `force_checkout` - local writes

use git2::Repository;
use git2::build::CheckoutBuilder;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

use super::paths::absolutize;

/// Name of the remote every clone is synced from.
pub const ORIGIN: &str = "origin";

/// Errors returned by git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// libgit2 reported an error.
    #[error("git operation failed: {0}")]
    Git(#[from] git2::Error),
    /// Repository path does not contain a git repo.
    #[error("repository not found at {0}")]
    NotFound(String),
    /// Output parsing or unexpected git data.
    #[error("failed to parse git data: {0}")]
    ParseError(String),
    /// Clone failed.
    #[error("clone failed: {0}")]
    CloneError(String),
    /// Pull failed.
    #[error("pull failed: {0}")]
    PullError(String),
    /// Fetch failed.
    #[error("fetch failed: {0}")]
    FetchError(String),
    /// Underlying IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid inputs were provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Reject values that git could read as an option or that carry control bytes.
fn validate_arg(value: &str, name: &str) -> Result<(), GitError> {
    if value.is_empty() {
        return Err(GitError::InvalidInput(format!("{} cannot be empty", name)));
    }
    if value.starts_with('-') {
        return Err(GitError::InvalidInput(format!(
            "{} cannot start with '-'",
            name
        )));
    }
    if value.bytes().any(|b| b < 0x20) {
        return Err(GitError::InvalidInput(format!(
            "{} cannot contain null or control characters",
            name
        )));
    }
    Ok(())
}

/// Validate a branch name passed on the command line.
fn validate_git_ref(value: &str, name: &str) -> Result<(), GitError> {
    validate_arg(value, name)?;
    if value.contains("..") {
        return Err(GitError::InvalidInput(format!(
            "{} cannot contain '..'",
            name
        )));
    }
    Ok(())
}

fn path_str<'a>(path: &'a Path, what: &str) -> Result<&'a str, GitError> {
    path.to_str()
        .ok_or_else(|| GitError::ParseError(format!("{} path is not valid UTF-8", what)))
}

// ============================================================================
// CLI Operations
// ============================================================================

/// Git CLI wrapper with security hardening.
#[derive(Debug, Clone)]
pub struct GitCli {
    git_path: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    /// Create a new GitCli instance using the system git.
    pub fn new() -> Self {
        Self {
            git_path: "git".into(),
        }
    }

    /// Create a hardened Command.
    ///
    /// Applies:
    /// - `GIT_TERMINAL_PROMPT=0` - disable interactive prompts
    /// - `core.hooksPath=` - disable hooks execution
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.git_path);
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.args(["-c", "core.hooksPath="]);
        cmd.stdin(Stdio::null());
        cmd
    }

    fn command_in(&self, repo_path: &Path) -> Result<Command, GitError> {
        let mut cmd = self.command();
        cmd.arg("-C").arg(path_str(repo_path, "repository")?);
        Ok(cmd)
    }

    fn run(mut cmd: Command, error: fn(String) -> GitError) -> Result<(), GitError> {
        let output = cmd.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(error(stderr.trim().to_string()));
        }
        Ok(())
    }

    /// Clone `source` (a URL or a local repository path) into `dest`.
    ///
    /// Parent directories are created as needed. A partially created `dest`
    /// is removed when the clone fails.
    pub fn clone(&self, source: &str, dest: &Path) -> Result<(), GitError> {
        validate_arg(source, "source")?;

        let dest_existed = dest.exists();
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut cmd = self.command();
        cmd.args(["clone", "--"])
            .arg(source)
            .arg(path_str(dest, "destination")?);

        let result = Self::run(cmd, GitError::CloneError);
        if result.is_err() && !dest_existed {
            let _ = std::fs::remove_dir_all(dest);
        }
        result
    }

    /// Fast-forward `branch` from origin. "Already up to date" is success.
    pub fn pull(&self, repo_path: &Path, branch: &str) -> Result<(), GitError> {
        validate_git_ref(branch, "branch")?;

        let mut cmd = self.command_in(repo_path)?;
        cmd.args(["pull", "--ff-only", ORIGIN]).arg(branch);
        Self::run(cmd, GitError::PullError)
    }

    /// Fetch all branches from origin.
    pub fn fetch(&self, repo_path: &Path) -> Result<(), GitError> {
        let mut cmd = self.command_in(repo_path)?;
        cmd.args(["fetch", ORIGIN]);
        Self::run(cmd, GitError::FetchError)
    }
}

// ============================================================================
// libgit2 Operations
// ============================================================================

/// Open an existing repository at the given path.
pub fn open_repository(path: &Path) -> Result<Repository, GitError> {
    let repo = Repository::open(path).map_err(|e| {
        if e.code() == git2::ErrorCode::NotFound {
            GitError::NotFound(path.display().to_string())
        } else {
            GitError::Git(e)
        }
    })?;
    Ok(repo)
}

/// Check if a path contains a valid git repository.
pub fn repository_exists(path: &Path) -> bool {
    Repository::open(path).is_ok()
}

/// Find the closest directory at or above `path` that is a repository root.
///
/// Walks parent directories up to the filesystem root.
pub fn locate_repository_root(path: &Path) -> Option<PathBuf> {
    let start = absolutize(path).unwrap_or_else(|_| path.to_path_buf());
    start
        .ancestors()
        .find(|dir| repository_exists(dir))
        .map(Path::to_path_buf)
}

/// Commit SHA that HEAD points at.
pub fn head_commit(repo: &Repository) -> Result<String, GitError> {
    let commit = repo.head()?.peel_to_commit()?;
    Ok(commit.id().to_string())
}

/// Shortest abbreviated commit id libgit2 will look up.
const MIN_COMMIT_ID_LEN: usize = 4;
const FULL_COMMIT_ID_LEN: usize = 40;

/// Whether `rev` looks like a full or abbreviated commit id.
///
/// Branch names, tags and `HEAD` are not commit ids.
pub fn is_commit_id(rev: &str) -> bool {
    (MIN_COMMIT_ID_LEN..=FULL_COMMIT_ID_LEN).contains(&rev.len())
        && rev.bytes().all(|b| b.is_ascii_hexdigit())
}

fn find_commit<'r>(repo: &'r Repository, id: &str) -> Result<git2::Commit<'r>, GitError> {
    if !is_commit_id(id) {
        return Err(GitError::InvalidInput(format!(
            "'{}' is not a commit id",
            id
        )));
    }
    Ok(repo.find_commit_by_prefix(id)?)
}

/// Whether commit `id` exists in the repository at `path`.
///
/// Accepts full or abbreviated ids only. Any failure counts as "not present".
pub fn has_commit(path: &Path, id: &str) -> bool {
    if !path.exists() {
        return false;
    }
    let Ok(repo) = Repository::open(path) else {
        return false;
    };
    find_commit(&repo, id).is_ok()
}

/// Branch a pull should fast-forward.
///
/// The checked-out branch, or, when HEAD is detached, the branch origin's
/// HEAD points at.
pub fn pull_branch(repo: &Repository) -> Result<String, GitError> {
    if !repo.head_detached()? {
        let head = repo.head()?;
        return head
            .shorthand()
            .map(str::to_string)
            .ok_or_else(|| GitError::ParseError("HEAD reference has no name".to_string()));
    }

    let origin_head = format!("refs/remotes/{}/HEAD", ORIGIN);
    let reference = repo.find_reference(&origin_head)?;
    let target = reference
        .symbolic_target()
        .ok_or_else(|| GitError::ParseError(format!("{} is not symbolic", origin_head)))?;
    let prefix = format!("refs/remotes/{}/", ORIGIN);
    target
        .strip_prefix(&prefix)
        .map(str::to_string)
        .ok_or_else(|| {
            GitError::ParseError(format!(
                "unexpected {} target: expected '{}<branch>', got '{}'",
                origin_head, prefix, target
            ))
        })
}

/// Force-checkout local `branch`, creating it from origin's copy if needed.
pub fn attach_branch(repo: &Repository, branch: &str) -> Result<(), GitError> {
    let refname = format!("refs/heads/{}", branch);
    if repo.find_reference(&refname).is_err() {
        let remote_ref = format!("refs/remotes/{}/{}", ORIGIN, branch);
        let commit = repo.find_reference(&remote_ref)?.peel_to_commit()?;
        repo.branch(branch, &commit, false)?;
    }

    let target = repo.revparse_single(&refname)?;
    repo.checkout_tree(&target, Some(CheckoutBuilder::new().force()))?;
    repo.set_head(&refname)?;
    Ok(())
}

/// Add a remote unless one with that name already exists.
///
/// Returns true when the remote was added.
pub fn ensure_remote(repo: &Repository, name: &str, url: &str) -> Result<bool, GitError> {
    match repo.find_remote(name) {
        Ok(_) => Ok(false),
        Err(e) if e.code() == git2::ErrorCode::NotFound => {
            repo.remote(name, url)?;
            Ok(true)
        }
        Err(e) => Err(e.into()),
    }
}

/// Check out commit `id` with a detached HEAD, overwriting local
/// modifications.
///
/// Returns the full commit SHA checked out.
pub fn force_checkout(repo: &Repository, id: &str) -> Result<String, GitError> {
    let commit = find_commit(repo, id)?;
    repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))?;
    repo.set_head_detached(commit.id())?;
    Ok(commit.id().to_string())
}

// ============================================================================
// Tests
// ============================================================================
