//! Global clone cache and git plumbing

mod git;
mod lock;
mod paths;
mod provider;

pub use git::{GitCli, GitError, ORIGIN, locate_repository_root, open_repository};
pub use lock::{CacheLock, DEFAULT_LOCK_TIMEOUT};
pub use paths::{CACHE_DIR_NAME, CachePaths, WorkingLayout, absolutize, normalize};
pub use provider::{GitProvider, SyncOutcome, UPSTREAM, Update, VersionControl};
