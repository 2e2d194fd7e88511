//! Git fixtures shared by unit tests.

use std::path::Path;

use git2::{Commit, Oid, Repository, Signature};

fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Tests that drive the git CLI skip when it is missing.
pub fn require_git() -> bool {
    if git_available() {
        true
    } else {
        eprintln!("skipping git CLI test (git not found on PATH)");
        false
    }
}

/// Init a repository at `path` with one commit adding `README`.
pub fn init_upstream(path: &Path) -> (Repository, Oid) {
    std::fs::create_dir_all(path).unwrap();
    let repo = Repository::init(path).unwrap();
    let oid = commit_file(&repo, "README", "initial", "initial commit");
    (repo, oid)
}

/// Write `name` in the work tree and commit it on the current branch.
pub fn commit_file(repo: &Repository, name: &str, contents: &str, message: &str) -> Oid {
    let workdir = repo.workdir().expect("fixture repos are not bare");
    std::fs::write(workdir.join(name), contents).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let signature = Signature::now("simple-deps", "tests@simple-deps.invalid").unwrap();
    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<&Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .unwrap()
}

/// `file://` URL for a local repository.
pub fn file_url(path: &Path) -> String {
    url::Url::from_file_path(path)
        .expect("fixture paths are absolute")
        .to_string()
}
