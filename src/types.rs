//! Shared types for simple-deps

use std::fmt;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use url::Url;

/// Token recorded in a config file to track the upstream head.
pub const LATEST_TOKEN: &str = "*";

/// Token for the repository root as a relative subpath.
pub const ROOT_SUBPATH: &str = "/";

/// The version pin recorded for a dependency.
///
/// `Unset` and `Latest` resolve the same way (no pinned checkout) but are kept
/// apart: an unset pin gets recorded on the next use-head run, while an
/// explicit `*` is never rewritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Pin {
    /// No version recorded yet.
    #[default]
    Unset,
    /// `*`: follow the upstream head.
    Latest,
    /// A commit identifier, full or abbreviated.
    Commit(String),
}

impl Pin {
    /// Returns the concrete commit, if this pin names one.
    pub fn commit(&self) -> Option<&str> {
        match self {
            Pin::Commit(commit) => Some(commit),
            _ => None,
        }
    }

    pub fn is_latest(&self) -> bool {
        matches!(self, Pin::Latest)
    }
}

impl From<&str> for Pin {
    fn from(token: &str) -> Self {
        match token {
            "" => Pin::Unset,
            LATEST_TOKEN => Pin::Latest,
            commit => Pin::Commit(commit.to_string()),
        }
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pin::Unset => Ok(()),
            Pin::Latest => f.write_str(LATEST_TOKEN),
            Pin::Commit(commit) => f.write_str(commit),
        }
    }
}

/// One declared dependency, as read from a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySpec {
    /// Config file this entry was read from; owns the entry on write-back.
    pub source_config: PathBuf,
    /// The first field exactly as written.
    pub url_or_path: String,
    /// Present iff `url_or_path` is an absolute URL.
    pub url: Option<Url>,
    pub pin: Pin,
    /// Library root inside the repository (`/` for the repository root).
    pub subpath: String,
    /// Whether consumers should descend into this dependency's own dependencies.
    pub recurse: bool,
    /// Set once resolution changes `pin` from what was read.
    pub modified: bool,
    name: String,
}

impl LibrarySpec {
    /// Creates a spec with default optional fields and an unset pin.
    pub fn new(source_config: impl Into<PathBuf>, url_or_path: impl Into<String>) -> Self {
        let url_or_path = url_or_path.into();
        let url = parse_url(&url_or_path);
        let name = resolved_name(&url_or_path, url.as_ref());
        Self {
            source_config: source_config.into(),
            url_or_path,
            url,
            pin: Pin::Unset,
            subpath: ROOT_SUBPATH.to_string(),
            recurse: false,
            modified: false,
            name,
        }
    }

    pub fn with_pin(mut self, pin: Pin) -> Self {
        self.pin = pin;
        self
    }

    pub fn with_subpath(mut self, subpath: impl Into<String>) -> Self {
        self.subpath = subpath.into();
        self
    }

    pub fn with_recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    /// Name derived from the URL or path when the spec was created.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records a new pin, marking the spec modified when it differs.
    pub fn update_pin(&mut self, pin: Pin) -> bool {
        if self.pin == pin {
            return false;
        }
        self.pin = pin;
        self.modified = true;
        true
    }

    /// Subpath relative to the repository root, or `None` for the root itself.
    pub fn relative_subpath(&self) -> Option<&Path> {
        let trimmed = self.subpath.trim_matches('/');
        if trimmed.is_empty() || trimmed == "." {
            None
        } else {
            Some(Path::new(trimmed))
        }
    }

    /// URL path without the leading slash or the extension of its last segment.
    ///
    /// `https://example.com/libs/foo.git` -> `libs/foo`. Used for the nested
    /// working-copy layout.
    pub fn url_path(&self) -> Option<String> {
        let url = self.url.as_ref()?;
        let decoded = percent_decode_str(url.path()).decode_utf8_lossy();
        let path = decoded.trim_matches('/');
        let base = path.rsplit('/').next().unwrap_or(path);
        let stem_len = base.len() - extension(base).len();
        let cut = path.len() - base.len() + stem_len;
        Some(path[..cut].to_string())
    }
}

/// Parses a token as an absolute URL.
///
/// Single-letter schemes are rejected so Windows drive paths stay paths.
pub fn parse_url(token: &str) -> Option<Url> {
    let url = Url::parse(token).ok()?;
    if url.scheme().len() < 2 {
        return None;
    }
    Some(url)
}

/// Derives a dependency name from its URL or path.
///
/// URLs use the last path segment, percent-decoded, with its extension
/// stripped; paths use their last component.
pub fn resolved_name(url_or_path: &str, url: Option<&Url>) -> String {
    match url {
        Some(url) => {
            let path = url.path().trim_end_matches('/');
            let base = path.rsplit('/').next().unwrap_or(path);
            let base = percent_decode_str(base).decode_utf8_lossy();
            let stem = &base[..base.len() - extension(&base).len()];
            if stem.is_empty() {
                url.host_str().unwrap_or_default().to_string()
            } else {
                stem.to_string()
            }
        }
        None => {
            let trimmed = url_or_path.trim_end_matches(['/', '\\']);
            Path::new(trimmed)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| trimmed.to_string())
        }
    }
}

/// The suffix starting at the final `.` of a path segment, or "".
fn extension(segment: &str) -> &str {
    match segment.rfind('.') {
        Some(index) => &segment[index..],
        None => "",
    }
}

/// Ordered dependencies for one run: config-file order, then line order.
#[derive(Debug, Clone, Default)]
pub struct DependencySet {
    libraries: Vec<LibrarySpec>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, library: LibrarySpec) {
        self.libraries.push(library);
    }

    pub fn libraries(&self) -> &[LibrarySpec] {
        &self.libraries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LibrarySpec> {
        self.libraries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, LibrarySpec> {
        self.libraries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

impl Extend<LibrarySpec> for DependencySet {
    fn extend<T: IntoIterator<Item = LibrarySpec>>(&mut self, iter: T) {
        self.libraries.extend(iter);
    }
}

impl FromIterator<LibrarySpec> for DependencySet {
    fn from_iter<T: IntoIterator<Item = LibrarySpec>>(iter: T) -> Self {
        Self {
            libraries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod pin_tests {
        use super::*;

        #[test]
        fn empty_token_is_unset() {
            assert_eq!(Pin::from(""), Pin::Unset);
        }

        #[test]
        fn star_is_latest() {
            assert_eq!(Pin::from("*"), Pin::Latest);
        }

        #[test]
        fn unset_and_latest_are_distinct() {
            assert_ne!(Pin::Unset, Pin::Latest);
            assert_eq!(Pin::Unset.to_string(), "");
            assert_eq!(Pin::Latest.to_string(), "*");
        }

        #[test]
        fn commit_round_trips_through_display() {
            let pin = Pin::from("abc123");
            assert_eq!(pin.commit(), Some("abc123"));
            assert_eq!(pin.to_string(), "abc123");
        }
    }

    mod name_tests {
        use super::*;

        #[test]
        fn url_name_strips_extension() {
            let spec = LibrarySpec::new("deps.txt", "https://example.com/libs/foo.git");
            assert!(spec.url.is_some());
            assert_eq!(spec.name(), "foo");
        }

        #[test]
        fn url_name_without_extension() {
            let spec = LibrarySpec::new("deps.txt", "https://github.com/octocat/hello-world");
            assert_eq!(spec.name(), "hello-world");
        }

        #[test]
        fn url_name_strips_only_last_extension() {
            let spec = LibrarySpec::new("deps.txt", "https://example.com/lib.v2.git");
            assert_eq!(spec.name(), "lib.v2");
        }

        #[test]
        fn url_name_ignores_trailing_slash() {
            let spec = LibrarySpec::new("deps.txt", "https://example.com/libs/bar/");
            assert_eq!(spec.name(), "bar");
        }

        #[test]
        fn url_name_is_percent_decoded() {
            let spec = LibrarySpec::new("deps.txt", "https://example.com/libs/my%20lib.git");
            assert_eq!(spec.name(), "my lib");
            assert_eq!(spec.url_path().as_deref(), Some("libs/my lib"));
        }

        #[test]
        fn file_url_is_remote() {
            let spec = LibrarySpec::new("deps.txt", "file:///srv/git/widget.git");
            assert!(spec.url.is_some());
            assert_eq!(spec.name(), "widget");
        }

        #[test]
        fn relative_path_is_local() {
            let spec = LibrarySpec::new("deps.txt", "../vendor/baz");
            assert!(spec.url.is_none());
            assert_eq!(spec.name(), "baz");
        }

        #[test]
        fn absolute_path_is_local() {
            let spec = LibrarySpec::new("deps.txt", "/opt/libs/qux/");
            assert!(spec.url.is_none());
            assert_eq!(spec.name(), "qux");
        }

        #[test]
        fn drive_letter_is_not_a_url() {
            assert!(parse_url("C:\\libs\\foo").is_none());
        }

        #[test]
        fn name_survives_pin_updates() {
            let mut spec = LibrarySpec::new("deps.txt", "https://example.com/libs/foo.git");
            spec.update_pin(Pin::Commit("deadbeef".into()));
            assert_eq!(spec.name(), "foo");
        }
    }

    #[test]
    fn url_path_strips_leading_slash_and_extension() {
        let spec = LibrarySpec::new("deps.txt", "https://example.com/libs/foo.git");
        assert_eq!(spec.url_path().as_deref(), Some("libs/foo"));
    }

    #[test]
    fn url_path_is_none_for_local() {
        let spec = LibrarySpec::new("deps.txt", "./foo");
        assert_eq!(spec.url_path(), None);
    }

    #[test]
    fn update_pin_marks_modified_only_on_change() {
        let mut spec =
            LibrarySpec::new("deps.txt", "https://example.com/foo.git").with_pin(Pin::from("abc"));
        assert!(!spec.update_pin(Pin::from("abc")));
        assert!(!spec.modified);
        assert!(spec.update_pin(Pin::from("def")));
        assert!(spec.modified);
        assert_eq!(spec.pin, Pin::Commit("def".into()));
    }

    #[test]
    fn relative_subpath_root_is_none() {
        let spec = LibrarySpec::new("deps.txt", "https://example.com/foo.git");
        assert_eq!(spec.relative_subpath(), None);
        let spec = spec.with_subpath("/src/lib/");
        assert_eq!(spec.relative_subpath(), Some(Path::new("src/lib")));
    }

    #[test]
    fn dependency_set_keeps_insertion_order() {
        let set: DependencySet = ["a", "b", "c"]
            .into_iter()
            .map(|name| LibrarySpec::new("deps.txt", name))
            .collect();
        let names: Vec<_> = set.iter().map(|lib| lib.name()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(set.len(), 3);
    }
}
