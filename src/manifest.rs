//! Build manifest emission.
//!
//! Resolved dependencies are rendered through a line template into
//! `dependencies.cmake`, next to the last config file processed.

use std::fs;
use std::io;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resolve::ResolvedDependency;
use crate::types::DependencySet;

/// Fixed name of the rendered manifest.
pub const MANIFEST_FILE_NAME: &str = "dependencies.cmake";

/// Template looked up beside the executable.
pub const TEMPLATE_FILE_NAME: &str = "dependencies.cmake.template";

const NAME_PLACEHOLDER: &str = "@NAME@";
const PATH_PLACEHOLDER: &str = "@PATH@";
const RECURSIVE_PLACEHOLDER: &str = "@RECURSIVE@";

/// Used when no template file sits beside the executable.
pub const BUILTIN_TEMPLATE: &str = "\
# Generated by simple-deps. Do not edit.

set(SIMPLE_DEPS_DEPENDENCIES \"\")
set(@NAME@_DIR \"@PATH@\")
set(@NAME@_RECURSIVE @RECURSIVE@)
list(APPEND SIMPLE_DEPS_DEPENDENCIES @NAME@)
";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("cannot read template {}: {source}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One manifest record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyInfo {
    pub name: String,
    pub path: PathBuf,
    pub recursive: bool,
}

impl From<&ResolvedDependency> for DependencyInfo {
    fn from(dep: &ResolvedDependency) -> Self {
        Self {
            name: dep.name.clone(),
            path: dep.path.clone(),
            recursive: dep.recursive,
        }
    }
}

/// Turns the ordered dependency records into manifest text.
pub trait Renderer {
    fn render(&self, deps: &[DependencyInfo]) -> String;
}

/// Template where each run of placeholder lines repeats per dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTemplate {
    text: String,
}

impl LineTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN_TEMPLATE)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Template {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(text))
    }

    /// An explicit template must exist; the default one falls back to
    /// [`BUILTIN_TEMPLATE`].
    pub fn select(explicit: Option<&Path>) -> Result<Self, ManifestError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_template_path() {
            Some(path) if path.is_file() => {
                log::debug!("Using template {}", path.display());
                Self::load(&path)
            }
            _ => {
                log::debug!("No {} beside executable, using built-in", TEMPLATE_FILE_NAME);
                Ok(Self::builtin())
            }
        }
    }
}

impl Renderer for LineTemplate {
    fn render(&self, deps: &[DependencyInfo]) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut block: Vec<&str> = Vec::new();

        for line in self.text.split_inclusive('\n') {
            if has_placeholder(line) {
                block.push(line);
                continue;
            }
            expand_block(&mut out, &block, deps);
            block.clear();
            out.push_str(line);
        }
        expand_block(&mut out, &block, deps);

        out
    }
}

fn has_placeholder(line: &str) -> bool {
    [NAME_PLACEHOLDER, PATH_PLACEHOLDER, RECURSIVE_PLACEHOLDER]
        .iter()
        .any(|placeholder| line.contains(placeholder))
}

fn expand_block(out: &mut String, block: &[&str], deps: &[DependencyInfo]) {
    if block.is_empty() {
        return;
    }
    for dep in deps {
        let path = dep.path.to_string_lossy().replace(MAIN_SEPARATOR, "/");
        let recursive = if dep.recursive { "ON" } else { "OFF" };
        for line in block {
            out.push_str(
                &line
                    .replace(NAME_PLACEHOLDER, &dep.name)
                    .replace(PATH_PLACEHOLDER, &path)
                    .replace(RECURSIVE_PLACEHOLDER, recursive),
            );
        }
    }
}

/// `dependencies.cmake.template` in the executable's directory.
pub fn default_template_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join(TEMPLATE_FILE_NAME))
}

/// Directory of the last dependency's config file, `.` if there is none.
pub fn manifest_dir(deps: &DependencySet) -> PathBuf {
    deps.libraries()
        .last()
        .and_then(|lib| lib.source_config.parent())
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Render `deps` into `dir/dependencies.cmake`, returning the file written.
pub fn write_manifest(
    dir: &Path,
    renderer: &impl Renderer,
    deps: &[DependencyInfo],
) -> Result<PathBuf, ManifestError> {
    let path = dir.join(MANIFEST_FILE_NAME);
    log::info!("Writing {}", path.display());

    fs::write(&path, renderer.render(deps)).map_err(|source| ManifestError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Pretty JSON array of the manifest records.
pub fn to_json(deps: &[DependencyInfo]) -> Result<String, ManifestError> {
    Ok(serde_json::to_string_pretty(deps)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ResolutionKind;
    use crate::types::LibrarySpec;
    use tempfile::tempdir;

    fn info(name: &str, path: &str, recursive: bool) -> DependencyInfo {
        DependencyInfo {
            name: name.to_string(),
            path: PathBuf::from(path),
            recursive,
        }
    }

    #[test]
    fn placeholder_block_repeats_per_dependency() {
        let template = LineTemplate::new(
            "# header\nset(@NAME@_DIR \"@PATH@\")\nset(@NAME@_RECURSIVE @RECURSIVE@)\n# footer\n",
        );
        let deps = [info("foo", "/w/foo", false), info("bar", "/w/bar", true)];

        assert_eq!(
            template.render(&deps),
            "# header\n\
             set(foo_DIR \"/w/foo\")\n\
             set(foo_RECURSIVE OFF)\n\
             set(bar_DIR \"/w/bar\")\n\
             set(bar_RECURSIVE ON)\n\
             # footer\n"
        );
    }

    #[test]
    fn separate_blocks_expand_independently() {
        let template = LineTemplate::new("@NAME@\n--\n@PATH@");
        let deps = [info("a", "/a", false), info("b", "/b", false)];

        assert_eq!(template.render(&deps), "a\nb\n--\n/a/b");
    }

    #[test]
    fn no_dependencies_keeps_static_lines() {
        let rendered = LineTemplate::builtin().render(&[]);
        assert!(rendered.starts_with("# Generated by simple-deps"));
        assert!(!rendered.contains('@'));
    }

    #[test]
    fn builtin_template_lists_every_dependency() {
        let deps = [info("foo", "/w/foo", true)];
        let rendered = LineTemplate::builtin().render(&deps);
        assert!(rendered.contains("set(foo_DIR \"/w/foo\")"));
        assert!(rendered.contains("set(foo_RECURSIVE ON)"));
        assert!(rendered.contains("list(APPEND SIMPLE_DEPS_DEPENDENCIES foo)"));
    }

    #[test]
    fn manifest_dir_follows_last_config() {
        let deps: DependencySet = [
            LibrarySpec::new("a/deps.txt", "https://example.com/x.git"),
            LibrarySpec::new("b/c/deps.txt", "https://example.com/y.git"),
        ]
        .into_iter()
        .collect();
        assert_eq!(manifest_dir(&deps), PathBuf::from("b/c"));
    }

    #[test]
    fn manifest_dir_defaults_to_current() {
        assert_eq!(manifest_dir(&DependencySet::new()), PathBuf::from("."));

        let deps: DependencySet = [LibrarySpec::new("deps.txt", "./x")].into_iter().collect();
        assert_eq!(manifest_dir(&deps), PathBuf::from("."));
    }

    #[test]
    fn write_manifest_renders_into_fixed_file() {
        let dir = tempdir().unwrap();
        let deps = [info("foo", "/w/foo", false)];

        let path = write_manifest(dir.path(), &LineTemplate::new("@NAME@=@PATH@\n"), &deps).unwrap();

        assert_eq!(path, dir.path().join(MANIFEST_FILE_NAME));
        assert_eq!(fs::read_to_string(path).unwrap(), "foo=/w/foo\n");
    }

    #[test]
    fn write_manifest_reports_missing_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");

        let err = write_manifest(&missing, &LineTemplate::builtin(), &[]).unwrap_err();
        assert!(matches!(err, ManifestError::Write { .. }));
    }

    #[test]
    fn explicit_template_must_exist() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.template");

        let err = LineTemplate::select(Some(&missing)).unwrap_err();
        assert!(matches!(err, ManifestError::Template { ref path, .. } if *path == missing));
    }

    #[test]
    fn explicit_template_is_loaded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.template");
        fs::write(&path, "@NAME@\n").unwrap();

        let template = LineTemplate::select(Some(&path)).unwrap();
        assert_eq!(template, LineTemplate::new("@NAME@\n"));
    }

    #[test]
    fn info_from_resolved_dependency() {
        let resolved = ResolvedDependency {
            name: "foo".into(),
            path: PathBuf::from("/w/foo/src"),
            recursive: true,
            kind: ResolutionKind::Checkout,
        };
        assert_eq!(
            DependencyInfo::from(&resolved),
            info("foo", "/w/foo/src", true)
        );
    }

    #[test]
    fn json_lists_records_in_order() {
        let deps = vec![info("foo", "/w/foo", false), info("bar", "/w/bar", true)];
        let json = to_json(&deps).unwrap();

        let parsed: Vec<DependencyInfo> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, deps);
        assert!(json.contains("\"recursive\": true"));
    }
}
