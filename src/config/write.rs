use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use super::ConfigError;
use crate::types::{LATEST_TOKEN, LibrarySpec, Pin, ROOT_SUBPATH};

/// Counter for unique temp file names within a process
static WRITE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Format a dependency as a config line (without the trailing newline).
///
/// Trailing optional fields are omitted when they hold their defaults, so the
/// line reads back into an identical spec.
pub fn format_line(lib: &LibrarySpec) -> String {
    let subpath = (lib.subpath != ROOT_SUBPATH || lib.recurse).then_some(lib.subpath.as_str());

    let mut fields = vec![lib.url_or_path.clone()];
    match (&lib.pin, subpath) {
        (Pin::Unset, None) => {}
        // A placeholder keeps later fields in position.
        (Pin::Unset, Some(_)) => fields.push(LATEST_TOKEN.to_string()),
        (pin, _) => fields.push(pin.to_string()),
    }
    if let Some(subpath) = subpath {
        fields.push(subpath.to_string());
    }
    if lib.recurse {
        fields.push("recurse".to_string());
    }
    fields.join(" ")
}

/// Replace a config file with the given dependencies, one per line.
///
/// Writes to a temp file next to `path` and renames it over the original, so
/// readers never observe a half-written config. A symlinked config is
/// replaced at its target and keeps its permissions.
pub fn write_config<'a>(
    path: &Path,
    libraries: impl IntoIterator<Item = &'a LibrarySpec>,
) -> Result<(), ConfigError> {
    let mut contents = String::new();
    for lib in libraries {
        contents.push_str(&format_line(lib));
        contents.push('\n');
    }

    replace_file(path, contents.as_bytes()).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn replace_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    let target = match fs::canonicalize(path) {
        Ok(target) => target,
        Err(e) if e.kind() == io::ErrorKind::NotFound => path.to_path_buf(),
        Err(e) => return Err(e),
    };
    let path = target.as_path();
    let permissions = fs::metadata(path).ok().map(|meta| meta.permissions());

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "config path has no file name"))?;

    loop {
        let counter = WRITE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut temp_name = file_name.to_os_string();
        temp_name.push(format!(".tmp.{}.{}", std::process::id(), counter));
        let temp_path = path.with_file_name(temp_name);

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
        {
            Ok(file) => file,
            // Left behind by a crashed run
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        };

        let permitted = match &permissions {
            Some(permissions) => file.set_permissions(permissions.clone()),
            None => Ok(()),
        };
        let written = permitted
            .and_then(|()| file.write_all(contents))
            .and_then(|()| file.sync_all())
            .and_then(|()| fs::rename(&temp_path, path));
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        return Ok(());
    }
}
