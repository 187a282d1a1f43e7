//! Mapping report keys onto source roots and back to project-relative names

use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Location `key` would have under `root`
///
/// Keys use forward slashes and may start with one (default package or a
/// stripped root package); empty segments are dropped so the key never
/// escapes `root`.
pub fn candidate_path(root: &Path, key: &str) -> PathBuf {
    key.split('/')
        .filter(|segment| !segment.is_empty())
        .fold(root.to_path_buf(), |path, segment| path.join(segment))
}

/// Name of `file` relative to `project_root`, as a URI-relative path
///
/// Both paths are turned into `file:` URLs so segments are percent-encoded
/// the URL way. A file outside the project keeps its full `file:` URL.
pub fn relative_name(project_root: &Path, file: &Path) -> String {
    let root = absolute(project_root);
    let file = absolute(file);

    if let Some(name) = relativize(&root, &file) {
        return name;
    }

    match (fs::canonicalize(&root), fs::canonicalize(&file)) {
        (Ok(root), Ok(file)) => {
            relativize(&root, &file).unwrap_or_else(|| file_url(&file))
        }
        _ => file_url(&file),
    }
}

fn relativize(root: &Path, file: &Path) -> Option<String> {
    let base = Url::from_directory_path(root).ok()?;
    let target = Url::from_file_path(file).ok()?;

    if !target.as_str().starts_with(base.as_str()) {
        return None;
    }

    base.make_relative(&target)
}

fn file_url(file: &Path) -> String {
    Url::from_file_path(file)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| file.display().to_string())
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }

    match std::env::current_dir() {
        Ok(dir) => dir.join(path),
        Err(_) => path.to_path_buf(),
    }
}
