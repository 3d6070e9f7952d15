// Path normalization utilities
// Manifest paths are always relative to the tree root and use forward slashes,
// whatever the host separator is.

use std::path::{Component, Path, PathBuf};

/// Convert backslashes to forward slashes.
pub fn to_slash(path: &str) -> String {
    path.replace('\\', "/")
}

/// Relative, slash-separated form of `path` below `base`.
///
/// Returns `None` when `path` is not below `base` or is `base` itself.
pub fn relative_slash_path(path: &Path, base: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;

    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// On-disk location of a manifest path below `base`.
pub fn resource_disk_path(base: &Path, resource_path: &str) -> PathBuf {
    let mut full = base.to_path_buf();
    for segment in resource_path.split('/').filter(|s| !s.is_empty()) {
        full.push(segment);
    }
    full
}

/// `path` with `suffix` appended to its file name, e.g. `a.jar` -> `a.jar.tmp`.
pub fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// True when a manifest path is safe to join under the tree root.
pub fn is_valid_resource_path(path: &str) -> bool {
    let normalized = to_slash(path);
    !normalized.is_empty()
        && !normalized.starts_with('/')
        && normalized
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}
