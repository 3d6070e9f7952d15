//! Tracking of disabled resources.
//!
//! Users toggle a managed file off by renaming `mods/x.jar` to
//! `mods/x.jar.disabled`. Manifests always name the enabled path, so the sync
//! resolves each resource to whichever variant exists on disk, temporarily
//! re-enables it to overwrite it, and puts the suffix back afterwards.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::hash::path_utils::{append_suffix, resource_disk_path};
use crate::pattern::PatternMatcher;
use crate::tree::all_files;

/// Canonical (enabled) manifest path -> relative path of the disabled file.
pub type DisabledFileMap = HashMap<String, String>;

/// Strip the first matching disabled suffix from `path`.
pub fn strip_disabled_extension<'a>(path: &'a str, extensions: &[String]) -> (&'a str, bool) {
    for ext in extensions.iter().filter(|e| !e.is_empty()) {
        if let Some(base) = path.strip_suffix(ext.as_str()) {
            return (base, true);
        }
    }
    (path, false)
}

/// Scan the managed folders for files carrying a disabled suffix.
pub fn scan_for_disabled_files(
    base_dir: &Path,
    folders: &[String],
    disabled_extensions: &[String],
) -> DisabledFileMap {
    let mut disabled = DisabledFileMap::new();
    if disabled_extensions.is_empty() {
        return disabled;
    }

    let folder_matcher = PatternMatcher::new(folders);

    for file in all_files(base_dir) {
        if !folder_matcher.should_include_path(&file.rel_path) {
            continue;
        }
        let (base, is_disabled) = strip_disabled_extension(&file.rel_path, disabled_extensions);
        if is_disabled && !base.is_empty() {
            disabled.insert(base.to_string(), file.rel_path.clone());
        }
    }

    disabled
}

/// Where a resource currently lives on disk.
///
/// Returns the disabled variant and its suffix when that file exists, else the
/// plain path and an empty suffix.
pub fn check_disabled_file(
    resource_path: &str,
    disabled: &DisabledFileMap,
    base_dir: &Path,
) -> (PathBuf, String) {
    if let Some(disabled_path) = disabled.get(resource_path) {
        let full = resource_disk_path(base_dir, disabled_path);
        if full.exists() {
            let suffix = disabled_path
                .strip_prefix(resource_path)
                .unwrap_or_default()
                .to_string();
            return (full, suffix);
        }
    }
    (resource_disk_path(base_dir, resource_path), String::new())
}

/// Rename an enabled file back to `path + suffix`. No-op for an empty suffix.
pub fn restore_disabled_file(path: &Path, suffix: &str) -> std::io::Result<()> {
    if suffix.is_empty() {
        return Ok(());
    }
    fs::rename(path, append_suffix(path, suffix))
}
