//! Preserve-list reconciliation and patch application.
//!
//! Files a user dropped into a managed folder are neither remote resources nor
//! retired paths. They are recorded in the config's `preserve` list before any
//! patch runs, so a later patch naming the same path never deletes them.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::hash::path_utils::is_valid_resource_path;
use crate::logging::RunLog;
use crate::manifest::ResourceSet;
use crate::sync::disabled::{check_disabled_file, strip_disabled_extension, DisabledFileMap};
use crate::tree::{TreeFile, TreeFilter};

/// Canonical paths of managed files the remote manifest knows nothing about.
///
/// A file counts when it is managed by `filter` and its path, with any
/// disabled suffix stripped, is neither a remote resource nor a remote patch.
pub fn find_user_installed(
    files: &[TreeFile],
    filter: &TreeFilter,
    remote: &ResourceSet,
    disabled_extensions: &[String],
) -> Vec<String> {
    let resources = remote.resource_paths();
    let patches: HashSet<&str> = remote.patches.iter().map(String::as_str).collect();

    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for file in files {
        if !filter.is_managed_file(&file.rel_path) {
            continue;
        }
        let (canonical, _) = strip_disabled_extension(&file.rel_path, disabled_extensions);
        if resources.contains(canonical) || patches.contains(canonical) {
            continue;
        }
        if seen.insert(canonical.to_string()) {
            found.push(canonical.to_string());
        }
    }
    found
}

/// Append unseen `user_installed` paths to `config.preserve` and persist the
/// config. A failed save is only a warning. Returns the added entries.
pub fn reconcile_preserve(
    config: &mut Config,
    config_path: &Path,
    user_installed: &[String],
    log: &RunLog,
) -> Vec<String> {
    let added: Vec<String> = user_installed
        .iter()
        .filter(|path| !config.is_preserved(path))
        .cloned()
        .collect();

    if added.is_empty() {
        return added;
    }

    for path in &added {
        log.info(format!("Preserving user-installed file {}", path));
    }
    config.preserve.extend(added.iter().cloned());

    if let Err(e) = config.save(config_path) {
        log.warn(format!("Failed to save preserve list: {}", e));
    }
    added
}

/// Delete every retired path that is present locally and not preserved.
///
/// The disabled variant of a patched resource is removed as well. Failures are
/// warnings. Returns the paths actually removed.
pub fn apply_patches(
    patches: &[String],
    config: &Config,
    disabled: &DisabledFileMap,
    base_dir: &Path,
    log: &RunLog,
) -> Vec<String> {
    let mut removed = Vec::new();
    for patch in patches {
        if config.is_preserved(patch) {
            tracing::debug!(path = %patch, "patch skipped, path is preserved");
            continue;
        }
        if !is_valid_resource_path(patch) {
            log.warn(format!("Ignoring invalid patch path '{}'", patch));
            continue;
        }

        let (path, _) = check_disabled_file(patch, disabled, base_dir);
        if !path.is_file() {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                log.info(format!("Removed retired file {}", patch));
                removed.push(patch.clone());
            }
            Err(e) => log.warn(format!("Failed to remove {}: {}", path.display(), e)),
        }
    }
    removed
}
