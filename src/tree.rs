// Directory traversal for the managed tree
// A pruning walk (ignore + folder rules) for manifest generation, and a plain
// full walk for the sync-time scans.

use std::fs;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;

use crate::error::{Result, SyncError};
use crate::hash::path_utils::relative_slash_path;
use crate::logging::RunLog;
use crate::pattern::PatternMatcher;

/// A regular file found below the tree root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeFile {
    /// Slash-separated path relative to the root.
    pub rel_path: String,
    pub path: PathBuf,
    pub size: u64,
}

impl TreeFile {
    pub fn file_name(&self) -> &str {
        self.rel_path.rsplit('/').next().unwrap_or(&self.rel_path)
    }
}

/// Ignore and folder rules of one run.
pub struct TreeFilter {
    ignore: PatternMatcher,
    folders: PatternMatcher,
    raw_folders: Vec<String>,
}

impl TreeFilter {
    pub fn new(folders: &[String], ignore: &[String], log: &RunLog) -> Self {
        Self {
            ignore: PatternMatcher::with_log(ignore, log),
            folders: PatternMatcher::with_log(folders, log),
            raw_folders: folders.to_vec(),
        }
    }

    pub fn folders(&self) -> &PatternMatcher {
        &self.folders
    }

    /// A directory is walked if it is an included folder or a folder rule
    /// could still match somewhere below it.
    pub fn should_descend(&self, rel_dir: &str) -> bool {
        if self.folders.should_include_folder(rel_dir) {
            return true;
        }
        self.raw_folders.iter().any(|raw| {
            let prefix = raw.strip_suffix('/').unwrap_or(raw);
            prefix.starts_with(&format!("{}/", rel_dir)) || prefix.starts_with(rel_dir)
        })
    }

    /// A file is managed when it is not ignored and lies in an included folder.
    pub fn is_managed_file(&self, rel_path: &str) -> bool {
        !self.ignore.should_ignore(rel_path, false) && self.folders.should_include_path(rel_path)
    }

    /// Walk `root` in file-name order, pruning ignored and unrelated
    /// directories. Paths in `exclude` are never returned.
    pub fn collect(&self, root: &Path, exclude: &[PathBuf]) -> Result<Vec<TreeFile>> {
        if !root.is_dir() {
            return Err(SyncError::io(
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
                "scanning directory",
                root,
            ));
        }
        let mut files = Vec::new();
        self.collect_recursive(root, root, exclude, &mut files)?;
        Ok(files)
    }

    fn collect_recursive(
        &self,
        root: &Path,
        dir: &Path,
        exclude: &[PathBuf],
        files: &mut Vec<TreeFile>,
    ) -> Result<()> {
        let mut entries = fs::read_dir(dir)
            .map_err(|e| SyncError::io(e, "reading directory", dir))?
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| SyncError::io(e, "reading directory entry", dir))?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let Some(rel_path) = relative_slash_path(&path, root) else {
                continue;
            };

            let file_type = entry
                .file_type()
                .map_err(|e| SyncError::io(e, "reading metadata", &path))?;
            let is_dir = file_type.is_dir();

            if self.ignore.should_ignore(&rel_path, is_dir) {
                continue;
            }

            if is_dir {
                if self.should_descend(&rel_path) {
                    self.collect_recursive(root, &path, exclude, files)?;
                }
            } else if file_type.is_file() {
                if exclude.iter().any(|ex| ex == &path) {
                    continue;
                }
                if !self.folders.should_include_path(&rel_path) {
                    continue;
                }
                let size = entry
                    .metadata()
                    .map_err(|e| SyncError::io(e, "reading metadata", &path))?
                    .len();
                files.push(TreeFile {
                    rel_path,
                    path,
                    size,
                });
            }
            // Skip symbolic links and other special files
        }

        Ok(())
    }
}

/// Every regular file below `root`, sorted, as slash-separated relative paths.
/// Unreadable entries are skipped.
pub fn all_files(root: &Path) -> Vec<TreeFile> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .sort(true)
        .skip_hidden(false)
        .follow_links(false)
        .into_iter()
        .flatten()
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(rel_path) = relative_slash_path(&path, root) else {
            continue;
        };
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        files.push(TreeFile {
            rel_path,
            path,
            size,
        });
    }
    files
}
