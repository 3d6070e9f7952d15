//! Pack configuration.
//!
//! The configuration is owned by the host application; the engine reads it and
//! only writes back the `preserve` list when user-installed files are found.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub welcome_message: String,
    /// Allow-list of managed folders (patterns).
    #[serde(default)]
    pub folders: Vec<String>,
    /// Deny-list (patterns, negations allowed).
    #[serde(default)]
    pub ignore: Vec<String>,
    /// URL of the published manifest.
    #[serde(default)]
    pub update_server: String,
    /// Paths never removed by patches.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preserve: Vec<String>,
    /// Suffixes that mark a toggled-off file, e.g. `.disabled`.
    #[serde(
        default,
        rename = "disabledExtensions",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub disabled_extensions: Vec<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data =
            fs::read_to_string(path).map_err(|e| SyncError::io(e, "reading config", path))?;
        serde_json::from_str(&data).map_err(|source| SyncError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self).map_err(|source| SyncError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, data).map_err(|e| SyncError::io(e, "writing config", path))
    }

    pub fn is_preserved(&self, path: &str) -> bool {
        self.preserve.iter().any(|p| p == path)
    }
}
