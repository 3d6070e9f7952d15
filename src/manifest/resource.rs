use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::{Result, SyncError};
use crate::hash::path_utils::{append_suffix, is_valid_resource_path};

/// Version given to a freshly initialised manifest.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// One managed file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Slash-separated path relative to the tree root; unique key.
    pub path: String,
    /// Lowercase hex SHA-1 of the content.
    pub hash: String,
    pub size: u64,
    /// Download source; empty when no provider is configured.
    #[serde(default)]
    pub url: String,
}

impl Resource {
    pub fn new(path: impl Into<String>, hash: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            hash: hash.into(),
            size,
            url: String::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Final path segment, used in progress and log lines.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// The manifest.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSet {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub local_version: String,
    #[serde(default)]
    pub resource_set_hash: String,
    /// Retired paths, append-only and deduplicated.
    #[serde(default)]
    pub patches: Vec<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl ResourceSet {
    /// Empty manifest at [`DEFAULT_VERSION`].
    pub fn new(name: impl Into<String>) -> Self {
        let mut set = Self {
            name: name.into(),
            local_version: DEFAULT_VERSION.to_string(),
            ..Default::default()
        };
        set.refresh_hash();
        set
    }

    /// Read and validate a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .map_err(|e| SyncError::io(e, "reading manifest", path))?;
        Self::parse(&data, path)
    }

    /// Decode and validate manifest JSON; `origin` is only used in errors.
    pub fn parse(data: &str, origin: &Path) -> Result<Self> {
        let set: ResourceSet =
            serde_json::from_str(data).map_err(|source| SyncError::ManifestParse {
                path: origin.to_path_buf(),
                source,
            })?;
        set.validate(origin)?;
        Ok(set)
    }

    /// Load `path`, or write and return an empty manifest if it does not exist.
    pub fn load_or_init(path: &Path, name: &str) -> Result<(Self, bool)> {
        if path.exists() {
            return Ok((Self::load(path)?, false));
        }
        let set = Self::new(name);
        set.save(path)?;
        Ok((set, true))
    }

    /// Check the path invariants: non-empty, no dot segments, unique.
    pub fn validate(&self, origin: &Path) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.resources.len());
        for resource in &self.resources {
            if !is_valid_resource_path(&resource.path) {
                return Err(SyncError::InvalidManifest {
                    path: origin.to_path_buf(),
                    reason: format!("invalid resource path '{}'", resource.path),
                });
            }
            if !seen.insert(resource.path.as_str()) {
                return Err(SyncError::InvalidManifest {
                    path: origin.to_path_buf(),
                    reason: format!("duplicate resource path '{}'", resource.path),
                });
            }
        }
        Ok(())
    }

    /// Persist as 2-space indented JSON through a temp file and rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self).map_err(|source| {
            SyncError::ManifestParse {
                path: path.to_path_buf(),
                source,
            }
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| SyncError::io(e, "creating manifest directory", parent))?;
        }

        let temp = append_suffix(path, ".tmp");
        fs::write(&temp, data).map_err(|e| SyncError::io(e, "writing manifest", &temp))?;
        fs::rename(&temp, path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            SyncError::io(e, "replacing manifest", path)
        })
    }

    /// SHA-1 over `path + hash` of every resource, in list order.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha1::new();
        for resource in &self.resources {
            hasher.update(resource.path.as_bytes());
            hasher.update(resource.hash.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    pub fn refresh_hash(&mut self) {
        self.resource_set_hash = self.compute_hash();
    }

    /// Stable partition: entries with a URL first.
    pub fn sort_by_url(&mut self) {
        let (with_url, without_url): (Vec<Resource>, Vec<Resource>) = self
            .resources
            .drain(..)
            .partition(|r| !r.url.is_empty());
        self.resources = with_url;
        self.resources.extend(without_url);
    }

    /// Append every path of `previous` that is no longer listed here and not
    /// already patched. Returns the newly added patch entries.
    pub fn append_patches_from(&mut self, previous: &ResourceSet) -> Vec<String> {
        let current: HashSet<&str> = self.resources.iter().map(|r| r.path.as_str()).collect();
        let mut known: HashSet<String> = self.patches.iter().cloned().collect();

        let mut added = Vec::new();
        for old in &previous.resources {
            if current.contains(old.path.as_str()) {
                continue;
            }
            if known.insert(old.path.clone()) {
                added.push(old.path.clone());
            }
        }

        self.patches.extend(added.iter().cloned());
        added
    }

    pub fn get(&self, path: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.path == path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn resource_paths(&self) -> HashSet<&str> {
        self.resources.iter().map(|r| r.path.as_str()).collect()
    }
}

/// A fetched remote manifest that still lives in its download temp file.
#[derive(Debug)]
pub struct RemoteResourceSet {
    pub set: ResourceSet,
    temp_path: PathBuf,
}

impl RemoteResourceSet {
    /// Parse the downloaded temp file; the temp file is deleted if it is invalid.
    pub fn from_temp_file(temp_path: PathBuf) -> Result<Self> {
        match ResourceSet::load(&temp_path) {
            Ok(set) => Ok(Self { set, temp_path }),
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }

    /// Rename the temp file over `destination`. On failure the temp file is
    /// removed and the error returned.
    pub fn adopt(self, destination: &Path) -> Result<ResourceSet> {
        match fs::rename(&self.temp_path, destination) {
            Ok(()) => Ok(self.set),
            Err(e) => {
                let _ = fs::remove_file(&self.temp_path);
                Err(SyncError::io(e, "adopting remote manifest", destination))
            }
        }
    }

    /// Drop the temp file without touching the local manifest.
    pub fn discard(self) {
        let _ = fs::remove_file(&self.temp_path);
    }
}
