//! Manifest generation (publish mode).
//!
//! Walks the managed folders, hashes every file and writes the next manifest
//! version. URLs curated in the previous manifest are carried over; retired
//! paths are appended to `patches`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use humansize::{format_size, DECIMAL};

use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::generate::provider::UrlResolver;
use crate::hash::hash_file_async;
use crate::hash::path_utils::append_suffix;
use crate::logging::{LogObserver, RunLog};
use crate::manifest::{increment_version, Resource, ResourceSet};
use crate::progress::{ErrorCallback, ProgressCallback, Reporter, TransferProgress};
use crate::tree::{TreeFile, TreeFilter};

/// Outcome of a manifest generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateReport {
    /// The manifest as written.
    pub manifest: ResourceSet,
    /// Patch entries added by this generation.
    pub new_patches: Vec<String>,
    /// Files the resolver had no URL for.
    pub missing_urls: Vec<String>,
}

/// Builds the next manifest version from the files under `base_dir`.
pub struct ManifestGenerator {
    base_dir: PathBuf,
    config: Config,
    previous: ResourceSet,
    output_path: PathBuf,
    resolver: Option<Arc<dyn UrlResolver>>,
    reporter: Reporter,
    log: RunLog,
}

impl ManifestGenerator {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        config: Config,
        previous: ResourceSet,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            config,
            previous,
            output_path: output_path.into(),
            resolver: None,
            reporter: Reporter::default(),
            log: RunLog::default(),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn UrlResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.reporter.set_progress(callback);
        self
    }

    pub fn with_error_callback(mut self, callback: ErrorCallback) -> Self {
        self.reporter.set_error(callback);
        self
    }

    pub fn with_log_observer(mut self, observer: Arc<dyn LogObserver>) -> Self {
        self.log = RunLog::new(Some(observer));
        self
    }

    /// Generate and persist the manifest.
    ///
    /// Nothing is written when any file fails; the error callback fires once.
    pub async fn generate(&self) -> Result<GenerateReport> {
        match self.run().await {
            Ok(report) => Ok(report),
            Err(err) => {
                let message = format!("Failed to generate manifest: {}", err);
                self.log.error(&message);
                self.reporter.error(&message, &err);
                Err(err)
            }
        }
    }

    async fn run(&self) -> Result<GenerateReport> {
        self.log.info(format!(
            "Generating manifest for {}",
            self.base_dir.display()
        ));

        let files = self.collect_files().await?;
        let total = files.len();
        self.log.info(format!("Found {} files to process", total));

        let curated: HashMap<&str, &str> = self
            .previous
            .resources
            .iter()
            .filter(|r| !r.url.is_empty())
            .map(|r| (r.path.as_str(), r.url.as_str()))
            .collect();

        let mut resources = Vec::with_capacity(total);
        let mut missing_urls = Vec::new();

        for (processed, file) in files.iter().enumerate() {
            let name = file.file_name();
            self.reporter
                .progress(TransferProgress::new(name, 0, file.size, processed, total));
            self.log.info(format!(
                "Processing: {} ({})",
                name,
                format_size(file.size, DECIMAL)
            ));

            let digest = hash_file_async(&file.path).await?;
            let mut resource = Resource::new(file.rel_path.as_str(), digest.hash, digest.size);

            if let Some(url) = curated.get(file.rel_path.as_str()) {
                resource.url = url.to_string();
            } else if let Some(resolver) = &self.resolver {
                match resolver.resolve(&resource.hash, name).await {
                    Ok(Some(url)) if !url.is_empty() => resource.url = url,
                    Ok(_) => missing_urls.push(file.rel_path.clone()),
                    Err(e) => {
                        return Err(SyncError::Resolver {
                            file: file.rel_path.clone(),
                            reason: e.to_string(),
                        })
                    }
                }
            }

            self.reporter.progress(TransferProgress::new(
                name,
                digest.size,
                digest.size,
                processed + 1,
                total,
            ));
            resources.push(resource);
        }

        let mut manifest = ResourceSet {
            name: self.config.name.clone(),
            local_version: increment_version(&self.previous.local_version),
            resource_set_hash: String::new(),
            patches: self.previous.patches.clone(),
            resources,
        };
        manifest.sort_by_url();
        let new_patches = manifest.append_patches_from(&self.previous);
        manifest.refresh_hash();
        manifest.save(&self.output_path)?;

        self.reporter.progress(TransferProgress::finished(total));
        self.summarize(&manifest, &new_patches, &missing_urls);

        Ok(GenerateReport {
            manifest,
            new_patches,
            missing_urls,
        })
    }

    /// Files to publish, in walk order. The output manifest and its temp file
    /// are never part of the tree.
    async fn collect_files(&self) -> Result<Vec<TreeFile>> {
        let root = fs::canonicalize(&self.base_dir)
            .map_err(|e| SyncError::io(e, "resolving base directory", &self.base_dir))?;
        let output = absolute_output_path(&self.output_path);
        let exclude = vec![append_suffix(&output, ".tmp"), output];

        let filter = TreeFilter::new(&self.config.folders, &self.config.ignore, &self.log);
        tokio::task::spawn_blocking(move || filter.collect(&root, &exclude)).await?
    }

    fn summarize(&self, manifest: &ResourceSet, new_patches: &[String], missing_urls: &[String]) {
        self.log.info(format!("New version: {}", manifest.local_version));
        self.log.info(format!("Total resources: {}", manifest.resources.len()));
        for patch in new_patches {
            self.log.info(format!("Retired: {}", patch));
        }

        if self.resolver.is_some() && !missing_urls.is_empty() {
            self.log.warn(format!(
                "Found {} files with missing download URLs:",
                missing_urls.len()
            ));
            for path in missing_urls {
                self.log.warn(format!("  - {}", path));
            }
            self.log
                .warn("These files have been placed at the bottom of the resources list.");
        }

        self.log
            .info(format!("Saved to: {}", self.output_path.display()));
    }
}

/// `path` with its parent directory canonicalized, so it compares equal to
/// paths produced by walking a canonical root.
fn absolute_output_path(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    match (fs::canonicalize(&parent), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}
