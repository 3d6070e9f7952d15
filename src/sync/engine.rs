//! Sync sequencer.
//!
//! Brings a local tree in line with the published manifest. The run is an
//! explicit state machine: each [`SyncPhase`] either yields the next phase or
//! aborts the whole run. Nothing is retried.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use humansize::{format_size, DECIMAL};
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::hash::hash_file_async;
use crate::hash::path_utils::{append_suffix, resource_disk_path};
use crate::logging::{LogObserver, RunLog};
use crate::manifest::{RemoteResourceSet, Resource};
use crate::pattern::PatternMatcher;
use crate::progress::{ErrorCallback, ProgressCallback, Reporter, TransferProgress};
use crate::sync::disabled::{
    check_disabled_file, restore_disabled_file, scan_for_disabled_files, DisabledFileMap,
};
use crate::sync::download::Downloader;
use crate::sync::reconcile::{apply_patches, find_user_installed, reconcile_preserve};
use crate::tree::{all_files, TreeFilter};

/// Tunables of a sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Pause before the final progress report.
    pub settle_delay: Duration,
    /// Appended to the manifest path to name the remote download.
    pub temp_suffix: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            temp_suffix: ".tmp".to_string(),
        }
    }
}

/// Phases of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    FetchManifest,
    ReconcilePreserve,
    ApplyPatches,
    Diff,
    Filter,
    Download,
    AdoptManifest,
    Settle,
    Done,
}

impl SyncPhase {
    pub fn next(self) -> Self {
        match self {
            Self::FetchManifest => Self::ReconcilePreserve,
            Self::ReconcilePreserve => Self::ApplyPatches,
            Self::ApplyPatches => Self::Diff,
            Self::Diff => Self::Filter,
            Self::Filter => Self::Download,
            Self::Download => Self::AdoptManifest,
            Self::AdoptManifest => Self::Settle,
            Self::Settle | Self::Done => Self::Done,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::FetchManifest => "fetching remote manifest",
            Self::ReconcilePreserve => "reconciling preserve list",
            Self::ApplyPatches => "applying patches",
            Self::Diff => "comparing local files",
            Self::Filter => "filtering ignored files",
            Self::Download => "downloading files",
            Self::AdoptManifest => "adopting manifest",
            Self::Settle => "finishing",
            Self::Done => "done",
        }
    }
}

/// Outcome of a completed sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Retired paths deleted from disk.
    pub patches_removed: Vec<String>,
    /// User-installed paths appended to the preserve list.
    pub preserve_added: Vec<String>,
    pub downloaded: Vec<String>,
    /// Stale resources the manifest has no URL for.
    pub skipped_without_url: Vec<String>,
    /// Stale resources dropped by the ignore list.
    pub ignored: Vec<String>,
    pub manifest_adopted: bool,
}

/// Mutable state threaded through the phases of one run.
#[derive(Default)]
struct RunState {
    remote: Option<RemoteResourceSet>,
    disabled: DisabledFileMap,
    stale: Vec<Resource>,
    total: usize,
    report: SyncReport,
}

impl RunState {
    fn remote(&self) -> Result<&RemoteResourceSet> {
        self.remote
            .as_ref()
            .ok_or_else(|| SyncError::Task("remote manifest not fetched".to_string()))
    }
}

/// Drives one sync of `base_dir` against the configured update server.
pub struct SyncSequencer {
    base_dir: PathBuf,
    config: Config,
    config_path: PathBuf,
    manifest_path: PathBuf,
    downloader: Arc<dyn Downloader>,
    reporter: Reporter,
    log: RunLog,
    options: SyncOptions,
}

impl SyncSequencer {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        config: Config,
        config_path: impl Into<PathBuf>,
        manifest_path: impl Into<PathBuf>,
        downloader: Arc<dyn Downloader>,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            config,
            config_path: config_path.into(),
            manifest_path: manifest_path.into(),
            downloader,
            reporter: Reporter::default(),
            log: RunLog::default(),
            options: SyncOptions::default(),
        }
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

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.options.settle_delay = delay;
        self
    }

    /// The configuration, including preserve entries added by the last run.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn temp_manifest_path(&self) -> PathBuf {
        append_suffix(&self.manifest_path, &self.options.temp_suffix)
    }

    /// Run every phase in order.
    ///
    /// On failure the error callback fires once, the downloaded manifest is
    /// discarded and the error is returned.
    pub async fn run(&mut self) -> Result<SyncReport> {
        let mut state = RunState::default();
        let mut phase = SyncPhase::FetchManifest;

        while phase != SyncPhase::Done {
            debug!(?phase, "entering sync phase");
            phase = match self.step(phase, &mut state).await {
                Ok(next) => next,
                Err(err) => {
                    if let Some(remote) = state.remote.take() {
                        remote.discard();
                    }
                    let message = format!("Update failed while {}: {}", phase.description(), err);
                    self.log.error(&message);
                    self.reporter.error(&message, &err);
                    return Err(err);
                }
            };
        }

        Ok(state.report)
    }

    async fn step(&mut self, phase: SyncPhase, state: &mut RunState) -> Result<SyncPhase> {
        match phase {
            SyncPhase::FetchManifest => self.fetch_manifest(state).await?,
            SyncPhase::ReconcilePreserve => self.reconcile_preserve(state).await?,
            SyncPhase::ApplyPatches => {
                let removed = apply_patches(
                    &state.remote()?.set.patches,
                    &self.config,
                    &state.disabled,
                    &self.base_dir,
                    &self.log,
                );
                state.report.patches_removed = removed;
            }
            SyncPhase::Diff => self.diff(state).await?,
            SyncPhase::Filter => self.filter(state),
            SyncPhase::Download => self.download(state).await?,
            SyncPhase::AdoptManifest => self.adopt_manifest(state),
            SyncPhase::Settle => {
                if !self.options.settle_delay.is_zero() {
                    tokio::time::sleep(self.options.settle_delay).await;
                }
                self.reporter.progress(TransferProgress::finished(state.total));
                self.log.info("Done");
            }
            SyncPhase::Done => {}
        }
        Ok(phase.next())
    }

    async fn fetch_manifest(&mut self, state: &mut RunState) -> Result<()> {
        self.log.info("Checking for updates...");
        if !self.config.welcome_message.is_empty() {
            self.log.raw(&self.config.welcome_message);
        }

        let url = self.config.update_server.clone();
        if url.is_empty() {
            return Err(SyncError::transport("", "no update server configured"));
        }

        let temp = self.temp_manifest_path();
        if let Some(parent) = temp.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| SyncError::io(e, "creating manifest directory", parent))?;
        }

        if let Err(e) = self.downloader.fetch(&url, &temp, &mut |_: u64| {}).await {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }

        let remote = RemoteResourceSet::from_temp_file(temp)?;
        self.log.info(format!(
            "Remote manifest '{}' version {} lists {} files",
            remote.set.name,
            remote.set.local_version,
            remote.set.resources.len()
        ));
        state.remote = Some(remote);
        Ok(())
    }

    async fn reconcile_preserve(&mut self, state: &mut RunState) -> Result<()> {
        let base = self.base_dir.clone();
        let folders = self.config.folders.clone();
        let extensions = self.config.disabled_extensions.clone();
        state.disabled = match tokio::task::spawn_blocking(move || {
            scan_for_disabled_files(&base, &folders, &extensions)
        })
        .await
        {
            Ok(disabled) => disabled,
            Err(e) => {
                self.log.warn(format!("Failed to scan for disabled files: {}", e));
                DisabledFileMap::new()
            }
        };

        let base = self.base_dir.clone();
        let files = match tokio::task::spawn_blocking(move || all_files(&base)).await {
            Ok(files) => files,
            Err(e) => {
                self.log.warn(format!("Failed to scan for user-installed files: {}", e));
                return Ok(());
            }
        };

        let filter = TreeFilter::new(&self.config.folders, &self.config.ignore, &self.log);
        let user_installed = find_user_installed(
            &files,
            &filter,
            &state.remote()?.set,
            &self.config.disabled_extensions,
        );

        state.report.preserve_added =
            reconcile_preserve(&mut self.config, &self.config_path, &user_installed, &self.log);
        Ok(())
    }

    async fn diff(&self, state: &mut RunState) -> Result<()> {
        let resources = state.remote()?.set.resources.clone();
        let mut stale = Vec::new();

        for resource in resources {
            let (path, _) = check_disabled_file(&resource.path, &state.disabled, &self.base_dir);
            if !path.is_file() {
                debug!(path = %resource.path, "missing locally");
                stale.push(resource);
                continue;
            }
            match hash_file_async(&path).await {
                Ok(digest) if digest.hash == resource.hash => {}
                Ok(_) => {
                    debug!(path = %resource.path, "hash mismatch");
                    stale.push(resource);
                }
                Err(e) => {
                    self.log.warn(format!("Failed to hash {}: {}", path.display(), e));
                    stale.push(resource);
                }
            }
        }

        self.log.info(format!("{} files need updating", stale.len()));
        state.stale = stale;
        Ok(())
    }

    fn filter(&self, state: &mut RunState) {
        let ignore = PatternMatcher::with_log(&self.config.ignore, &self.log);
        let (ignored, kept): (Vec<Resource>, Vec<Resource>) = state
            .stale
            .drain(..)
            .partition(|r| ignore.should_ignore(&r.path, false));

        for resource in &ignored {
            debug!(path = %resource.path, "stale file is ignored");
        }
        state.report.ignored = ignored.into_iter().map(|r| r.path).collect();
        state.total = kept.len();
        state.stale = kept;
    }

    async fn download(&self, state: &mut RunState) -> Result<()> {
        let total = state.total;
        let stale = std::mem::take(&mut state.stale);

        for (index, resource) in stale.iter().enumerate() {
            if resource.url.is_empty() {
                self.log.warn(format!("No download URL for {}, skipping", resource.path));
                state.report.skipped_without_url.push(resource.path.clone());
                continue;
            }

            self.download_one(resource, index, total, &state.disabled).await?;
            state.report.downloaded.push(resource.path.clone());
        }
        Ok(())
    }

    async fn download_one(
        &self,
        resource: &Resource,
        index: usize,
        total: usize,
        disabled: &DisabledFileMap,
    ) -> Result<()> {
        let name = resource.file_name().to_string();
        let size = resource.size;
        self.reporter
            .progress(TransferProgress::new(name.as_str(), 0, size, index, total));

        let plain = resource_disk_path(&self.base_dir, &resource.path);
        if let Some(parent) = plain.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SyncError::io(e, "creating resource directory", parent))?;
        }

        let (actual, suffix) = check_disabled_file(&resource.path, disabled, &self.base_dir);
        let (target, restore) = if suffix.is_empty() {
            (plain.clone(), false)
        } else {
            match fs::rename(&actual, &plain) {
                Ok(()) => (plain.clone(), true),
                Err(e) => {
                    self.log.warn(format!(
                        "Failed to re-enable {}: {}",
                        actual.display(),
                        e
                    ));
                    (actual.clone(), false)
                }
            }
        };

        self.log.info(format!(
            "Downloading {} ({})",
            resource.path,
            format_size(size, DECIMAL)
        ));

        let reporter = self.reporter.clone();
        let mut on_bytes = |bytes: u64| {
            reporter.progress(TransferProgress::new(name.as_str(), bytes, size, index, total));
        };
        let result = self
            .downloader
            .fetch(&resource.url, &target, &mut on_bytes)
            .await;

        if restore {
            self.restore_disabled(&plain, &suffix);
        }
        result?;

        self.reporter
            .progress(TransferProgress::new(name.as_str(), size, size, index + 1, total));
        Ok(())
    }

    fn restore_disabled(&self, path: &Path, suffix: &str) {
        if let Err(e) = restore_disabled_file(path, suffix) {
            self.log.warn(format!(
                "Failed to disable {} again: {}",
                path.display(),
                e
            ));
        }
    }

    fn adopt_manifest(&self, state: &mut RunState) {
        let Some(remote) = state.remote.take() else {
            return;
        };
        let version = remote.set.local_version.clone();
        match remote.adopt(&self.manifest_path) {
            Ok(_) => {
                self.log.info(format!("Local manifest updated to version {}", version));
                state.report.manifest_adopted = true;
            }
            Err(e) => self.log.warn(format!("Failed to adopt new manifest: {}", e)),
        }
    }
}
