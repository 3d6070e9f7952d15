//! Sync mode
//!
//! Fetches the published manifest, reconciles the preserve list, applies
//! patches, downloads stale files and adopts the new manifest.

pub mod disabled;
pub mod download;
pub mod engine;
pub mod reconcile;

pub use disabled::{
    check_disabled_file, restore_disabled_file, scan_for_disabled_files,
    strip_disabled_extension, DisabledFileMap,
};
pub use download::{Downloader, HttpDownloader};
pub use engine::{SyncOptions, SyncPhase, SyncReport, SyncSequencer};
