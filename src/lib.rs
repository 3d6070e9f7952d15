// Library module for packsync
// Re-exports modules for use in integration tests and the command-line front end

pub mod config;
pub mod error;
pub mod generate;
pub mod hash;
pub mod logging;
pub mod manifest;
pub mod pattern;
pub mod progress;
pub mod sync;
pub mod tree;

pub use config::Config;
pub use error::{Result, SyncError};
pub use generate::{GenerateReport, ManifestGenerator, UrlResolver};
pub use manifest::{RemoteResourceSet, Resource, ResourceSet};
pub use progress::{ErrorCallback, ProgressCallback, TransferProgress};
pub use sync::{Downloader, HttpDownloader, SyncOptions, SyncReport, SyncSequencer};
