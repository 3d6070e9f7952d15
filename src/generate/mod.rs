//! Publish mode
//!
//! Regenerates the manifest from the local tree.

pub mod generator;
pub mod provider;

pub use generator::{GenerateReport, ManifestGenerator};
pub use provider::UrlResolver;
