//! Download URL lookup used while publishing.

use async_trait::async_trait;

use crate::error::Result;

/// Looks up a public download URL for a file by its content digest.
///
/// Only consulted for files whose previous manifest entry carries no URL.
/// `Ok(None)` (or an empty string) means "unknown" and is not an error; an
/// `Err` aborts manifest generation.
#[async_trait]
pub trait UrlResolver: Send + Sync {
    async fn resolve(&self, hash: &str, file_name: &str) -> Result<Option<String>>;
}
