//! SHA-1 content digests.
//!
//! Manifests record every resource as a lowercase hex SHA-1 of its bytes; the
//! same digest decides whether a local file is stale.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha1::{Digest, Sha1};

use crate::error::{Result, SyncError};

/// A computed file digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    /// The hash value as hex string.
    pub hash: String,
    /// File size in bytes.
    pub size: u64,
}

/// Hash bytes with SHA-1.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// Hash a file with SHA-1, streaming it through a 64KB buffer.
pub fn hash_file(path: &Path) -> Result<FileDigest> {
    let mut file =
        File::open(path).map_err(|e| SyncError::io(e, "opening file for hashing", path))?;

    let mut hasher = Sha1::new();
    let mut buffer = [0u8; 65536];
    let mut size = 0u64;

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| SyncError::io(e, "reading file for hashing", path))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        size += bytes_read as u64;
    }

    Ok(FileDigest {
        hash: hex::encode(hasher.finalize()),
        size,
    })
}

/// Hash a file on the blocking pool.
pub async fn hash_file_async(path: &Path) -> Result<FileDigest> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || hash_file(&path)).await?
}
