// Content hashing and path helpers
// Shared by the manifest generator and the sync sequencer

pub mod digest;
pub mod path_utils;

pub use digest::{hash_bytes, hash_file, hash_file_async, FileDigest};
pub use path_utils::{relative_slash_path, resource_disk_path, to_slash};
