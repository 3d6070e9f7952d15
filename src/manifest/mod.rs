//! Resource manifest model.
//!
//! A manifest ([`ResourceSet`]) lists every managed file with its SHA-1 digest,
//! size and download URL, plus the `patches` list of paths the publisher has
//! retired. The remote copy fetched during a sync is wrapped in a
//! [`RemoteResourceSet`] until it is adopted or discarded.

pub mod resource;
pub mod version;

pub use resource::{RemoteResourceSet, Resource, ResourceSet, DEFAULT_VERSION};
pub use version::increment_version;
