//! # Artifact Stores
//!
//! An artifact store persists produced images under their derived names and
//! can enumerate the names it holds (the listing side feeds the catalog
//! indexer). Collisions are avoided upstream by the naming convention, so the
//! bucket backend refuses overwrites outright rather than papering over them.

pub mod bucket;
pub mod filesystem;

use async_trait::async_trait;

use crate::error::Result;

pub use bucket::{BucketArtifactStore, BucketStoreSettings};
pub use filesystem::FilesystemArtifactStore;

/// Contract for artifact persistence backends
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist an image buffer under the given filename. A write failure is
    /// returned for the caller to log; the artifact is considered lost for
    /// that attempt and is never re-queued.
    async fn store(&self, filename: &str, bytes: &[u8]) -> Result<()>;

    /// Enumerate stored artifact names. Used by the catalog indexer.
    async fn list_names(&self) -> Result<Vec<String>>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}
