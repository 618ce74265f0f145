//! Metadata cache for fetched content
//!
//! Maps a `(video_id, mime, quality)` key to a cached descriptor and an
//! optional delivery reference issued by the chat transport. Records are
//! inserted on first successful fetch and promoted in place once a
//! delivery reference is obtained; they are never deleted. The promotion
//! is one-way: a non-empty `file_id` is never overwritten by an empty one,
//! and the upsert SQL itself enforces that.

pub mod config;
pub mod error;
pub mod model;
pub mod pg;

use async_trait::async_trait;

pub use config::DatabaseConfig;
pub use error::{Error, Result};
pub use model::MetadataRecord;
pub use pg::PgMetadataStore;

/// Metadata store collaborator.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Fetch a record by its unique key. Missing records are
    /// [`Error::NotFound`].
    async fn fetch_by_key(&self, video_id: &str, mime: &str, quality: &str)
        -> Result<MetadataRecord>;

    /// Insert or promote a record. A concurrent collision the store cannot
    /// resolve surfaces as [`Error::Conflict`].
    async fn upsert(&self, record: &MetadataRecord) -> Result<()>;
}
