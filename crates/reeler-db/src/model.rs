//! Metadata record model

use chrono::{DateTime, Utc};
use reeler_types::VideoParams;

/// A cached content descriptor, keyed by `(video_id, mime, quality)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub video_id: String,
    pub mime: String,
    pub quality: String,
    /// Delivery reference issued by the chat transport. Empty until the
    /// first successful delivery; once non-empty it is never cleared.
    pub file_id: String,
    pub params: VideoParams,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MetadataRecord {
    /// A fresh record for content that has been fetched but not yet
    /// delivered.
    pub fn new(
        video_id: impl Into<String>,
        mime: impl Into<String>,
        quality: impl Into<String>,
        params: VideoParams,
    ) -> Self {
        let now = Utc::now();
        Self {
            video_id: video_id.into(),
            mime: mime.into(),
            quality: quality.into(),
            file_id: String::new(),
            params,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_delivery_reference(&self) -> bool {
        !self.file_id.is_empty()
    }
}
