//! Queue wire format

use serde::{Deserialize, Serialize};

/// The message body published to the "fetching" and "uploading" queues.
///
/// A payload is produced incomplete (empty `mime`/`quality`) when a chat
/// message is first parsed; the fetch phase completes it once a rendition
/// has been chosen, and it is carried unchanged into the upload phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPayload {
    pub video_id: String,
    pub chat_id: i64,
    #[serde(default)]
    pub mime: String,
    #[serde(default)]
    pub quality: String,
}

impl JobPayload {
    /// Create an incomplete payload, as parsed from a chat message.
    pub fn new(video_id: impl Into<String>, chat_id: i64) -> Self {
        Self {
            video_id: video_id.into(),
            chat_id,
            mime: String::new(),
            quality: String::new(),
        }
    }

    /// Complete the payload with a chosen rendition.
    pub fn with_rendition(mut self, mime: impl Into<String>, quality: impl Into<String>) -> Self {
        self.mime = mime.into();
        self.quality = quality.into();
        self
    }

    /// Re-derive the minimal two-field payload used for shutdown requeue.
    pub fn minimal(&self) -> Self {
        Self::new(self.video_id.clone(), self.chat_id)
    }
}
