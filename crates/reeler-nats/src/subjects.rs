//! NATS subject patterns for the job queues
//!
//! Subject pattern: `reeler.{prefix}.jobs.{queue}`
//!
//! - `reeler.{prefix}.jobs.fetching` — payloads awaiting the fetch phase
//! - `reeler.{prefix}.jobs.uploading` — payloads awaiting the upload phase

/// Queue names, also used in stream and consumer names.
pub const QUEUE_FETCHING: &str = "fetching";
pub const QUEUE_UPLOADING: &str = "uploading";

/// Subject builder for job queues
pub mod jobs {
    /// Subject of an arbitrary job queue
    pub fn queue(prefix: &str, name: &str) -> String {
        format!("reeler.{}.jobs.{}", prefix, name)
    }

    /// Fetch-requests queue subject
    pub fn fetching(prefix: &str) -> String {
        queue(prefix, super::QUEUE_FETCHING)
    }

    /// Upload-requests queue subject
    pub fn uploading(prefix: &str) -> String {
        queue(prefix, super::QUEUE_UPLOADING)
    }
}
