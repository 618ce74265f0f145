//! Shared types for the Reeler pipeline
//!
//! This crate holds the wire format published to the work queues, the
//! in-flight job bookkeeping unit, and the rendition parameters carried
//! from the fetch phase into the upload phase.

pub mod job;
pub mod payload;
pub mod video;

pub use job::{Job, JobKind};
pub use payload::JobPayload;
pub use video::VideoParams;
