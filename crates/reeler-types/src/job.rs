//! In-flight job bookkeeping

use serde::{Deserialize, Serialize};

use crate::payload::JobPayload;

/// Which pipeline phase a dequeued message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Fetching,
    Uploading,
}

/// A dequeued-but-unfinished unit of work.
///
/// Jobs exist solely so that graceful shutdown can requeue accepted work;
/// the queue broker remains the source of truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub kind: JobKind,
    pub payload: JobPayload,
}

impl Job {
    pub fn new(kind: JobKind, payload: JobPayload) -> Self {
        Self { kind, payload }
    }
}
