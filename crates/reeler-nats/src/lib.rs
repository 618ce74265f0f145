//! NATS JetStream infrastructure for the Reeler pipeline
//!
//! Two durable work-queue streams ("fetching" and "uploading") carry the
//! job payloads between pipeline phases with at-least-once delivery, and a
//! JetStream KV bucket persists conversation sessions with a TTL. This
//! crate owns connection management, stream/consumer/bucket setup, the
//! publish side ([`JobQueue`]), the typed consume side ([`JobStream`]),
//! and the KV-backed session backend.

pub mod config;
pub mod error;
pub mod kv;
pub mod nats;
pub mod queue;
pub mod subjects;

pub use config::NatsConfig;
pub use error::{Error, Result};
pub use kv::KvSessionBackend;
pub use nats::connect;
pub use queue::{JobQueue, JobStream, NatsJobQueue};
