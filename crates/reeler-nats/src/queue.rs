//! Job queue publish and consume helpers

use std::marker::PhantomData;

use async_nats::jetstream;
use async_nats::jetstream::consumer::PullConsumer;
use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use reeler_types::JobPayload;

use crate::error::{Error, Result};
use crate::subjects;

/// Publish side of the two job queues.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn publish_fetching(&self, payload: &JobPayload) -> Result<()>;
    async fn publish_uploading(&self, payload: &JobPayload) -> Result<()>;
}

/// JetStream-backed publisher.
///
/// Every publish awaits the `PubAck`, so a returned `Ok` means the payload
/// is durably stored in the work-queue stream.
#[derive(Clone)]
pub struct NatsJobQueue {
    js: jetstream::Context,
    prefix: String,
}

impl NatsJobQueue {
    pub fn new(js: jetstream::Context, prefix: impl Into<String>) -> Self {
        Self {
            js,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    async fn publish(&self, subject: String, payload: &JobPayload) -> Result<()> {
        let body = serde_json::to_vec(payload)?;
        trace!("Publishing to {}, size: {} bytes", subject, body.len());

        let ack_future = self
            .js
            .publish(subject.clone(), body.into())
            .await
            .map_err(|e| Error::Publish(format!("JetStream publish to {} failed: {}", subject, e)))?;
        ack_future
            .await
            .map_err(|e| Error::Publish(format!("PubAck for {} failed: {}", subject, e)))?;

        debug!("Published job payload to {}", subject);
        Ok(())
    }
}

#[async_trait]
impl JobQueue for NatsJobQueue {
    async fn publish_fetching(&self, payload: &JobPayload) -> Result<()> {
        self.publish(subjects::jobs::fetching(&self.prefix), payload)
            .await
    }

    async fn publish_uploading(&self, payload: &JobPayload) -> Result<()> {
        self.publish(subjects::jobs::uploading(&self.prefix), payload)
            .await
    }
}

/// Typed stream of queue payloads off a shared durable consumer.
///
/// Messages are acknowledged on receipt, before processing: delivery is
/// at-least-once and nothing downstream acks manually. Recovery of
/// accepted-but-unfinished work is the dispatcher's job registry.
pub struct JobStream<T> {
    messages: jetstream::consumer::pull::Stream,
    _phantom: PhantomData<T>,
}

impl<T: DeserializeOwned> JobStream<T> {
    /// Open a message stream off the consumer. Each worker opens its own.
    pub async fn new(consumer: &PullConsumer) -> Result<Self> {
        let messages = consumer
            .messages()
            .await
            .map_err(|e| Error::Consume(format!("Failed to open message stream: {}", e)))?;
        Ok(Self {
            messages,
            _phantom: PhantomData,
        })
    }

    /// Receive and decode the next payload. `None` means the stream ended.
    pub async fn next(&mut self) -> Option<Result<T>> {
        let msg = match self.messages.next().await? {
            Ok(msg) => msg,
            Err(e) => return Some(Err(Error::Consume(e.to_string()))),
        };

        trace!("Received message on subject: {}", msg.subject);
        if let Err(e) = msg.ack().await {
            warn!("Failed to ack message on {}: {}", msg.subject, e);
        }

        match serde_json::from_slice(&msg.payload) {
            Ok(value) => Some(Ok(value)),
            Err(e) => Some(Err(Error::Serialization(e))),
        }
    }
}
