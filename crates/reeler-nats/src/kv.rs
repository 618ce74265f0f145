//! JetStream KV session backend

use async_nats::jetstream::kv::Store;
use async_trait::async_trait;

use reeler_state::{Error as StateError, SessionBackend};

/// Session persistence over a JetStream KV bucket.
///
/// TTL-style expiry comes from the bucket's `max_age`; see
/// [`crate::nats::setup_session_kv`].
#[derive(Clone)]
pub struct KvSessionBackend {
    kv: Store,
}

impl KvSessionBackend {
    pub fn new(kv: Store) -> Self {
        Self { kv }
    }
}

#[async_trait]
impl SessionBackend for KvSessionBackend {
    async fn get(&self, key: &str) -> reeler_state::Result<Vec<u8>> {
        match self.kv.get(key).await {
            Ok(Some(entry)) => Ok(entry.to_vec()),
            Ok(None) => Err(StateError::SessionNotFound),
            Err(e) => Err(StateError::Backend(e.to_string())),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> reeler_state::Result<()> {
        self.kv
            .put(key, value.into())
            .await
            .map(|_| ())
            .map_err(|e| StateError::Backend(e.to_string()))
    }

    async fn delete(&self, key: &str) -> reeler_state::Result<()> {
        self.kv
            .purge(key)
            .await
            .map_err(|e| StateError::Backend(e.to_string()))
    }
}
