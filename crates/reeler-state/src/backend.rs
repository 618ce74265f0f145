//! Session persistence backend contract

use async_trait::async_trait;

use crate::error::Result;

/// Opaque key/value persistence for session state.
///
/// `get` on an unknown key must return [`crate::Error::SessionNotFound`];
/// expiry policy (TTL) is the backend's concern.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}
