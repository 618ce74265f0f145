//! Blob storage for fetched content
//!
//! Content-addressed binary objects keyed by bucket + key. The [`Blob`]
//! trait is the single storage capability the pipeline sees; [`open`]
//! returns an [`ObjectBody`] carrying an explicit delivery hint (inline
//! bytes or a public locator) so call sites decide how to deliver without
//! ever inspecting the backend type.
//!
//! [`open`]: Blob::open

pub mod error;
pub mod fs;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;

pub use error::{Error, Result};
pub use fs::FilesystemBlob;
pub use memory::MemoryBlob;

/// How an object can be delivered downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectBody {
    /// The object's bytes, to be uploaded directly.
    Inline(Bytes),
    /// A public locator the receiving side can pull from itself.
    Public(String),
}

/// Content-addressed blob storage.
#[async_trait]
pub trait Blob: Send + Sync {
    async fn create(&self, bucket: &str, key: &str, contents: Bytes) -> Result<()>;

    /// Retrieve an object for delivery. Missing objects are
    /// [`Error::NotFound`].
    async fn open(&self, bucket: &str, key: &str) -> Result<ObjectBody>;

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool>;

    /// Remove an object. Deleting an absent object is not an error.
    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;
}
