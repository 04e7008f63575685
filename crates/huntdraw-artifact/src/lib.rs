//! Huntdraw Artifact
//!
//! This crate provides the blob storage trait and implementations for huntdraw.
//! Blobs are compiled task-chain definitions, uploaded documents (hunt-code and
//! applicant CSVs, draw config and sort JSON) and exported draw results.
//!
//! The [`Store`] trait defines the backend layer for blob storage.
//! Implementations handle the actual storage (filesystem, memory, etc.) while
//! callers decide on keys.

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_CSV: &str = "text/csv";

/// Error type for blob storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested blob was not found.
  #[error("artifact not found: {0}")]
  NotFound(String),

  /// The key is empty or would resolve outside the store.
  #[error("invalid artifact key: '{0}'")]
  InvalidKey(String),

  /// An I/O error occurred.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("invalid json in '{key}': {source}")]
  Json {
    key: String,
    #[source]
    source: serde_json::Error,
  },
}

/// Blob storage trait.
#[async_trait]
pub trait Store: Send + Sync {
  /// Retrieve a blob by key.
  async fn get(&self, key: &str) -> Result<Bytes, Error>;

  /// Store a blob, overwriting any existing blob at `key`.
  async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), Error>;

  /// Delete a blob by key.
  async fn delete(&self, key: &str) -> Result<(), Error>;
}

/// Read a blob and parse it as JSON.
pub async fn get_json<T: DeserializeOwned>(store: &dyn Store, key: &str) -> Result<T, Error> {
  let bytes = store.get(key).await?;
  serde_json::from_slice(&bytes).map_err(|source| Error::Json {
    key: key.to_string(),
    source,
  })
}

/// Serialize a value as pretty JSON and store it.
pub async fn put_json<T: Serialize + ?Sized>(
  store: &dyn Store,
  key: &str,
  value: &T,
) -> Result<(), Error> {
  let body = serde_json::to_vec_pretty(value).map_err(|source| Error::Json {
    key: key.to_string(),
    source,
  })?;
  store.put(key, Bytes::from(body), CONTENT_TYPE_JSON).await
}
