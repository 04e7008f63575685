use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::{Error, Store};

/// In-memory blob store.
#[derive(Default)]
pub struct MemoryStore {
  blobs: RwLock<HashMap<String, (Bytes, String)>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Keys currently stored, sorted.
  pub async fn keys(&self) -> Vec<String> {
    let blobs = self.blobs.read().await;
    let mut keys: Vec<String> = blobs.keys().cloned().collect();
    keys.sort();
    keys
  }

  /// Content type a blob was stored with.
  pub async fn content_type(&self, key: &str) -> Option<String> {
    let blobs = self.blobs.read().await;
    blobs.get(key).map(|(_, content_type)| content_type.clone())
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn get(&self, key: &str) -> Result<Bytes, Error> {
    let blobs = self.blobs.read().await;
    blobs
      .get(key)
      .map(|(data, _)| data.clone())
      .ok_or_else(|| Error::NotFound(key.to_string()))
  }

  async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), Error> {
    let mut blobs = self.blobs.write().await;
    blobs.insert(key.to_string(), (data, content_type.to_string()));
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<(), Error> {
    let mut blobs = self.blobs.write().await;
    blobs
      .remove(key)
      .map(|_| ())
      .ok_or_else(|| Error::NotFound(key.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use serde::{Deserialize, Serialize};

  use crate::{CONTENT_TYPE_JSON, get_json, put_json};

  #[derive(Debug, PartialEq, Serialize, Deserialize)]
  struct Doc {
    name: String,
  }

  #[tokio::test]
  async fn test_json_helpers() {
    let store = MemoryStore::new();
    let doc = Doc {
      name: "sort".to_string(),
    };
    put_json(&store, "cfg/sort.json", &doc).await.unwrap();

    let loaded: Doc = get_json(&store, "cfg/sort.json").await.unwrap();
    assert_eq!(loaded, doc);
    assert_eq!(
      store.content_type("cfg/sort.json").await.as_deref(),
      Some(CONTENT_TYPE_JSON)
    );
  }

  #[tokio::test]
  async fn test_invalid_json_names_key() {
    let store = MemoryStore::new();
    store
      .put("bad.json", Bytes::from_static(b"{nope"), CONTENT_TYPE_JSON)
      .await
      .unwrap();

    let err = get_json::<Doc>(&store, "bad.json").await.unwrap_err();
    assert!(matches!(err, Error::Json { ref key, .. } if key == "bad.json"));
  }

  #[tokio::test]
  async fn test_delete_missing() {
    let store = MemoryStore::new();
    assert!(matches!(store.delete("x").await, Err(Error::NotFound(_))));
  }
}
