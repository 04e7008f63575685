use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

use crate::{Error, Store};

/// Filesystem-based blob store.
///
/// Stores blobs as files on the local filesystem. Each blob is stored
/// at `{base_path}/{key}`. Parent directories are created automatically.
pub struct FsStore {
  base_path: PathBuf,
}

impl FsStore {
  /// Create a new filesystem store with the given base path.
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self {
      base_path: base_path.into(),
    }
  }

  fn key_to_path(&self, key: &str) -> Result<PathBuf, Error> {
    // Keys must stay under the base path.
    let relative = Path::new(key);
    let escapes = relative
      .components()
      .any(|c| !matches!(c, Component::Normal(_)));
    if key.is_empty() || escapes {
      return Err(Error::InvalidKey(key.to_string()));
    }
    Ok(self.base_path.join(relative))
  }
}

fn map_not_found(key: &str) -> impl FnOnce(std::io::Error) -> Error + '_ {
  move |e| {
    if e.kind() == std::io::ErrorKind::NotFound {
      Error::NotFound(key.to_string())
    } else {
      Error::Io(e)
    }
  }
}

#[async_trait]
impl Store for FsStore {
  async fn get(&self, key: &str) -> Result<Bytes, Error> {
    let path = self.key_to_path(key)?;
    let data = fs::read(&path).await.map_err(map_not_found(key))?;
    Ok(Bytes::from(data))
  }

  async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> Result<(), Error> {
    let path = self.key_to_path(key)?;

    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).await?;
    }

    fs::write(&path, &data).await?;
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<(), Error> {
    let path = self.key_to_path(key)?;
    fs::remove_file(&path).await.map_err(map_not_found(key))
  }
}
