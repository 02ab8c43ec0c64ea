//! Object storage for raw subtitle uploads.
//!
//! The pipeline only needs put/get/delete over opaque keys; the default
//! binding keeps objects on the local filesystem under the configured
//! storage directory.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

pub trait ObjectStore: Send + Sync {
  fn put(&self, key: &str, bytes: &[u8]) -> io::Result<()>;
  fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>>;
  fn delete(&self, key: &str) -> io::Result<()>;
}

pub type SharedObjectStore = Arc<dyn ObjectStore>;

pub struct FsObjectStore {
  root: PathBuf,
}

impl FsObjectStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Resolve a key beneath the root, rejecting traversal components
  fn resolve(&self, key: &str) -> io::Result<PathBuf> {
    let relative = Path::new(key);
    let traversal = relative
      .components()
      .any(|c| !matches!(c, Component::Normal(_)));
    if traversal || key.is_empty() {
      return Err(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("invalid storage key: {}", key),
      ));
    }
    Ok(self.root.join(relative))
  }
}

impl ObjectStore for FsObjectStore {
  fn put(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
    let path = self.resolve(key)?;
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
  }

  fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
    let path = self.resolve(key)?;
    match std::fs::read(path) {
      Ok(bytes) => Ok(Some(bytes)),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e),
    }
  }

  fn delete(&self, key: &str) -> io::Result<()> {
    let path = self.resolve(key)?;
    match std::fs::remove_file(path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn test_put_get_delete_roundtrip() {
    let temp = TempDir::new().unwrap();
    let store = FsObjectStore::new(temp.path());

    store.put("subtitles/show1/ep1.vtt", b"WEBVTT").unwrap();
    assert_eq!(
      store.get("subtitles/show1/ep1.vtt").unwrap(),
      Some(b"WEBVTT".to_vec())
    );

    store.delete("subtitles/show1/ep1.vtt").unwrap();
    assert_eq!(store.get("subtitles/show1/ep1.vtt").unwrap(), None);
  }

  #[test]
  fn test_get_missing_key_is_none() {
    let temp = TempDir::new().unwrap();
    let store = FsObjectStore::new(temp.path());
    assert_eq!(store.get("nope.srt").unwrap(), None);
  }

  #[test]
  fn test_delete_missing_key_is_ok() {
    let temp = TempDir::new().unwrap();
    let store = FsObjectStore::new(temp.path());
    assert!(store.delete("nope.srt").is_ok());
  }

  #[test]
  fn test_rejects_traversal_keys() {
    let temp = TempDir::new().unwrap();
    let store = FsObjectStore::new(temp.path());
    assert!(store.put("../outside.txt", b"x").is_err());
    assert!(store.get("/etc/passwd").is_err());
  }
}
