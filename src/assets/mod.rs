// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Bundled asset access.
//!
//! An asset store is a read-only, name-keyed blob repository. The resolver
//! walks an ordered candidate list and yields the names the store holds.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Invalid asset name: {0}")]
    InvalidName(String),

    #[error("Asset is empty: {0}")]
    Empty(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read-only asset repository.
pub trait AssetStore: Send + Sync {
    fn exists(&self, name: &str) -> bool;

    /// Streaming reader, or `None` if the asset cannot be opened.
    fn open_streaming(&self, name: &str) -> Option<Box<dyn Read + '_>>;

    /// Full asset contents.
    fn read_all(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        let mut reader = self
            .open_streaming(name)
            .ok_or_else(|| AssetError::NotFound(name.to_string()))?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        if bytes.is_empty() {
            return Err(AssetError::Empty(name.to_string()));
        }
        Ok(bytes)
    }
}

/// Assets served from a directory on disk.
#[derive(Debug, Clone)]
pub struct DirAssetStore {
    root: PathBuf,
}

impl DirAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Join `name` under the root. Absolute names and `..` are rejected.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, AssetError> {
        let relative = Path::new(name);
        if name.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(AssetError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl AssetStore for DirAssetStore {
    fn exists(&self, name: &str) -> bool {
        self.resolve(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn open_streaming(&self, name: &str) -> Option<Box<dyn Read + '_>> {
        let path = self.resolve(name).ok()?;
        let file = File::open(path).ok()?;
        Some(Box::new(file))
    }
}

/// In-memory assets, for tests and embedded hosts.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    assets: HashMap<String, Vec<u8>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.assets.insert(name.into(), bytes);
    }

    pub fn with(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl AssetStore for MemoryAssetStore {
    fn exists(&self, name: &str) -> bool {
        self.assets.contains_key(name)
    }

    fn open_streaming(&self, name: &str) -> Option<Box<dyn Read + '_>> {
        self.assets
            .get(name)
            .map(|bytes| Box::new(Cursor::new(bytes.as_slice())) as Box<dyn Read + '_>)
    }
}

/// Candidates present in `store`, in list order.
pub fn existing_candidates<'a>(
    store: &'a dyn AssetStore,
    candidates: &'a [String],
) -> impl Iterator<Item = &'a str> + 'a {
    candidates
        .iter()
        .map(String::as_str)
        .filter(move |name| store.exists(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_existing_candidates_follow_list_order() {
        let store = MemoryAssetStore::new()
            .with("models/b.tflite", vec![1])
            .with("models/c.tflite", vec![2]);
        let candidates = names(&["models/a.tflite", "models/c.tflite", "models/b.tflite"]);
        let found: Vec<_> = existing_candidates(&store, &candidates).collect();
        assert_eq!(found, vec!["models/c.tflite", "models/b.tflite"]);
    }

    #[test]
    fn test_existing_candidates_empty_store() {
        let store = MemoryAssetStore::new();
        assert_eq!(existing_candidates(&store, &names(&["x"])).count(), 0);
    }

    #[test]
    fn test_read_all_memory() {
        let store = MemoryAssetStore::new().with("m", b"bytes".to_vec()).with("e", vec![]);
        assert_eq!(store.read_all("m").unwrap(), b"bytes");
        assert!(matches!(store.read_all("missing"), Err(AssetError::NotFound(_))));
        assert!(matches!(store.read_all("e"), Err(AssetError::Empty(_))));
    }

    #[test]
    fn test_dir_store_reads_nested_asset() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("models")).unwrap();
        std::fs::write(dir.path().join("models/m.tflite"), b"tfl3").unwrap();

        let store = DirAssetStore::new(dir.path());
        assert!(store.exists("models/m.tflite"));
        assert!(!store.exists("models"));
        assert_eq!(store.read_all("models/m.tflite").unwrap(), b"tfl3");
    }

    #[test]
    fn test_dir_store_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirAssetStore::new(dir.path());
        assert!(matches!(store.resolve("../secret"), Err(AssetError::InvalidName(_))));
        assert!(matches!(store.resolve("/etc/passwd"), Err(AssetError::InvalidName(_))));
        assert!(matches!(store.resolve(""), Err(AssetError::InvalidName(_))));
        assert!(!store.exists("../secret"));
        assert!(store.open_streaming("a/../../b").is_none());
    }
}
