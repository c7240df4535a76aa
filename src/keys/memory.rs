//! In-memory key store, optionally seeded from a JSON file.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::keys::store::{KeyStore, KeyStoreError};

/// A thread-safe map of image URL to signing key.
#[derive(Clone, Default)]
pub struct InMemoryKeyStore {
    inner: Arc<DashMap<String, Vec<u8>>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON object mapping image URLs to keys.
    pub fn load_from_file(path: &Path) -> Result<Self, KeyStoreError> {
        let reader = BufReader::new(File::open(path)?);
        let map: HashMap<String, String> = serde_json::from_reader(reader)?;

        let store = Self::new();
        for (image, key) in map {
            store.insert(image, key.into_bytes());
        }
        tracing::info!(path = ?path, keys = store.len(), "Loaded per-image keys");
        Ok(store)
    }

    pub fn insert(&self, image: impl Into<String>, key: Vec<u8>) {
        self.inner.insert(image.into(), key);
    }

    pub fn remove(&self, image: &str) -> Option<Vec<u8>> {
        self.inner.remove(image).map(|(_, key)| key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn crypto_key(&self, image: &str) -> Result<Option<Vec<u8>>, KeyStoreError> {
        Ok(self.inner.get(image).map(|r| r.value().clone()))
    }
}
