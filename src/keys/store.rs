//! Key store abstraction and bounded lookup.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::observability::metrics;
use crate::resilience::timeouts::with_timeout;

/// Errors raised by key store backends.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid key file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Source of per-image signing keys.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Key stored for `image`, if any.
    async fn crypto_key(&self, image: &str) -> Result<Option<Vec<u8>>, KeyStoreError>;
}

/// Look up the key for `image`, giving up after `limit`.
pub async fn lookup_key(store: &dyn KeyStore, image: &str, limit: Duration) -> Option<Vec<u8>> {
    match with_timeout(limit, store.crypto_key(image)).await {
        Ok(Ok(key)) => {
            metrics::record_key_lookup(if key.is_some() { "found" } else { "missing" });
            key
        }
        Ok(Err(e)) => {
            tracing::warn!(image = %image, error = %e, "Per-image key lookup failed");
            metrics::record_key_lookup("error");
            None
        }
        Err(e) => {
            tracing::warn!(image = %image, error = %e, "Per-image key lookup timed out");
            metrics::record_key_lookup("timeout");
            None
        }
    }
}
