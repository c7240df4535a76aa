//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated `GuardConfig` into the runtime the handler uses
//! - Open the configured per-image key store
//!
//! # Design Decisions
//! - Fail fast: a key store that cannot be opened is a startup error
//! - The same path rebuilds the runtime on config reload

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{GuardConfig, KeyStoreConfig};
use crate::keys::{FileSystemKeyStore, InMemoryKeyStore, KeyStore, KeyStoreError};
use crate::signature::{HmacSha1Factory, SignatureRepair};

/// Everything a request needs, swapped atomically on reload.
pub struct GuardRuntime {
    pub config: GuardConfig,
    pub repair: SignatureRepair,
}

impl GuardRuntime {
    pub fn from_config(config: GuardConfig) -> Result<Self, KeyStoreError> {
        let security = &config.security;
        let mut repair = SignatureRepair::new(Arc::new(HmacSha1Factory), security.security_key.as_bytes());

        if security.stores_crypto_key_for_each_image {
            match &security.key_store {
                Some(store_config) => {
                    let store = open_key_store(store_config)?;
                    let timeout = Duration::from_millis(security.key_lookup_timeout_ms);
                    repair = repair.with_key_store(store, timeout);
                }
                None => {
                    tracing::warn!("Per-image keys enabled without a key store, using the security key only");
                }
            }
        }

        Ok(Self { config, repair })
    }
}

fn open_key_store(config: &KeyStoreConfig) -> Result<Arc<dyn KeyStore>, KeyStoreError> {
    match config {
        KeyStoreConfig::Filesystem { root_path } => {
            tracing::info!(root_path = %root_path, "Using filesystem key store");
            Ok(Arc::new(FileSystemKeyStore::new(root_path)))
        }
        KeyStoreConfig::Json { path } => {
            Ok(Arc::new(InMemoryKeyStore::load_from_file(Path::new(path))?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::SignedRequest;
    use crate::signature::{CascadeOutcome, HmacSha1Signer, KeySource, Signer, Stage};

    fn guarded_config(key_store: Option<KeyStoreConfig>) -> GuardConfig {
        let mut config = GuardConfig::default();
        config.security.security_key = "MY_SECURE_KEY".into();
        config.security.stores_crypto_key_for_each_image = key_store.is_some();
        config.security.key_store = key_store;
        config
    }

    #[tokio::test]
    async fn test_runtime_uses_json_key_store() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, br#"{"http://example.com/a.png": "image-key"}"#).unwrap();

        let config = guarded_config(Some(KeyStoreConfig::Json {
            path: file.path().to_string_lossy().into_owned(),
        }));
        let runtime = GuardRuntime::from_config(config).unwrap();

        let payload = "http%3A//example.com/a.png";
        let token = HmacSha1Signer::new("image-key").signature(payload);
        let mut request = SignedRequest::parse(&format!("/{}/{}", token, payload)).unwrap();

        assert_eq!(
            runtime.repair.apply(&mut request).await,
            CascadeOutcome::Accepted { stage: Stage::AsReceived, key: KeySource::PerImage }
        );
    }

    #[test]
    fn test_runtime_fails_on_missing_json_store() {
        let config = guarded_config(Some(KeyStoreConfig::Json {
            path: "/nonexistent/keys.json".into(),
        }));

        assert!(matches!(GuardRuntime::from_config(config), Err(KeyStoreError::Io(_))));
    }

    #[test]
    fn test_filesystem_store_opens_lazily() {
        let config = guarded_config(Some(KeyStoreConfig::Filesystem {
            root_path: "/nonexistent/keys".into(),
        }));

        assert!(GuardRuntime::from_config(config).is_ok());
    }
}
