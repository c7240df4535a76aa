//! Keys stored as files next to images, in thumbor's file storage layout.
//!
//! The key for an image lives at `<root>/<h[..2]>/<h[2..]>.txt`, where `h`
//! is the hex SHA-1 of the image URL.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha1::{Digest, Sha1};

use crate::keys::store::{KeyStore, KeyStoreError};

#[derive(Debug, Clone)]
pub struct FileSystemKeyStore {
    root: PathBuf,
}

impl FileSystemKeyStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the key file for `image`.
    pub fn key_path(&self, image: &str) -> PathBuf {
        let digest: String = Sha1::digest(image.as_bytes())
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        self.root
            .join(&digest[..2])
            .join(format!("{}.txt", &digest[2..]))
    }
}

#[async_trait]
impl KeyStore for FileSystemKeyStore {
    async fn crypto_key(&self, image: &str) -> Result<Option<Vec<u8>>, KeyStoreError> {
        match tokio::fs::read(self.key_path(image)).await {
            Ok(mut key) => {
                // Editors leave a trailing newline; it is never part of the key.
                while matches!(key.last(), Some(b'\n' | b'\r')) {
                    key.pop();
                }
                Ok(Some(key))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_path_layout() {
        let store = FileSystemKeyStore::new("/var/lib/thumbor/storage");
        assert_eq!(
            store.key_path("http://example.com/a.png"),
            PathBuf::from("/var/lib/thumbor/storage/a0/1ecb8acccaad2a4b6e94e8dc9d01fe5f8a48af.txt")
        );
    }

    #[tokio::test]
    async fn test_reads_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemKeyStore::new(dir.path());
        let path = store.key_path("http://example.com/a.png");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "image-key\n").unwrap();

        let key = store.crypto_key("http://example.com/a.png").await.unwrap();
        assert_eq!(key.as_deref(), Some(&b"image-key"[..]));
    }

    #[tokio::test]
    async fn test_missing_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemKeyStore::new(dir.path());

        assert!(store.crypto_key("http://example.com/b.png").await.unwrap().is_none());
    }
}
