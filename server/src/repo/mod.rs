//! In-memory repository for uploaded service packages

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A stored upload
#[derive(Debug, Clone)]
pub struct UploadedBlob {
    /// Name the blob was uploaded under
    pub name: String,

    /// SHA-256 digest of the contents
    pub digest: String,

    /// Raw contents
    pub bytes: Vec<u8>,

    /// Upload time
    pub uploaded_at: DateTime<Utc>,
}

/// Keyed blob store backing the install path.
///
/// Keys are generated on store and handed back to the caller; install
/// requests reference the package by key. No durability: contents live
/// for the process lifetime only.
pub struct UploadRepo {
    entries: RwLock<HashMap<String, UploadedBlob>>,
}

impl UploadRepo {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Store a blob and return its retrieval key
    pub fn store(&self, name: &str, bytes: Vec<u8>) -> String {
        let key = Uuid::new_v4().to_string();
        let blob = UploadedBlob {
            name: name.to_string(),
            digest: sha256_hash(&bytes),
            bytes,
            uploaded_at: Utc::now(),
        };
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.clone(), blob);
        key
    }

    /// Retrieve a blob by key
    pub fn retrieve(&self, upload_key: &str) -> Option<UploadedBlob> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(upload_key).cloned()
    }

    /// Remove a blob by key
    pub fn remove(&self, upload_key: &str) -> Option<UploadedBlob> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(upload_key)
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    /// Whether the repository is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for UploadRepo {
    fn default() -> Self {
        Self::new()
    }
}

/// Calculate SHA256 hash of data
pub fn sha256_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
