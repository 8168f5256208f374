//! Object storage boundary.
//!
//! File bytes live outside the record store in a key-addressed blob
//! store. The record store and the blob store can drift; a missing blob
//! for an existing record is a hard failure, not a retryable one.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use vendo_commerce::CommerceError;

/// A stored blob with its delivery metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    /// Raw file bytes.
    pub bytes: Vec<u8>,
    /// MIME type served with the file.
    pub content_type: String,
    /// Content-Disposition header value (carries the filename).
    pub content_disposition: String,
}

/// Key-addressed binary blob store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write bytes under a key, replacing any previous object.
    async fn put(&self, key: &str, object: StoredObject) -> Result<(), CommerceError>;

    /// Read the object under a key, if present.
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, CommerceError>;

    /// Delete the object under a key. Deleting a missing key is a no-op.
    async fn delete(&self, key: &str) -> Result<(), CommerceError>;
}

/// In-process object store used for development and tests.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, object: StoredObject) -> Result<(), CommerceError> {
        self.objects
            .write()
            .expect("object store lock poisoned")
            .insert(key.to_string(), object);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, CommerceError> {
        Ok(self
            .objects
            .read()
            .expect("object store lock poisoned")
            .get(key)
            .cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), CommerceError> {
        self.objects
            .write()
            .expect("object store lock poisoned")
            .remove(key);
        Ok(())
    }
}
