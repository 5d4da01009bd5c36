//! The object-store seam.
//!
//! The virtual filesystem is orchestrated against an [`ObjectStore`]: a flat
//! key space offering single-key operations only. Errors at this level are
//! transport-focused; classifying them into the resource-level taxonomy is
//! the manager's job.
//!
//! The store is assumed to give read-your-writes consistency per key but no
//! atomicity across keys. Bucket lifecycle (create-if-missing) belongs to
//! the concrete implementation, not to this trait.

pub mod memory;

use std::io::Read;

use thiserror::Error;

use crate::path::ObjectKey;
use crate::resource::ResourceType;

pub use memory::MemoryStore;

/// Transport and backend errors from the object store.
///
/// No semantic errors here ("parent missing", "wrong resource type"): those
/// belong to the resource layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The addressed key does not exist.
    #[error("object not found: '{key}'")]
    NotFound { key: String },

    /// I/O failure while talking to the backend or moving payload bytes.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other backend-side failure (network, protocol, server error).
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Returns `true` if this error means the addressed key is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Metadata for a single stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStat {
    /// Payload size in bytes. Zero for directory markers.
    pub size: u64,
    /// Content type recorded when the object was stored, if any.
    pub content_type: Option<String>,
}

/// One entry of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: ObjectKey,
    /// Payload size; zero for directory markers and collapsed prefixes.
    pub size: u64,
}

impl ObjectEntry {
    /// The resource type derived from the entry's key.
    #[inline]
    pub fn resource_type(&self) -> ResourceType {
        self.key.resource_type()
    }
}

/// Flat key-value object store offering single-key operations.
///
/// Implementations must be safe to share across threads; the resource layer
/// issues calls sequentially within one logical operation but serves many
/// operations concurrently.
///
/// # Object Safety
///
/// The trait is object-safe: `Box<dyn ObjectStore>` works.
pub trait ObjectStore: Send + Sync {
    /// Whether an object exists at `key`.
    fn exists(&self, key: &ObjectKey) -> Result<bool, StoreError>;

    /// Metadata for the object at `key`.
    fn stat(&self, key: &ObjectKey) -> Result<ObjectStat, StoreError>;

    /// Open a read stream over the object's payload.
    fn get(&self, key: &ObjectKey) -> Result<Box<dyn Read + Send>, StoreError>;

    /// Store `size` bytes read from `data` at `key`, replacing any existing
    /// object.
    fn put(
        &self,
        key: &ObjectKey,
        data: &mut dyn Read,
        size: u64,
        content_type: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Delete the object at `key`. Deleting an absent key is a no-op.
    fn delete(&self, key: &ObjectKey) -> Result<(), StoreError>;

    /// Copy the object at `src` to `dst`, replacing any existing object.
    fn copy(&self, src: &ObjectKey, dst: &ObjectKey) -> Result<(), StoreError>;

    /// List objects whose keys start with `prefix`.
    ///
    /// With `recursive` set, every matching key is returned. Otherwise keys
    /// nested more than one level below the prefix are collapsed into their
    /// first-level directory prefix, each reported once with size zero (the
    /// delimiter-listing behavior of S3-style backends). No ordering is
    /// guaranteed.
    fn list(&self, prefix: &ObjectKey, recursive: bool) -> Result<Vec<ObjectEntry>, StoreError>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn exists(&self, key: &ObjectKey) -> Result<bool, StoreError> {
        (**self).exists(key)
    }

    fn stat(&self, key: &ObjectKey) -> Result<ObjectStat, StoreError> {
        (**self).stat(key)
    }

    fn get(&self, key: &ObjectKey) -> Result<Box<dyn Read + Send>, StoreError> {
        (**self).get(key)
    }

    fn put(
        &self,
        key: &ObjectKey,
        data: &mut dyn Read,
        size: u64,
        content_type: Option<&str>,
    ) -> Result<(), StoreError> {
        (**self).put(key, data, size, content_type)
    }

    fn delete(&self, key: &ObjectKey) -> Result<(), StoreError> {
        (**self).delete(key)
    }

    fn copy(&self, src: &ObjectKey, dst: &ObjectKey) -> Result<(), StoreError> {
        (**self).copy(src, dst)
    }

    fn list(&self, prefix: &ObjectKey, recursive: bool) -> Result<Vec<ObjectEntry>, StoreError> {
        (**self).list(prefix, recursive)
    }
}

impl<T: ObjectStore + ?Sized> ObjectStore for Box<T> {
    fn exists(&self, key: &ObjectKey) -> Result<bool, StoreError> {
        self.as_ref().exists(key)
    }

    fn stat(&self, key: &ObjectKey) -> Result<ObjectStat, StoreError> {
        self.as_ref().stat(key)
    }

    fn get(&self, key: &ObjectKey) -> Result<Box<dyn Read + Send>, StoreError> {
        self.as_ref().get(key)
    }

    fn put(
        &self,
        key: &ObjectKey,
        data: &mut dyn Read,
        size: u64,
        content_type: Option<&str>,
    ) -> Result<(), StoreError> {
        self.as_ref().put(key, data, size, content_type)
    }

    fn delete(&self, key: &ObjectKey) -> Result<(), StoreError> {
        self.as_ref().delete(key)
    }

    fn copy(&self, src: &ObjectKey, dst: &ObjectKey) -> Result<(), StoreError> {
        self.as_ref().copy(src, dst)
    }

    fn list(&self, prefix: &ObjectKey, recursive: bool) -> Result<Vec<ObjectEntry>, StoreError> {
        self.as_ref().list(prefix, recursive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use std::io::Cursor;

    #[test]
    fn object_safety_works() {
        let store: Box<dyn ObjectStore> = Box::new(MemoryStore::new());
        let key = ObjectKey::from_raw("user-1-files/a.txt");

        store
            .put(&key, &mut Cursor::new(b"data".to_vec()), 4, None)
            .unwrap();
        assert!(store.exists(&key).unwrap());
        assert_eq!(store.stat(&key).unwrap().size, 4);
    }

    #[test]
    fn ref_blanket_impl_works() {
        fn put_one<S: ObjectStore>(store: S, key: &ObjectKey) {
            store
                .put(key, &mut Cursor::new(b"x".to_vec()), 1, None)
                .unwrap();
        }

        let store = MemoryStore::new();
        let key = ObjectKey::from_raw("user-1-files/a.txt");

        // A shared reference satisfies the trait bound
        put_one(&store, &key);
        assert!(store.exists(&key).unwrap());
    }

    #[test]
    fn entry_type_follows_key_convention() {
        let file = ObjectEntry {
            key: ObjectKey::from_raw("user-1-files/a.txt"),
            size: 3,
        };
        assert!(file.resource_type().is_file());

        let dir = ObjectEntry {
            key: ObjectKey::from_raw("user-1-files/docs/"),
            size: 0,
        };
        assert!(dir.resource_type().is_directory());
    }
}
