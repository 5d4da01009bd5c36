//! In-memory object store.
//!
//! Reference implementation of the [`ObjectStore`] contract and the fixture
//! used by the integration tests. Keys live in a `BTreeMap`, so listings come
//! back in lexicographic order — the same order S3-style backends use, though
//! callers must not rely on any ordering.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::{PoisonError, RwLock};

use crate::path::ObjectKey;

use super::{ObjectEntry, ObjectStat, ObjectStore, StoreError};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: Option<String>,
}

/// Thread-safe in-memory [`ObjectStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects, markers included.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, StoredObject>> {
        self.objects.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, StoredObject>> {
        self.objects.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ObjectStore for MemoryStore {
    fn exists(&self, key: &ObjectKey) -> Result<bool, StoreError> {
        Ok(self.read().contains_key(key.as_str()))
    }

    fn stat(&self, key: &ObjectKey) -> Result<ObjectStat, StoreError> {
        let objects = self.read();
        let object = objects.get(key.as_str()).ok_or_else(|| StoreError::NotFound {
            key: key.as_str().to_string(),
        })?;
        Ok(ObjectStat {
            size: object.data.len() as u64,
            content_type: object.content_type.clone(),
        })
    }

    fn get(&self, key: &ObjectKey) -> Result<Box<dyn Read + Send>, StoreError> {
        let objects = self.read();
        let object = objects.get(key.as_str()).ok_or_else(|| StoreError::NotFound {
            key: key.as_str().to_string(),
        })?;
        Ok(Box::new(Cursor::new(object.data.clone())))
    }

    fn put(
        &self,
        key: &ObjectKey,
        data: &mut dyn Read,
        size: u64,
        content_type: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut bytes = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
        data.take(size).read_to_end(&mut bytes)?;
        if (bytes.len() as u64) < size {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("expected {size} bytes, got {}", bytes.len()),
            )));
        }
        self.write().insert(
            key.as_str().to_string(),
            StoredObject {
                data: bytes,
                content_type: content_type.map(str::to_string),
            },
        );
        Ok(())
    }

    fn delete(&self, key: &ObjectKey) -> Result<(), StoreError> {
        self.write().remove(key.as_str());
        Ok(())
    }

    fn copy(&self, src: &ObjectKey, dst: &ObjectKey) -> Result<(), StoreError> {
        let mut objects = self.write();
        let object = objects.get(src.as_str()).ok_or_else(|| StoreError::NotFound {
            key: src.as_str().to_string(),
        })?;
        let copied = object.clone();
        objects.insert(dst.as_str().to_string(), copied);
        Ok(())
    }

    fn list(&self, prefix: &ObjectKey, recursive: bool) -> Result<Vec<ObjectEntry>, StoreError> {
        let objects = self.read();
        // Collects into a map so a collapsed prefix and its marker object
        // dedupe to one entry.
        let mut entries: BTreeMap<String, u64> = BTreeMap::new();
        for (key, object) in objects.range(prefix.as_str().to_string()..) {
            let Some(rest) = key.strip_prefix(prefix.as_str()) else {
                break;
            };
            if recursive {
                entries.insert(key.clone(), object.data.len() as u64);
                continue;
            }
            match rest.find('/') {
                // Nested deeper than one level: collapse to the first-level
                // directory prefix. The marker object, when present, sorts
                // first and keeps its own (zero) size.
                Some(idx) if idx + 1 < rest.len() => {
                    entries
                        .entry(format!("{}{}", prefix.as_str(), &rest[..=idx]))
                        .or_insert(0);
                }
                // Direct child (file or subdirectory marker), or the prefix
                // object itself.
                _ => {
                    entries.insert(key.clone(), object.data.len() as u64);
                }
            }
        }
        Ok(entries
            .into_iter()
            .map(|(key, size)| ObjectEntry {
                key: ObjectKey::from_raw(key),
                size,
            })
            .collect())
    }
}
