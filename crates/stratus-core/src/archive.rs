//! Zip packaging for directory downloads.
//!
//! A directory download is assembled from the directory's recursive listing:
//! every descendant file becomes one zip entry named by its path relative to
//! the directory; marker objects (and the directory's own key) carry no
//! payload and are excluded. Object bytes are copied into the archive
//! through a fixed-size buffer, so per-object memory stays bounded; the
//! archive itself is built in memory, so total memory scales with archive
//! size.

use std::io::{Cursor, Read, Write};

use thiserror::Error;
use tracing::{debug, trace};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::path::ObjectKey;
use crate::store::{ObjectEntry, ObjectStore, StoreError};

/// Copy buffer size for streaming object bytes into archive entries.
const COPY_BUF_SIZE: usize = 64 * 1024;

/// Errors raised while assembling an archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build a zip archive over a directory's descendants.
///
/// `entries` is the recursive listing below `dir`; entries that are
/// directory markers, or that do not sit under `dir`, are skipped. Entry
/// bytes are read from the store one object at a time.
pub fn build_directory_archive<S>(
    store: &S,
    dir: &ObjectKey,
    entries: &[ObjectEntry],
) -> Result<Vec<u8>, ArchiveError>
where
    S: ObjectStore + ?Sized,
{
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entry_count = 0usize;
    for entry in entries {
        if entry.key.is_directory() {
            continue;
        }
        let Some(entry_name) = entry.key.strip_prefix(dir) else {
            continue;
        };

        writer.start_file(entry_name, options)?;
        let mut reader = store.get(&entry.key)?;
        let copied = copy_into(&mut reader, &mut writer)?;
        trace!(entry = entry_name, bytes = copied, "Added archive entry");
        entry_count += 1;
    }

    let bytes = writer.finish()?.into_inner();
    debug!(
        dir = %dir,
        entries = entry_count,
        archive_size = bytes.len(),
        "Built directory archive"
    );
    Ok(bytes)
}

fn copy_into<W: Write>(reader: &mut dyn Read, writer: &mut W) -> Result<u64, std::io::Error> {
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Ok(total);
        }
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::io::Cursor;

    fn put(store: &MemoryStore, raw: &str, bytes: &[u8]) {
        store
            .put(
                &ObjectKey::from_raw(raw),
                &mut Cursor::new(bytes.to_vec()),
                bytes.len() as u64,
                None,
            )
            .unwrap();
    }

    fn archive_names(bytes: &[u8]) -> Vec<String> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        archive.file_names().map(str::to_string).collect()
    }

    #[test]
    fn entry_names_are_relative_to_directory() {
        let store = MemoryStore::new();
        put(&store, "user-1-files/docs/", b"");
        put(&store, "user-1-files/docs/a.txt", b"aaa");
        put(&store, "user-1-files/docs/sub/", b"");
        put(&store, "user-1-files/docs/sub/b.txt", b"bbbb");

        let dir = ObjectKey::from_raw("user-1-files/docs/");
        let entries = store.list(&dir, true).unwrap();
        let bytes = build_directory_archive(&store, &dir, &entries).unwrap();

        let mut names = archive_names(&bytes);
        names.sort();
        assert_eq!(names, vec!["a.txt", "sub/b.txt"]);
    }

    #[test]
    fn markers_carry_no_entries() {
        let store = MemoryStore::new();
        put(&store, "user-1-files/empty/", b"");

        let dir = ObjectKey::from_raw("user-1-files/empty/");
        let entries = store.list(&dir, true).unwrap();
        let bytes = build_directory_archive(&store, &dir, &entries).unwrap();

        assert!(archive_names(&bytes).is_empty());
    }

    #[test]
    fn entry_bytes_match_stored_objects() {
        let store = MemoryStore::new();
        put(&store, "user-1-files/docs/", b"");
        put(&store, "user-1-files/docs/data.bin", &[7u8; 100_000]);

        let dir = ObjectKey::from_raw("user-1-files/docs/");
        let entries = store.list(&dir, true).unwrap();
        let bytes = build_directory_archive(&store, &dir, &entries).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name("data.bin").unwrap();
        let mut content = Vec::new();
        file.read_to_end(&mut content).unwrap();
        assert_eq!(content, vec![7u8; 100_000]);
    }
}
