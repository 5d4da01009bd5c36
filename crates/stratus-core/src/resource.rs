//! Resource values exposed to callers.
//!
//! A [`Resource`] has no identity of its own: it is a computed view over
//! object-store state at call time. Serialized shapes match the public API
//! contract (`"FILE"`/`"DIRECTORY"` type tags, size omitted for
//! directories).

use std::io::Read;

use serde::{Deserialize, Serialize};

/// Whether a resource is a file or a directory.
///
/// Derived from the trailing-slash convention on the backing key, never
/// stored as metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceType {
    File,
    Directory,
}

impl ResourceType {
    /// Returns `true` if this is a file.
    #[inline]
    pub fn is_file(self) -> bool {
        matches!(self, ResourceType::File)
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_directory(self) -> bool {
        matches!(self, ResourceType::Directory)
    }
}

/// A file or directory as seen through the virtual filesystem.
///
/// `path` is the parent virtual directory of the resource relative to the
/// user's root, always ending in `/` (`"/"` for root-level resources).
/// `name` is the last path segment. `size` is present only for files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub path: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}

/// One file in an upload batch.
///
/// The name may itself contain `/`, addressing a sub-path below the target
/// directory. This is intentional: clients upload whole directory trees by
/// encoding relative paths inside each file's name.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        UploadFile {
            name: name.into(),
            content_type: None,
            data: data.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Payload handed back by a download: a suggested filename plus the bytes.
pub struct ResourceDownload {
    /// Name the caller should present for the payload. For directories this
    /// is the directory name with `.zip` appended.
    pub file_name: String,
    /// Content type recorded at upload time, `application/zip` for archives.
    pub content_type: Option<String>,
    pub body: DownloadBody,
}

/// The body of a download.
pub enum DownloadBody {
    /// A single file, streamed straight from the store.
    Stream(Box<dyn Read + Send>),
    /// A directory packaged as a zip archive, fully built in memory.
    Archive(Vec<u8>),
}

impl DownloadBody {
    /// Returns `true` if this body is a zip archive.
    pub fn is_archive(&self) -> bool {
        matches!(self, DownloadBody::Archive(_))
    }

    /// Consume the body, reading a stream to its end if necessary.
    pub fn into_bytes(self) -> std::io::Result<Vec<u8>> {
        match self {
            DownloadBody::Stream(mut reader) => {
                let mut bytes = Vec::new();
                reader.read_to_end(&mut bytes)?;
                Ok(bytes)
            }
            DownloadBody::Archive(bytes) => Ok(bytes),
        }
    }
}

impl std::fmt::Debug for DownloadBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadBody::Stream(_) => f.write_str("DownloadBody::Stream(..)"),
            DownloadBody::Archive(bytes) => {
                write!(f, "DownloadBody::Archive({} bytes)", bytes.len())
            }
        }
    }
}
