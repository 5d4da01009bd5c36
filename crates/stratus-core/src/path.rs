//! Type-safe path handling for the storage namespace.
//!
//! This module provides the types that keep the two path worlds apart:
//! - `ObjectKey`: absolute keys in the backing object store
//!   (e.g., "user-7-files/Documents/report.txt")
//! - virtual paths: user-facing, user-relative strings handed in by callers
//!   (e.g., "Documents/report.txt")
//!
//! The trailing-slash convention lives here and only here: a key (or virtual
//! path) ending in `/` addresses a directory, anything else addresses a file.
//! Directories exist in the store as zero-byte marker objects at their key.

use std::fmt;

use crate::resource::ResourceType;

/// Numeric identifier of a storage user.
///
/// User isolation is purely a key-prefix convention: every key belonging to
/// user `n` starts with that user's root (`user-<n>-files/`). See
/// [`StorageLayout::user_root`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(u64);

impl UserId {
    #[inline]
    pub const fn new(id: u64) -> Self {
        UserId(id)
    }

    /// Get the raw numeric value.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        UserId(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Absolute key in the backing object store.
///
/// Keys are opaque to the store; all structure (directories, user roots) is
/// convention layered on top by this module. No normalization is performed:
/// `..` segments and repeated slashes pass through verbatim, so callers must
/// not rely on sanitization here.
///
/// # Examples
///
/// ```
/// use stratus_core::path::ObjectKey;
///
/// let key = ObjectKey::from_raw("user-1-files/docs/report.txt");
/// assert!(!key.is_directory());
/// assert_eq!(key.name(), "report.txt");
/// assert_eq!(key.parent().as_str(), "user-1-files/docs/");
///
/// let dir = ObjectKey::from_raw("user-1-files/docs/");
/// assert!(dir.is_directory());
/// assert_eq!(dir.name(), "docs");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Create a key from a raw string, as stored in the backend.
    #[inline]
    pub fn from_raw(key: impl Into<String>) -> Self {
        ObjectKey(key.into())
    }

    /// Get the raw string representation.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key addresses a directory (trailing `/`).
    #[inline]
    pub fn is_directory(&self) -> bool {
        self.0.ends_with('/')
    }

    /// The resource type derived from the trailing-slash convention.
    #[inline]
    pub fn resource_type(&self) -> ResourceType {
        if self.is_directory() {
            ResourceType::Directory
        } else {
            ResourceType::File
        }
    }

    /// The last path segment: directory name without its trailing slash,
    /// or the filename.
    pub fn name(&self) -> &str {
        let trimmed = self.0.strip_suffix('/').unwrap_or(&self.0);
        match trimmed.rfind('/') {
            Some(idx) => &trimmed[idx + 1..],
            None => trimmed,
        }
    }

    /// The parent directory key, including its trailing slash.
    ///
    /// A key with no remaining separator is its own parent (root case).
    pub fn parent(&self) -> ObjectKey {
        let trimmed = self.0.strip_suffix('/').unwrap_or(&self.0);
        match trimmed.rfind('/') {
            Some(idx) => ObjectKey(trimmed[..=idx].to_string()),
            None => self.clone(),
        }
    }

    /// Append a relative segment to a directory key.
    ///
    /// The segment may itself contain `/`, producing a deeper key; a segment
    /// ending in `/` produces a directory key.
    pub fn join(&self, segment: impl AsRef<str>) -> ObjectKey {
        ObjectKey(format!("{}{}", self.0, segment.as_ref()))
    }

    /// The remainder of this key after `prefix`, or `None` if `prefix` does
    /// not lead it.
    pub fn strip_prefix(&self, prefix: &ObjectKey) -> Option<&str> {
        self.0.strip_prefix(prefix.as_str())
    }

    /// Whether `prefix` leads this key.
    #[inline]
    pub fn has_prefix(&self, prefix: &ObjectKey) -> bool {
        self.0.starts_with(prefix.as_str())
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a virtual path addresses a directory.
///
/// The empty path and `"/"` both address the user root; anything else must
/// carry a trailing `/` to be a directory.
#[inline]
pub fn is_directory_path(path: &str) -> bool {
    path.is_empty() || path.ends_with('/')
}

/// Key-namespace configuration: where user trees live inside the bucket.
///
/// The default layout places each user's tree at `user-<id>-files/` directly
/// under the bucket root. A deployment can push the whole namespace below a
/// shared prefix (e.g. when the bucket is shared with other applications)
/// via [`StorageLayout::with_root_prefix`].
#[derive(Debug, Clone, Default)]
pub struct StorageLayout {
    root_prefix: Option<String>,
}

impl StorageLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place all user roots under `prefix` instead of the bucket root.
    ///
    /// A trailing slash on the prefix is optional.
    pub fn with_root_prefix(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }
        StorageLayout {
            root_prefix: Some(prefix),
        }
    }

    /// The root directory key for a user's tree.
    ///
    /// Created once when the user is registered and never deleted.
    pub fn user_root(&self, user: UserId) -> ObjectKey {
        match &self.root_prefix {
            Some(prefix) => ObjectKey::from_raw(format!("{prefix}user-{user}-files/")),
            None => ObjectKey::from_raw(format!("user-{user}-files/")),
        }
    }

    /// Resolve a user-relative virtual path to its absolute key.
    ///
    /// The empty path and `"/"` resolve to the user root; any other path is
    /// appended to the root verbatim.
    pub fn resolve(&self, user: UserId, virtual_path: &str) -> ObjectKey {
        let root = self.user_root(user);
        if virtual_path.is_empty() || virtual_path == "/" {
            root
        } else {
            root.join(virtual_path)
        }
    }

    /// The parent virtual directory of a key, relative to the user root.
    ///
    /// Always ends in `/`; the canonical representation for resources sitting
    /// directly in the root is `"/"`.
    pub fn virtual_parent(&self, user: UserId, key: &ObjectKey) -> String {
        let root = self.user_root(user);
        match key.parent().strip_prefix(&root) {
            Some(rel) if !rel.is_empty() => rel.to_string(),
            _ => "/".to_string(),
        }
    }
}
