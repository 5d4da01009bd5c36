//! High-level resource operations over the object store.
//!
//! [`ResourceManager`] is the orchestration core of the crate: it resolves
//! user-relative virtual paths to object keys, validates the namespace
//! invariants (trailing-slash typing, uniqueness, parent existence), and
//! issues the store calls. Multi-key operations (move, recursive delete,
//! batch upload) run their store calls sequentially and are not atomic: a
//! failure partway through leaves the keys already processed in their new
//! state. Re-running a failed delete or move is safe because both are
//! idempotent per key.
//!
//! # Key Methods
//!
//! - **Info**: [`get_resource_info`](ResourceManager::get_resource_info)
//! - **Directories**: [`create_directory`](ResourceManager::create_directory),
//!   [`list_directory`](ResourceManager::list_directory)
//! - **Content**: [`upload_resources`](ResourceManager::upload_resources),
//!   [`download_resource`](ResourceManager::download_resource)
//! - **Mutation**: [`delete_resource`](ResourceManager::delete_resource),
//!   [`move_resource`](ResourceManager::move_resource)
//! - **Search**: [`search_resources`](ResourceManager::search_resources)
//!
//! # Concurrency
//!
//! Multi-key mutations for one user are serialized through a per-user
//! advisory mutex ([`UserLockRegistry`]); reads take no lock and rely on the
//! store's per-key consistency.
//!
//! # Observability
//!
//! Operations are instrumented with `tracing` spans and events; payload
//! bytes are never logged.

use std::fmt;
use std::io::Cursor;

use thiserror::Error;
use tracing::{debug, info, instrument, trace};

use crate::archive::{self, ArchiveError};
use crate::locks::UserLockRegistry;
use crate::path::{is_directory_path, ObjectKey, StorageLayout, UserId};
use crate::resource::{DownloadBody, Resource, ResourceDownload, UploadFile};
use crate::store::{ObjectStore, StoreError};

/// Context attached to storage-level failures, for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    /// The virtual path being operated on.
    pub path: Option<String>,
    /// The object key being addressed.
    pub key: Option<String>,
}

impl OpContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

impl fmt::Display for OpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref path) = self.path {
            parts.push(format!("path '{path}'"));
        }
        if let Some(ref key) = self.key {
            parts.push(format!("key '{key}'"));
        }
        if parts.is_empty() {
            write!(f, "(no context)")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Errors surfaced by resource operations.
///
/// Store-level errors never cross this boundary unclassified: every variant
/// maps to one of the four [`ErrorKind`]s the API contract defines.
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("search query must not be blank")]
    EmptyQuery,

    #[error("resource not found: '{path}'")]
    NotFound { path: String },

    #[error("parent directory does not exist: '{path}'")]
    ParentNotFound { path: String },

    #[error("resource already exists: '{path}'")]
    AlreadyExists { path: String },

    #[error("cannot change resource type when moving '{from}' to '{to}'")]
    TypeMismatch { from: String, to: String },

    #[error("storage error for {context}: {source}")]
    Store {
        #[source]
        source: StoreError,
        context: OpContext,
    },

    #[error("archive error for {context}: {source}")]
    Archive {
        #[source]
        source: ArchiveError,
        context: OpContext,
    },
}

impl ResourceError {
    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResourceError::InvalidPath { .. }
            | ResourceError::EmptyQuery
            | ResourceError::TypeMismatch { .. } => ErrorKind::InvalidArgument,
            ResourceError::NotFound { .. } | ResourceError::ParentNotFound { .. } => {
                ErrorKind::NotFound
            }
            ResourceError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            ResourceError::Store { .. } | ResourceError::Archive { .. } => ErrorKind::Internal,
        }
    }
}

/// Coarse error classification, stable across variants.
///
/// A serving layer maps kinds straight to response statuses via
/// [`http_status`](ErrorKind::http_status).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    Internal,
}

impl ErrorKind {
    /// The HTTP status this kind surfaces as.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::InvalidArgument => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::AlreadyExists => 409,
            ErrorKind::Internal => 500,
        }
    }
}

fn store_err(source: StoreError, path: &str, key: &ObjectKey) -> ResourceError {
    ResourceError::Store {
        source,
        context: OpContext::new().with_path(path).with_key(key.as_str()),
    }
}

fn invalid_path(path: &str, reason: &str) -> ResourceError {
    ResourceError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

/// Orchestrates the per-user virtual filesystem over an [`ObjectStore`].
///
/// The manager holds no cached state: every `Resource` it returns is a view
/// computed from store state at call time.
pub struct ResourceManager<S> {
    store: S,
    layout: StorageLayout,
    locks: UserLockRegistry,
}

impl<S: ObjectStore> ResourceManager<S> {
    /// Create a manager with the default key layout.
    pub fn new(store: S) -> Self {
        Self::with_layout(store, StorageLayout::new())
    }

    /// Create a manager with an explicit key layout.
    pub fn with_layout(store: S, layout: StorageLayout) -> Self {
        ResourceManager {
            store,
            layout,
            locks: UserLockRegistry::new(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The key layout in use.
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Create the root directory marker for a newly registered user.
    ///
    /// Driven by the (external) user-registration event. Idempotent: an
    /// existing root is left untouched.
    #[instrument(level = "info", skip(self), fields(user = %user))]
    pub fn create_user_root(&self, user: UserId) -> Result<(), ResourceError> {
        let root = self.layout.user_root(user);
        if self.exists("/", &root)? {
            trace!(key = %root, "User root already present");
            return Ok(());
        }
        self.put_marker("/", &root)?;
        info!(key = %root, "Created user root");
        Ok(())
    }

    /// Look up a file or directory without mutating anything.
    ///
    /// Safe to call concurrently with any other operation, subject to the
    /// store's own per-key consistency.
    #[instrument(level = "debug", skip(self), fields(user = %user, path = path.as_ref()))]
    pub fn get_resource_info(
        &self,
        user: UserId,
        path: impl AsRef<str>,
    ) -> Result<Resource, ResourceError> {
        let path = path.as_ref();
        if path.trim().is_empty() {
            return Err(invalid_path(path, "path must not be blank"));
        }

        let key = self.layout.resolve(user, path);
        if !self.exists(path, &key)? {
            return Err(ResourceError::NotFound {
                path: path.to_string(),
            });
        }

        let size = if key.is_directory() {
            None
        } else {
            let stat = self.store.stat(&key).map_err(|e| {
                if e.is_not_found() {
                    ResourceError::NotFound {
                        path: path.to_string(),
                    }
                } else {
                    store_err(e, path, &key)
                }
            })?;
            Some(stat.size)
        };

        Ok(self.resource_for_key(user, &key, size))
    }

    /// Create an empty directory under an existing parent.
    ///
    /// No implicit `mkdir -p`: the parent directory must already exist.
    #[instrument(level = "debug", skip(self), fields(user = %user, path = path.as_ref()))]
    pub fn create_directory(
        &self,
        user: UserId,
        path: impl AsRef<str>,
    ) -> Result<Resource, ResourceError> {
        let path = path.as_ref();
        if !is_directory_path(path) {
            return Err(invalid_path(path, "directory paths must end with '/'"));
        }

        let key = self.layout.resolve(user, path);
        if self.exists(path, &key)? {
            return Err(ResourceError::AlreadyExists {
                path: path.to_string(),
            });
        }

        let parent = key.parent();
        if !self.exists(path, &parent)? {
            return Err(ResourceError::ParentNotFound {
                path: self.layout.virtual_parent(user, &key),
            });
        }

        self.put_marker(path, &key)?;
        debug!(key = %key, "Created directory marker");
        Ok(self.resource_for_key(user, &key, None))
    }

    /// List the direct children of a directory.
    ///
    /// The directory's own marker is not part of the result. No ordering is
    /// guaranteed beyond what the store's listing returns.
    #[instrument(level = "debug", skip(self), fields(user = %user, path = path.as_ref()))]
    pub fn list_directory(
        &self,
        user: UserId,
        path: impl AsRef<str>,
    ) -> Result<Vec<Resource>, ResourceError> {
        let path = path.as_ref();
        if !is_directory_path(path) {
            return Err(invalid_path(path, "directory paths must end with '/'"));
        }

        let key = self.layout.resolve(user, path);
        if !self.exists(path, &key)? {
            return Err(ResourceError::NotFound {
                path: path.to_string(),
            });
        }

        let entries = self
            .store
            .list(&key, false)
            .map_err(|e| store_err(e, path, &key))?;

        let resources: Vec<Resource> = entries
            .into_iter()
            .filter(|entry| entry.key != key)
            .map(|entry| {
                let size = entry.resource_type().is_file().then_some(entry.size);
                self.resource_for_key(user, &entry.key, size)
            })
            .collect();

        debug!(count = resources.len(), "Listed directory");
        Ok(resources)
    }

    /// Upload a batch of files into an existing directory.
    ///
    /// Files are stored sequentially in the given order. A file whose name
    /// contains `/` lands on the corresponding sub-path below the target
    /// directory. The whole request aborts on the first name that already
    /// exists; files stored before the conflict are **not** rolled back.
    #[instrument(
        level = "info",
        skip(self, files),
        fields(user = %user, path = path.as_ref(), file_count = files.len())
    )]
    pub fn upload_resources(
        &self,
        user: UserId,
        path: impl AsRef<str>,
        files: Vec<UploadFile>,
    ) -> Result<Vec<Resource>, ResourceError> {
        let path = path.as_ref();
        if !is_directory_path(path) {
            return Err(invalid_path(path, "upload target must be a directory path"));
        }

        let dir_key = self.layout.resolve(user, path);

        let lock = self.locks.get_or_create(user);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        if !self.exists(path, &dir_key)? {
            return Err(ResourceError::NotFound {
                path: path.to_string(),
            });
        }

        let mut uploaded = Vec::with_capacity(files.len());
        for file in &files {
            let target = dir_key.join(&file.name);
            if self.exists(path, &target)? {
                return Err(ResourceError::AlreadyExists {
                    path: self.virtual_path_of(user, &target),
                });
            }

            let size = file.data.len() as u64;
            self.store
                .put(
                    &target,
                    &mut Cursor::new(file.data.as_slice()),
                    size,
                    file.content_type.as_deref(),
                )
                .map_err(|e| store_err(e, path, &target))?;
            debug!(key = %target, size, "Stored uploaded object");
            uploaded.push(self.resource_for_key(user, &target, Some(size)));
        }

        info!(uploaded = uploaded.len(), "Upload complete");
        Ok(uploaded)
    }

    /// Delete a file, or a directory together with everything below it.
    ///
    /// Deletion order across keys is unspecified and there is no rollback on
    /// partial failure; re-running the delete is safe.
    #[instrument(level = "info", skip(self), fields(user = %user, path = path.as_ref()))]
    pub fn delete_resource(
        &self,
        user: UserId,
        path: impl AsRef<str>,
    ) -> Result<(), ResourceError> {
        let path = path.as_ref();
        if path.trim().is_empty() {
            return Err(invalid_path(path, "path must not be blank"));
        }

        let key = self.layout.resolve(user, path);

        let lock = self.locks.get_or_create(user);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        if !self.exists(path, &key)? {
            return Err(ResourceError::NotFound {
                path: path.to_string(),
            });
        }

        if key.is_directory() {
            let entries = self
                .store
                .list(&key, true)
                .map_err(|e| store_err(e, path, &key))?;
            for entry in &entries {
                self.store
                    .delete(&entry.key)
                    .map_err(|e| store_err(e, path, &entry.key))?;
            }
            info!(deleted = entries.len(), "Deleted directory tree");
        } else {
            self.store
                .delete(&key)
                .map_err(|e| store_err(e, path, &key))?;
            debug!(key = %key, "Deleted object");
        }

        Ok(())
    }

    /// Move or rename a file or directory.
    ///
    /// The trailing-slash types of `from` and `to` must agree: directories
    /// move to directory paths, files to file paths. Directory moves walk
    /// the subtree key by key (copy, then delete); missing intermediate
    /// directory markers on the destination side are materialized first. A
    /// crash mid-operation leaves the tree split between source and
    /// destination; re-running the move is safe.
    #[instrument(
        level = "info",
        skip(self),
        fields(user = %user, from = from.as_ref(), to = to.as_ref())
    )]
    pub fn move_resource(
        &self,
        user: UserId,
        from: impl AsRef<str>,
        to: impl AsRef<str>,
    ) -> Result<Resource, ResourceError> {
        let from = from.as_ref();
        let to = to.as_ref();
        if from.trim().is_empty() {
            return Err(invalid_path(from, "'from' must not be blank"));
        }
        if to.trim().is_empty() {
            return Err(invalid_path(to, "'to' must not be blank"));
        }
        if is_directory_path(from) != is_directory_path(to) {
            return Err(ResourceError::TypeMismatch {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let from_key = self.layout.resolve(user, from);
        let to_key = self.layout.resolve(user, to);

        let lock = self.locks.get_or_create(user);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        if !self.exists(from, &from_key)? {
            return Err(ResourceError::NotFound {
                path: from.to_string(),
            });
        }
        if self.exists(to, &to_key)? {
            return Err(ResourceError::AlreadyExists {
                path: to.to_string(),
            });
        }

        self.ensure_parent_markers(user, to, &to_key)?;

        if from_key.is_directory() {
            let entries = self
                .store
                .list(&from_key, true)
                .map_err(|e| store_err(e, from, &from_key))?;
            for entry in &entries {
                let Some(rest) = entry.key.strip_prefix(&from_key) else {
                    continue;
                };
                let new_key = to_key.join(rest);
                self.store
                    .copy(&entry.key, &new_key)
                    .map_err(|e| store_err(e, from, &entry.key))?;
                self.store
                    .delete(&entry.key)
                    .map_err(|e| store_err(e, from, &entry.key))?;
                trace!(old = %entry.key, new = %new_key, "Moved object");
            }
            info!(moved = entries.len(), "Moved directory tree");
            Ok(self.resource_for_key(user, &to_key, None))
        } else {
            self.store
                .copy(&from_key, &to_key)
                .map_err(|e| store_err(e, from, &from_key))?;
            self.store
                .delete(&from_key)
                .map_err(|e| store_err(e, from, &from_key))?;
            let stat = self
                .store
                .stat(&to_key)
                .map_err(|e| store_err(e, to, &to_key))?;
            debug!(old = %from_key, new = %to_key, "Moved object");
            Ok(self.resource_for_key(user, &to_key, Some(stat.size)))
        }
    }

    /// Find resources whose name contains `query`, case-insensitively.
    ///
    /// Matches on the last path segment only; both files and directories are
    /// returned.
    #[instrument(level = "debug", skip(self), fields(user = %user, query = query.as_ref()))]
    pub fn search_resources(
        &self,
        user: UserId,
        query: impl AsRef<str>,
    ) -> Result<Vec<Resource>, ResourceError> {
        let query = query.as_ref();
        if query.trim().is_empty() {
            return Err(ResourceError::EmptyQuery);
        }

        let root = self.layout.user_root(user);
        let entries = self
            .store
            .list(&root, true)
            .map_err(|e| store_err(e, "/", &root))?;

        let needle = query.to_lowercase();
        let mut matches = Vec::new();
        for entry in entries {
            // The root marker is infrastructure, not a user resource
            if entry.key == root {
                continue;
            }
            if entry.key.name().to_lowercase().contains(&needle) {
                let size = entry.resource_type().is_file().then_some(entry.size);
                matches.push(self.resource_for_key(user, &entry.key, size));
            }
        }

        debug!(matches = matches.len(), "Search complete");
        Ok(matches)
    }

    /// Download a file as a byte stream, or a directory as a zip archive.
    ///
    /// Directory archives contain one entry per descendant file, named by
    /// its path relative to the directory; markers carry no entries.
    #[instrument(level = "info", skip(self), fields(user = %user, path = path.as_ref()))]
    pub fn download_resource(
        &self,
        user: UserId,
        path: impl AsRef<str>,
    ) -> Result<ResourceDownload, ResourceError> {
        let path = path.as_ref();
        if path.trim().is_empty() {
            return Err(invalid_path(path, "path must not be blank"));
        }

        let key = self.layout.resolve(user, path);
        if !self.exists(path, &key)? {
            return Err(ResourceError::NotFound {
                path: path.to_string(),
            });
        }

        if key.is_directory() {
            let entries = self
                .store
                .list(&key, true)
                .map_err(|e| store_err(e, path, &key))?;
            let bytes =
                archive::build_directory_archive(&self.store, &key, &entries).map_err(|source| {
                    ResourceError::Archive {
                        source,
                        context: OpContext::new().with_path(path).with_key(key.as_str()),
                    }
                })?;
            info!(archive_size = bytes.len(), "Packaged directory download");
            Ok(ResourceDownload {
                file_name: format!("{}.zip", key.name()),
                content_type: Some("application/zip".to_string()),
                body: DownloadBody::Archive(bytes),
            })
        } else {
            let stat = self
                .store
                .stat(&key)
                .map_err(|e| store_err(e, path, &key))?;
            let reader = self.store.get(&key).map_err(|e| store_err(e, path, &key))?;
            debug!(key = %key, size = stat.size, "Streaming file download");
            Ok(ResourceDownload {
                file_name: key.name().to_string(),
                content_type: stat.content_type,
                body: DownloadBody::Stream(reader),
            })
        }
    }

    fn exists(&self, path: &str, key: &ObjectKey) -> Result<bool, ResourceError> {
        self.store.exists(key).map_err(|e| store_err(e, path, key))
    }

    fn put_marker(&self, path: &str, key: &ObjectKey) -> Result<(), ResourceError> {
        self.store
            .put(key, &mut std::io::empty(), 0, None)
            .map_err(|e| store_err(e, path, key))
    }

    /// Materialize missing directory markers between the user root and
    /// `key`'s parent, shallowest first.
    fn ensure_parent_markers(
        &self,
        user: UserId,
        path: &str,
        key: &ObjectKey,
    ) -> Result<(), ResourceError> {
        let root = self.layout.user_root(user);
        let mut missing = Vec::new();
        let mut current = key.parent();
        while current != root && current.has_prefix(&root) {
            if self.exists(path, &current)? {
                break;
            }
            missing.push(current.clone());
            let next = current.parent();
            if next == current {
                break;
            }
            current = next;
        }
        for marker in missing.into_iter().rev() {
            self.put_marker(path, &marker)?;
            debug!(key = %marker, "Materialized destination directory");
        }
        Ok(())
    }

    fn resource_for_key(&self, user: UserId, key: &ObjectKey, size: Option<u64>) -> Resource {
        Resource {
            path: self.layout.virtual_parent(user, key),
            name: key.name().to_string(),
            size,
            resource_type: key.resource_type(),
        }
    }

    fn virtual_path_of(&self, user: UserId, key: &ObjectKey) -> String {
        let root = self.layout.user_root(user);
        key.strip_prefix(&root)
            .map_or_else(|| key.as_str().to_string(), str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_classify_variants() {
        let invalid = invalid_path("docs", "directory paths must end with '/'");
        assert_eq!(invalid.kind(), ErrorKind::InvalidArgument);
        assert_eq!(ResourceError::EmptyQuery.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            ResourceError::TypeMismatch {
                from: "docs/".into(),
                to: "docs".into()
            }
            .kind(),
            ErrorKind::InvalidArgument
        );

        assert_eq!(
            ResourceError::NotFound { path: "x".into() }.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ResourceError::ParentNotFound { path: "x/".into() }.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ResourceError::AlreadyExists { path: "x".into() }.kind(),
            ErrorKind::AlreadyExists
        );

        let store = ResourceError::Store {
            source: StoreError::Backend("boom".into()),
            context: OpContext::new().with_path("x"),
        };
        assert_eq!(store.kind(), ErrorKind::Internal);
    }

    #[test]
    fn kinds_map_to_http_statuses() {
        assert_eq!(ErrorKind::InvalidArgument.http_status(), 400);
        assert_eq!(ErrorKind::NotFound.http_status(), 404);
        assert_eq!(ErrorKind::AlreadyExists.http_status(), 409);
        assert_eq!(ErrorKind::Internal.http_status(), 500);
    }

    #[test]
    fn op_context_display() {
        assert_eq!(OpContext::new().to_string(), "(no context)");
        assert_eq!(
            OpContext::new().with_path("docs/").to_string(),
            "path 'docs/'"
        );
        assert_eq!(
            OpContext::new()
                .with_path("docs/")
                .with_key("user-1-files/docs/")
                .to_string(),
            "path 'docs/', key 'user-1-files/docs/'"
        );
    }
}
