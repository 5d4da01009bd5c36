//! Per-user advisory locking for multi-key operations.
//!
//! The object store offers single-key operations only, so moves, recursive
//! deletes, and batch uploads issue several calls that can interleave with
//! concurrent mutations of the same subtree. The registry hands out one
//! advisory mutex per user; the resource layer holds it for the duration of
//! any multi-key mutation. Read operations take no lock.
//!
//! Locks are keyed by [`UserId`], so two users never contend with each
//! other. The lock serializes mutations; it does not make them atomic — a
//! failure partway through still leaves the keys already processed in their
//! new state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::path::UserId;

/// Registry mapping users to their shared advisory mutex.
///
/// All operations on one manager instance share the registry, so mutations
/// for the same user serialize even when issued from different threads.
#[derive(Debug, Default)]
pub struct UserLockRegistry {
    locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the mutex for a user.
    ///
    /// Callers lock the returned handle and hold the guard across every
    /// store call of the multi-key operation:
    ///
    /// ```
    /// use stratus_core::locks::UserLockRegistry;
    /// use stratus_core::path::UserId;
    ///
    /// let registry = UserLockRegistry::new();
    /// let lock = registry.get_or_create(UserId::new(1));
    /// let _guard = lock.lock().unwrap();
    /// // ... issue store calls ...
    /// ```
    pub fn get_or_create(&self, user: UserId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(user).or_default().clone()
    }
}
