//! Session storage contract
//!
//! The dialog core only needs a small Redis-shaped surface: lists for the
//! state stack, hashes for per-state data and plain strings for flags and
//! JSON blobs. Indices follow Redis semantics, so `-1` is the tail.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Storage lock poisoned")]
    Poisoned,
    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value storage backing every chat session
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Elements `start..=stop` of a list; negative indices count from the tail
    async fn list_range(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>>;

    /// Single list element; negative indices count from the tail
    async fn list_index(&self, key: &str, index: isize) -> StoreResult<Option<String>>;

    /// Append to the tail, returning the new length
    async fn list_push_tail(&self, key: &str, value: &str) -> StoreResult<usize>;

    /// Remove and return the tail element
    async fn list_pop_tail(&self, key: &str) -> StoreResult<Option<String>>;

    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()>;

    /// Returns whether the field existed
    async fn hash_delete_field(&self, key: &str, field: &str) -> StoreResult<bool>;

    async fn string_get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn string_set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete a key of any kind, returning whether it existed
    async fn delete(&self, key: &str) -> StoreResult<bool>;
}

// ============================================================================
// Arc implementation for trait objects
// ============================================================================

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn list_range(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>> {
        (**self).list_range(key, start, stop).await
    }

    async fn list_index(&self, key: &str, index: isize) -> StoreResult<Option<String>> {
        (**self).list_index(key, index).await
    }

    async fn list_push_tail(&self, key: &str, value: &str) -> StoreResult<usize> {
        (**self).list_push_tail(key, value).await
    }

    async fn list_pop_tail(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).list_pop_tail(key).await
    }

    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        (**self).hash_get(key, field).await
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        (**self).hash_set(key, field, value).await
    }

    async fn hash_delete_field(&self, key: &str, field: &str) -> StoreResult<bool> {
        (**self).hash_delete_field(key, field).await
    }

    async fn string_get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).string_get(key).await
    }

    async fn string_set(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).string_set(key, value).await
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        (**self).delete(key).await
    }
}

// ============================================================================
// Redis index helpers
// ============================================================================

/// Resolve a possibly negative index against a list of `len` elements
pub(crate) fn resolve_index(len: usize, index: isize) -> Option<usize> {
    let len = isize::try_from(len).ok()?;
    let resolved = if index < 0 { len + index } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

/// Resolve an inclusive `start..=stop` range the way `LRANGE` does.
///
/// Out-of-range bounds are clamped; an empty result is `None`.
pub(crate) fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = isize::try_from(len).ok()?;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((usize::try_from(start).ok()?, usize::try_from(stop).ok()?))
}
