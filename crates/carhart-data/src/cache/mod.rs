//! Caching layer for derived series and results.
//!
//! A cache maps a [`CacheKey`] to a value. Entries are immutable once
//! computed: re-running a computation for the same key must produce an
//! identical value, so overwriting is always safe.

mod csv_file;
mod memory;
mod sqlite;

pub use self::csv_file::CsvSeriesCache;
pub use self::memory::MemoryCache;
pub use self::sqlite::{CacheStats, SqliteCache};

use crate::error::{DataError, Result};
use crate::series::FactorKey;
use std::sync::Arc;
use tracing::debug;

/// Stable identity of a cached value.
pub trait CacheKey {
    /// Group the key belongs to (e.g. `factor`, `regression`).
    fn namespace(&self) -> &'static str;

    /// Key unique within its namespace.
    fn cache_key(&self) -> String;
}

impl CacheKey for FactorKey {
    fn namespace(&self) -> &'static str {
        "factor"
    }

    fn cache_key(&self) -> String {
        self.to_string()
    }
}

/// Key-value cache with a compute-on-miss contract.
pub trait Cache<K: CacheKey, V>: Send + Sync {
    /// Stored value for `key`, if any.
    fn get(&self, key: &K) -> Result<Option<V>>;

    /// Store `value` under `key`, replacing any previous entry.
    fn put(&self, key: &K, value: &V) -> Result<()>;

    /// Return the cached value, or compute, store and return it.
    ///
    /// A cache hit is returned verbatim without calling `compute`.
    fn get_or_compute<E, F>(&self, key: &K, compute: F) -> std::result::Result<V, E>
    where
        Self: Sized,
        E: From<DataError>,
        F: FnOnce() -> std::result::Result<V, E>,
    {
        if let Some(value) = self.get(key)? {
            debug!(namespace = key.namespace(), key = %key.cache_key(), "cache hit");
            return Ok(value);
        }
        let value = compute()?;
        self.put(key, &value)?;
        debug!(namespace = key.namespace(), key = %key.cache_key(), "cache stored");
        Ok(value)
    }
}

impl<K: CacheKey, V, C: Cache<K, V> + ?Sized> Cache<K, V> for Arc<C> {
    fn get(&self, key: &K) -> Result<Option<V>> {
        (**self).get(key)
    }

    fn put(&self, key: &K, value: &V) -> Result<()> {
        (**self).put(key, value)
    }
}
