//! Process-local cache.

use super::{Cache, CacheKey};
use crate::error::{DataError, Result};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::RwLock;

/// Thread-safe in-memory cache keyed by [`CacheKey::cache_key`].
#[derive(Debug)]
pub struct MemoryCache<K, V> {
    entries: RwLock<HashMap<(&'static str, String), V>>,
    _key: PhantomData<fn(&K)>,
}

impl<K, V> Default for MemoryCache<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            _key: PhantomData,
        }
    }
}

impl<K, V> MemoryCache<K, V> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> DataError {
    DataError::Cache("cache lock poisoned".to_string())
}

impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: CacheKey,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Result<Option<V>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(&(key.namespace(), key.cache_key())).cloned())
    }

    fn put(&self, key: &K, value: &V) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert((key.namespace(), key.cache_key()), value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::{Period, ReportingPeriod};
    use crate::series::{FactorKey, FactorKind, FactorSeries};
    use chrono::NaiveDate;
    use std::cell::Cell;

    fn key() -> FactorKey {
        FactorKey::market(FactorKind::Smb, ReportingPeriod::new(2023, Period::Q1))
    }

    fn series() -> FactorSeries {
        let date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        FactorSeries::new(key(), vec![(date, 0.01)])
    }

    #[test]
    fn test_get_or_compute_hits_after_miss() {
        let cache = MemoryCache::<FactorKey, FactorSeries>::new();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok::<_, DataError>(series())
        };

        let first = cache.get_or_compute(&key(), compute).unwrap();
        let second = cache.get_or_compute(&key(), compute).unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_compute_error_is_not_cached() {
        let cache = MemoryCache::<FactorKey, FactorSeries>::new();
        let result = cache.get_or_compute(&key(), || Err(DataError::not_found("x")));
        assert!(result.is_err());
        assert!(cache.is_empty());
    }
}
