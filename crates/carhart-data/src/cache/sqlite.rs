//! SQLite caching layer for derived results.

use super::{Cache, CacheKey};
use crate::error::{DataError, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite cache storing values as JSON, one table for every namespace.
///
/// Non-finite floats do not survive JSON encoding; cache only values whose
/// numbers are finite or optional.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Create a new SQLite cache.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Create an in-memory cache (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DataError::Cache("connection lock poisoned".to_string()))
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        self.conn()?.execute(
            "CREATE TABLE IF NOT EXISTS entries (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                data TEXT NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (namespace, key)
            )",
            [],
        )?;
        Ok(())
    }

    /// Remove every entry of a namespace.
    pub fn clear_namespace(&self, namespace: &str) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM entries WHERE namespace = ?1", params![namespace])?;
        Ok(())
    }

    /// Clear all cached data.
    pub fn clear_all(&self) -> Result<()> {
        self.conn()?.execute("DELETE FROM entries", [])?;
        Ok(())
    }

    /// Get cache statistics.
    pub fn get_stats(&self) -> Result<CacheStats> {
        let conn = self.conn()?;
        let entries: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        let namespaces: i64 =
            conn.query_row("SELECT COUNT(DISTINCT namespace) FROM entries", [], |row| {
                row.get(0)
            })?;
        Ok(CacheStats {
            entries: entries as usize,
            namespaces: namespaces as usize,
        })
    }
}

impl<K, V> Cache<K, V> for SqliteCache
where
    K: CacheKey,
    V: Serialize + DeserializeOwned,
{
    fn get(&self, key: &K) -> Result<Option<V>> {
        let data: Option<String> = self
            .conn()?
            .query_row(
                "SELECT data FROM entries WHERE namespace = ?1 AND key = ?2",
                params![key.namespace(), key.cache_key()],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|json| serde_json::from_str(&json).map_err(DataError::from))
            .transpose()
    }

    fn put(&self, key: &K, value: &V) -> Result<()> {
        let data = serde_json::to_string(value)?;
        let cached_at = Utc::now().to_rfc3339();
        self.conn()?.execute(
            "INSERT OR REPLACE INTO entries (namespace, key, data, cached_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![key.namespace(), key.cache_key(), data, cached_at],
        )?;
        Ok(())
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached entries
    pub entries: usize,
    /// Number of distinct namespaces
    pub namespaces: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::{Period, ReportingPeriod};
    use crate::series::{FactorKey, FactorKind, FactorSeries};
    use chrono::NaiveDate;

    fn sample() -> (FactorKey, FactorSeries) {
        let key = FactorKey::for_symbol(
            FactorKind::Mom,
            ReportingPeriod::new(2023, Period::Q3),
            "005930",
        );
        let date = NaiveDate::from_ymd_opt(2023, 7, 3).unwrap();
        let series = FactorSeries::new(key.clone(), vec![(date, 0.123_456_789_012_345_6)]);
        (key, series)
    }

    #[test]
    fn test_cache_initialization() {
        let cache = SqliteCache::in_memory();
        assert!(cache.is_ok());
    }

    #[test]
    fn test_put_get_roundtrip() {
        let cache = SqliteCache::in_memory().unwrap();
        let (key, series) = sample();

        let missing: Option<FactorSeries> = cache.get(&key).unwrap();
        assert!(missing.is_none());

        cache.put(&key, &series).unwrap();
        let loaded: Option<FactorSeries> = cache.get(&key).unwrap();
        assert_eq!(loaded, Some(series));
    }

    #[test]
    fn test_overwrite_is_idempotent() {
        let cache = SqliteCache::in_memory().unwrap();
        let (key, series) = sample();
        cache.put(&key, &series).unwrap();
        cache.put(&key, &series).unwrap();

        let stats = cache.get_stats().unwrap();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.namespaces, 1);
    }

    #[test]
    fn test_clear_operations() {
        let cache = SqliteCache::in_memory().unwrap();
        let (key, series) = sample();
        cache.put(&key, &series).unwrap();

        cache.clear_namespace("regression").unwrap();
        assert_eq!(cache.get_stats().unwrap().entries, 1);
        cache.clear_namespace("factor").unwrap();
        assert_eq!(cache.get_stats().unwrap().entries, 0);

        cache.put(&key, &series).unwrap();
        cache.clear_all().unwrap();
        assert_eq!(cache.get_stats().unwrap().entries, 0);
    }
}
