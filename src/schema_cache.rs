//! Shared cache of fetched table metadata.
//!
//! The only cross-request shared state in the pipeline. One entry per
//! (source, schema) key, last write wins. Concurrent misses on the same
//! key may each trigger an upstream fetch; entries are derivable, so the
//! duplicate work is harmless.

use crate::models::TableMetadata;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: String,
    pub schema_name: String,
}

impl CacheKey {
    pub fn new(source: impl Into<String>, schema_name: Option<&str>) -> Self {
        Self {
            source: source.into(),
            schema_name: schema_name.unwrap_or("default").to_string(),
        }
    }
}

struct CacheEntry {
    tables: Arc<Vec<TableMetadata>>,
    fetched_at: Instant,
}

/// Time-scoped schema store. Expired entries are treated as misses on
/// read; there is no background eviction.
pub struct SchemaCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttl: Option<Duration>,
}

impl SchemaCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Vec<TableMetadata>>> {
        let entries = self.entries.read().expect("schema cache lock poisoned");
        let entry = entries.get(key)?;
        if let Some(ttl) = self.ttl {
            if entry.fetched_at.elapsed() > ttl {
                debug!(source = %key.source, schema = %key.schema_name, "schema cache entry expired");
                return None;
            }
        }
        Some(Arc::clone(&entry.tables))
    }

    pub fn put(&self, key: CacheKey, tables: Vec<TableMetadata>) {
        let mut entries = self.entries.write().expect("schema cache lock poisoned");
        entries.insert(
            key,
            CacheEntry {
                tables: Arc::new(tables),
                fetched_at: Instant::now(),
            },
        );
    }

    pub fn clear(&self, key: &CacheKey) {
        let mut entries = self.entries.write().expect("schema cache lock poisoned");
        entries.remove(key);
    }

    pub fn clear_all(&self) {
        let mut entries = self.entries.write().expect("schema cache lock poisoned");
        entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> TableMetadata {
        TableMetadata {
            name: name.to_string(),
            schema_name: "main".to_string(),
            columns: vec![],
            row_count: None,
            description: None,
        }
    }

    #[test]
    fn put_then_get_returns_entry() {
        let cache = SchemaCache::new(None);
        let key = CacheKey::new("db", Some("main"));
        cache.put(key.clone(), vec![table("users")]);
        let hit = cache.get(&key).unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].name, "users");
    }

    #[test]
    fn last_write_wins() {
        let cache = SchemaCache::new(None);
        let key = CacheKey::new("db", None);
        cache.put(key.clone(), vec![table("old")]);
        cache.put(key.clone(), vec![table("new")]);
        assert_eq!(cache.get(&key).unwrap()[0].name, "new");
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let cache = SchemaCache::new(Some(Duration::from_millis(0)));
        let key = CacheKey::new("db", None);
        cache.put(key.clone(), vec![table("users")]);
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn clear_removes_only_the_given_key() {
        let cache = SchemaCache::new(None);
        let a = CacheKey::new("db", Some("a"));
        let b = CacheKey::new("db", Some("b"));
        cache.put(a.clone(), vec![table("t1")]);
        cache.put(b.clone(), vec![table("t2")]);
        cache.clear(&a);
        assert!(cache.get(&a).is_none());
        assert!(cache.get(&b).is_some());
    }

    #[test]
    fn clear_all_empties_the_cache() {
        let cache = SchemaCache::new(None);
        let key = CacheKey::new("db", None);
        cache.put(key.clone(), vec![table("t")]);
        cache.clear_all();
        assert!(cache.get(&key).is_none());
    }
}
