//! Database connectors.
//!
//! The pipeline depends only on the `DatabaseConnector` trait; backends
//! are swappable (tests substitute fakes).

pub mod sqlite;

use crate::error::Result;
use crate::models::TableMetadata;
use async_trait::async_trait;
use std::collections::HashMap;

pub use sqlite::SqliteConnector;

/// Raw rows and column order returned by a backend.
#[derive(Debug, Clone, Default)]
pub struct ExecutionRows {
    pub rows: Vec<HashMap<String, serde_json::Value>>,
    pub columns: Vec<String>,
}

/// Capability interface for a relational backend: schema introspection,
/// query execution with a statement timeout, and cache control.
#[async_trait]
pub trait DatabaseConnector: Send + Sync {
    /// Fetch metadata for every table in the given schema. Safe to call
    /// repeatedly; `use_cache = true` prefers the shared schema cache.
    async fn fetch_all_tables(
        &self,
        schema: Option<&str>,
        use_cache: bool,
    ) -> Result<Vec<TableMetadata>>;

    /// Run a single SQL statement. Must honor the configured statement
    /// timeout and return `ChatError::Timeout` when it trips.
    async fn execute(&self, sql: &str) -> Result<ExecutionRows>;

    async fn test_connection(&self) -> bool;

    fn clear_cache(&self);
}
