//! SQLite connector.
//!
//! Opens a fresh connection per call inside `spawn_blocking`; rusqlite
//! connections are not shareable across await points. The statement
//! timeout is enforced with `tokio::time::timeout` around the blocking
//! task, so a tripped timeout abandons the task rather than interrupting
//! the engine mid-statement.

use crate::db::{DatabaseConnector, ExecutionRows};
use crate::error::{ChatError, Result};
use crate::models::{ColumnMetadata, TableMetadata};
use crate::schema_cache::{CacheKey, SchemaCache};
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct SqliteConnector {
    path: PathBuf,
    cache: Arc<SchemaCache>,
    statement_timeout: Duration,
}

impl SqliteConnector {
    pub fn new(path: impl Into<PathBuf>, cache: Arc<SchemaCache>, statement_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            cache,
            statement_timeout,
        }
    }

    fn cache_key(&self, schema: Option<&str>) -> CacheKey {
        CacheKey::new(self.path.to_string_lossy(), schema)
    }

    fn open(path: &PathBuf) -> Result<Connection> {
        Connection::open(path).map_err(|e| ChatError::Execution(e.to_string()))
    }

    fn introspect(path: &PathBuf, schema: Option<&str>) -> Result<Vec<TableMetadata>> {
        let conn = Self::open(path)?;
        let schema_name = schema.unwrap_or("main").to_string();

        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .map_err(|e| ChatError::Schema(e.to_string()))?;
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| ChatError::Schema(e.to_string()))?
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| ChatError::Schema(e.to_string()))?;

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let mut columns = Vec::new();
            let mut col_stmt = conn
                .prepare(&format!("PRAGMA table_info(\"{}\")", name))
                .map_err(|e| ChatError::Schema(e.to_string()))?;
            let cols = col_stmt
                .query_map([], |row| {
                    let col_name: String = row.get(1)?;
                    let data_type: String = row.get(2)?;
                    let not_null: i64 = row.get(3)?;
                    Ok(ColumnMetadata {
                        name: col_name,
                        data_type,
                        nullable: not_null == 0,
                    })
                })
                .map_err(|e| ChatError::Schema(e.to_string()))?;
            for col in cols {
                columns.push(col.map_err(|e| ChatError::Schema(e.to_string()))?);
            }

            // Best effort; a missing count is not an introspection failure
            let row_count = conn
                .query_row(&format!("SELECT COUNT(*) FROM \"{}\"", name), [], |row| {
                    row.get::<_, i64>(0)
                })
                .map(|n| n as u64)
                .map_err(|e| {
                    warn!(table = %name, error = %e, "Could not get row count");
                    e
                })
                .ok();

            tables.push(TableMetadata {
                name,
                schema_name: schema_name.clone(),
                columns,
                row_count,
                description: None,
            });
        }

        Ok(tables)
    }

    fn run_query(path: &PathBuf, sql: &str) -> Result<ExecutionRows> {
        let conn = Self::open(path)?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| ChatError::Execution(e.to_string()))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let mut rows = Vec::new();
        let mut raw_rows = stmt
            .query([])
            .map_err(|e| ChatError::Execution(e.to_string()))?;
        while let Some(row) = raw_rows
            .next()
            .map_err(|e| ChatError::Execution(e.to_string()))?
        {
            let mut record = HashMap::with_capacity(columns.len());
            for (idx, col) in columns.iter().enumerate() {
                let value = match row
                    .get_ref(idx)
                    .map_err(|e| ChatError::Execution(e.to_string()))?
                {
                    ValueRef::Null => serde_json::Value::Null,
                    ValueRef::Integer(i) => serde_json::Value::from(i),
                    ValueRef::Real(f) => serde_json::Number::from_f64(f)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null),
                    ValueRef::Text(t) => {
                        serde_json::Value::String(String::from_utf8_lossy(t).into_owned())
                    }
                    ValueRef::Blob(b) => serde_json::Value::String(format!("<blob {} bytes>", b.len())),
                };
                record.insert(col.clone(), value);
            }
            rows.push(record);
        }

        Ok(ExecutionRows { rows, columns })
    }

    async fn with_timeout<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let timeout = self.statement_timeout;
        let task = tokio::task::spawn_blocking(f);
        match tokio::time::timeout(timeout, task).await {
            Ok(joined) => joined.map_err(|e| ChatError::Execution(format!("{} task failed: {}", op, e)))?,
            Err(_) => Err(ChatError::Timeout(format!(
                "{} exceeded {} seconds",
                op,
                timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl DatabaseConnector for SqliteConnector {
    async fn fetch_all_tables(
        &self,
        schema: Option<&str>,
        use_cache: bool,
    ) -> Result<Vec<TableMetadata>> {
        let key = self.cache_key(schema);
        if use_cache {
            if let Some(cached) = self.cache.get(&key) {
                info!("Using cached schema metadata");
                return Ok(cached.as_ref().clone());
            }
        }

        info!("Fetching schema metadata from database");
        let path = self.path.clone();
        let schema_owned = schema.map(|s| s.to_string());
        let tables = self
            .with_timeout("Schema introspection", move || {
                Self::introspect(&path, schema_owned.as_deref())
            })
            .await?;

        self.cache.put(key, tables.clone());
        info!(tables = tables.len(), "Fetched table metadata");
        Ok(tables)
    }

    async fn execute(&self, sql: &str) -> Result<ExecutionRows> {
        let path = self.path.clone();
        let sql = sql.to_string();
        let result = self
            .with_timeout("Query execution", move || Self::run_query(&path, &sql))
            .await?;
        info!(rows = result.rows.len(), "Executed query");
        Ok(result)
    }

    async fn test_connection(&self) -> bool {
        let path = self.path.clone();
        let probe = self
            .with_timeout("Connection test", move || {
                let conn = Self::open(&path)?;
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                    .map_err(|e| ChatError::Execution(e.to_string()))
            })
            .await;
        match probe {
            Ok(_) => {
                info!("Database connection test successful");
                true
            }
            Err(e) => {
                warn!(error = %e, "Database connection test failed");
                false
            }
        }
    }

    fn clear_cache(&self) {
        self.cache.clear_all();
        info!("Cleared schema cache");
    }
}
