//! Query execution against the database backend.

use crate::db::DatabaseConnector;
use crate::error::{ChatError, Result};
use crate::models::QueryResult;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub struct Executor {
    connector: Arc<dyn DatabaseConnector>,
    timeout_seconds: u64,
}

impl Executor {
    pub fn new(connector: Arc<dyn DatabaseConnector>, timeout_seconds: u64) -> Self {
        Self {
            connector,
            timeout_seconds,
        }
    }

    /// Execute validated SQL, truncating the result to `max_rows`.
    /// Only call this after the safety gate has passed.
    pub async fn execute_query(&self, sql: &str, max_rows: Option<usize>) -> Result<QueryResult> {
        let start = Instant::now();
        info!(sql = %truncate_for_log(sql), "Executing query");

        let execution = match self.connector.execute(sql).await {
            Ok(rows) => rows,
            Err(e) => {
                let elapsed = start.elapsed().as_millis() as u64;
                error!(error = %e, elapsed_ms = elapsed, "Query execution failed");
                return Err(match e {
                    ChatError::Timeout(msg) => ChatError::Timeout(msg),
                    other => ChatError::Execution(self.parse_error_message(&other.to_string())),
                });
            }
        };

        let mut rows = execution.rows;
        let mut truncated = false;
        if let Some(cap) = max_rows {
            if rows.len() > cap {
                rows.truncate(cap);
                truncated = true;
                warn!(max_rows = cap, "Results truncated");
            }
        }

        let columns = if execution.columns.is_empty() {
            rows.first()
                .map(|row| row.keys().cloned().collect())
                .unwrap_or_default()
        } else {
            execution.columns
        };

        let execution_time_ms = start.elapsed().as_millis() as u64;
        info!(
            rows_returned = rows.len(),
            truncated,
            execution_time_ms,
            "Query executed successfully"
        );

        Ok(QueryResult {
            row_count: rows.len(),
            rows,
            columns,
            truncated,
            execution_time_ms,
        })
    }

    /// Rewrites known raw driver phrasings into a user-friendly sentence.
    fn parse_error_message(&self, error: &str) -> String {
        let error_lower = error.to_lowercase();

        if error_lower.contains("does not exist") || error_lower.contains("not found") {
            return "Table or column not found. The query may reference non-existent database objects."
                .to_string();
        }

        if error_lower.contains("syntax error") || error_lower.contains("invalid syntax") {
            return "SQL syntax error. The query contains invalid SQL syntax.".to_string();
        }

        if error_lower.contains("timeout") || error_lower.contains("timed out") {
            return format!(
                "Query execution timed out after {} seconds. Try simplifying the query.",
                self.timeout_seconds
            );
        }

        if error_lower.contains("permission") || error_lower.contains("access denied") {
            return "Permission denied. You don't have access to query these tables.".to_string();
        }

        if error_lower.contains("ambiguous") {
            return "Ambiguous column reference. The query needs to specify which table columns belong to."
                .to_string();
        }

        if error_lower.contains("divide by zero") || error_lower.contains("division by zero") {
            return "Division by zero error. Check calculations in the query.".to_string();
        }

        format!("Database error: {}", error)
    }
}

fn truncate_for_log(sql: &str) -> &str {
    sql.get(..200).unwrap_or(sql)
}
