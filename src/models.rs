//! Data models for the query pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Status of a query moving through the pipeline.
///
/// Moves forward through Pending -> Validating -> Executing -> Success,
/// with a side exit to Failed or Timeout at any stage. Never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Pending,
    Validating,
    Executing,
    Success,
    Failed,
    Timeout,
}

/// One column of a table, as reported by schema introspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

/// Metadata for a database table. Immutable once fetched for a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    pub schema_name: String,
    pub columns: Vec<ColumnMetadata>,
    pub row_count: Option<u64>,
    pub description: Option<String>,
}

/// An inferred foreign-key style relationship between two tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

/// Schema context handed to the SQL generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaContext {
    pub tables: Vec<TableMetadata>,
    pub relationships: Vec<Relationship>,
    pub common_queries: Vec<String>,
    pub business_terms: HashMap<String, String>,
}

/// A generated SQL candidate plus generation metadata, not yet proven safe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlQuery {
    pub sql: String,
    pub explanation: Option<String>,
    #[serde(default)]
    pub tables_used: Vec<String>,
    pub confidence_score: Option<f64>,
}

/// Outcome of the safety gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub estimated_cost: f64,
    pub safe_to_execute: bool,
}

/// Result of query execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<HashMap<String, serde_json::Value>>,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub truncated: bool,
    pub execution_time_ms: u64,
}

/// Chart configuration recommended for a result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    pub chart_type: String,
    pub x_axis: Option<String>,
    pub y_axis: Option<String>,
    pub title: Option<String>,
    pub color_column: Option<String>,
}

/// Incoming pipeline request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_query: String,
    pub user_id: String,
    /// Overrides the configured row cap when set.
    pub max_rows: Option<usize>,
    pub include_visualization: bool,
}

impl ChatRequest {
    pub fn new(user_query: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            user_query: user_query.into(),
            user_id: user_id.into(),
            max_rows: None,
            include_visualization: true,
        }
    }
}

/// Accumulating pipeline response. Partial results produced by earlier
/// stages stay attached even when a later stage fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub query_id: String,
    pub status: QueryStatus,
    pub user_query: String,
    pub sql: Option<SqlQuery>,
    pub validation: Option<ValidationResult>,
    pub result: Option<QueryResult>,
    pub chart_html: Option<String>,
    pub error_message: Option<String>,
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl ChatResponse {
    pub fn new(user_query: impl Into<String>) -> Self {
        Self {
            query_id: uuid::Uuid::new_v4().to_string(),
            status: QueryStatus::Pending,
            user_query: user_query.into(),
            sql: None,
            validation: None,
            result: None,
            chart_html: None,
            error_message: None,
            execution_time_ms: 0,
            timestamp: Utc::now(),
        }
    }
}
