//! SQL generation from natural language.

use crate::error::{ChatError, Result};
use crate::llm::LlmProvider;
use crate::models::{SchemaContext, SqlQuery};
use std::sync::Arc;
use tracing::info;

const SYSTEM_PROMPT: &str = "You are an expert SQL query generator. Your task is to convert natural language questions into accurate SQL queries.

Guidelines:
1. Generate syntactically correct SQL queries
2. Use proper JOINs when querying multiple tables
3. Always use explicit column names (avoid SELECT *)
4. Include appropriate WHERE clauses for filtering
5. Use aggregate functions (COUNT, SUM, AVG, etc.) when appropriate
6. Add ORDER BY for ranking/sorting queries
7. Use LIMIT to prevent returning too many rows
8. Be case-insensitive in comparisons using LOWER() or UPPER()
9. Handle NULL values appropriately
10. Write queries that are optimized for performance

You must respond with valid JSON containing:
- sql: The SQL query string
- explanation: Brief explanation of what the query does
- tables_used: List of table names used in the query
- confidence_score: Your confidence in the query (0.0 to 1.0)

Important: Only use tables and columns that are provided in the schema context.";

/// Generates a candidate SQL query from a user question plus schema
/// context. Malformed structured output is a generation failure here, not
/// a validation concern downstream.
pub struct SqlGenerator {
    llm: Arc<dyn LlmProvider>,
}

impl SqlGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    pub async fn generate_sql(
        &self,
        user_query: &str,
        schema_context: &SchemaContext,
    ) -> Result<SqlQuery> {
        let user_prompt = build_user_prompt(user_query, schema_context);
        let response_format = serde_json::json!({
            "sql": "string - the SQL query",
            "explanation": "string - explanation of what the query does",
            "tables_used": ["list of table names used"],
            "confidence_score": "float between 0 and 1"
        });

        let response = self
            .llm
            .generate_structured(&user_prompt, Some(SYSTEM_PROMPT), &response_format)
            .await
            .map_err(|e| ChatError::Generation(e.to_string()))?;

        let sql_query: SqlQuery = serde_json::from_value(response)
            .map_err(|e| ChatError::Generation(format!("Malformed SQL response: {}", e)))?;

        if sql_query.sql.trim().is_empty() {
            return Err(ChatError::Generation(
                "LLM returned an empty SQL string".to_string(),
            ));
        }

        info!(
            sql_length = sql_query.sql.len(),
            tables_used = sql_query.tables_used.len(),
            confidence = ?sql_query.confidence_score,
            "SQL generated"
        );

        Ok(sql_query)
    }
}

fn build_user_prompt(user_query: &str, schema_context: &SchemaContext) -> String {
    format!(
        "User Question: {}\n\n\
         Database Schema:\n{}\n\n\
         Generate a SQL query that answers the user's question using the provided schema.\n\
         Remember to:\n\
         - Only use tables and columns that exist in the schema\n\
         - Write clean, readable SQL\n\
         - Include your confidence score based on schema completeness and query complexity\n\n\
         Respond with JSON only.",
        user_query,
        format_schema_context(schema_context)
    )
}

fn format_schema_context(schema_context: &SchemaContext) -> String {
    let mut lines = Vec::new();

    for table in &schema_context.tables {
        lines.push(format!("\nTable: {}.{}", table.schema_name, table.name));
        if let Some(ref description) = table.description {
            lines.push(format!("  Description: {}", description));
        }

        lines.push("  Columns:".to_string());
        for col in &table.columns {
            let nullable = if col.nullable { "NULL" } else { "NOT NULL" };
            lines.push(format!("    - {} ({}) {}", col.name, col.data_type, nullable));
        }

        if let Some(row_count) = table.row_count {
            lines.push(format!("  Approximate rows: {}", row_count));
        }
    }

    if !schema_context.relationships.is_empty() {
        lines.push("\nTable Relationships:".to_string());
        for rel in &schema_context.relationships {
            lines.push(format!(
                "  {}.{} -> {}.{}",
                rel.from_table, rel.from_column, rel.to_table, rel.to_column
            ));
        }
    }

    if !schema_context.business_terms.is_empty() {
        lines.push("\nBusiness Terms:".to_string());
        for (term, definition) in &schema_context.business_terms {
            lines.push(format!("  {}: {}", term, definition));
        }
    }

    lines.join("\n")
}
