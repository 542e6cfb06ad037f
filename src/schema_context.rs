//! Schema retrieval and relevance filtering.
//!
//! Selects the subset of tables likely pertinent to a natural-language
//! query before it is handed to the SQL generator. Keyword matching is
//! deliberately coarse and recall-biased; the generator decides what to
//! actually use.

use crate::db::DatabaseConnector;
use crate::error::{ChatError, Result};
use crate::models::{Relationship, SchemaContext, TableMetadata};
use std::sync::Arc;
use tracing::{info, warn};

/// Upper bound on tables handed to the generator when nothing matched.
const FALLBACK_TABLE_LIMIT: usize = 20;

/// Filter tables that are likely relevant to the user query.
///
/// A table qualifies if any whitespace-separated query token is a
/// substring of its name or of one of its column names (case-folded).
/// When nothing matches, the first `FALLBACK_TABLE_LIMIT` tables are
/// returned so the generator still has bounded context to work with.
pub fn filter_relevant_tables(user_query: &str, all_tables: &[TableMetadata]) -> Vec<TableMetadata> {
    let query_lower = user_query.to_lowercase();
    let query_words: Vec<&str> = query_lower.split_whitespace().collect();

    let mut relevant = Vec::new();

    for table in all_tables {
        let table_name = table.name.to_lowercase();
        if query_words.iter().any(|word| table_name.contains(word)) {
            relevant.push(table.clone());
            continue;
        }

        let column_hit = table.columns.iter().any(|col| {
            let col_name = col.name.to_lowercase();
            query_words.iter().any(|word| col_name.contains(word))
        });
        if column_hit {
            relevant.push(table.clone());
        }
    }

    if relevant.is_empty() {
        warn!("No tables matched query keywords, falling back to full catalog");
        return all_tables.iter().take(FALLBACK_TABLE_LIMIT).cloned().collect();
    }

    info!(
        relevant = relevant.len(),
        total = all_tables.len(),
        "Filtered relevant tables"
    );
    relevant
}

/// Infer relationships between tables from column naming.
///
/// A column ending in `id` or `_id` is assumed to reference a table named
/// like the stripped prefix, whose primary key is assumed to be literally
/// named `id`. Neither assumption is verified against the catalog, so the
/// output is best-effort prompt enrichment, not a foreign-key authority.
pub fn infer_relationships(tables: &[TableMetadata]) -> Vec<Relationship> {
    let mut relationships = Vec::new();

    for table in tables {
        for column in &table.columns {
            let col_name = column.name.to_lowercase();

            let referenced = if let Some(prefix) = col_name.strip_suffix("_id") {
                prefix
            } else if let Some(prefix) = col_name.strip_suffix("id") {
                prefix
            } else {
                continue;
            };

            for other in tables {
                if other.name.to_lowercase() == referenced {
                    relationships.push(Relationship {
                        from_table: table.name.clone(),
                        from_column: column.name.clone(),
                        to_table: other.name.clone(),
                        to_column: "id".to_string(),
                    });
                }
            }
        }
    }

    relationships
}

/// Schema stage: fetches the table catalog (cache-preferring) and builds
/// the filtered context the generator consumes.
pub struct SchemaStage {
    connector: Arc<dyn DatabaseConnector>,
}

impl SchemaStage {
    pub fn new(connector: Arc<dyn DatabaseConnector>) -> Self {
        Self { connector }
    }

    pub async fn schema_context(
        &self,
        user_query: &str,
        schema_name: Option<&str>,
        use_cache: bool,
    ) -> Result<SchemaContext> {
        let all_tables = self
            .connector
            .fetch_all_tables(schema_name, use_cache)
            .await
            .map_err(|e| ChatError::Schema(e.to_string()))?;

        let tables = filter_relevant_tables(user_query, &all_tables);
        let relationships = infer_relationships(&tables);

        info!(
            total_tables = all_tables.len(),
            relevant_tables = tables.len(),
            relationships = relationships.len(),
            "Schema context retrieved"
        );

        Ok(SchemaContext {
            tables,
            relationships,
            common_queries: Vec::new(),
            business_terms: Default::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnMetadata;

    fn table(name: &str, columns: &[&str]) -> TableMetadata {
        TableMetadata {
            name: name.to_string(),
            schema_name: "public".to_string(),
            columns: columns
                .iter()
                .map(|c| ColumnMetadata {
                    name: c.to_string(),
                    data_type: "TEXT".to_string(),
                    nullable: true,
                })
                .collect(),
            row_count: None,
            description: None,
        }
    }

    #[test]
    fn test_filter_matches_table_name() {
        let tables = vec![
            table("users", &["id"]),
            table("orders", &["id"]),
            table("products", &["id"]),
        ];
        let relevant = filter_relevant_tables("show me all users", &tables);
        assert_eq!(relevant.len(), 1);
        assert_eq!(relevant[0].name, "users");
    }

    #[test]
    fn test_filter_matches_column_name() {
        let tables = vec![
            table("t1", &["revenue", "region"]),
            table("t2", &["id", "name"]),
        ];
        let relevant = filter_relevant_tables("total revenue by month", &tables);
        assert_eq!(relevant.len(), 1);
        assert_eq!(relevant[0].name, "t1");
    }

    #[test]
    fn test_filter_falls_back_to_first_twenty() {
        let tables: Vec<TableMetadata> = (0..30).map(|i| table(&format!("t{}", i), &[])).collect();
        let relevant = filter_relevant_tables("zzz qqq", &tables);
        assert_eq!(relevant.len(), FALLBACK_TABLE_LIMIT);
        assert_eq!(relevant[0].name, "t0");
    }

    #[test]
    fn test_filter_fallback_returns_all_when_small() {
        let tables = vec![table("a", &[]), table("b", &[])];
        let relevant = filter_relevant_tables("zzz", &tables);
        assert_eq!(relevant.len(), 2);
    }

    #[test]
    fn test_infer_relationships_underscore_id() {
        let tables = vec![
            table("orders", &["id", "customer_id"]),
            table("customer", &["id", "name"]),
        ];
        let rels = infer_relationships(&tables);
        assert_eq!(
            rels,
            vec![Relationship {
                from_table: "orders".to_string(),
                from_column: "customer_id".to_string(),
                to_table: "customer".to_string(),
                to_column: "id".to_string(),
            }]
        );
    }

    #[test]
    fn test_infer_relationships_bare_id_suffix() {
        let tables = vec![
            table("payments", &["accountid"]),
            table("account", &["id"]),
        ];
        let rels = infer_relationships(&tables);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].to_table, "account");
    }

    #[test]
    fn test_infer_relationships_no_match() {
        let tables = vec![table("orders", &["customer_id"]), table("users", &["id"])];
        assert!(infer_relationships(&tables).is_empty());
    }
}
