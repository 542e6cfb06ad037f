//! The safety gate.
//!
//! Composes the safety checker, syntax-shape check, row-limit enforcement,
//! cost estimation and the confidence check into a single verdict.
//! Execution must never be attempted unless `safe_to_execute` is true.

use crate::cost::estimate_cost;
use crate::models::{SqlQuery, ValidationResult};
use crate::security::{QuerySafetyChecker, RowLimitEnforcer};
use tracing::info;

/// Confidence scores below this threshold draw a warning.
const LOW_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Validation verdict plus the (possibly row-limit-rewritten) SQL.
///
/// The rewrite is returned explicitly rather than mutating the candidate;
/// the orchestrator writes it back so callers still observe the updated
/// SQL on the response.
#[derive(Debug, Clone)]
pub struct Validated {
    pub outcome: ValidationResult,
    pub rewritten_sql: String,
}

pub struct Validator {
    allow_destructive: bool,
    max_rows: usize,
}

impl Validator {
    pub fn new(allow_destructive: bool, max_rows: usize) -> Self {
        Self {
            allow_destructive,
            max_rows,
        }
    }

    /// Validate a candidate query. Checks accumulate rather than
    /// short-circuit, so the caller sees every problem at once. Cost is
    /// estimated and attached regardless of validity.
    pub fn validate(&self, query: &SqlQuery) -> Validated {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let sql = &query.sql;

        if !check_syntax(sql) {
            errors.push("SQL syntax appears invalid".to_string());
        }

        let (_, safety_errors, safety_warnings) =
            QuerySafetyChecker::validate_query(sql, self.allow_destructive);
        errors.extend(safety_errors);
        warnings.extend(safety_warnings);

        let estimated_rows = RowLimitEnforcer::estimate_result_size(sql);
        let mut rewritten_sql = sql.clone();
        if estimated_rows.map_or(true, |n| n > self.max_rows as u64) {
            warnings.push(format!(
                "Query may return many rows. Limit will be enforced ({} rows)",
                self.max_rows
            ));
            rewritten_sql = RowLimitEnforcer::add_limit_clause(sql, self.max_rows);
        }

        let estimated_cost = estimate_cost(sql, &query.tables_used);

        if let Some(confidence) = query.confidence_score {
            if confidence < LOW_CONFIDENCE_THRESHOLD {
                warnings.push(format!(
                    "Low confidence score ({:.2}). Query may not be accurate.",
                    confidence
                ));
            }
        }

        let safe_to_execute = errors.is_empty();

        info!(
            is_valid = safe_to_execute,
            errors = errors.len(),
            warnings = warnings.len(),
            estimated_cost,
            "Query validated"
        );

        Validated {
            outcome: ValidationResult {
                is_valid: safe_to_execute,
                errors,
                warnings,
                estimated_cost,
                safe_to_execute,
            },
            rewritten_sql,
        }
    }
}

/// Basic shape check; real validation happens at execution.
fn check_syntax(sql: &str) -> bool {
    let sql_upper = sql.trim().to_uppercase();

    if !sql_upper.starts_with("SELECT") && !sql_upper.starts_with("WITH") {
        return false;
    }

    if sql.matches('(').count() != sql.matches(')').count() {
        return false;
    }

    if sql_upper.starts_with("SELECT") && !sql_upper.contains("FROM") {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(sql: &str, confidence: Option<f64>) -> SqlQuery {
        SqlQuery {
            sql: sql.to_string(),
            explanation: None,
            tables_used: vec!["users".to_string()],
            confidence_score: confidence,
        }
    }

    #[test]
    fn safe_query_passes() {
        let validator = Validator::new(false, 10_000);
        let validated = validator.validate(&candidate(
            "SELECT id, name FROM users WHERE status = 'active' LIMIT 100",
            Some(0.9),
        ));
        assert!(validated.outcome.is_valid);
        assert!(validated.outcome.safe_to_execute);
        assert!(validated.outcome.errors.is_empty());
        assert_eq!(
            validated.rewritten_sql,
            "SELECT id, name FROM users WHERE status = 'active' LIMIT 100"
        );
    }

    #[test]
    fn destructive_query_is_blocked() {
        let validator = Validator::new(false, 10_000);
        let validated = validator.validate(&candidate("DROP TABLE users", Some(0.5)));
        assert!(!validated.outcome.is_valid);
        assert!(!validated.outcome.safe_to_execute);
        assert!(validated
            .outcome
            .errors
            .iter()
            .any(|e| e.contains("Destructive operation")));
    }

    #[test]
    fn destructive_query_allowed_when_configured() {
        let validator = Validator::new(true, 10_000);
        let validated =
            validator.validate(&candidate("DELETE FROM users WHERE id = 1", None));
        assert!(!validated
            .outcome
            .errors
            .iter()
            .any(|e| e.contains("Destructive operation")));
    }

    #[test]
    fn missing_limit_is_rewritten() {
        let validator = Validator::new(false, 1000);
        let validated = validator.validate(&candidate("SELECT id FROM users", Some(0.8)));
        assert!(validated.rewritten_sql.ends_with("LIMIT 1000"));
        assert!(validated
            .outcome
            .warnings
            .iter()
            .any(|w| w.contains("Limit will be enforced")));
    }

    #[test]
    fn oversized_limit_is_shrunk_smaller_kept() {
        let validator = Validator::new(false, 1000);

        let shrunk = validator.validate(&candidate("SELECT id FROM users LIMIT 5000", None));
        assert!(shrunk.rewritten_sql.contains("LIMIT 1000"));
        assert!(!shrunk.rewritten_sql.contains("LIMIT 5000"));

        let kept = validator.validate(&candidate("SELECT id FROM users LIMIT 10", None));
        assert_eq!(kept.rewritten_sql, "SELECT id FROM users LIMIT 10");
    }

    #[test]
    fn rewrite_is_idempotent() {
        let validator = Validator::new(false, 500);
        let first = validator.validate(&candidate("SELECT id FROM users", None));
        let second = validator.validate(&candidate(&first.rewritten_sql, None));
        assert_eq!(first.rewritten_sql, second.rewritten_sql);
    }

    #[test]
    fn low_confidence_warns_but_does_not_block() {
        let validator = Validator::new(false, 10_000);
        let validated =
            validator.validate(&candidate("SELECT id FROM users LIMIT 5", Some(0.3)));
        assert!(validated.outcome.is_valid);
        assert!(validated
            .outcome
            .warnings
            .iter()
            .any(|w| w.contains("Low confidence")));
    }

    #[test]
    fn syntax_shape_check() {
        assert!(check_syntax("SELECT a FROM t"));
        assert!(check_syntax("WITH cte AS (SELECT 1) SELECT * FROM cte"));
        assert!(!check_syntax("INSERT INTO t VALUES (1)"));
        assert!(!check_syntax("SELECT a FROM t WHERE (x = 1"));
        assert!(!check_syntax("SELECT 1"));
    }

    #[test]
    fn cost_is_attached_even_when_invalid() {
        let validator = Validator::new(false, 10_000);
        let validated = validator.validate(&candidate("DROP TABLE users", None));
        assert!(validated.outcome.estimated_cost >= 0.0);
        assert!(validated.outcome.estimated_cost <= 1.0);
    }
}
