//! Query safety checks and row-limit enforcement.
//!
//! Pattern-based heuristics, not a SQL parser. Real validation happens at
//! execution time; this layer exists to refuse obviously destructive
//! statements and to cap result sizes before they reach the database.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Statements capable of irreversibly altering schema or data.
    static ref DESTRUCTIVE_PATTERNS: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"(?i)\bDROP\s+TABLE\b").unwrap(), r"\bDROP\s+TABLE\b"),
        (Regex::new(r"(?i)\bDROP\s+DATABASE\b").unwrap(), r"\bDROP\s+DATABASE\b"),
        (Regex::new(r"(?i)\bDROP\s+SCHEMA\b").unwrap(), r"\bDROP\s+SCHEMA\b"),
        (Regex::new(r"(?i)\bTRUNCATE\b").unwrap(), r"\bTRUNCATE\b"),
        (Regex::new(r"(?i)\bDELETE\s+FROM\b").unwrap(), r"\bDELETE\s+FROM\b"),
        (Regex::new(r"(?i)\bUPDATE\s+.*\s+SET\b").unwrap(), r"\bUPDATE\s+.*\s+SET\b"),
    ];

    /// Patterns that warrant a warning but never block on their own.
    static ref DANGEROUS_PATTERNS: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"--").unwrap(), "--"),
        (Regex::new(r"(?s)/\*.*\*/").unwrap(), r"/\*.*\*/"),
        (Regex::new(r"(?i);\s*DROP").unwrap(), r";\s*DROP"),
        (Regex::new(r"(?i)\bEXEC\s+").unwrap(), r"EXEC\s+"),
        (Regex::new(r"(?i)xp_cmdshell").unwrap(), "xp_cmdshell"),
    ];

    static ref LIMIT_RE: Regex = Regex::new(r"(?i)LIMIT\s+(\d+)").unwrap();
}

/// Checks SQL strings for safety concerns.
pub struct QuerySafetyChecker;

impl QuerySafetyChecker {
    /// Returns one issue per destructive pattern matched.
    pub fn destructive_issues(sql: &str) -> Vec<String> {
        DESTRUCTIVE_PATTERNS
            .iter()
            .filter(|(re, _)| re.is_match(sql))
            .map(|(_, label)| format!("Destructive operation detected: {}", label))
            .collect()
    }

    /// Returns one warning per dangerous pattern matched.
    pub fn dangerous_warnings(sql: &str) -> Vec<String> {
        DANGEROUS_PATTERNS
            .iter()
            .filter(|(re, _)| re.is_match(sql))
            .map(|(_, label)| format!("Potentially dangerous pattern: {}", label))
            .collect()
    }

    /// Full safety scan. Returns (is_safe, errors, warnings); destructive
    /// matches become errors unless `allow_destructive` is set.
    pub fn validate_query(sql: &str, allow_destructive: bool) -> (bool, Vec<String>, Vec<String>) {
        let mut errors = Vec::new();
        let warnings = Self::dangerous_warnings(sql);

        if !allow_destructive {
            errors.extend(Self::destructive_issues(sql));
        }

        if sql.trim().is_empty() {
            errors.push("Empty SQL query".to_string());
        }

        // Simple check, not statement-aware
        if sql.matches(';').count() > 1 {
            errors.push("Multiple SQL statements not allowed".to_string());
        }

        let is_safe = errors.is_empty();
        (is_safe, errors, warnings)
    }
}

/// Enforces a maximum result size by rewriting LIMIT clauses.
pub struct RowLimitEnforcer;

impl RowLimitEnforcer {
    /// Estimated result size. `None` means unbounded: there is no LIMIT
    /// clause to read the bound from. When subqueries carry their own
    /// limits the largest one is reported, a conservative overestimate
    /// that keeps the enforcer engaged whenever any clause is over cap.
    pub fn estimate_result_size(sql: &str) -> Option<u64> {
        LIMIT_RE
            .captures_iter(sql)
            .filter_map(|caps| caps.get(1).and_then(|m| m.as_str().parse().ok()))
            .max()
    }

    /// Rewrites `sql` so no LIMIT clause exceeds `max_rows`. Every
    /// occurrence is rewritten independently, subquery limits included;
    /// an existing lower limit is left untouched (only shrink, never
    /// grow). A missing limit is appended after stripping any trailing
    /// statement terminator.
    pub fn add_limit_clause(sql: &str, max_rows: usize) -> String {
        if LIMIT_RE.is_match(sql) {
            return LIMIT_RE
                .replace_all(sql, |caps: &regex::Captures| {
                    match caps[1].parse::<u64>() {
                        Ok(n) if n <= max_rows as u64 => caps[0].to_string(),
                        _ => format!("LIMIT {}", max_rows),
                    }
                })
                .into_owned();
        }

        let trimmed = sql.trim_end().trim_end_matches(';');
        format!("{}\nLIMIT {}", trimmed, max_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destructive_query_detection() {
        assert!(!QuerySafetyChecker::destructive_issues("DROP TABLE users").is_empty());
        assert!(
            !QuerySafetyChecker::destructive_issues("DELETE FROM users WHERE id = 1").is_empty()
        );
        assert!(!QuerySafetyChecker::destructive_issues("truncate orders").is_empty());
        assert!(QuerySafetyChecker::destructive_issues("SELECT * FROM users").is_empty());
    }

    #[test]
    fn test_destructive_allowed_when_configured() {
        let (is_safe, errors, _) = QuerySafetyChecker::validate_query("DROP TABLE users", true);
        assert!(is_safe);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_dangerous_patterns() {
        assert!(
            !QuerySafetyChecker::dangerous_warnings("SELECT * FROM users -- comment").is_empty()
        );
        assert!(!QuerySafetyChecker::dangerous_warnings("SELECT 1; DROP TABLE x").is_empty());
        assert!(QuerySafetyChecker::dangerous_warnings("SELECT * FROM users").is_empty());
    }

    #[test]
    fn test_validate_query() {
        let (is_safe, errors, _) =
            QuerySafetyChecker::validate_query("SELECT * FROM users LIMIT 10", false);
        assert!(is_safe);
        assert!(errors.is_empty());

        let (is_safe, errors, _) = QuerySafetyChecker::validate_query("DROP TABLE users", false);
        assert!(!is_safe);
        assert!(!errors.is_empty());

        let (is_safe, errors, _) = QuerySafetyChecker::validate_query("   ", false);
        assert!(!is_safe);
        assert!(errors.iter().any(|e| e.contains("Empty")));

        let (is_safe, _, _) =
            QuerySafetyChecker::validate_query("SELECT 1 FROM a; SELECT 2 FROM b;", false);
        assert!(!is_safe);
    }

    #[test]
    fn test_add_limit_clause() {
        let result = RowLimitEnforcer::add_limit_clause("SELECT * FROM users", 1000);
        assert!(result.ends_with("LIMIT 1000"));

        // Existing lower limit is preserved
        let result = RowLimitEnforcer::add_limit_clause("SELECT * FROM users LIMIT 100", 1000);
        assert!(result.contains("LIMIT 100"));
        assert!(!result.contains("LIMIT 1000"));

        // Existing higher limit is shrunk
        let result = RowLimitEnforcer::add_limit_clause("SELECT * FROM users LIMIT 5000", 1000);
        assert!(result.contains("LIMIT 1000"));
        assert!(!result.contains("LIMIT 5000"));
    }

    #[test]
    fn test_add_limit_rewrites_every_occurrence() {
        let sql = "SELECT * FROM (SELECT * FROM t LIMIT 50000) sub LIMIT 50000";
        let rewritten = RowLimitEnforcer::add_limit_clause(sql, 10_000);
        assert!(!rewritten.contains("LIMIT 50000"));
        assert_eq!(rewritten.matches("LIMIT 10000").count(), 2);
    }

    #[test]
    fn test_add_limit_mixed_subquery_limits() {
        // Only the over-cap clause is shrunk; the lower one survives
        let sql = "SELECT * FROM (SELECT * FROM t LIMIT 10) sub LIMIT 50000";
        let rewritten = RowLimitEnforcer::add_limit_clause(sql, 1000);
        assert!(rewritten.contains("LIMIT 10)"));
        assert!(rewritten.ends_with("LIMIT 1000"));
        assert!(!rewritten.contains("LIMIT 50000"));
    }

    #[test]
    fn test_add_limit_strips_trailing_semicolon() {
        let result = RowLimitEnforcer::add_limit_clause("SELECT * FROM users;", 50);
        assert!(!result.contains(';'));
        assert!(result.ends_with("LIMIT 50"));
    }

    #[test]
    fn test_add_limit_is_idempotent() {
        let once = RowLimitEnforcer::add_limit_clause("SELECT * FROM users", 500);
        let twice = RowLimitEnforcer::add_limit_clause(&once, 500);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_estimate_result_size() {
        assert_eq!(
            RowLimitEnforcer::estimate_result_size("SELECT * FROM users LIMIT 50"),
            Some(50)
        );
        assert_eq!(
            RowLimitEnforcer::estimate_result_size("SELECT * FROM users"),
            None
        );
        // Largest clause wins so an over-cap subquery still registers
        assert_eq!(
            RowLimitEnforcer::estimate_result_size(
                "SELECT * FROM (SELECT * FROM t LIMIT 50000) sub LIMIT 10"
            ),
            Some(50_000)
        );
    }
}
