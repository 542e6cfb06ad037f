//! Heuristic query cost estimation.

/// Keywords that signal window functions.
const WINDOW_FUNCTIONS: [&str; 5] = ["ROW_NUMBER", "RANK", "DENSE_RANK", "LAG", "LEAD"];

/// Estimate a relative cost score in [0, 1] from the shape of a SQL string.
///
/// This is a heuristic over keyword counts, not a query-planner estimate:
/// it never looks at table statistics or execution telemetry. Scores are
/// additive and capped at 1.0.
pub fn estimate_cost(sql: &str, tables_used: &[String]) -> f64 {
    let sql_upper = sql.to_uppercase();
    let mut cost = 0.0;

    // Each table referenced adds a little; joins add more
    cost += tables_used.len() as f64 * 0.1;
    cost += sql_upper.matches("JOIN").count() as f64 * 0.15;

    // Extra SELECTs are a proxy for subqueries
    let subquery_count = sql_upper.matches("SELECT").count().saturating_sub(1);
    cost += subquery_count as f64 * 0.2;

    if sql_upper.contains("GROUP BY") {
        cost += 0.15;
    }

    // Sorting an unbounded result set
    if sql_upper.contains("ORDER BY") && !sql_upper.contains("LIMIT") {
        cost += 0.1;
    }

    if sql_upper.contains("DISTINCT") {
        cost += 0.1;
    }

    if WINDOW_FUNCTIONS.iter().any(|f| sql_upper.contains(f)) {
        cost += 0.15;
    }

    cost.min(1.0)
}
