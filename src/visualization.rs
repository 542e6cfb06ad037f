//! Chart recommendation and rendering.
//!
//! Best-effort stage: the orchestrator swallows every failure here, so a
//! bad chart never costs the caller their query results.

use crate::error::{ChatError, Result};
use crate::llm::LlmProvider;
use crate::models::{ChartConfig, QueryResult};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.32.0.min.js";

pub struct Visualizer {
    llm: Arc<dyn LlmProvider>,
    max_chart_points: usize,
}

impl Visualizer {
    pub fn new(llm: Arc<dyn LlmProvider>, max_chart_points: usize) -> Self {
        Self {
            llm,
            max_chart_points,
        }
    }

    /// Produce an HTML chart artifact for a result set.
    pub async fn generate_visualization(
        &self,
        query_result: &QueryResult,
        user_query: &str,
    ) -> Result<Option<String>> {
        if query_result.rows.is_empty() {
            info!("No data to visualize");
            return Ok(None);
        }

        let mut result = query_result.clone();
        if result.rows.len() > self.max_chart_points {
            warn!(
                points = result.rows.len(),
                cap = self.max_chart_points,
                "Too many data points, limiting"
            );
            result.rows.truncate(self.max_chart_points);
        }

        let config = self.determine_chart_type(&result, user_query).await;
        let html = render_chart(&result, &config)?;

        info!(
            chart_type = %config.chart_type,
            data_points = result.rows.len(),
            "Visualization generated"
        );

        Ok(Some(html))
    }

    /// Ask the LLM for a chart recommendation; fall back to the fixed
    /// heuristic when it fails.
    async fn determine_chart_type(&self, query_result: &QueryResult, user_query: &str) -> ChartConfig {
        let sample: Vec<_> = query_result.rows.iter().take(5).collect();
        let prompt = format!(
            "Based on the user's query and the data structure, determine the best chart type and configuration.\n\n\
             User Query: {}\n\n\
             Data Structure:\n\
             Columns: {}\n\
             Sample Data: {}\n\n\
             Choose the most appropriate chart type and specify the axes:\n\
             - bar: For comparing categories\n\
             - line: For trends over time or ordered data\n\
             - scatter: For relationships between two numeric variables\n\
             - pie: For showing proportions (only if suitable)\n\
             - table: If data is not suitable for charts\n\n\
             Respond with JSON only.",
            user_query,
            query_result.columns.join(", "),
            serde_json::to_string(&sample).unwrap_or_default()
        );
        let response_format = json!({
            "chart_type": "string (bar, line, scatter, pie, or table)",
            "x_axis": "string (column name for x-axis)",
            "y_axis": "string (column name for y-axis)",
            "title": "string (suggested chart title)",
            "color_column": "string or null (column for color coding)"
        });
        let system_prompt = "You are a data visualization expert. Recommend the best chart type \
                             and configuration for the given data.";

        match self
            .llm
            .generate_structured(&prompt, Some(system_prompt), &response_format)
            .await
            .and_then(|v| {
                serde_json::from_value::<ChartConfig>(v)
                    .map_err(|e| ChatError::Visualization(e.to_string()))
            }) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Failed to determine chart type with LLM, using defaults");
                simple_chart_heuristic(query_result)
            }
        }
    }
}

/// Fixed default: first two columns as x/y on a bar chart, or a table
/// view if fewer than two columns exist.
fn simple_chart_heuristic(query_result: &QueryResult) -> ChartConfig {
    let columns = &query_result.columns;
    if columns.len() >= 2 {
        ChartConfig {
            chart_type: "bar".to_string(),
            x_axis: Some(columns[0].clone()),
            y_axis: Some(columns[1].clone()),
            title: Some("Query Results".to_string()),
            color_column: None,
        }
    } else {
        ChartConfig {
            chart_type: "table".to_string(),
            x_axis: None,
            y_axis: None,
            title: Some("Query Results".to_string()),
            color_column: None,
        }
    }
}

fn column_values(result: &QueryResult, column: &str) -> Vec<serde_json::Value> {
    result
        .rows
        .iter()
        .map(|row| row.get(column).cloned().unwrap_or(serde_json::Value::Null))
        .collect()
}

/// Render a self-contained HTML artifact embedding the data as a Plotly
/// figure (script loaded from the CDN).
fn render_chart(result: &QueryResult, config: &ChartConfig) -> Result<String> {
    let title = config.title.clone().unwrap_or_else(|| "Query Results".to_string());

    let trace = match (config.chart_type.as_str(), &config.x_axis, &config.y_axis) {
        ("bar", Some(x), Some(y)) => json!({
            "type": "bar",
            "x": column_values(result, x),
            "y": column_values(result, y),
        }),
        ("line", Some(x), Some(y)) => json!({
            "type": "scatter",
            "mode": "lines",
            "x": column_values(result, x),
            "y": column_values(result, y),
        }),
        ("scatter", Some(x), Some(y)) => json!({
            "type": "scatter",
            "mode": "markers",
            "x": column_values(result, x),
            "y": column_values(result, y),
        }),
        ("pie", Some(x), Some(y)) => json!({
            "type": "pie",
            "labels": column_values(result, x),
            "values": column_values(result, y),
        }),
        // Table display also covers configs with missing axes
        _ => {
            let cells: Vec<Vec<serde_json::Value>> = result
                .columns
                .iter()
                .map(|col| column_values(result, col))
                .collect();
            json!({
                "type": "table",
                "header": {"values": result.columns},
                "cells": {"values": cells},
            })
        }
    };

    let layout = json!({
        "title": title,
        "template": "plotly_white",
        "height": 500,
        "margin": {"l": 50, "r": 50, "t": 50, "b": 50},
    });

    Ok(format!(
        "<!DOCTYPE html>\n<html>\n<head><script src=\"{}\"></script></head>\n<body>\n\
         <div id=\"chart\"></div>\n<script>\nPlotly.newPlot(\"chart\", [{}], {});\n</script>\n\
         </body>\n</html>",
        PLOTLY_CDN,
        serde_json::to_string(&trace)?,
        serde_json::to_string(&layout)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn result(columns: &[&str], rows: Vec<Vec<serde_json::Value>>) -> QueryResult {
        let rows: Vec<HashMap<String, serde_json::Value>> = rows
            .into_iter()
            .map(|values| {
                columns
                    .iter()
                    .map(|c| c.to_string())
                    .zip(values)
                    .collect()
            })
            .collect();
        QueryResult {
            row_count: rows.len(),
            rows,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            truncated: false,
            execution_time_ms: 0,
        }
    }

    #[test]
    fn heuristic_prefers_bar_with_two_columns() {
        let r = result(
            &["status", "count"],
            vec![vec![json!("open"), json!(3)], vec![json!("closed"), json!(5)]],
        );
        let config = simple_chart_heuristic(&r);
        assert_eq!(config.chart_type, "bar");
        assert_eq!(config.x_axis.as_deref(), Some("status"));
        assert_eq!(config.y_axis.as_deref(), Some("count"));
    }

    #[test]
    fn heuristic_falls_back_to_table_with_one_column() {
        let r = result(&["total"], vec![vec![json!(42)]]);
        let config = simple_chart_heuristic(&r);
        assert_eq!(config.chart_type, "table");
    }

    #[test]
    fn renders_bar_chart_html() {
        let r = result(
            &["status", "count"],
            vec![vec![json!("open"), json!(3)], vec![json!("closed"), json!(5)]],
        );
        let html = render_chart(&r, &simple_chart_heuristic(&r)).unwrap();
        assert!(html.contains(PLOTLY_CDN));
        assert!(html.contains("\"type\":\"bar\""));
        assert!(html.contains("Plotly.newPlot"));
    }

    #[test]
    fn missing_axes_render_as_table() {
        let r = result(&["a", "b"], vec![vec![json!(1), json!(2)]]);
        let config = ChartConfig {
            chart_type: "bar".to_string(),
            x_axis: None,
            y_axis: None,
            title: None,
            color_column: None,
        };
        let html = render_chart(&r, &config).unwrap();
        assert!(html.contains("\"type\":\"table\""));
    }
}
