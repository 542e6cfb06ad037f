use anyhow::Result;
use clap::Parser;
use queryline::config::Settings;
use queryline::models::ChatRequest;
use queryline::orchestrator::Orchestrator;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "queryline")]
#[command(about = "Ask questions of a database in natural language")]
struct Args {
    /// The question in natural language
    query: String,

    /// User identifier attached to the request
    #[arg(long, default_value = "cli-user")]
    user_id: String,

    /// Maximum rows to return (overrides MAX_QUERY_ROWS)
    #[arg(long)]
    max_rows: Option<usize>,

    /// Skip chart generation
    #[arg(long)]
    no_chart: bool,

    /// Write the generated chart HTML to this path
    #[arg(long)]
    chart_out: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let settings = Settings::from_env()?;
    info!(
        database = %settings.database_path,
        provider = ?settings.llm_provider,
        "Loaded settings"
    );

    let orchestrator = Orchestrator::from_settings(settings)?;

    info!("Testing database connection...");
    if !orchestrator.test_connection().await {
        error!("Database connection test failed");
        anyhow::bail!("could not connect to the database");
    }

    let mut request = ChatRequest::new(args.query, args.user_id);
    request.max_rows = args.max_rows;
    request.include_visualization = !args.no_chart;

    let response = orchestrator.process(request).await;

    println!("\nStatus: {:?}", response.status);
    if let Some(ref sql) = response.sql {
        println!("\nSQL:\n{}", sql.sql);
        if let Some(ref explanation) = sql.explanation {
            println!("\nExplanation: {}", explanation);
        }
    }
    if let Some(ref validation) = response.validation {
        for warning in &validation.warnings {
            println!("Warning: {}", warning);
        }
    }
    if let Some(ref result) = response.result {
        println!(
            "\nRows: {}{} ({} ms)",
            result.row_count,
            if result.truncated { " (truncated)" } else { "" },
            result.execution_time_ms
        );
        println!("Columns: {}", result.columns.join(", "));
        for row in result.rows.iter().take(20) {
            let line: Vec<String> = result
                .columns
                .iter()
                .map(|col| {
                    row.get(col)
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "null".to_string())
                })
                .collect();
            println!("  {}", line.join(" | "));
        }
        if result.row_count > 20 {
            println!("  ... {} more rows", result.row_count - 20);
        }
    }
    if let Some(ref message) = response.error_message {
        println!("\nError: {}", message);
    }
    if let (Some(chart), Some(path)) = (response.chart_html.as_ref(), args.chart_out.as_ref()) {
        std::fs::write(path, chart)?;
        println!("\nChart written to {}", path.display());
    }
    println!("\nTotal time: {} ms", response.execution_time_ms);

    Ok(())
}
