//! Pipeline orchestrator.
//!
//! Sequences schema retrieval, SQL generation, validation, execution and
//! visualization for one request. Each stage gates the next; the first
//! failure terminates the pipeline with a stage-prefixed message. The
//! orchestrator itself never returns an error.

use crate::config::{LlmProviderKind, Settings};
use crate::db::{DatabaseConnector, SqliteConnector};
use crate::error::Result;
use crate::executor::Executor;
use crate::generator::SqlGenerator;
use crate::llm::{AnthropicProvider, LlmProvider, OpenAiProvider};
use crate::models::{ChatRequest, ChatResponse, QueryStatus};
use crate::schema_cache::SchemaCache;
use crate::schema_context::SchemaStage;
use crate::validator::Validator;
use crate::visualization::Visualizer;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn, Instrument};

pub struct Orchestrator {
    settings: Settings,
    connector: Arc<dyn DatabaseConnector>,
    schema_stage: SchemaStage,
    generator: SqlGenerator,
    validator: Validator,
    executor: Executor,
    visualizer: Visualizer,
}

impl Orchestrator {
    /// Wire the pipeline from explicit collaborators. Tests use this with
    /// fakes; production wiring goes through [`Orchestrator::from_settings`].
    pub fn new(
        settings: Settings,
        llm: Arc<dyn LlmProvider>,
        connector: Arc<dyn DatabaseConnector>,
    ) -> Self {
        let schema_stage = SchemaStage::new(Arc::clone(&connector));
        let generator = SqlGenerator::new(Arc::clone(&llm));
        let validator = Validator::new(settings.allow_destructive_queries, settings.max_query_rows);
        let executor = Executor::new(Arc::clone(&connector), settings.query_timeout_seconds);
        let visualizer = Visualizer::new(Arc::clone(&llm), settings.max_chart_points);

        info!("Orchestrator initialized successfully");

        Self {
            settings,
            connector,
            schema_stage,
            generator,
            validator,
            executor,
            visualizer,
        }
    }

    /// Build the configured LLM provider and SQLite connector from
    /// settings.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let api_key = settings.llm_api_key()?;
        let llm: Arc<dyn LlmProvider> = match settings.llm_provider {
            LlmProviderKind::OpenAi => Arc::new(OpenAiProvider::new(
                api_key,
                settings.llm_model.clone(),
                settings.llm_temperature,
                settings.llm_max_tokens,
            )),
            LlmProviderKind::Anthropic => Arc::new(AnthropicProvider::new(
                api_key,
                settings.llm_model.clone(),
                settings.llm_temperature,
                settings.llm_max_tokens,
            )),
        };

        let cache = Arc::new(SchemaCache::new(Some(Duration::from_secs(
            settings.schema_cache_ttl_seconds,
        ))));
        let connector: Arc<dyn DatabaseConnector> = Arc::new(SqliteConnector::new(
            settings.database_path.clone(),
            cache,
            Duration::from_secs(settings.query_timeout_seconds),
        ));

        Ok(Self::new(settings, llm, connector))
    }

    /// Process one request through the pipeline. All failures are folded
    /// into the response; partial results from earlier stages stay
    /// attached so the caller can show what was achieved.
    pub async fn process(&self, request: ChatRequest) -> ChatResponse {
        let start = Instant::now();
        let mut response = ChatResponse::new(&request.user_query);

        let span = info_span!(
            "process_query",
            request_id = %response.query_id,
            user_id = %request.user_id
        );
        self.run_pipeline(&request, &mut response)
            .instrument(span)
            .await;

        response.execution_time_ms = start.elapsed().as_millis() as u64;
        response
    }

    async fn run_pipeline(&self, request: &ChatRequest, response: &mut ChatResponse) {
        info!("Processing query started");

        // Step 1: schema context (cache-preferring)
        info!("Step 1: Getting schema context");
        let schema_context = match self
            .schema_stage
            .schema_context(
                &request.user_query,
                self.settings.database_schema.as_deref(),
                true,
            )
            .await
        {
            Ok(ctx) => ctx,
            Err(e) => {
                response.status = QueryStatus::Failed;
                response.error_message = Some(format!("Failed to get schema: {}", e));
                return;
            }
        };

        // Step 2: generate SQL
        info!("Step 2: Generating SQL");
        let mut sql_query = match self
            .generator
            .generate_sql(&request.user_query, &schema_context)
            .await
        {
            Ok(query) => query,
            Err(e) => {
                response.status = QueryStatus::Failed;
                response.error_message = Some(format!("Failed to generate SQL: {}", e));
                return;
            }
        };
        response.sql = Some(sql_query.clone());

        // Step 3: safety gate
        info!("Step 3: Validating SQL");
        response.status = QueryStatus::Validating;

        let validated = self.validator.validate(&sql_query);
        sql_query.sql = validated.rewritten_sql;
        response.sql = Some(sql_query.clone());
        response.validation = Some(validated.outcome.clone());

        if !validated.outcome.safe_to_execute {
            response.status = QueryStatus::Failed;
            response.error_message = Some(format!(
                "Query failed safety validation: {}",
                validated.outcome.errors.join("; ")
            ));
            return;
        }

        // Step 4: execute
        info!("Step 4: Executing query");
        response.status = QueryStatus::Executing;

        let max_rows = request.max_rows.unwrap_or(self.settings.max_query_rows);
        let result = match self
            .executor
            .execute_query(&sql_query.sql, Some(max_rows))
            .await
        {
            Ok(result) => result,
            Err(e) => {
                response.status = if e.is_timeout() {
                    QueryStatus::Timeout
                } else {
                    QueryStatus::Failed
                };
                response.error_message = Some(format!("Execution failed: {}", e));
                return;
            }
        };
        response.result = Some(result);

        // Step 5: visualization, best effort only
        let row_count = response.result.as_ref().map(|r| r.row_count).unwrap_or(0);
        if request.include_visualization && row_count > 0 {
            info!("Step 5: Generating visualization");
            if let Some(result) = response.result.as_ref() {
                match self
                    .visualizer
                    .generate_visualization(result, &request.user_query)
                    .await
                {
                    Ok(Some(html)) => response.chart_html = Some(html),
                    Ok(None) => {}
                    Err(e) => {
                        warn!(error = %e, "Visualization failed, continuing without chart")
                    }
                }
            }
        }

        response.status = QueryStatus::Success;
        info!(
            status = "success",
            rows_returned = row_count,
            "Query processing completed"
        );
    }

    pub async fn test_connection(&self) -> bool {
        self.connector.test_connection().await
    }

    pub fn clear_cache(&self) {
        self.connector.clear_cache();
        info!("Caches cleared");
    }
}
