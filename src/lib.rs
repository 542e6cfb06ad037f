pub mod config;
pub mod cost;
pub mod db;
pub mod error;
pub mod executor;
pub mod generator;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod schema_cache;
pub mod schema_context;
pub mod security;
pub mod validator;
pub mod visualization;
