//! Configuration module for the metering agent.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Database backends (type, refname, connection parameters)
//! - The sampling loop (baseline interval, run mode, conditional intervals)
//! - Inputs (metric sources) and outputs (publisher sinks)

mod app;
mod params;
mod validation;

pub use app::{
    AgentConfig, AgentSpec, AppConfig, CollectorConfig, CondIntervalConfig, DatabaseConfig,
    InputConfig, OutputConfig,
};
pub use params::Params;
pub use validation::{ConfigError, expand_env_vars, fill_placeholders, is_sql_identifier};

// Re-export constants
pub use app::{DATABASE_REF_KEY, DEFAULT_INTERVAL_SECS, DEFAULT_RULE_PRIORITY};
