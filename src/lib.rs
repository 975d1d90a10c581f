//! Metering Agent - Polling Metrics Library
//!
//! This crate provides the core functionality of a polling metering agent. It
//! can be used as a library by other Rust projects, or run as a standalone
//! binary with the `metering-agent` executable.
//!
//! # Architecture
//!
//! - **Metric**: Scalar values and the derived-value engine (transform modes)
//! - **Collectors**: Metric sources (files, sysfs, procfs, shell commands, SQL queries)
//! - **Publishers**: Sinks (stdout, files, SQL tables)
//! - **Database**: Backend connections opened per call
//! - **Registry**: Type-name resolution with plugin files
//! - **Scheduler**: Conditional sampling intervals
//! - **Agent**: Run-mode orchestration
//!
//! # Example
//!
//! ```rust,no_run
//! use metering_agent::{Agent, AppConfig, TypeRegistry};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load("agent.yaml")?.config;
//!     let mut registry = TypeRegistry::new(".");
//!     let mut agent = Agent::from_config(&config, &mut registry)?;
//!     agent.run().await;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod collector;
pub mod config;
pub mod database;
pub mod metric;
pub mod publisher;
pub mod registry;
pub mod scheduler;

pub use agent::{Agent, AgentError, RunMode};
pub use collector::{Collector, CollectorError, MetricSource};
pub use config::{AgentConfig, AppConfig, ConfigError};
pub use database::{BackendConnection, DatabaseError, DatabaseSet, SqlDialect};
pub use metric::{DataType, Scalar, TransformMode};
pub use publisher::{PublishError, Publisher};
pub use registry::{Category, RegistryError, TypeRegistry};
pub use scheduler::{IntervalRule, IntervalScheduler};
