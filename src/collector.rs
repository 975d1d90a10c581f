//! Collector Layer
//!
//! Metric sources and the acquisition strategies behind them. A source owns a
//! boxed [`Collector`] and applies its transform mode to each fresh sample.
//!
//! # Architecture
//!
//! - [`Collector`]: Core trait for fetching one raw sample
//! - [`MetricSource`]: Named, typed source with derived-value state
//! - Built-in collectors: file, sysfs, procfs, shell command and SQL query
//! - [`PluginCollector`]: Collector described by a plugin file
//!
//! # Example
//!
//! ```rust,no_run
//! use metering_agent::collector::{MetricSource, ReadFileCollector};
//! use metering_agent::metric::{DataType, TransformMode};
//!
//! # async fn demo() {
//! let mut source = MetricSource::new(
//!     "Entropy",
//!     "entropy",
//!     DataType::Int,
//!     TransformMode::Passthrough,
//!     Box::new(ReadFileCollector::new("/proc/sys/kernel/random/entropy_avail")),
//! );
//! let value = source.sample(0.0).await;
//! # }
//! ```

pub mod command;
pub mod file;
pub mod plugin;
pub mod procfs;
mod source;
pub mod sql;
pub mod sys;
mod traits;

pub use command::CommandCollector;
pub use file::ReadFileCollector;
pub use plugin::{CollectorDefinition, PluginCollector};
pub use procfs::{LoadCollector, MemoryCollector};
pub use source::{MetricSource, NOT_AVAILABLE};
pub use sql::SqlQueryCollector;
pub use sys::{BandwidthCollector, PacketsCollector};
pub use traits::{Collector, CollectorError};

#[cfg(test)]
pub(crate) use source::tests::ScriptedCollector;
