//! Core collector traits and types.

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::Params;
use crate::database::DatabaseError;
use crate::metric::{DataType, DeriveError, Scalar, TransformMode};

/// Errors that can occur while building a collector or acquiring a sample.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Reading a file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A system command could not run or exited unsuccessfully.
    #[error("command `{command}` failed: {reason}")]
    Command { command: String, reason: String },

    /// Scalar query failed.
    #[error("query failed: {0}")]
    Database(#[from] DatabaseError),

    /// The acquired content does not contain the expected value.
    #[error("parse error: {0}")]
    Parse(String),

    /// The raw value cannot be transformed.
    #[error("derive error: {0}")]
    Derive(#[from] DeriveError),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}

impl CollectorError {
    /// Wrap a parameter deserialization error.
    pub fn params(kind: &str, err: serde_yaml::Error) -> Self {
        Self::Config(format!("{}: invalid parameters: {}", kind, err))
    }
}

/// Deserialize a collector's typed parameters.
pub(crate) fn parse_params<T: DeserializeOwned>(kind: &str, params: &Params) -> Result<T, CollectorError> {
    params.parse().map_err(|e| CollectorError::params(kind, e))
}

/// Acquisition step of a metric source.
///
/// Implementations only fetch a fresh raw value; the transform mode, the
/// previous-sample memory and type coercion live in
/// [`MetricSource`](super::MetricSource).
///
/// # Error Handling
///
/// An `Err` from [`acquire`](Collector::acquire) makes the source report an
/// undefined value for the current cycle only. The next cycle calls
/// `acquire` again.
#[async_trait::async_trait]
pub trait Collector: Send + Sync {
    /// Type name, for logs.
    fn kind(&self) -> &str;

    /// Transform mode this type always uses, overriding the configured one.
    fn forced_mode(&self) -> Option<TransformMode> {
        None
    }

    /// Obtain one raw sample. `elapsed_secs` is the time since the previous
    /// sampling pass (0 on the first).
    async fn acquire(&self, elapsed_secs: f64) -> Result<Scalar, CollectorError>;

    /// Human-readable rendering of a defined derived value.
    ///
    /// `None` falls back to the value coerced to `data_type`.
    fn render(&self, _derived: &Scalar, _data_type: DataType) -> Option<String> {
        None
    }
}

impl std::fmt::Debug for dyn Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector").field("kind", &self.kind()).finish()
    }
}
