//! Core publisher traits and types.

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::collector::MetricSource;
use crate::config::Params;
use crate::database::DatabaseError;

/// Errors that can occur while building a publisher or publishing a metric set.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Writing to stdout or a file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The insert statement failed.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// JSON serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}

impl PublishError {
    /// Wrap a parameter deserialization error.
    pub fn params(kind: &str, err: serde_yaml::Error) -> Self {
        Self::Config(format!("{}: invalid parameters: {}", kind, err))
    }
}

/// Deserialize a publisher's typed parameters.
pub(crate) fn parse_params<T: DeserializeOwned>(kind: &str, params: &Params) -> Result<T, PublishError> {
    params.parse().map_err(|e| PublishError::params(kind, e))
}

/// A sink receiving the full metric set once per publishing pass.
///
/// Publishers hold no state between calls apart from their destination
/// parameters.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    /// Type name, for logs.
    fn kind(&self) -> &str;

    /// Render the current metric set and deliver it.
    async fn publish(&self, sources: &[MetricSource]) -> Result<(), PublishError>;
}

impl std::fmt::Debug for dyn Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher").field("kind", &self.kind()).finish()
    }
}

/// Text rendering of a metric set, for the stdout and file sinks.
pub trait Render: Send + Sync {
    fn render(&self, sources: &[MetricSource]) -> Result<String, PublishError>;
}
