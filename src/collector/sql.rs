//! Values obtained from scalar SQL queries.

use std::sync::Arc;

use serde::Deserialize;

use crate::collector::traits::parse_params;
use crate::collector::{Collector, CollectorError};
use crate::config::Params;
use crate::database::{BackendConnection, DatabaseSet};
use crate::metric::Scalar;

/// Parameters of [`SqlQueryCollector`].
#[derive(Debug, Clone, Deserialize)]
pub struct SqlQueryParams {
    /// Refname of a declared database.
    pub database_ref: String,
    /// Query whose first column of the first row is the value.
    pub sql: String,
}

/// Runs a scalar query against a declared backend.
pub struct SqlQueryCollector {
    backend: Arc<dyn BackendConnection>,
    sql: String,
}

impl SqlQueryCollector {
    pub const KIND: &'static str = "SqlDerivedData";

    pub fn new(backend: Arc<dyn BackendConnection>, sql: impl Into<String>) -> Self {
        Self {
            backend,
            sql: sql.into(),
        }
    }

    /// Registry constructor.
    pub fn from_params(
        params: &Params,
        databases: &DatabaseSet,
    ) -> Result<Box<dyn Collector>, CollectorError> {
        let p: SqlQueryParams = parse_params(Self::KIND, params)?;
        let backend = databases.get(&p.database_ref)?;
        Ok(Box::new(Self::new(backend, p.sql)))
    }
}

#[async_trait::async_trait]
impl Collector for SqlQueryCollector {
    fn kind(&self) -> &str {
        Self::KIND
    }

    async fn acquire(&self, _elapsed_secs: f64) -> Result<Scalar, CollectorError> {
        tracing::trace!(database = %self.backend.refname(), sql = %self.sql, "Running scalar query");
        Ok(self.backend.query_scalar(&self.sql, &[]).await?)
    }
}
