//! Relational table sink.

use std::sync::Arc;

use serde::Deserialize;

use crate::collector::MetricSource;
use crate::config::{Params, is_sql_identifier};
use crate::database::{BackendConnection, DatabaseSet, SqlDialect};
use crate::metric::Scalar;
use crate::publisher::traits::parse_params;
use crate::publisher::{PublishError, Publisher};

/// Parameters of [`SqlTablePublisher`].
#[derive(Debug, Clone, Deserialize)]
pub struct SqlTableParams {
    pub database_ref: String,
    pub tablename: String,
    pub timestampname: String,
}

/// Inserts one row per publish: the backend's current timestamp plus one
/// column per keyed source with a defined value.
pub struct SqlTablePublisher {
    backend: Arc<dyn BackendConnection>,
    table: String,
    timestamp_column: String,
}

impl SqlTablePublisher {
    pub const KIND: &'static str = "SqlDatabase";

    /// Create a publisher; table and column names must be plain identifiers.
    pub fn new(
        backend: Arc<dyn BackendConnection>,
        table: impl Into<String>,
        timestamp_column: impl Into<String>,
    ) -> Result<Self, PublishError> {
        let table = table.into();
        let timestamp_column = timestamp_column.into();
        for ident in [&table, &timestamp_column] {
            if !is_sql_identifier(ident) {
                return Err(PublishError::Config(format!(
                    "{}: '{}' is not a valid SQL identifier",
                    Self::KIND,
                    ident
                )));
            }
        }
        Ok(Self {
            backend,
            table,
            timestamp_column,
        })
    }

    /// Registry constructor.
    pub fn from_params(
        params: &Params,
        databases: &DatabaseSet,
    ) -> Result<Box<dyn Publisher>, PublishError> {
        let p: SqlTableParams = parse_params(Self::KIND, params)?;
        let backend = databases.get(&p.database_ref)?;
        Ok(Box::new(Self::new(backend, p.tablename, p.timestampname)?))
    }

    /// Compose the parameterized insert for `sources`.
    pub fn build_insert(&self, dialect: SqlDialect, sources: &[MetricSource]) -> (String, Vec<Scalar>) {
        let mut columns = vec![self.timestamp_column.clone()];
        let mut values = Vec::new();

        for (shortname, value) in sources.iter().filter_map(MetricSource::keyed_value) {
            if !is_sql_identifier(shortname) {
                tracing::warn!(table = %self.table, shortname, "Skipping metric: shortname is not a valid column name");
                continue;
            }
            columns.push(shortname.to_string());
            values.push(value);
        }

        let placeholders: Vec<String> = (1..=values.len()).map(|i| dialect.placeholder(i)).collect();
        let mut row = vec![dialect.current_timestamp().to_string()];
        row.extend(placeholders);

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            row.join(", ")
        );
        (sql, values)
    }
}

#[async_trait::async_trait]
impl Publisher for SqlTablePublisher {
    fn kind(&self) -> &str {
        Self::KIND
    }

    async fn publish(&self, sources: &[MetricSource]) -> Result<(), PublishError> {
        let (sql, values) = self.build_insert(self.backend.dialect(), sources);
        let rows = self.backend.execute(&sql, &values).await?;
        tracing::debug!(database = %self.backend.refname(), table = %self.table, columns = values.len(), rows, "Inserted metrics row");
        Ok(())
    }
}
