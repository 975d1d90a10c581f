//! SQL backend implementation using sqlx.
//!
//! One implementation serves MySQL, PostgreSQL and SQLite through sqlx's
//! `Any` driver; the [`SqlDialect`] decides the URL scheme, the timestamp
//! expression and the placeholder style.

use sqlx::any::{AnyArguments, AnyRow, install_default_drivers};
use sqlx::query::Query;
use sqlx::{Any, AnyConnection, Connection, Row, TypeInfo, ValueRef};
use url::Url;

use super::traits::{BackendConnection, ConnectionParams, DatabaseError, SqlDialect};
use crate::metric::Scalar;

/// Default host when none is configured.
const DEFAULT_HOST: &str = "localhost";

/// Backend that opens a fresh sqlx connection for every call.
pub struct SqlBackend {
    params: ConnectionParams,
    dialect: SqlDialect,
    url: String,
}

impl std::fmt::Debug for SqlBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlBackend")
            .field("refname", &self.params.refname)
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

impl SqlBackend {
    /// Create a backend. No connection is opened here.
    ///
    /// # Errors
    /// Returns `DatabaseError::InvalidParams` if the parameters do not form a
    /// valid connection URL.
    pub fn new(dialect: SqlDialect, params: ConnectionParams) -> Result<Self, DatabaseError> {
        let url = connection_url(dialect, &params)?;
        Ok(Self {
            params,
            dialect,
            url,
        })
    }

    async fn connect(&self) -> Result<AnyConnection, DatabaseError> {
        install_default_drivers();
        tracing::trace!(refname = %self.params.refname, "Opening database connection");
        AnyConnection::connect(&self.url)
            .await
            .map_err(|source| DatabaseError::Connect {
                refname: self.params.refname.clone(),
                source,
            })
    }

    async fn disconnect(&self, conn: AnyConnection) {
        if let Err(e) = conn.close().await {
            tracing::warn!(refname = %self.params.refname, error = %e, "Failed to close database connection");
        }
    }

    fn query_error(&self, source: sqlx::Error) -> DatabaseError {
        DatabaseError::Query {
            refname: self.params.refname.clone(),
            source,
        }
    }
}

#[async_trait::async_trait]
impl BackendConnection for SqlBackend {
    fn refname(&self) -> &str {
        &self.params.refname
    }

    fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    async fn query_scalar(&self, sql: &str, params: &[Scalar]) -> Result<Scalar, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = bind_params(sqlx::query(sql), params)
            .fetch_optional(&mut conn)
            .await;
        self.disconnect(conn).await;

        let row = result
            .map_err(|e| self.query_error(e))?
            .ok_or(DatabaseError::NoRows)?;
        scalar_from_row(&row)
    }

    async fn execute(&self, sql: &str, params: &[Scalar]) -> Result<u64, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = bind_params(sqlx::query(sql), params)
            .execute(&mut conn)
            .await;
        self.disconnect(conn).await;

        Ok(result.map_err(|e| self.query_error(e))?.rows_affected())
    }
}

fn connection_url(dialect: SqlDialect, params: &ConnectionParams) -> Result<String, DatabaseError> {
    let invalid = |reason: &str| DatabaseError::InvalidParams {
        refname: params.refname.clone(),
        reason: reason.to_string(),
    };

    let scheme = match dialect {
        SqlDialect::Sqlite => {
            return Ok(if params.name == ":memory:" {
                "sqlite::memory:".to_string()
            } else {
                format!("sqlite://{}?mode=rwc", params.name)
            });
        }
        SqlDialect::Mysql => "mysql",
        SqlDialect::Pgsql => "postgres",
    };

    let host = if params.host.is_empty() {
        DEFAULT_HOST
    } else {
        params.host.as_str()
    };
    let mut url =
        Url::parse(&format!("{}://{}", scheme, host)).map_err(|e| invalid(&e.to_string()))?;
    if !params.user.is_empty() {
        url.set_username(&params.user)
            .map_err(|_| invalid("cannot set user name"))?;
    }
    if !params.password.is_empty() {
        url.set_password(Some(&params.password))
            .map_err(|_| invalid("cannot set password"))?;
    }
    url.set_path(&format!("/{}", params.name));

    Ok(url.into())
}

fn bind_params<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    params: &[Scalar],
) -> Query<'q, Any, AnyArguments<'q>> {
    for param in params {
        query = match param {
            Scalar::Int(v) => query.bind(*v),
            Scalar::Float(v) => query.bind(*v),
            Scalar::Text(s) => query.bind(s.clone()),
        };
    }
    query
}

fn scalar_from_row(row: &AnyRow) -> Result<Scalar, DatabaseError> {
    let raw = row
        .try_get_raw(0)
        .map_err(|e| DatabaseError::UnsupportedType(e.to_string()))?;
    if raw.is_null() {
        return Err(DatabaseError::NullValue);
    }
    let type_name = raw.type_info().name().to_string();

    if let Ok(v) = row.try_get::<i64, _>(0) {
        return Ok(Scalar::Int(v));
    }
    if let Ok(v) = row.try_get::<f64, _>(0) {
        return Ok(Scalar::Float(v));
    }
    if let Ok(v) = row.try_get::<String, _>(0) {
        return Ok(Scalar::raw_text(&v));
    }
    if let Ok(v) = row.try_get::<bool, _>(0) {
        return Ok(Scalar::Int(i64::from(v)));
    }

    Err(DatabaseError::UnsupportedType(type_name))
}
