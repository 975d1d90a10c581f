//! Backend connection capability and shared types.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

use crate::config::DatabaseConfig;
use crate::metric::Scalar;

/// Errors raised by backend connections.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Opening the connection failed.
    #[error("connect to '{refname}' failed: {source}")]
    Connect {
        refname: String,
        #[source]
        source: sqlx::Error,
    },

    /// The query or statement failed.
    #[error("query on '{refname}' failed: {source}")]
    Query {
        refname: String,
        #[source]
        source: sqlx::Error,
    },

    /// A scalar query returned no rows.
    #[error("query returned no rows")]
    NoRows,

    /// A scalar query returned NULL.
    #[error("query returned NULL")]
    NullValue,

    /// The result column has a type that cannot become a scalar.
    #[error("unsupported result column type: {0}")]
    UnsupportedType(String),

    /// Connection parameters do not form a valid URL.
    #[error("invalid connection parameters for '{refname}': {reason}")]
    InvalidParams { refname: String, reason: String },

    /// No backend is declared under this reference name.
    #[error("unknown database_ref '{0}'")]
    UnknownRef(String),

    /// Two backends share a reference name.
    #[error("duplicate database refname '{0}'")]
    DuplicateRef(String),
}

/// SQL flavour of a backend.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SqlDialect {
    Mysql,
    #[serde(alias = "postgres")]
    #[strum(to_string = "pgsql", serialize = "postgres")]
    Pgsql,
    Sqlite,
}

impl SqlDialect {
    /// Expression evaluating to the current timestamp.
    pub fn current_timestamp(self) -> &'static str {
        match self {
            Self::Mysql | Self::Sqlite => "CURRENT_TIMESTAMP",
            Self::Pgsql => "now()",
        }
    }

    /// Bind placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Self::Mysql | Self::Sqlite => "?".to_string(),
            Self::Pgsql => format!("${}", index),
        }
    }
}

/// Parameters needed to open a connection.
#[derive(Clone)]
pub struct ConnectionParams {
    pub refname: String,
    pub host: String,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("refname", &self.refname)
            .field("host", &self.host)
            .field("name", &self.name)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl From<&DatabaseConfig> for ConnectionParams {
    fn from(db: &DatabaseConfig) -> Self {
        let db = db.expanded();
        Self {
            refname: db.refname,
            host: db.host,
            name: db.name,
            user: db.user,
            password: db.password,
        }
    }
}

/// Scoped access to a relational store.
///
/// Every call opens its own connection and closes it before returning, also
/// when the statement fails. No connection outlives a call.
#[async_trait::async_trait]
pub trait BackendConnection: Send + Sync {
    /// Reference name sources and sinks use to find this backend.
    fn refname(&self) -> &str;

    /// SQL flavour, used to compose statements.
    fn dialect(&self) -> SqlDialect;

    /// Run a query and return the first column of the first row.
    async fn query_scalar(&self, sql: &str, params: &[Scalar]) -> Result<Scalar, DatabaseError>;

    /// Run a statement and return the number of affected rows.
    async fn execute(&self, sql: &str, params: &[Scalar]) -> Result<u64, DatabaseError>;
}

/// Backends declared in the configuration, keyed by refname.
///
/// Built once at startup and passed to every factory that needs backend access.
#[derive(Clone, Default)]
pub struct DatabaseSet {
    backends: HashMap<String, Arc<dyn BackendConnection>>,
}

impl DatabaseSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its refname.
    pub fn insert(&mut self, backend: Arc<dyn BackendConnection>) -> Result<(), DatabaseError> {
        let refname = backend.refname().to_string();
        if self.backends.contains_key(&refname) {
            return Err(DatabaseError::DuplicateRef(refname));
        }
        self.backends.insert(refname, backend);
        Ok(())
    }

    /// Look up a backend by refname.
    pub fn get(&self, refname: &str) -> Result<Arc<dyn BackendConnection>, DatabaseError> {
        self.backends
            .get(refname)
            .cloned()
            .ok_or_else(|| DatabaseError::UnknownRef(refname.to_string()))
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl std::fmt::Debug for DatabaseSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSet")
            .field("refnames", &self.backends.keys().collect::<Vec<_>>())
            .finish()
    }
}
