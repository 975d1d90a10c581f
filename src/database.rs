//! Database backends.
//!
//! - [`BackendConnection`]: scalar query / statement capability used by
//!   SQL-derived sources and the table sink
//! - [`SqlBackend`]: sqlx implementation for MySQL, PostgreSQL and SQLite
//! - [`DatabaseSet`]: the backends declared in the configuration, by refname
//!
//! # Example
//!
//! ```ignore
//! let backend = SqlBackend::new(SqlDialect::Sqlite, params)?;
//! let value = backend.query_scalar("SELECT COUNT(*) FROM jobs", &[]).await?;
//! ```

mod sql;
mod traits;

pub use sql::SqlBackend;
pub use traits::{BackendConnection, ConnectionParams, DatabaseError, DatabaseSet, SqlDialect};
