use std::path::PathBuf;

use rusqlite::Error as SqliteError;
use thiserror::Error;

/// Errors raised by [`crate::SqliteStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path:?}")]
    Open {
        /// Location of the database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Enabling SQLite foreign keys failed.
    #[error("failed to enable SQLite foreign keys")]
    ForeignKeys {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A schema creation step failed.
    #[error("failed to execute schema step '{step}'")]
    Schema {
        /// Step label.
        step: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The database was created by an incompatible schema version.
    #[error(
        "expected ClickBus schema version {expected} but found {found}; recreate the database before retrying"
    )]
    VersionMismatch {
        /// Version this build writes.
        expected: i64,
        /// Version recorded in the database.
        found: i64,
    },
    /// A single statement failed; nothing was written.
    #[error("failed to {operation}")]
    Statement {
        /// Operation label, e.g. `"insert order"`.
        operation: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}

impl StoreError {
    pub(crate) fn statement(operation: &'static str) -> impl FnOnce(SqliteError) -> Self {
        move |source| Self::Statement { operation, source }
    }
}
