use thiserror::Error;

/// Errors surfaced across the `ConnectionPool` boundary (spec §6, §7
/// "Integrity error"). The core never constructs these itself; it only
/// propagates and, at a transaction boundary, triggers rollback on them.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("unique constraint violated on {table}({columns:?})")]
    UniqueViolation { table: String, columns: Vec<String> },

    #[error("foreign key constraint violated on {table}({columns:?})")]
    ForeignKeyViolation { table: String, columns: Vec<String> },

    #[error("connection closed or unavailable")]
    ConnectionClosed,

    #[error("query timed out")]
    Timeout,

    #[error("database error: {0}")]
    Other(String),
}
