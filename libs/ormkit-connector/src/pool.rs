use async_trait::async_trait;
use ormkit_schema_describer::{Column, ForeignKey, Index, PrimaryKey};
use ormkit_value::Value;

use crate::dialect::Dialect;
use crate::error::DbError;
use crate::result::QueryResult;

/// The narrow capability the core consumes from the concrete wire driver
/// (spec §6). The core never assumes a particular wire library; connection
/// opening and protocol framing live entirely on the other side of this
/// trait.
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<QueryResult, DbError>;

    /// Fire-and-forget form: runs a statement, returns only the row count.
    async fn execute_statement(&self, sql: &str, params: Vec<Value>) -> Result<u64, DbError>;

    async fn begin(&self) -> Result<Box<dyn Transaction>, DbError>;

    fn dialect(&self) -> Dialect;

    fn is_postgres(&self) -> bool {
        self.dialect().is_postgres()
    }

    async fn close(&self) -> Result<(), DbError>;

    async fn get_tables(&self) -> Result<Vec<String>, DbError>;
    async fn get_columns(&self, table: &str) -> Result<Vec<Column>, DbError>;
    async fn get_indexes(&self, table: &str) -> Result<Vec<Index>, DbError>;
    async fn get_constraints(&self, table: &str) -> Result<(Option<PrimaryKey>, Vec<ForeignKey>), DbError>;
}

/// An open transaction. Scope auto-commits on clean exit and rolls back on
/// an error path at the call site (spec §4.D, §5 "Cancellation and
/// timeouts"); because Rust has no implicit scope-exit hook across `?`,
/// callers must explicitly `commit` or `rollback` — the session wraps this
/// to restore the auto-rollback-on-error ergonomics (see `ormkit-session::Transaction`).
#[async_trait]
pub trait Transaction: Send + Sync {
    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<QueryResult, DbError>;
    async fn execute_statement(&self, sql: &str, params: Vec<Value>) -> Result<u64, DbError>;
    async fn commit(self: Box<Self>) -> Result<(), DbError>;
    async fn rollback(self: Box<Self>) -> Result<(), DbError>;
}
