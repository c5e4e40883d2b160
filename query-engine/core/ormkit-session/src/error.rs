use ormkit_connector::DbError;
use ormkit_models::SchemaError;
use ormkit_sql_query_connector::{LoadError, QueryError};

/// Top-level session error; composes the lower layers' errors the way the
/// teacher's `ConnectorError`/`CoreError` pair composes `DbError` and
/// schema-resolution failures (spec §7).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("no rows matched a one()/one_or_none() call that required at most one")]
    NotFound,
    #[error("{operation} requires entity {entity:?} to declare exactly one primary key")]
    NoPrimaryKey { entity: String, operation: &'static str },
    #[error("insert called with zero rows")]
    EmptyInsert,
    #[error("relationship {relationship:?} on {entity:?} was never loaded and is not `noload`")]
    LazyLoadMisuse { entity: String, relationship: String },
    #[error("relationship {relationship:?} on {entity:?} is not many-to-many")]
    NotManyToMany { entity: String, relationship: String },
}
