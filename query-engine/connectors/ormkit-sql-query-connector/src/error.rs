use ormkit_connector::DbError;
use ormkit_models::SchemaError;
use ormkit_value::ConversionError;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("expected {expected} row(s), got {actual}")]
    RowCount { expected: &'static str, actual: usize },
}

impl From<ormkit_connector::RowCountError> for QueryError {
    fn from(e: ormkit_connector::RowCountError) -> Self {
        QueryError::RowCount { expected: e.expected, actual: e.actual }
    }
}

/// Errors raised while prefetching relationships (spec §4.C).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("relationship {relationship:?} on {entity:?} is configured `raise` and was not prefetched")]
    LazyLoadRaised { entity: String, relationship: String },
    #[error("unknown relationship {relationship:?} on {entity:?}")]
    UnknownRelationship { entity: String, relationship: String },
}
