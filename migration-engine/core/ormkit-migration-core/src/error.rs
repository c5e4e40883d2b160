use ormkit_connector::DbError;
use ormkit_migration_connector::ConnectorError;
use thiserror::Error;

/// Errors raised by the revision graph and the [`crate::Runner`] (spec
/// §4.E "Failure semantics").
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    Database(#[from] DbError),

    /// A script's `down_revision` chain is missing its parent. Caught at
    /// load time, before anything runs (spec §4.E).
    #[error("migration {revision} declares down_revision {down_revision:?}, which is not present in the migrations directory")]
    BrokenChain { revision: String, down_revision: String },

    #[error("multiple migrations declare no down_revision: {0:?}")]
    MultipleHeads(Vec<String>),

    #[error("multiple migrations declare down_revision {down_revision}: {revisions:?}")]
    AmbiguousChain { down_revision: String, revisions: Vec<String> },

    #[error("revision `{0}` was not found in the migrations directory")]
    UnknownRevision(String),

    #[error("cannot roll back {requested} step(s); only {available} migration(s) are applied")]
    InsufficientHistory { requested: usize, available: usize },
}

pub type CoreResult<T> = Result<T, CoreError>;
