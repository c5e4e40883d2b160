use ormkit_connector::DbError;
use ormkit_migration_connector::ConnectorError;
use ormkit_migration_core::CoreError;
use thiserror::Error;

/// Top-level CLI error (spec §6 "Exit code 0 on success, 1 on argument or
/// configuration error, non-zero on any database-side failure propagated
/// out of the engine"), grounded on the teacher's `CliError` /
/// `exit_code()` pairing in `migration-engine/core/src/cli.rs`.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error("no concrete ConnectionPool is wired into this binary; pass one in via the embedding application (spec §1: the wire driver is out of scope)")]
    NoDriver,

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 1,
            CliError::NoDriver => 2,
            CliError::Connector(_) => 3,
            CliError::Core(_) => 4,
            CliError::Database(_) => 5,
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
