use std::io;

use thiserror::Error;

/// Errors surfaced while managing the migrations directory or validating
/// script metadata (spec §7 "Migration errors"). Database-side failures
/// raised while *running* a migration belong to the runner
/// (`ormkit-migration-core::CoreError`), not here.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("io error at {path}: {source}")]
    Io { path: String, #[source] source: io::Error },

    #[error("migration script at {path} has no `revision`")]
    MissingRevision { path: String },

    #[error("migration {revision} declares down_revision {down_revision:?}, which is not present in the migrations directory")]
    BrokenChain { revision: String, down_revision: String },

    #[error("migration script at {path} failed checksum verification: recorded {recorded}, on-disk {actual}")]
    ChecksumMismatch { path: String, recorded: String, actual: String },

    #[error("migrations directory targets provider `{locked}`, but the active pool is `{actual}`")]
    ProviderMismatch { locked: String, actual: String },

    #[error("a migration directory already exists at {path}")]
    DirectoryExists { path: String },

    #[error("malformed migration script at {path}: {reason}")]
    MalformedScript { path: String, reason: String },
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;
