//! Operation IR, migration script model, and migrations-directory
//! management (spec §4.E), shared by every dialect-specific migration
//! connector.

mod directory;
mod error;
mod operation;
mod script;

pub use directory::{
    checksum, create_migration_directory, error_on_changed_provider, list_migrations, write_migration_lock_file, MigrationDirectory,
    MIGRATION_LOCK_FILENAME, MIGRATION_SCRIPT_FILENAME,
};
pub use error::{ConnectorError, ConnectorResult};
pub use operation::{ColumnChange, ColumnDefault, ColumnSpec, ForeignKeySpec, IndexSpec, Operation};
pub use script::MigrationScript;
