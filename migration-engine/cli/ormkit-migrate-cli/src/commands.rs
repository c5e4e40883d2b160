//! One function per CLI subcommand (spec §6 "CLI surface": `init`,
//! `create`, `auto`, `up`, `down`, `status`, `history`). Kept separate
//! from argument parsing so each is independently testable against a
//! fixture `ConnectionPool`, per the teacher's `commands/*.rs` layout.

use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::instrument;

use ormkit_connector::{ConnectionPool, Dialect};
use ormkit_migration_connector::{create_migration_directory, write_migration_lock_file, MigrationScript};
use ormkit_migration_core::{CoreResult, DowngradeTarget, Runner, Status};
use ormkit_sql_migration_connector::{introspect, MigrationRecord};

use crate::autogen;
use crate::error::CliResult;
use crate::manifest;

fn revision_id(message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(Utc::now().to_rfc3339().as_bytes());
    hasher.update(message.as_bytes());
    format!("{:x}", hasher.finalize())[..12].to_owned()
}

/// Creates the migrations directory and records the target dialect
/// (spec §2 "a `migration_lock` file... records which dialect the
/// migration chain targets").
#[instrument(skip_all, fields(dir = %migrations_dir.display()))]
pub fn init(migrations_dir: &Path, dialect: Dialect) -> CliResult<()> {
    std::fs::create_dir_all(migrations_dir).map_err(|e| ormkit_migration_connector::ConnectorError::Io {
        path: migrations_dir.display().to_string(),
        source: e,
    })?;
    write_migration_lock_file(migrations_dir, dialect)?;
    Ok(())
}

/// Scaffolds an empty migration against the current head (spec §4.E
/// "Script model"). The caller fills in operations afterward; `auto`
/// is the autogenerated counterpart.
#[instrument(skip_all, fields(dir = %migrations_dir.display()))]
pub fn create(migrations_dir: &Path, message: &str, slug: &str) -> CliResult<PathBuf> {
    let head = ormkit_migration_core::RevisionGraph::load(migrations_dir)?.head().map(str::to_owned);
    let dir = create_migration_directory(migrations_dir, slug)?;
    let script = MigrationScript::new(revision_id(message), head, message, Utc::now());
    dir.write_script(&script)?;
    Ok(dir.path().to_path_buf())
}

/// Diffs a `--models` manifest against the live schema and writes the
/// resulting migration (spec §4.E "Autogen").
#[instrument(skip(pool))]
pub async fn auto(pool: &dyn ConnectionPool, migrations_dir: &Path, models_path: &Path, message: &str, slug: &str) -> CliResult<PathBuf> {
    let entities = manifest::load(models_path)?;
    let live = introspect(pool).await?;
    let operations = autogen::diff(&entities, &live);

    let head = ormkit_migration_core::RevisionGraph::load(migrations_dir)?.head().map(str::to_owned);
    let dir = create_migration_directory(migrations_dir, slug)?;
    let mut script = MigrationScript::new(revision_id(message), head, message, Utc::now());
    for operation in operations {
        script.push(operation);
    }
    dir.write_script(&script)?;
    Ok(dir.path().to_path_buf())
}

#[instrument(skip(pool))]
pub async fn up(pool: &dyn ConnectionPool, migrations_dir: &Path, table: &str, target: Option<&str>) -> CoreResult<Vec<String>> {
    Runner::new(pool, migrations_dir, table).upgrade(target).await
}

#[instrument(skip(pool))]
pub async fn down(pool: &dyn ConnectionPool, migrations_dir: &Path, table: &str, target: DowngradeTarget) -> CoreResult<Vec<String>> {
    Runner::new(pool, migrations_dir, table).downgrade(target).await
}

#[instrument(skip(pool))]
pub async fn status(pool: &dyn ConnectionPool, migrations_dir: &Path, table: &str) -> CoreResult<Status> {
    Runner::new(pool, migrations_dir, table).status().await
}

#[instrument(skip(pool))]
pub async fn history(pool: &dyn ConnectionPool, migrations_dir: &Path, table: &str) -> CoreResult<Vec<MigrationRecord>> {
    Runner::new(pool, migrations_dir, table).history().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormkit_connector::Dialect;
    use tempfile::tempdir;

    #[test]
    fn init_writes_the_lock_file() {
        let dir = tempdir().unwrap();
        let migrations_dir = dir.path().join("migrations");
        init(&migrations_dir, Dialect::Postgres).unwrap();
        assert!(migrations_dir.join(ormkit_migration_connector::MIGRATION_LOCK_FILENAME).exists());
    }

    #[test]
    fn create_scaffolds_an_empty_migration_against_the_current_head() {
        let dir = tempdir().unwrap();
        let migrations_dir = dir.path().join("migrations");
        init(&migrations_dir, Dialect::Sqlite).unwrap();

        let first = create(&migrations_dir, "init", "init").unwrap();
        let script = ormkit_migration_connector::MigrationDirectory::new(first).read_script().unwrap();
        assert_eq!(script.down_revision, None);

        let second = create(&migrations_dir, "add age", "add_age").unwrap();
        let script2 = ormkit_migration_connector::MigrationDirectory::new(second).read_script().unwrap();
        assert_eq!(script2.down_revision, Some(script.revision));
    }
}
