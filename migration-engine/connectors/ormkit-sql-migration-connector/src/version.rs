//! Version table persistence (spec §6 "Version table schema"), extended
//! per the expanded spec with a checksum and applied-at timestamp per row
//! so `status`/`history` can report drift without re-parsing a script
//! (teacher: `MigrationRecord` in `migration_persistence.rs`).

use chrono::{DateTime, Utc};
use ormkit_connector::{ConnectionPool, DbError};

/// One applied migration, as recorded in the version table.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationRecord {
    pub revision: String,
    pub checksum: String,
    pub applied_at: DateTime<Utc>,
}

/// Persists applied-migration bookkeeping in a single table, named
/// `version_table` in the migration config (default `alembic_version`,
/// spec §6). Exactly zero or one *current* row per the base spec; the
/// expanded history table keeps every applied revision as an append-only
/// log so `history` can list them all.
pub struct VersionTable<'a> {
    pool: &'a dyn ConnectionPool,
    table_name: String,
}

impl<'a> VersionTable<'a> {
    pub fn new(pool: &'a dyn ConnectionPool, table_name: impl Into<String>) -> Self {
        Self { pool, table_name: table_name.into() }
    }

    pub async fn ensure_exists(&self) -> Result<(), DbError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\
                version_num VARCHAR(32) PRIMARY KEY, \
                checksum VARCHAR(64) NOT NULL, \
                applied_at TIMESTAMP NOT NULL\
            )",
            self.table_name
        );
        self.pool.execute_statement(&sql, vec![]).await?;
        Ok(())
    }

    /// The stored `version_num`, or `None` if the table is empty (spec
    /// §4.E "`current_revision` returns the stored `version_num` or none").
    pub async fn current(&self) -> Result<Option<String>, DbError> {
        let sql = format!("SELECT version_num FROM {} ORDER BY applied_at DESC LIMIT 1", self.table_name);
        let result = self.pool.execute(&sql, vec![]).await?;
        Ok(result.first().and_then(|row| row.get("version_num")).and_then(|v| v.as_str().map(str::to_owned)))
    }

    pub async fn history(&self) -> Result<Vec<MigrationRecord>, DbError> {
        let sql = format!("SELECT version_num, checksum, applied_at FROM {} ORDER BY applied_at ASC", self.table_name);
        let result = self.pool.execute(&sql, vec![]).await?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| {
                let revision = row.get("version_num")?.as_str()?.to_owned();
                let checksum = row.get("checksum")?.as_str()?.to_owned();
                let applied_at = match row.get("applied_at")? {
                    ormkit_value::Value::DateTime(dt) => *dt,
                    ormkit_value::Value::String(s) => DateTime::parse_from_rfc3339(s).ok()?.with_timezone(&Utc),
                    _ => return None,
                };
                Some(MigrationRecord { revision, checksum, applied_at })
            })
            .collect())
    }

    /// Records a migration as applied (spec §4.E "updates the version
    /// table after every success"). One call per successfully executed
    /// revision; `upgrade`/`downgrade` call this once per step so the
    /// history table mirrors the order migrations actually ran in.
    pub async fn record_applied(&self, revision: &str, checksum: &str, applied_at: DateTime<Utc>) -> Result<(), DbError> {
        let dialect = self.pool.dialect();
        let sql = format!(
            "INSERT INTO {} (version_num, checksum, applied_at) VALUES ({}, {}, {})",
            self.table_name,
            dialect.placeholder(1),
            dialect.placeholder(2),
            dialect.placeholder(3)
        );
        self.pool
            .execute_statement(
                &sql,
                vec![
                    ormkit_value::Value::from(revision),
                    ormkit_value::Value::from(checksum),
                    ormkit_value::Value::from(applied_at.to_rfc3339()),
                ],
            )
            .await?;
        Ok(())
    }

    /// Removes the most recently applied row (spec §4.E `downgrade`
    /// rolling back one step at a time).
    pub async fn remove_applied(&self, revision: &str) -> Result<(), DbError> {
        let sql = format!("DELETE FROM {} WHERE version_num = {}", self.table_name, self.pool.dialect().placeholder(1));
        self.pool.execute_statement(&sql, vec![ormkit_value::Value::from(revision)]).await?;
        Ok(())
    }

    /// Sets the table to exactly `revision` without running anything
    /// (spec §4.E "`stamp(rev)` sets the version table without executing
    /// anything").
    pub async fn stamp(&self, revision: &str, checksum: &str, at: DateTime<Utc>) -> Result<(), DbError> {
        self.clear().await?;
        self.record_applied(revision, checksum, at).await
    }

    /// Empties the table, leaving `current()` at `None` (spec §4.E
    /// "after full downgrade, the table is empty").
    pub async fn clear(&self) -> Result<(), DbError> {
        self.pool.execute_statement(&format!("DELETE FROM {}", self.table_name), vec![]).await?;
        Ok(())
    }
}
