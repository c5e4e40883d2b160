//! The migration runner (spec §4.E "Runner").

use std::path::{Path, PathBuf};

use chrono::Utc;
use ormkit_connector::ConnectionPool;
use ormkit_migration_connector::checksum;
use ormkit_sql_migration_connector::{MigrationRecord, VersionTable};

use crate::error::{CoreError, CoreResult};
use crate::graph::RevisionGraph;

/// Where `downgrade` should land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DowngradeTarget {
    /// A specific revision, which must already be applied.
    Revision(String),
    /// Roll back the `N` most recently applied migrations (`-N` on the CLI).
    Steps(usize),
    /// Roll back everything.
    Base,
}

/// A snapshot of where the chain stands relative to the version table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub current: Option<String>,
    pub head: Option<String>,
    pub pending: Vec<String>,
}

impl Status {
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Drives a [`RevisionGraph`] against a live database through a
/// [`VersionTable`] (spec §4.E). Holds no state of its own beyond the
/// pool and directory it was built with; every call re-reads the chain
/// and the table, since the runner is expected to outlive individual
/// `up`/`down` invocations in the CLI.
pub struct Runner<'a> {
    pool: &'a dyn ConnectionPool,
    migrations_dir: PathBuf,
    versions: VersionTable<'a>,
}

impl<'a> Runner<'a> {
    pub fn new(pool: &'a dyn ConnectionPool, migrations_dir: impl Into<PathBuf>, table_name: impl Into<String>) -> Self {
        Self { pool, migrations_dir: migrations_dir.into(), versions: VersionTable::new(pool, table_name) }
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    /// Creates the version table if it doesn't already exist. Every
    /// public method on `Runner` calls this first, so callers never need
    /// a separate "init" step before `status`/`current_revision`.
    pub async fn ensure_version_table(&self) -> CoreResult<()> {
        self.versions.ensure_exists().await?;
        Ok(())
    }

    /// The stored `version_num`, or `None` if no migration has run yet
    /// (spec §4.E "`current_revision` returns the stored `version_num`
    /// or none").
    pub async fn current_revision(&self) -> CoreResult<Option<String>> {
        self.ensure_version_table().await?;
        Ok(self.versions.current().await?)
    }

    pub async fn history(&self) -> CoreResult<Vec<MigrationRecord>> {
        self.ensure_version_table().await?;
        Ok(self.versions.history().await?)
    }

    pub async fn status(&self) -> CoreResult<Status> {
        self.ensure_version_table().await?;
        let graph = RevisionGraph::load(&self.migrations_dir)?;
        let current = self.current_revision().await?;
        let from = current.as_deref().and_then(|rev| graph.position(rev)).map(|i| i + 1).unwrap_or(0);
        let pending = graph.iter().skip(from).map(|(_, script)| script.revision.clone()).collect();
        Ok(Status { current, head: graph.head().map(str::to_owned), pending })
    }

    /// Computes pending migrations as `load_migrations() - applied`,
    /// executes each in chain order, and updates the version table after
    /// every success. `target`, if given, must name a revision present in
    /// the chain; `None` means the head (spec §4.E).
    pub async fn upgrade(&self, target: Option<&str>) -> CoreResult<Vec<String>> {
        self.ensure_version_table().await?;
        let graph = RevisionGraph::load(&self.migrations_dir)?;
        if graph.is_empty() {
            return Ok(Vec::new());
        }

        let target_index = match target {
            Some(revision) => graph.position(revision).ok_or_else(|| CoreError::UnknownRevision(revision.to_owned()))?,
            None => graph.len() - 1,
        };

        let current = self.current_revision().await?;
        let start = current.as_deref().and_then(|rev| graph.position(rev)).map(|i| i + 1).unwrap_or(0);

        let mut applied = Vec::new();
        for index in start..=target_index {
            let (_, script) = graph.get(index).expect("index within chain bounds");
            for operation in &script.upgrade {
                for sql in operation.to_sql(self.pool.dialect()) {
                    self.pool.execute_statement(&sql, vec![]).await?;
                }
            }
            let digest = checksum(script)?;
            self.versions.record_applied(&script.revision, &digest, Utc::now()).await?;
            applied.push(script.revision.clone());
        }
        Ok(applied)
    }

    /// Runs `reverse()`-style operations in reverse definition order
    /// (spec §4.E). A script that wasn't fully reversible at authoring
    /// time only undoes what its `downgrade` list actually contains.
    pub async fn downgrade(&self, target: DowngradeTarget) -> CoreResult<Vec<String>> {
        let graph = RevisionGraph::load(&self.migrations_dir)?;
        let current = self.current_revision().await?;
        let Some(current_index) = current.as_deref().and_then(|rev| graph.position(rev)) else {
            return Ok(Vec::new());
        };

        let target_index: Option<usize> = match target {
            DowngradeTarget::Base => None,
            DowngradeTarget::Revision(revision) => {
                let index = graph.position(&revision).ok_or_else(|| CoreError::UnknownRevision(revision.clone()))?;
                if index > current_index {
                    return Err(CoreError::UnknownRevision(revision));
                }
                Some(index)
            }
            DowngradeTarget::Steps(n) => {
                let available = current_index + 1;
                if n > available {
                    return Err(CoreError::InsufficientHistory { requested: n, available });
                }
                current_index.checked_sub(n)
            }
        };

        let mut reverted = Vec::new();
        let mut index = current_index;
        loop {
            if Some(index) == target_index {
                break;
            }
            let (_, script) = graph.get(index).expect("index within chain bounds");
            for operation in &script.downgrade {
                for sql in operation.to_sql(self.pool.dialect()) {
                    self.pool.execute_statement(&sql, vec![]).await?;
                }
            }
            self.versions.remove_applied(&script.revision).await?;
            reverted.push(script.revision.clone());

            if index == 0 {
                break;
            }
            index -= 1;
        }
        Ok(reverted)
    }

    /// Sets the version table without executing anything (spec §4.E
    /// "`stamp(rev)` sets the version table without executing anything").
    /// `None` clears the table entirely.
    pub async fn stamp(&self, revision: Option<&str>) -> CoreResult<()> {
        self.ensure_version_table().await?;
        match revision {
            None => Ok(self.versions.clear().await?),
            Some(revision) => {
                let graph = RevisionGraph::load(&self.migrations_dir)?;
                let (_, script) = graph
                    .get(graph.position(revision).ok_or_else(|| CoreError::UnknownRevision(revision.to_owned()))?)
                    .expect("position returned a valid index");
                let digest = checksum(script)?;
                self.versions.stamp(&script.revision.clone(), &digest, Utc::now()).await?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ormkit_connector::{Dialect, DbError, QueryResult, Row, Transaction};
    use ormkit_migration_connector::{create_migration_directory, ColumnSpec, MigrationScript, Operation};
    use ormkit_models::ColumnType;
    use ormkit_schema_describer::{Column, ForeignKey, Index, PrimaryKey};
    use ormkit_value::Value;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakePool {
        executed: Mutex<Vec<String>>,
        version_rows: Mutex<Vec<Row>>,
    }

    #[async_trait]
    impl ConnectionPool for FakePool {
        async fn execute(&self, sql: &str, _params: Vec<Value>) -> Result<QueryResult, DbError> {
            if !sql.starts_with("SELECT") {
                return Ok(QueryResult::default());
            }
            let rows = self.version_rows.lock().unwrap().clone();
            if sql.contains("LIMIT 1") {
                // mimics `ORDER BY applied_at DESC LIMIT 1`: most recently inserted wins
                Ok(QueryResult::new(rows.last().cloned().into_iter().collect()))
            } else {
                Ok(QueryResult::new(rows))
            }
        }

        async fn execute_statement(&self, sql: &str, params: Vec<Value>) -> Result<u64, DbError> {
            if sql.starts_with("CREATE TABLE IF NOT EXISTS") {
                // version-table bootstrap, not a migration operation
            } else if sql.starts_with("INSERT") {
                self.version_rows.lock().unwrap().push(Row(vec![
                    ("version_num".into(), params[0].clone()),
                    ("checksum".into(), params[1].clone()),
                    ("applied_at".into(), params[2].clone()),
                ]));
            } else if sql.starts_with("DELETE FROM") && !sql.contains("WHERE") {
                self.version_rows.lock().unwrap().clear();
            } else if sql.starts_with("DELETE FROM") {
                let revision = match &params[0] {
                    Value::String(s) => s.clone(),
                    _ => String::new(),
                };
                self.version_rows.lock().unwrap().retain(|row| row.get("version_num") != Some(&Value::String(revision.clone())));
            } else {
                self.executed.lock().unwrap().push(sql.to_owned());
            }
            Ok(1)
        }

        async fn begin(&self) -> Result<Box<dyn Transaction>, DbError> {
            unimplemented!()
        }

        fn dialect(&self) -> Dialect {
            Dialect::Sqlite
        }

        async fn close(&self) -> Result<(), DbError> {
            Ok(())
        }

        async fn get_tables(&self) -> Result<Vec<String>, DbError> {
            Ok(vec![])
        }

        async fn get_columns(&self, _table: &str) -> Result<Vec<Column>, DbError> {
            Ok(vec![])
        }

        async fn get_indexes(&self, _table: &str) -> Result<Vec<Index>, DbError> {
            Ok(vec![])
        }

        async fn get_constraints(&self, _table: &str) -> Result<(Option<PrimaryKey>, Vec<ForeignKey>), DbError> {
            Ok((None, vec![]))
        }
    }

    fn now() -> chrono::DateTime<Utc> {
        chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn write_two_step_chain(dir: &Path) {
        let a = create_migration_directory(dir, "init").unwrap();
        let mut script_a = MigrationScript::new("a", None, "init", now());
        script_a.push(Operation::CreateTable {
            table: "t".into(),
            columns: vec![ColumnSpec::new("id", ColumnType::Int).primary_key(), ColumnSpec::new("name", ColumnType::Text)],
        });
        a.write_script(&script_a).unwrap();

        let b = create_migration_directory(dir, "add_age").unwrap();
        let mut script_b = MigrationScript::new("b", Some("a".to_owned()), "add age", now());
        script_b.push(Operation::AddColumn { table: "t".into(), column: ColumnSpec::new("age", ColumnType::Int).nullable() });
        b.write_script(&script_b).unwrap();
    }

    #[tokio::test]
    async fn upgrade_to_head_then_downgrade_to_base_round_trips() {
        let dir = tempdir().unwrap();
        write_two_step_chain(dir.path());
        let pool = FakePool::default();
        let runner = Runner::new(&pool, dir.path(), "alembic_version");

        let applied = runner.upgrade(None).await.unwrap();
        assert_eq!(applied, vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(runner.current_revision().await.unwrap(), Some("b".to_owned()));

        let reverted = runner.downgrade(DowngradeTarget::Steps(1)).await.unwrap();
        assert_eq!(reverted, vec!["b".to_owned()]);
        assert_eq!(runner.current_revision().await.unwrap(), Some("a".to_owned()));

        let reverted = runner.downgrade(DowngradeTarget::Steps(1)).await.unwrap();
        assert_eq!(reverted, vec!["a".to_owned()]);
        assert_eq!(runner.current_revision().await.unwrap(), None);
    }

    #[tokio::test]
    async fn upgrade_is_idempotent_once_at_head() {
        let dir = tempdir().unwrap();
        write_two_step_chain(dir.path());
        let pool = FakePool::default();
        let runner = Runner::new(&pool, dir.path(), "alembic_version");

        runner.upgrade(None).await.unwrap();
        let applied_again = runner.upgrade(None).await.unwrap();
        assert!(applied_again.is_empty());
    }

    #[tokio::test]
    async fn status_reports_pending_migrations() {
        let dir = tempdir().unwrap();
        write_two_step_chain(dir.path());
        let pool = FakePool::default();
        let runner = Runner::new(&pool, dir.path(), "alembic_version");
        runner.ensure_version_table().await.unwrap();

        let status = runner.status().await.unwrap();
        assert_eq!(status.pending, vec!["a".to_owned(), "b".to_owned()]);
        assert!(!status.is_up_to_date());

        runner.upgrade(None).await.unwrap();
        let status = runner.status().await.unwrap();
        assert!(status.is_up_to_date());
        assert_eq!(status.current, Some("b".to_owned()));
    }

    #[tokio::test]
    async fn downgrading_more_steps_than_applied_is_rejected() {
        let dir = tempdir().unwrap();
        write_two_step_chain(dir.path());
        let pool = FakePool::default();
        let runner = Runner::new(&pool, dir.path(), "alembic_version");
        runner.upgrade(Some("a")).await.unwrap();

        assert!(matches!(runner.downgrade(DowngradeTarget::Steps(2)).await, Err(CoreError::InsufficientHistory { .. })));
    }

    #[tokio::test]
    async fn stamp_sets_the_version_table_without_running_anything() {
        let dir = tempdir().unwrap();
        write_two_step_chain(dir.path());
        let pool = FakePool::default();
        let runner = Runner::new(&pool, dir.path(), "alembic_version");

        runner.stamp(Some("b")).await.unwrap();
        assert_eq!(runner.current_revision().await.unwrap(), Some("b".to_owned()));
        assert!(pool.executed.lock().unwrap().is_empty());
    }
}
