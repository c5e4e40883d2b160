use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use ormkit_connector::{ConnectionPool, Dialect, Transaction};
use ormkit_models::{LazyPolicy, Record, RelationshipValue, Registry, ResolvedEntity};
use ormkit_sql_query_connector::{access_relationship, build_delete, build_insert, build_select, build_update, Delete, Filter, Insert, Select, SoftDeleteMode, Update, Upsert};
use ormkit_value::Value;
use tracing::instrument;

use crate::error::SessionError;
use crate::identity_map::IdentityMap;
use crate::query::Query;

/// The unit-of-work session: identity map, pending insert/delete queues,
/// and the query facade, over one [`ConnectionPool`] (spec §4.D). One
/// session per task (spec §5 "Ordering guarantees") — `Session` is not
/// `Sync`-safe for concurrent mutation by design, matching the source.
pub struct Session {
    pool: Arc<dyn ConnectionPool>,
    registry: Arc<Registry>,
    identity_map: IdentityMap,
    pending_new: Mutex<HashMap<String, Vec<Record>>>,
    pending_delete: Mutex<Vec<(String, Value)>>,
    txn: Mutex<Option<Box<dyn Transaction>>>,
    autoflush: bool,
}

impl Session {
    pub fn new(pool: Arc<dyn ConnectionPool>, registry: Arc<Registry>, autoflush: bool) -> Self {
        Self {
            pool,
            registry,
            identity_map: IdentityMap::new(),
            pending_new: Mutex::new(HashMap::new()),
            pending_delete: Mutex::new(Vec::new()),
            txn: Mutex::new(None),
            autoflush,
        }
    }

    pub(crate) fn pool(&self) -> &dyn ConnectionPool {
        &*self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.pool.dialect()
    }

    pub(crate) fn resolve(&self, entity: &str) -> Result<Arc<ResolvedEntity>, SessionError> {
        Ok(self.registry.resolve(entity)?)
    }

    pub fn query(&self, entity: impl Into<String>) -> Query<'_> {
        Query::new(self, entity)
    }

    /// Routes through the active transaction, if one is open, else the
    /// pool directly. A `std::sync::MutexGuard` is never held across an
    /// `.await` here: the transaction is taken out, used, then restored.
    pub(crate) async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<ormkit_connector::QueryResult, ormkit_connector::DbError> {
        match self.txn.lock().unwrap().take() {
            Some(txn) => {
                let result = txn.execute(sql, params).await;
                *self.txn.lock().unwrap() = Some(txn);
                result
            }
            None => self.pool.execute(sql, params).await,
        }
    }

    pub(crate) async fn execute_statement(&self, sql: &str, params: Vec<Value>) -> Result<u64, ormkit_connector::DbError> {
        match self.txn.lock().unwrap().take() {
            Some(txn) => {
                let result = txn.execute_statement(sql, params).await;
                *self.txn.lock().unwrap() = Some(txn);
                result
            }
            None => self.pool.execute_statement(sql, params).await,
        }
    }

    /// Identity-map lookup first; a hit never issues SQL (spec §8
    /// "`session.get` is idempotent... issues SQL at most once").
    #[instrument(skip(self))]
    pub async fn get(&self, entity: &str, pk: Value, include_deleted: bool) -> Result<Option<Arc<std::sync::RwLock<Record>>>, SessionError> {
        if let Some(cached) = self.identity_map.get(entity, &pk) {
            return Ok(Some(cached));
        }

        let resolved = self.resolve(entity)?;
        let pk_column = resolved
            .descriptor
            .primary_key()
            .ok_or_else(|| SessionError::NoPrimaryKey { entity: entity.to_owned(), operation: "get" })?
            .name
            .clone();

        let mode = if !resolved.descriptor.soft_delete {
            SoftDeleteMode::NotApplicable
        } else if include_deleted {
            SoftDeleteMode::WithDeleted
        } else {
            SoftDeleteMode::Default
        };

        let select = Select::new(resolved.descriptor.table.as_str()).filter(Filter::eq(&pk_column, pk.clone())).soft_delete(mode).limit(1);
        let (sql, params) = build_select(&select, self.dialect());
        let result = self.execute(&sql, params).await?;

        match result.to_model(&resolved.descriptor) {
            Some(record) => Ok(Some(self.identity_map.get_or_insert(entity, &pk, record))),
            None => Ok(None),
        }
    }

    /// Reads a relationship attribute through its declared lazy policy
    /// (spec §3, §7 "Lazy-load misuse"). `noload` reports "not loaded"
    /// silently; every other policy that wasn't actually prefetched is a
    /// caller error — they should have used a query `.options()` override
    /// instead of assuming the attribute would just be there.
    pub fn relationship<'r>(
        &self,
        entity: &str,
        record: &'r Record,
        name: &str,
    ) -> Result<Option<&'r RelationshipValue>, SessionError> {
        let resolved = self.resolve(entity)?;
        let descriptor = resolved.relationship(name).ok_or_else(|| SessionError::LazyLoadMisuse {
            entity: entity.to_owned(),
            relationship: name.to_owned(),
        })?;

        if descriptor.lazy == LazyPolicy::Raise {
            return Ok(access_relationship(entity, name, LazyPolicy::Raise, record)?);
        }

        if record.is_loaded(name) {
            return Ok(record.relationship(name));
        }
        if descriptor.lazy == LazyPolicy::Noload {
            return Ok(None);
        }
        Err(SessionError::LazyLoadMisuse { entity: entity.to_owned(), relationship: name.to_owned() })
    }

    /// Binds a live, mutable many-to-many collection to one owner row
    /// (spec §3 "Entity instance... for M2M with a session attached,
    /// returns a live mutable collection bound to the junction table").
    pub async fn m2m(&self, entity: &str, owner_pk: Value, relationship: &str) -> Result<crate::m2m::M2MCollection<'_>, SessionError> {
        let resolved = self.resolve(entity)?;
        let descriptor = resolved.relationship(relationship).ok_or_else(|| SessionError::NotManyToMany {
            entity: entity.to_owned(),
            relationship: relationship.to_owned(),
        })?;
        let target_table = self.resolve(descriptor.kind.target())?.descriptor.table.clone();
        crate::m2m::M2MCollection::new(self, &descriptor.kind, owner_pk, target_table).ok_or_else(|| SessionError::NotManyToMany {
            entity: entity.to_owned(),
            relationship: relationship.to_owned(),
        })
    }

    pub fn insert(&self, entity: impl Into<String>, record: Record) -> Result<(), SessionError> {
        self.insert_all(entity, vec![record])
    }

    /// Queues rows for the next flush; `insert` with zero rows fails
    /// immediately rather than silently doing nothing (spec §7).
    pub fn insert_all(&self, entity: impl Into<String>, records: Vec<Record>) -> Result<(), SessionError> {
        if records.is_empty() {
            return Err(SessionError::EmptyInsert);
        }
        self.pending_new.lock().unwrap().entry(entity.into()).or_default().extend(records);
        Ok(())
    }

    /// Queues a hard delete for the next `commit_pending` (spec §4.D, GLOSSARY
    /// "Unit of work"). Unlike [`Session::force_delete`], this issues no SQL
    /// until flushed.
    pub fn delete(&self, entity: impl Into<String>, pk: Value) {
        self.pending_delete.lock().unwrap().push((entity.into(), pk));
    }

    /// Flushes pending inserts, batched per entity and clamped to the
    /// dialect's bind-parameter cap (spec §4.D "Insert flushing").
    #[instrument(skip(self))]
    pub async fn flush(&self) -> Result<(), SessionError> {
        let pending = std::mem::take(&mut *self.pending_new.lock().unwrap());
        for (entity, records) in pending {
            self.flush_entity(&entity, records).await?;
        }
        Ok(())
    }

    async fn flush_entity(&self, entity: &str, records: Vec<Record>) -> Result<(), SessionError> {
        let resolved = self.resolve(entity)?;
        let insert_columns: Vec<String> = resolved
            .descriptor
            .columns
            .iter()
            .filter(|c| !(c.autoincrement && c.primary_key))
            .map(|c| c.name.clone())
            .collect();
        let pk_column = resolved.descriptor.primary_key().map(|c| c.name.clone());

        let columns_per_row = insert_columns.len().max(1);
        let max_params = self.dialect().max_bind_parameters();
        let batch_size = (max_params / columns_per_row).max(1);

        for batch in records.chunks(batch_size) {
            let rows: Vec<Vec<(String, Value)>> = batch
                .iter()
                .map(|record| insert_columns.iter().map(|c| (c.clone(), record.get(c).cloned().unwrap_or(Value::Null))).collect())
                .collect();

            let insert = Insert::new(resolved.descriptor.table.as_str(), rows).returning();
            let (sql, params) = build_insert(&insert, self.dialect());
            let result = self.execute(&sql, params).await?;

            for (row, record) in result.rows.iter().zip(batch.iter()) {
                let mut hydrated = record.clone();
                for (name, value) in &row.0 {
                    hydrated.set(name.clone(), value.clone());
                }
                if let Some(pk_column) = &pk_column {
                    if let Some(pk) = hydrated.get(pk_column).cloned() {
                        self.identity_map.insert(entity, &pk, hydrated);
                    }
                }
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn soft_delete(&self, entity: &str, pk: Value) -> Result<(), SessionError> {
        let resolved = self.resolve(entity)?;
        let pk_column = self.require_pk(&resolved, "soft_delete")?;
        let update = Update {
            table: resolved.descriptor.table.clone(),
            set: vec![("deleted_at".to_owned(), Value::from(Utc::now()))],
            filter: Filter::eq(&pk_column, pk.clone()),
            soft_delete: SoftDeleteMode::NotApplicable,
        };
        let (sql, params) = build_update(&update, self.dialect());
        self.execute_statement(&sql, params).await?;
        self.identity_map.remove(entity, &pk);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn restore(&self, entity: &str, pk: Value) -> Result<(), SessionError> {
        let resolved = self.resolve(entity)?;
        let pk_column = self.require_pk(&resolved, "restore")?;
        let update = Update {
            table: resolved.descriptor.table.clone(),
            set: vec![("deleted_at".to_owned(), Value::Null)],
            filter: Filter::eq(&pk_column, pk.clone()),
            soft_delete: SoftDeleteMode::NotApplicable,
        };
        let (sql, params) = build_update(&update, self.dialect());
        self.execute_statement(&sql, params).await?;
        self.identity_map.remove(entity, &pk);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn force_delete(&self, entity: &str, pk: Value) -> Result<(), SessionError> {
        let resolved = self.resolve(entity)?;
        let pk_column = self.require_pk(&resolved, "force_delete")?;
        let delete = Delete {
            table: resolved.descriptor.table.clone(),
            filter: Filter::eq(&pk_column, pk.clone()),
            soft_delete: SoftDeleteMode::WithDeleted,
        };
        let (sql, params) = build_delete(&delete, self.dialect());
        self.execute_statement(&sql, params).await?;
        self.identity_map.remove(entity, &pk);
        Ok(())
    }

    /// `ON CONFLICT DO UPDATE`/`DO NOTHING`, resolved back to the
    /// authoritative row in one round trip on PostgreSQL (`RETURNING *`)
    /// and two on SQLite, which has no multi-row-affecting `RETURNING`
    /// for an upsert the implementation can rely on uniformly (spec §4.D).
    #[instrument(skip(self, record))]
    pub async fn upsert(
        &self,
        entity: &str,
        record: Record,
        conflict_target: Vec<String>,
        update_fields: Option<Vec<String>>,
        do_nothing: bool,
    ) -> Result<Record, SessionError> {
        let resolved = self.resolve(entity)?;
        let insert_columns: Vec<String> = resolved
            .descriptor
            .columns
            .iter()
            .filter(|c| !(c.autoincrement && c.primary_key))
            .map(|c| c.name.clone())
            .collect();
        let row: Vec<(String, Value)> = insert_columns.iter().filter_map(|c| record.get(c).cloned().map(|v| (c.clone(), v))).collect();

        let upsert = Upsert { conflict_target: conflict_target.clone(), update_fields, do_nothing };
        let is_postgres = self.dialect().is_postgres();
        let insert = if is_postgres { Insert::new(resolved.descriptor.table.as_str(), vec![row.clone()]).upsert(upsert).returning() } else { Insert::new(resolved.descriptor.table.as_str(), vec![row.clone()]).upsert(upsert) };

        let (sql, params) = build_insert(&insert, self.dialect());
        let result = self.execute(&sql, params).await?;

        let hydrated = if is_postgres {
            result.to_model(&resolved.descriptor)
        } else {
            let filter = conflict_target
                .iter()
                .filter_map(|c| row.iter().find(|(name, _)| name == c).map(|(_, v)| Filter::eq(c, v.clone())))
                .fold(Filter::And(vec![]), |acc, f| match acc {
                    Filter::And(mut leaves) => {
                        leaves.push(f);
                        Filter::And(leaves)
                    }
                    other => Filter::And(vec![other, f]),
                });
            let select = Select::new(resolved.descriptor.table.as_str()).filter(filter).limit(1);
            let (sql, params) = build_select(&select, self.dialect());
            let reselected = self.execute(&sql, params).await?;
            reselected.to_model(&resolved.descriptor)
        };

        let hydrated = hydrated.ok_or(SessionError::NotFound)?;
        if let Some(pk_column) = resolved.descriptor.primary_key().map(|c| c.name.clone()) {
            if let Some(pk) = hydrated.get(&pk_column).cloned() {
                self.identity_map.insert(entity, &pk, hydrated.clone());
            }
        }
        Ok(hydrated)
    }

    pub async fn upsert_all(
        &self,
        entity: &str,
        records: Vec<Record>,
        conflict_target: Vec<String>,
        update_fields: Option<Vec<String>>,
        do_nothing: bool,
    ) -> Result<Vec<Record>, SessionError> {
        let mut out = Vec::with_capacity(records.len());
        for record in records {
            out.push(self.upsert(entity, record, conflict_target.clone(), update_fields.clone(), do_nothing).await?);
        }
        Ok(out)
    }

    fn require_pk(&self, resolved: &ResolvedEntity, operation: &'static str) -> Result<String, SessionError> {
        resolved
            .descriptor
            .primary_key()
            .map(|c| c.name.clone())
            .ok_or_else(|| SessionError::NoPrimaryKey { entity: resolved.descriptor.name.clone(), operation })
    }

    /// Clears pending queues without touching the database (spec §4.D
    /// "`rollback()` clears pending queues").
    pub fn clear_pending(&self) {
        self.pending_new.lock().unwrap().clear();
        self.pending_delete.lock().unwrap().clear();
    }

    /// Flushes pending inserts then pending deletes (spec §4.D "`commit()`
    /// flushes pending inserts then pending deletes").
    pub async fn commit_pending(&self) -> Result<(), SessionError> {
        self.flush().await?;
        let deletes = std::mem::take(&mut *self.pending_delete.lock().unwrap());
        for (entity, pk) in deletes {
            self.force_delete(&entity, pk).await?;
        }
        Ok(())
    }

    /// Runs `f` inside a transaction scope: commits (flushing pending
    /// queues) on success, rolls back and clears pending queues on error
    /// — the auto-commit/auto-rollback ergonomics the pool's bare
    /// `Transaction` trait can't express across `?` (spec §4.D, §5).
    pub async fn transaction<'s, F, Fut, T>(&'s self, f: F) -> Result<T, SessionError>
    where
        F: FnOnce(&'s Session) -> Fut,
        Fut: Future<Output = Result<T, SessionError>> + 's,
    {
        let txn = self.pool.begin().await?;
        *self.txn.lock().unwrap() = Some(txn);

        match f(self).await {
            Ok(value) => {
                self.commit_pending().await?;
                let txn = self.txn.lock().unwrap().take();
                if let Some(txn) = txn {
                    txn.commit().await?;
                }
                Ok(value)
            }
            Err(e) => {
                self.clear_pending();
                let txn = self.txn.lock().unwrap().take();
                if let Some(txn) = txn {
                    txn.rollback().await?;
                }
                Err(e)
            }
        }
    }

    pub fn autoflush_enabled(&self) -> bool {
        self.autoflush
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ormkit_connector::{DbError, QueryResult, Row};
    use ormkit_models::{ColumnDescriptor, ColumnType, EntityDescriptor};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeTransaction;

    #[async_trait]
    impl Transaction for FakeTransaction {
        async fn execute(&self, _sql: &str, _params: Vec<Value>) -> Result<QueryResult, DbError> {
            Ok(QueryResult::new(vec![]))
        }
        async fn execute_statement(&self, _sql: &str, _params: Vec<Value>) -> Result<u64, DbError> {
            Ok(0)
        }
        async fn commit(self: Box<Self>) -> Result<(), DbError> {
            Ok(())
        }
        async fn rollback(self: Box<Self>) -> Result<(), DbError> {
            Ok(())
        }
    }

    struct FakePool {
        calls: AtomicUsize,
        next_rows: Mutex<Vec<Row>>,
    }

    impl FakePool {
        fn with_rows(rows: Vec<Row>) -> Self {
            Self { calls: AtomicUsize::new(0), next_rows: Mutex::new(rows) }
        }
    }

    #[async_trait]
    impl ConnectionPool for FakePool {
        async fn execute(&self, _sql: &str, _params: Vec<Value>) -> Result<QueryResult, DbError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(QueryResult::new(self.next_rows.lock().unwrap().clone()))
        }
        async fn execute_statement(&self, _sql: &str, _params: Vec<Value>) -> Result<u64, DbError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        }
        async fn begin(&self) -> Result<Box<dyn Transaction>, DbError> {
            Ok(Box::new(FakeTransaction))
        }
        fn dialect(&self) -> Dialect {
            Dialect::Postgres
        }
        async fn close(&self) -> Result<(), DbError> {
            Ok(())
        }
        async fn get_tables(&self) -> Result<Vec<String>, DbError> {
            unimplemented!()
        }
        async fn get_columns(&self, _table: &str) -> Result<Vec<ormkit_schema_describer::Column>, DbError> {
            unimplemented!()
        }
        async fn get_indexes(&self, _table: &str) -> Result<Vec<ormkit_schema_describer::Index>, DbError> {
            unimplemented!()
        }
        async fn get_constraints(
            &self,
            _table: &str,
        ) -> Result<(Option<ormkit_schema_describer::PrimaryKey>, Vec<ormkit_schema_describer::ForeignKey>), DbError> {
            unimplemented!()
        }
    }

    fn user_registry() -> Arc<Registry> {
        let mut reg = Registry::new();
        reg.register(
            EntityDescriptor::builder("User", "users")
                .column(ColumnDescriptor::new("id", ColumnType::Int).primary_key().autoincrement())
                .column(ColumnDescriptor::new("name", ColumnType::Text))
                .build(),
        );
        Arc::new(reg)
    }

    fn registry_with_raise_relationship() -> Arc<Registry> {
        let mut reg = Registry::new();
        reg.register(
            EntityDescriptor::builder("User", "users")
                .column(ColumnDescriptor::new("id", ColumnType::Int).primary_key().autoincrement())
                .relationship(ormkit_models::RelationshipSpec::one_to_many("posts", "Post").lazy(ormkit_models::LazyPolicy::Raise))
                .build(),
        );
        reg.register(
            EntityDescriptor::builder("Post", "posts")
                .column(ColumnDescriptor::new("id", ColumnType::Int).primary_key().autoincrement())
                .column(ColumnDescriptor::new("author_id", ColumnType::Int).foreign_key("users", "id"))
                .build(),
        );
        Arc::new(reg)
    }

    #[tokio::test]
    async fn accessing_an_unloaded_raise_relationship_errors() {
        let pool = Arc::new(FakePool::with_rows(vec![]));
        let session = Session::new(pool, registry_with_raise_relationship(), false);
        let record = Record::new("User");

        let err = session.relationship("User", &record, "posts").unwrap_err();
        assert!(matches!(err, SessionError::Load(_)));
    }

    #[tokio::test]
    async fn accessing_a_prefetched_raise_relationship_succeeds() {
        let pool = Arc::new(FakePool::with_rows(vec![]));
        let session = Session::new(pool, registry_with_raise_relationship(), false);
        let mut record = Record::new("User");
        record.set_relationship("posts", ormkit_models::RelationshipValue::ToMany(vec![]));

        let result = session.relationship("User", &record, "posts").unwrap();
        assert!(matches!(result, Some(RelationshipValue::ToMany(rows)) if rows.is_empty()));
    }

    #[tokio::test]
    async fn get_is_idempotent_and_issues_sql_at_most_once() {
        let row = Row(vec![("id".into(), Value::from(1)), ("name".into(), Value::from("Alice"))]);
        let pool = Arc::new(FakePool::with_rows(vec![row]));
        let session = Session::new(pool.clone(), user_registry(), false);

        let first = session.get("User", Value::from(1), false).await.unwrap().unwrap();
        let second = session.get("User", Value::from(1), false).await.unwrap().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(pool.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn insert_all_rejects_empty_batch() {
        let pool = Arc::new(FakePool::with_rows(vec![]));
        let session = Session::new(pool, user_registry(), false);
        assert!(matches!(session.insert_all("User", vec![]), Err(SessionError::EmptyInsert)));
    }

    #[tokio::test]
    async fn flush_assigns_primary_keys_and_populates_identity_map() {
        let returned = Row(vec![("id".into(), Value::from(1)), ("name".into(), Value::from("A"))]);
        let pool = Arc::new(FakePool::with_rows(vec![returned]));
        let session = Session::new(pool, user_registry(), false);

        let mut record = Record::new("User");
        record.set("name", Value::from("A"));
        session.insert("User", record).unwrap();
        session.flush().await.unwrap();

        let cached = session.get("User", Value::from(1), false).await.unwrap();
        assert!(cached.is_some());
    }

    #[tokio::test]
    async fn transaction_commits_pending_inserts_on_success() {
        let returned = Row(vec![("id".into(), Value::from(1)), ("name".into(), Value::from("A"))]);
        let pool = Arc::new(FakePool::with_rows(vec![returned]));
        let session = Session::new(pool, user_registry(), false);

        let result = session
            .transaction(|s| async move {
                let mut record = Record::new("User");
                record.set("name", Value::from("A"));
                s.insert("User", record)?;
                Ok::<_, SessionError>(())
            })
            .await;

        assert!(result.is_ok());
    }
}
