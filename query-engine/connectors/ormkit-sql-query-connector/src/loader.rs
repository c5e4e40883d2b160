//! Relationship prefetch (spec §4.C). A single entry point walks a
//! resolved entity's relationships and issues exactly one additional
//! round trip per `selectin` relationship — two for `many_to_many`, since
//! the junction table and the target table are distinct queries — and
//! zero for `joined` (folded into the initial `SELECT` by
//! [`crate::builder::build_select`]) and `noload`. `select` (the default)
//! and `raise` never prefetch; they are resolved at attribute-access time
//! by the caller, which is out of this crate's scope.

use std::collections::HashMap;

use ormkit_connector::ConnectionPool;
use ormkit_models::{LazyPolicy, Record, RelationshipKind, RelationshipValue, ResolvedEntity};
use ormkit_value::Value;
use tracing::instrument;

use crate::builder::build_select;
use crate::describe::Select;
use crate::error::LoadError;
use crate::filter::Filter;

/// Prefetch every `selectin` relationship on `entity` into `records`.
/// Returns the number of additional round trips issued, so callers (and
/// tests) can assert the N+1-avoidance contract directly.
#[instrument(skip(pool, entity, records))]
pub async fn load_relationships(
    pool: &dyn ConnectionPool,
    entity: &ResolvedEntity,
    records: &mut [Record],
) -> Result<usize, LoadError> {
    let mut round_trips = 0;

    for relationship in &entity.relationships {
        match relationship.lazy {
            LazyPolicy::Selectin => {
                round_trips += load_one(pool, &relationship.kind, &relationship.name, records).await?;
            }
            LazyPolicy::Joined | LazyPolicy::Noload | LazyPolicy::Select | LazyPolicy::Raise => {}
        }
    }

    Ok(round_trips)
}

/// Reads a relationship attribute respecting its lazy policy (spec §3
/// "raise", §7 "Lazy-load misuse"). `select`/`joined`/`selectin` that
/// weren't actually prefetched just report "not loaded" (`Ok(None)`) —
/// the caller presumably knows what it asked for; `raise` errors instead,
/// since accessing it unprefetched is exactly the misuse that policy
/// exists to catch.
pub fn access_relationship<'r>(
    entity: &str,
    name: &str,
    policy: LazyPolicy,
    record: &'r Record,
) -> Result<Option<&'r RelationshipValue>, LoadError> {
    if record.is_loaded(name) {
        return Ok(record.relationship(name));
    }
    if policy == LazyPolicy::Raise {
        return Err(LoadError::LazyLoadRaised { entity: entity.to_owned(), relationship: name.to_owned() });
    }
    Ok(None)
}

async fn load_one(
    pool: &dyn ConnectionPool,
    kind: &RelationshipKind,
    name: &str,
    records: &mut [Record],
) -> Result<usize, LoadError> {
    match kind {
        RelationshipKind::ManyToOne { target, local_column, remote_column } => {
            load_many_to_one(pool, target, local_column, remote_column, name, records).await
        }
        RelationshipKind::OneToMany { target, remote_fk_column, local_pk_column } => {
            load_one_to_many(pool, target, remote_fk_column, local_pk_column, name, records).await
        }
        RelationshipKind::ManyToMany {
            target,
            secondary,
            local_pk_column,
            remote_pk_column,
            junction_local_column,
            junction_remote_column,
        } => {
            load_many_to_many(
                pool,
                target,
                secondary,
                local_pk_column,
                remote_pk_column,
                junction_local_column,
                junction_remote_column,
                name,
                records,
            )
            .await
        }
    }
}

/// `Value` has no `Hash`/`Eq` impl (it carries an `f64` arm), so maps keyed
/// by a `Value` use this tagged string form rather than the value itself
/// (same convention as `ormkit_session::identity_map::key_of`).
fn key_of(value: &Value) -> String {
    match value {
        Value::String(s) => format!("s:{}", s),
        Value::Int(i) => format!("i:{}", i),
        Value::Float(f) => format!("f:{}", f),
        Value::Boolean(b) => format!("b:{}", b),
        Value::DateTime(dt) => format!("d:{}", dt.to_rfc3339()),
        Value::Uuid(u) => format!("u:{}", u),
        Value::Json(j) => format!("j:{}", j),
        Value::Null => "n:".to_owned(),
        Value::List(items) => format!("l:{:?}", items),
    }
}

fn owner_keys(records: &[Record], key_column: &str) -> Vec<Value> {
    let mut seen = Vec::new();
    for record in records {
        if let Some(v) = record.get(key_column) {
            if !seen.contains(v) {
                seen.push(v.clone());
            }
        }
    }
    seen
}

async fn run_select(pool: &dyn ConnectionPool, table: &str, column: &str, keys: Vec<Value>) -> Result<Vec<Record>, LoadError> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }
    let select = Select::new(table).filter(Filter::in_set(column, keys));
    let (sql, params) = build_select(&select, pool.dialect());
    let result = pool.execute(&sql, params).await?;
    Ok(result.rows.iter().map(|row| row_to_record(table, row)).collect())
}

fn row_to_record(table: &str, row: &ormkit_connector::Row) -> Record {
    let mut record = Record::new(table.to_owned());
    for (column, value) in &row.0 {
        record.set(column.clone(), value.clone());
    }
    record
}

async fn load_many_to_one(
    pool: &dyn ConnectionPool,
    target: &str,
    local_column: &str,
    remote_column: &str,
    name: &str,
    records: &mut [Record],
) -> Result<usize, LoadError> {
    let keys = owner_keys(records, local_column);
    let targets = run_select(pool, target, remote_column, keys).await?;

    let by_key: HashMap<String, Record> =
        targets.into_iter().filter_map(|r| r.get(remote_column).map(key_of).map(|k| (k, r))).collect();

    for record in records.iter_mut() {
        let matched = record.get(local_column).and_then(|k| by_key.get(&key_of(k))).cloned();
        record.set_relationship(name, RelationshipValue::ToOne(matched.map(Box::new)));
    }

    Ok(1)
}

async fn load_one_to_many(
    pool: &dyn ConnectionPool,
    target: &str,
    remote_fk_column: &str,
    local_pk_column: &str,
    name: &str,
    records: &mut [Record],
) -> Result<usize, LoadError> {
    let keys = owner_keys(records, local_pk_column);
    let children = run_select(pool, target, remote_fk_column, keys).await?;

    let mut by_parent: HashMap<String, Vec<Record>> = HashMap::new();
    for child in children {
        if let Some(fk) = child.get(remote_fk_column).map(key_of) {
            by_parent.entry(fk).or_default().push(child);
        }
    }

    for record in records.iter_mut() {
        let matched = record.get(local_pk_column).and_then(|k| by_parent.remove(&key_of(k))).unwrap_or_default();
        record.set_relationship(name, RelationshipValue::ToMany(matched));
    }

    Ok(1)
}

#[allow(clippy::too_many_arguments)]
async fn load_many_to_many(
    pool: &dyn ConnectionPool,
    target: &str,
    secondary: &str,
    local_pk_column: &str,
    remote_pk_column: &str,
    junction_local_column: &str,
    junction_remote_column: &str,
    name: &str,
    records: &mut [Record],
) -> Result<usize, LoadError> {
    let owner_ids = owner_keys(records, local_pk_column);
    let junction_rows = run_select(pool, secondary, junction_local_column, owner_ids).await?;

    let mut owner_to_remote: HashMap<String, Vec<Value>> = HashMap::new();
    let mut all_remote_ids = Vec::new();
    for row in &junction_rows {
        let (Some(owner_id), Some(remote_id)) = (row.get(junction_local_column), row.get(junction_remote_column))
        else {
            continue;
        };
        owner_to_remote.entry(key_of(owner_id)).or_default().push(remote_id.clone());
        if !all_remote_ids.contains(remote_id) {
            all_remote_ids.push(remote_id.clone());
        }
    }

    let targets = run_select(pool, target, remote_pk_column, all_remote_ids).await?;
    let by_remote_id: HashMap<String, Record> =
        targets.into_iter().filter_map(|r| r.get(remote_pk_column).map(key_of).map(|k| (k, r))).collect();

    for record in records.iter_mut() {
        let owned = record
            .get(local_pk_column)
            .and_then(|owner_id| owner_to_remote.get(&key_of(owner_id)))
            .map(|remote_ids| remote_ids.iter().filter_map(|id| by_remote_id.get(&key_of(id)).cloned()).collect())
            .unwrap_or_default();
        record.set_relationship(name, RelationshipValue::ToMany(owned));
    }

    Ok(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ormkit_connector::{Dialect, QueryResult, Row, Transaction};
    use ormkit_models::{ColumnDescriptor, ColumnType, EntityDescriptor, LazyPolicy, Registry, RelationshipSpec};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakePool {
        calls: AtomicUsize,
        tables: HashMap<&'static str, Vec<Row>>,
    }

    #[async_trait]
    impl ConnectionPool for FakePool {
        async fn execute(&self, sql: &str, _params: Vec<Value>) -> Result<QueryResult, ormkit_connector::DbError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            for (table, rows) in &self.tables {
                if sql.contains(table) {
                    return Ok(QueryResult::new(rows.clone()));
                }
            }
            Ok(QueryResult::new(vec![]))
        }

        async fn execute_statement(&self, _sql: &str, _params: Vec<Value>) -> Result<u64, ormkit_connector::DbError> {
            unimplemented!()
        }

        async fn begin(&self) -> Result<Box<dyn Transaction>, ormkit_connector::DbError> {
            unimplemented!()
        }

        fn dialect(&self) -> Dialect {
            Dialect::Postgres
        }

        async fn close(&self) -> Result<(), ormkit_connector::DbError> {
            Ok(())
        }

        async fn get_tables(&self) -> Result<Vec<String>, ormkit_connector::DbError> {
            unimplemented!()
        }

        async fn get_columns(&self, _table: &str) -> Result<Vec<ormkit_schema_describer::Column>, ormkit_connector::DbError> {
            unimplemented!()
        }

        async fn get_indexes(&self, _table: &str) -> Result<Vec<ormkit_schema_describer::Index>, ormkit_connector::DbError> {
            unimplemented!()
        }

        async fn get_constraints(
            &self,
            _table: &str,
        ) -> Result<(Option<ormkit_schema_describer::PrimaryKey>, Vec<ormkit_schema_describer::ForeignKey>), ormkit_connector::DbError>
        {
            unimplemented!()
        }
    }

    fn registry_with_selectin() -> Registry {
        let mut reg = Registry::new();
        reg.register(
            EntityDescriptor::builder("User", "users")
                .column(ColumnDescriptor::new("id", ColumnType::Int).autoincrement())
                .relationship(RelationshipSpec::one_to_many("posts", "Post").lazy(LazyPolicy::Selectin))
                .build(),
        );
        reg.register(
            EntityDescriptor::builder("Post", "posts")
                .column(ColumnDescriptor::new("id", ColumnType::Int).autoincrement())
                .column(ColumnDescriptor::new("author_id", ColumnType::Int).foreign_key("users", "id"))
                .build(),
        );
        reg
    }

    #[tokio::test]
    async fn one_to_many_selectin_issues_exactly_one_round_trip() {
        let reg = registry_with_selectin();
        let user = reg.resolve("User").unwrap();

        let mut records = vec![Record::new("User")];
        records[0].set("id", Value::from(1));

        let pool = FakePool {
            calls: AtomicUsize::new(0),
            tables: HashMap::from([(
                "posts",
                vec![Row(vec![("id".into(), Value::from(1)), ("author_id".into(), Value::from(1))])],
            )]),
        };

        let round_trips = load_relationships(&pool, &user, &mut records).await.unwrap();
        assert_eq!(round_trips, 1);
        assert_eq!(pool.calls.load(Ordering::SeqCst), 1);

        match records[0].relationship("posts").unwrap() {
            RelationshipValue::ToMany(children) => assert_eq!(children.len(), 1),
            _ => panic!("expected to-many"),
        }
    }

    #[tokio::test]
    async fn many_to_many_selectin_issues_exactly_two_round_trips() {
        let mut reg = Registry::new();
        reg.register(
            EntityDescriptor::builder("User", "users")
                .column(ColumnDescriptor::new("id", ColumnType::Int).autoincrement())
                .relationship(RelationshipSpec::many_to_many("roles", "Role").lazy(LazyPolicy::Selectin))
                .build(),
        );
        reg.register(
            EntityDescriptor::builder("Role", "roles")
                .column(ColumnDescriptor::new("id", ColumnType::Int).autoincrement())
                .build(),
        );
        let user = reg.resolve("User").unwrap();

        let mut records = vec![Record::new("User")];
        records[0].set("id", Value::from(1));

        let pool = FakePool {
            calls: AtomicUsize::new(0),
            tables: HashMap::from([
                ("users_roles", vec![Row(vec![("user_id".into(), Value::from(1)), ("role_id".into(), Value::from(9))])]),
                ("roles", vec![Row(vec![("id".into(), Value::from(9))])]),
            ]),
        };

        let round_trips = load_relationships(&pool, &user, &mut records).await.unwrap();
        assert_eq!(round_trips, 2);
        assert_eq!(pool.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn joined_relationship_issues_zero_round_trips() {
        let mut reg = Registry::new();
        reg.register(
            EntityDescriptor::builder("Post", "posts")
                .column(ColumnDescriptor::new("id", ColumnType::Int).autoincrement())
                .column(ColumnDescriptor::new("author_id", ColumnType::Int).foreign_key("users", "id"))
                .relationship(RelationshipSpec::many_to_one("author", "User").lazy(LazyPolicy::Joined))
                .build(),
        );
        reg.register(
            EntityDescriptor::builder("User", "users")
                .column(ColumnDescriptor::new("id", ColumnType::Int).autoincrement())
                .build(),
        );
        let post = reg.resolve("Post").unwrap();

        let mut records = vec![Record::new("Post")];
        let pool = FakePool { calls: AtomicUsize::new(0), tables: HashMap::new() };

        let round_trips = load_relationships(&pool, &post, &mut records).await.unwrap();
        assert_eq!(round_trips, 0);
        assert_eq!(pool.calls.load(Ordering::SeqCst), 0);
        assert!(!records[0].is_loaded("author"));
    }

    #[tokio::test]
    async fn empty_owner_set_short_circuits_without_a_round_trip() {
        let reg = registry_with_selectin();
        let user = reg.resolve("User").unwrap();
        let mut records: Vec<Record> = vec![];

        let pool = FakePool { calls: AtomicUsize::new(0), tables: HashMap::new() };
        let round_trips = load_relationships(&pool, &user, &mut records).await.unwrap();
        assert_eq!(round_trips, 1);
        assert_eq!(pool.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn accessing_an_unloaded_raise_relationship_errors() {
        let record = Record::new("Post");
        let err = access_relationship("Post", "author", LazyPolicy::Raise, &record).unwrap_err();
        assert!(matches!(err, LoadError::LazyLoadRaised { .. }));
    }

    #[test]
    fn accessing_an_unloaded_select_relationship_returns_none() {
        let record = Record::new("Post");
        let result = access_relationship("Post", "author", LazyPolicy::Select, &record).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn accessing_a_loaded_raise_relationship_returns_the_value() {
        let mut record = Record::new("Post");
        record.set_relationship("author", RelationshipValue::ToOne(None));
        let result = access_relationship("Post", "author", LazyPolicy::Raise, &record).unwrap();
        assert!(matches!(result, Some(RelationshipValue::ToOne(None))));
    }

    #[allow(unused)]
    fn _assert_arc_type(_: Arc<ResolvedEntity>) {}
}
