//! The query facade (spec §4.D "Query facade"): a builder plus terminal
//! operations, all routed through the one soft-delete injection point in
//! [`ormkit_sql_query_connector::build_select`].

use std::collections::HashMap;
use std::pin::Pin;

use futures::stream::{self, Stream};
use ormkit_models::{LazyPolicy, Record, RelationshipKind, RelationshipValue};
use ormkit_sql_query_connector::{
    build_delete, build_select, build_update, load_relationships, Columns, Delete, Filter, JoinInfo, OrderBy, Select,
    SoftDeleteMode, Update,
};
use ormkit_value::Value;
use tracing::instrument;

use crate::error::SessionError;
use crate::session::Session;

/// A query-scoped override of a relationship's default load strategy,
/// constructed via [`joined`] / [`selectin`] / [`noload`].
#[derive(Debug, Clone)]
pub struct LoadOption {
    pub relationship: String,
    pub policy: LazyPolicy,
}

pub fn joined(relationship: impl Into<String>) -> LoadOption {
    LoadOption { relationship: relationship.into(), policy: LazyPolicy::Joined }
}

pub fn selectin(relationship: impl Into<String>) -> LoadOption {
    LoadOption { relationship: relationship.into(), policy: LazyPolicy::Selectin }
}

pub fn noload(relationship: impl Into<String>) -> LoadOption {
    LoadOption { relationship: relationship.into(), policy: LazyPolicy::Noload }
}

pub struct Query<'s> {
    session: &'s Session,
    entity: String,
    filter: Filter,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
    distinct: bool,
    group_by: Vec<String>,
    having: Option<Filter>,
    options: Vec<LoadOption>,
    deleted_mode: DeletedMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeletedMode {
    Default,
    WithDeleted,
    OnlyDeleted,
}

impl<'s> Query<'s> {
    pub(crate) fn new(session: &'s Session, entity: impl Into<String>) -> Self {
        Self {
            session,
            entity: entity.into(),
            filter: Filter::And(vec![]),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            distinct: false,
            group_by: Vec::new(),
            having: None,
            options: Vec::new(),
            deleted_mode: DeletedMode::Default,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = and_with(self.filter, filter);
        self
    }

    /// Django-style keyword conjunction (spec §9 "Filter tree and Q composition").
    pub fn filter_by(mut self, pairs: Vec<(&str, Value)>) -> Self {
        self.filter = and_with(self.filter, Filter::from_kwargs(pairs));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, descending: bool) -> Self {
        let column = column.into();
        self.order_by.push(if descending { OrderBy::desc(column) } else { OrderBy::asc(column) });
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    pub fn having(mut self, filter: Filter) -> Self {
        self.having = Some(filter);
        self
    }

    pub fn options(mut self, option: LoadOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn with_deleted(mut self) -> Self {
        self.deleted_mode = DeletedMode::WithDeleted;
        self
    }

    pub fn only_deleted(mut self) -> Self {
        self.deleted_mode = DeletedMode::OnlyDeleted;
        self
    }

    fn soft_delete_mode(&self, entity_has_soft_delete: bool) -> SoftDeleteMode {
        if !entity_has_soft_delete {
            return SoftDeleteMode::NotApplicable;
        }
        match self.deleted_mode {
            DeletedMode::Default => SoftDeleteMode::Default,
            DeletedMode::WithDeleted => SoftDeleteMode::WithDeleted,
            DeletedMode::OnlyDeleted => SoftDeleteMode::OnlyDeleted,
        }
    }

    /// Merge the registry's default per-relationship policy with this
    /// query's `.options()` overrides, downgrading a `joined` override on a
    /// to-many relationship to `selectin` the same way the registry does
    /// (spec §9 "Joined-load of one-to-many silently downgrades").
    fn effective_policies(&self) -> Result<HashMap<String, LazyPolicy>, SessionError> {
        let resolved = self.session.resolve(&self.entity)?;
        let mut policies: HashMap<String, LazyPolicy> =
            resolved.relationships.iter().map(|r| (r.name.clone(), r.lazy)).collect();

        for option in &self.options {
            if let Some(descriptor) = resolved.relationship(&option.relationship) {
                let effective = if option.policy == LazyPolicy::Joined && descriptor.kind.uselist() {
                    LazyPolicy::Selectin
                } else {
                    option.policy
                };
                policies.insert(option.relationship.clone(), effective);
            }
        }
        Ok(policies)
    }

    #[instrument(skip(self))]
    pub async fn all(&self) -> Result<Vec<Record>, SessionError> {
        let resolved = self.session.resolve(&self.entity)?;
        let policies = self.effective_policies()?;

        let mut joins = Vec::new();
        let mut joined_relationships = Vec::new();
        for descriptor in &resolved.relationships {
            if policies.get(&descriptor.name) == Some(&LazyPolicy::Joined) {
                if let RelationshipKind::ManyToOne { target, local_column, remote_column } = &descriptor.kind {
                    let target_entity = self.session.resolve(target)?;
                    let target_columns: Vec<String> = target_entity.descriptor.columns.iter().map(|c| c.name.clone()).collect();
                    joins.push(JoinInfo {
                        relationship: descriptor.name.clone(),
                        target_table: target_entity.descriptor.table.clone(),
                        local_column: local_column.clone(),
                        remote_column: remote_column.clone(),
                        target_columns,
                    });
                    joined_relationships.push(descriptor.name.clone());
                }
            }
        }

        let mut select = Select::new(resolved.descriptor.table.as_str())
            .filter(self.filter.clone())
            .distinct_if(self.distinct)
            .soft_delete(self.soft_delete_mode(resolved.descriptor.soft_delete));
        for ob in &self.order_by {
            select = select.order_by(ob.clone());
        }
        if let Some(limit) = self.limit {
            select = select.limit(limit);
        }
        if let Some(offset) = self.offset {
            select = select.offset(offset);
        }
        select.group_by = self.group_by.clone();
        select.having = self.having.clone();
        for join in joins {
            select = select.join(join);
        }

        let (sql, params) = build_select(&select, self.session.dialect());
        let result = self.session.pool().execute(&sql, params).await?;

        let mut records: Vec<Record> = result
            .rows
            .iter()
            .map(|row| hydrate(&resolved.descriptor.name, row, &joined_relationships))
            .collect();

        let selectin_only: Vec<_> = resolved
            .relationships
            .iter()
            .filter(|d| policies.get(&d.name) == Some(&LazyPolicy::Selectin))
            .cloned()
            .collect();
        if !selectin_only.is_empty() {
            let filtered = ormkit_models::ResolvedEntity { descriptor: resolved.descriptor.clone(), relationships: selectin_only };
            load_relationships(self.session.pool(), &filtered, &mut records).await?;
        }

        Ok(records)
    }

    pub async fn first(&self) -> Result<Option<Record>, SessionError> {
        let limited = Query { limit: Some(1), ..self.clone_shallow() };
        Ok(limited.all().await?.into_iter().next())
    }

    pub async fn one(&self) -> Result<Record, SessionError> {
        let mut rows = self.all().await?;
        match rows.len() {
            1 => Ok(rows.remove(0)),
            _ => Err(SessionError::NotFound),
        }
    }

    pub async fn one_or_none(&self) -> Result<Option<Record>, SessionError> {
        let mut rows = self.all().await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(Some(rows.remove(0))),
            _ => Err(SessionError::NotFound),
        }
    }

    /// A dedicated `SELECT COUNT(*)`, ignoring `limit`/`offset` and skipping
    /// relationship eager-loading entirely — `all()` would apply the
    /// pagination window to the count itself and trigger `load_relationships`
    /// for no reason (spec §4.D "count ignores the pagination window").
    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64, SessionError> {
        let resolved = self.session.resolve(&self.entity)?;
        let mut select = Select::new(resolved.descriptor.table.as_str())
            .filter(self.filter.clone())
            .soft_delete(self.soft_delete_mode(resolved.descriptor.soft_delete))
            .columns(Columns::Count);
        select.group_by = self.group_by.clone();
        select.having = self.having.clone();

        let (sql, params) = build_select(&select, self.session.dialect());
        let result = self.session.pool().execute(&sql, params).await?;
        let count = result
            .rows
            .first()
            .and_then(|row| row.0.first())
            .and_then(|(_, v)| numeric(v))
            .unwrap_or(0.0);
        Ok(count as i64)
    }

    pub async fn exists(&self) -> Result<bool, SessionError> {
        Ok(self.first().await?.is_some())
    }

    /// Same pagination concern as `count()`: aggregates must run over every
    /// matching row, not just the `limit`/`offset` window (spec §4.D).
    async fn aggregate(&self, column: &str, reducer: impl Fn(&[Value]) -> Option<Value>) -> Result<Option<Value>, SessionError> {
        let resolved = self.session.resolve(&self.entity)?;
        let select = Select::new(resolved.descriptor.table.as_str())
            .filter(self.filter.clone())
            .soft_delete(self.soft_delete_mode(resolved.descriptor.soft_delete))
            .columns(Columns::Explicit(vec![column.to_owned()]));

        let (sql, params) = build_select(&select, self.session.dialect());
        let result = self.session.pool().execute(&sql, params).await?;
        let values: Vec<Value> = result.rows.iter().filter_map(|row| row.0.first().map(|(_, v)| v.clone())).collect();
        Ok(reducer(&values))
    }

    pub async fn sum(&self, column: &str) -> Result<Option<Value>, SessionError> {
        self.aggregate(column, |values| {
            if values.is_empty() {
                return None;
            }
            let total: f64 = values.iter().filter_map(numeric).sum();
            Some(Value::Float(total))
        })
        .await
    }

    pub async fn avg(&self, column: &str) -> Result<Option<Value>, SessionError> {
        self.aggregate(column, |values| {
            if values.is_empty() {
                return None;
            }
            let total: f64 = values.iter().filter_map(numeric).sum();
            Some(Value::Float(total / values.len() as f64))
        })
        .await
    }

    pub async fn min(&self, column: &str) -> Result<Option<Value>, SessionError> {
        self.aggregate(column, |values| {
            values.iter().filter_map(numeric).fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.min(v)))).map(Value::Float)
        })
        .await
    }

    pub async fn max(&self, column: &str) -> Result<Option<Value>, SessionError> {
        self.aggregate(column, |values| {
            values.iter().filter_map(numeric).fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v)))).map(Value::Float)
        })
        .await
    }

    pub async fn values(&self, columns: &[&str]) -> Result<Vec<HashMap<String, Value>>, SessionError> {
        let rows = self.all().await?;
        Ok(rows
            .into_iter()
            .map(|r| columns.iter().filter_map(|c| r.get(c).map(|v| (c.to_string(), v.clone()))).collect())
            .collect())
    }

    pub async fn values_list(&self, columns: &[&str]) -> Result<Vec<Vec<Option<Value>>>, SessionError> {
        let rows = self.all().await?;
        Ok(rows.into_iter().map(|r| columns.iter().map(|c| r.get(c).cloned()).collect()).collect())
    }

    pub async fn delete(&self) -> Result<u64, SessionError> {
        let resolved = self.session.resolve(&self.entity)?;
        let delete = Delete {
            table: resolved.descriptor.table.clone(),
            filter: self.filter.clone(),
            soft_delete: self.soft_delete_mode(resolved.descriptor.soft_delete),
        };
        let (sql, params) = build_delete(&delete, self.session.dialect());
        Ok(self.session.pool().execute_statement(&sql, params).await?)
    }

    pub async fn update(&self, set: Vec<(String, Value)>) -> Result<u64, SessionError> {
        let resolved = self.session.resolve(&self.entity)?;
        let update = Update {
            table: resolved.descriptor.table.clone(),
            set,
            filter: self.filter.clone(),
            soft_delete: self.soft_delete_mode(resolved.descriptor.soft_delete),
        };
        let (sql, params) = build_update(&update, self.session.dialect());
        Ok(self.session.pool().execute_statement(&sql, params).await?)
    }

    /// Issues successive `LIMIT`/`OFFSET` windows, yielding rows one at a
    /// time and stopping at the first empty or short batch (spec §4.D).
    pub fn stream(self, batch_size: u64) -> Pin<Box<dyn Stream<Item = Result<Record, SessionError>> + 's>> {
        let state = (self, 0u64, Vec::<Record>::new().into_iter(), false);
        Box::pin(stream::unfold(state, move |(query, mut window, mut buffered, done)| async move {
            loop {
                if let Some(record) = buffered.next() {
                    return Some((Ok(record), (query, window, buffered, done)));
                }
                if done {
                    return None;
                }
                let page = Query { limit: Some(batch_size), offset: Some(window), ..query.clone_shallow() };
                match page.all().await {
                    Ok(rows) => {
                        let short = (rows.len() as u64) < batch_size;
                        window += batch_size;
                        buffered = rows.into_iter();
                        if short {
                            return Some((Ok(buffered.next()?), (query, window, buffered, true)));
                        }
                    }
                    Err(e) => return Some((Err(e), (query, window, buffered, true))),
                }
            }
        }))
    }

    fn clone_shallow(&self) -> Query<'s> {
        Query {
            session: self.session,
            entity: self.entity.clone(),
            filter: self.filter.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit,
            offset: self.offset,
            distinct: self.distinct,
            group_by: self.group_by.clone(),
            having: self.having.clone(),
            options: self.options.clone(),
            deleted_mode: self.deleted_mode,
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn and_with(base: Filter, addition: Filter) -> Filter {
    match base {
        Filter::And(mut leaves) if !leaves.is_empty() || matches!(addition, Filter::And(_)) => {
            leaves.push(addition);
            Filter::And(leaves)
        }
        Filter::And(_) => addition,
        other => Filter::And(vec![other, addition]),
    }
}

/// Split a hydrated row into the base record plus one `ToOne` relationship
/// per joined alias, treating an all-NULL alias group as an absent match
/// (spec §8 "joined-load outer-join miss... produces `None` not a stub").
fn hydrate(entity: &str, row: &ormkit_connector::Row, joined_relationships: &[String]) -> Record {
    let mut record = Record::new(entity.to_owned());
    for (i, relationship) in joined_relationships.iter().enumerate() {
        let prefix = format!("_j{}_", i + 1);
        let mut child_columns = Vec::new();
        let mut all_null = true;
        for (name, value) in &row.0 {
            if let Some(col) = name.strip_prefix(&prefix) {
                if !value.is_null() {
                    all_null = false;
                }
                child_columns.push((col.to_owned(), value.clone()));
            }
        }
        let child = if all_null || child_columns.is_empty() {
            None
        } else {
            let mut child_record = Record::new(String::new());
            for (col, value) in child_columns {
                child_record.set(col, value);
            }
            Some(Box::new(child_record))
        };
        record.set_relationship(relationship.clone(), RelationshipValue::ToOne(child));
    }
    for (name, value) in &row.0 {
        if !name.starts_with("_j") {
            record.set(name.clone(), value.clone());
        }
    }
    record
}

trait SelectExt {
    fn distinct_if(self, on: bool) -> Self;
}

impl SelectExt for Select {
    fn distinct_if(self, on: bool) -> Self {
        if on {
            self.distinct()
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_with_flattens_into_a_single_conjunction() {
        let f = and_with(Filter::eq("a", 1), Filter::eq("b", 2));
        match f {
            Filter::And(leaves) => assert_eq!(leaves.len(), 2),
            _ => panic!("expected And"),
        }
    }
}
