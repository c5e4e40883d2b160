//! Structured, dialect-agnostic descriptions of the four statement shapes
//! the builder emits (spec §4.B). These are plain data; building one does
//! no I/O and has no hidden state.

use ormkit_value::Value;

use crate::filter::Filter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self { column: column.into(), descending: false }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self { column: column.into(), descending: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Columns {
    All,
    Explicit(Vec<String>),
    /// `COUNT(*)`, for `Query::count()` — never combined with `limit`/`offset`
    /// (spec §4.D "count ignores the pagination window").
    Count,
}

/// Whether, and how, a soft-delete entity's `deleted_at` predicate gets
/// injected into a query's `WHERE` clause (spec §4.B "Soft delete").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftDeleteMode {
    NotApplicable,
    Default,
    WithDeleted,
    OnlyDeleted,
}

/// One eager many-to-one `LEFT JOIN`, selected with `alias.col AS alias_col`
/// so hydration can demultiplex rows (spec §4.B).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinInfo {
    pub relationship: String,
    pub target_table: String,
    pub local_column: String,
    pub remote_column: String,
    pub target_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: String,
    pub filter: Filter,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub distinct: bool,
    pub group_by: Vec<String>,
    pub having: Option<Filter>,
    pub joins: Vec<JoinInfo>,
    pub soft_delete: SoftDeleteMode,
    pub columns: Columns,
}

impl Select {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: Filter::And(vec![]),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            distinct: false,
            group_by: Vec::new(),
            having: None,
            joins: Vec::new(),
            soft_delete: SoftDeleteMode::NotApplicable,
            columns: Columns::All,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
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

    pub fn join(mut self, join: JoinInfo) -> Self {
        self.joins.push(join);
        self
    }

    pub fn soft_delete(mut self, mode: SoftDeleteMode) -> Self {
        self.soft_delete = mode;
        self
    }

    pub fn columns(mut self, columns: Columns) -> Self {
        self.columns = columns;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Upsert {
    pub conflict_target: Vec<String>,
    pub update_fields: Option<Vec<String>>,
    pub do_nothing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
    pub rows: Vec<Vec<(String, Value)>>,
    pub upsert: Option<Upsert>,
    pub returning: bool,
}

impl Insert {
    pub fn new(table: impl Into<String>, rows: Vec<Vec<(String, Value)>>) -> Self {
        Self { table: table.into(), rows, upsert: None, returning: false }
    }

    pub fn upsert(mut self, upsert: Upsert) -> Self {
        self.upsert = Some(upsert);
        self
    }

    pub fn returning(mut self) -> Self {
        self.returning = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,
    pub set: Vec<(String, Value)>,
    pub filter: Filter,
    pub soft_delete: SoftDeleteMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: String,
    pub filter: Filter,
    pub soft_delete: SoftDeleteMode,
}
