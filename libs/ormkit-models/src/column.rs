use ormkit_value::Value;
use serde::{Deserialize, Serialize};

/// The column's scalar type, independent of dialect.
///
/// Also the type the migration engine's operation IR renders to dialect
/// DDL (spec §4.E); `Serialize`/`Deserialize` let it round-trip through a
/// migration script file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Text,
    Int,
    Float,
    Boolean,
    DateTime,
    Uuid,
    Json,
}

/// Referential action taken on the referenced row's deletion or update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefAction {
    Cascade,
    SetNull,
    Restrict,
    NoAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
    pub on_delete: RefAction,
    pub on_update: RefAction,
}

/// A column's default, either a fixed value or the name of a
/// connector-provided default-producing function (e.g. `"now"`).
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnDefault {
    Literal(Value),
    Function(String),
}

#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub indexed: bool,
    pub default: Option<ColumnDefault>,
    pub max_length: Option<u32>,
    pub foreign_key: Option<ForeignKeyRef>,
    pub json: bool,
    pub autoincrement: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
            primary_key: false,
            unique: false,
            indexed: false,
            default: None,
            max_length: None,
            foreign_key: None,
            json: matches!(ty, ColumnType::Json),
            autoincrement: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn max_length(mut self, n: u32) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn default_value(mut self, v: Value) -> Self {
        self.default = Some(ColumnDefault::Literal(v));
        self
    }

    pub fn default_function(mut self, name: impl Into<String>) -> Self {
        self.default = Some(ColumnDefault::Function(name.into()));
        self
    }

    pub fn foreign_key(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key = Some(ForeignKeyRef {
            table: table.into(),
            column: column.into(),
            on_delete: RefAction::NoAction,
            on_update: RefAction::NoAction,
        });
        self
    }

    pub fn on_delete(mut self, action: RefAction) -> Self {
        if let Some(fk) = self.foreign_key.as_mut() {
            fk.on_delete = action;
        }
        self
    }
}
