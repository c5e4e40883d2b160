//! The introspected-schema IR consumed by the migration engine's autogen
//! diff (spec §4.E). Kept independent of any live database: tests can
//! construct a [`SqlSchema`] by hand as a fixture, exactly as the registry
//! resolution tests construct entities by hand.

use serde::{Deserialize, Serialize};

/// A live database schema, as reported by a `ConnectionPool`'s
/// introspection capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqlSchema {
    pub tables: Vec<Table>,
}

impl SqlSchema {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.get_table(name).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    pub primary_key: Option<PrimaryKey>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn is_column_unique(&self, name: &str) -> bool {
        self.indexes
            .iter()
            .any(|idx| idx.unique && idx.columns.len() == 1 && idx.columns[0] == name)
    }

    pub fn has_index_on(&self, columns: &[String]) -> bool {
        self.indexes.iter().any(|idx| idx.columns == columns)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// The raw, dialect-reported type name (`"INTEGER"`, `"varchar"`, ...).
    pub type_name: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub autoincrement: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefAction {
    Cascade,
    SetNull,
    Restrict,
    NoAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub constraint_name: Option<String>,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub on_delete: RefAction,
    pub on_update: RefAction,
}

/// Equivalence classes used by autogen to decide that a live column's type
/// doesn't need an `AlterColumn`, even though its raw name differs from the
/// model's declared type (spec §4.E).
pub fn types_compatible(declared: &str, live: &str) -> bool {
    fn class(name: &str) -> String {
        let upper = name.to_ascii_uppercase();
        match upper.as_str() {
            "INTEGER" | "INT" | "SERIAL" | "BIGINT" | "BIGSERIAL" => "int".to_string(),
            "TEXT" | "VARCHAR" | "CHARACTER VARYING" | "CHAR" => "text".to_string(),
            "FLOAT" | "REAL" | "DOUBLE PRECISION" | "DOUBLE" => "float".to_string(),
            "BOOLEAN" | "BOOL" => "bool".to_string(),
            "TIMESTAMP" | "TIMESTAMPTZ" | "DATETIME" | "TIMESTAMP WITH TIME ZONE" => {
                "datetime".to_string()
            }
            "JSON" | "JSONB" => "json".to_string(),
            "UUID" => "uuid".to_string(),
            other => other.to_string(),
        }
    }

    class(declared) == class(live)
}
