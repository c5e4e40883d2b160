//! Bridges the model registry's column metadata (`ormkit_models`) to the
//! migration engine's serializable operation IR (`ormkit_migration_connector`),
//! rendering a `ormkit_value::Value` default down to a SQL literal token.

use ormkit_models::{ColumnDefault as ModelDefault, ColumnDescriptor, ColumnType};
use ormkit_value::Value;

use ormkit_migration_connector::{ColumnDefault, ColumnSpec};

/// The declared type name used for [`ormkit_schema_describer::types_compatible`]
/// comparisons against a live column's reported type name.
pub fn sql_type_name(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Text => "TEXT",
        ColumnType::Int => "INTEGER",
        ColumnType::Float => "FLOAT",
        ColumnType::Boolean => "BOOLEAN",
        ColumnType::DateTime => "TIMESTAMP",
        ColumnType::Uuid => "UUID",
        ColumnType::Json => "JSON",
    }
}

fn render_literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Null => "NULL".to_owned(),
        other => format!("'{}'", other),
    }
}

pub fn column_spec_for(column: &ColumnDescriptor) -> ColumnSpec {
    let mut spec = ColumnSpec::new(column.name.clone(), column.ty);
    if column.nullable {
        spec = spec.nullable();
    }
    if column.primary_key {
        spec = spec.primary_key();
    }
    if column.autoincrement {
        spec = spec.autoincrement();
    }
    if column.unique {
        spec = spec.unique();
    }
    spec.default = column.default.as_ref().map(|d| match d {
        ModelDefault::Literal(v) => ColumnDefault::Literal(render_literal(v)),
        ModelDefault::Function(name) => ColumnDefault::Function(name.clone()),
    });
    spec
}
