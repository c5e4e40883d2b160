//! Diffs a `--models` manifest against a live schema (spec §4.E
//! "Autogen"), the CLI-facing counterpart to
//! [`ormkit_sql_migration_connector::diff`] for callers that only have a
//! JSON export of their entity registry rather than live
//! `EntityDescriptor`s in-process. Same pairing pattern (added / dropped
//! / type-mismatched / missing-index columns), reapplied to
//! [`EntityManifest`]'s already-rendered [`ColumnSpec`]s.

use ormkit_migration_connector::{ColumnChange, IndexSpec, Operation};
use ormkit_models::ColumnType;
use ormkit_schema_describer::{types_compatible, SqlSchema};
use ormkit_sql_migration_connector::sql_type_name;

use crate::manifest::EntityManifest;

fn live_type_to_column_type(live_type: &str) -> ColumnType {
    use ColumnType::*;
    match live_type.to_ascii_uppercase().as_str() {
        "TEXT" | "VARCHAR" | "CHARACTER VARYING" | "CHAR" => Text,
        "BOOLEAN" | "BOOL" => Boolean,
        "FLOAT" | "REAL" | "DOUBLE PRECISION" | "DOUBLE" => Float,
        "TIMESTAMP" | "TIMESTAMPTZ" | "DATETIME" | "TIMESTAMP WITH TIME ZONE" => DateTime,
        "JSON" | "JSONB" => Json,
        "UUID" => Uuid,
        _ => Int,
    }
}

/// Dropping a table is never auto-generated (spec §4.E "too dangerous").
pub fn diff(entities: &[EntityManifest], live: &SqlSchema) -> Vec<Operation> {
    let mut operations = Vec::new();

    for entity in entities {
        let Some(table) = live.get_table(&entity.table) else {
            operations.push(Operation::CreateTable { table: entity.table.clone(), columns: entity.columns.clone() });
            continue;
        };

        for column in &entity.columns {
            if !table.has_column(&column.name) {
                operations.push(Operation::AddColumn { table: entity.table.clone(), column: column.clone() });
            }
        }

        for live_column in &table.columns {
            if !entity.columns.iter().any(|c| c.name == live_column.name) {
                operations.push(Operation::DropColumn { table: entity.table.clone(), column: live_column.name.clone(), former: None });
            }
        }

        for column in &entity.columns {
            let Some(live_column) = table.column(&column.name) else { continue };
            let declared_type = sql_type_name(column.ty);
            if !types_compatible(declared_type, &live_column.type_name) {
                operations.push(Operation::AlterColumn {
                    table: entity.table.clone(),
                    column: column.name.clone(),
                    change: ColumnChange::Type { from: live_type_to_column_type(&live_column.type_name), to: column.ty },
                });
            }
        }

        for column in entity.columns.iter().filter(|c| c.unique) {
            if !table.has_index_on(&[column.name.clone()]) {
                let name = format!("{}_{}_idx", entity.table, column.name);
                operations.push(Operation::CreateIndex {
                    table: entity.table.clone(),
                    index: IndexSpec { name, columns: vec![column.name.clone()], unique: true },
                });
            }
        }
    }

    operations
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormkit_migration_connector::ColumnSpec;
    use ormkit_schema_describer::{Column as LiveColumn, Table};

    fn manifest() -> Vec<EntityManifest> {
        vec![EntityManifest {
            table: "users".into(),
            columns: vec![
                ColumnSpec::new("id", ColumnType::Int).primary_key().autoincrement(),
                ColumnSpec::new("email", ColumnType::Text).unique(),
            ],
        }]
    }

    #[test]
    fn new_table_emits_create_table() {
        let ops = diff(&manifest(), &SqlSchema::empty());
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], Operation::CreateTable { table, .. } if table == "users"));
    }

    #[test]
    fn missing_column_emits_add_column_and_index() {
        let live = SqlSchema {
            tables: vec![Table {
                name: "users".into(),
                columns: vec![LiveColumn { name: "id".into(), type_name: "INTEGER".into(), nullable: false, default: None, autoincrement: true }],
                indexes: vec![],
                primary_key: None,
                foreign_keys: vec![],
            }],
        };
        let ops = diff(&manifest(), &live);
        assert!(ops.iter().any(|op| matches!(op, Operation::AddColumn { column, .. } if column.name == "email")));
        assert!(ops.iter().any(|op| matches!(op, Operation::CreateIndex { index, .. } if index.columns == vec!["email".to_owned()])));
    }

    #[test]
    fn matching_schema_emits_nothing() {
        let live = SqlSchema {
            tables: vec![Table {
                name: "users".into(),
                columns: vec![
                    LiveColumn { name: "id".into(), type_name: "INTEGER".into(), nullable: false, default: None, autoincrement: true },
                    LiveColumn { name: "email".into(), type_name: "TEXT".into(), nullable: false, default: None, autoincrement: false },
                ],
                indexes: vec![ormkit_schema_describer::Index { name: "users_email_idx".into(), columns: vec!["email".into()], unique: true }],
                primary_key: None,
                foreign_keys: vec![],
            }],
        };
        assert!(diff(&manifest(), &live).is_empty());
    }
}
