//! Schema differ / autogen (spec §4.E "Autogen"). Compares the model
//! registry's derived schema against a live [`SqlSchema`] snapshot and
//! emits the operations needed to bring the live schema in line, the way
//! the teacher's `TableDiffer` pairs previous/next columns by name to
//! compute added/dropped/matched sets.

use ormkit_models::EntityDescriptor;
use ormkit_schema_describer::{types_compatible, SqlSchema, Table};

use ormkit_migration_connector::{ColumnSpec, Operation};

use crate::render::{column_spec_for, sql_type_name};

/// One entity's derived shape against the live table with the same name,
/// or `None` on either side when the table doesn't exist yet.
struct TableDiffer<'a> {
    entity: &'a EntityDescriptor,
    live: Option<&'a Table>,
}

impl<'a> TableDiffer<'a> {
    fn added_columns(&self) -> impl Iterator<Item = &'a ormkit_models::ColumnDescriptor> + '_ {
        let live = self.live;
        self.entity.columns.iter().filter(move |c| !live.map(|t| t.has_column(&c.name)).unwrap_or(false))
    }

    fn dropped_columns(&self) -> Vec<String> {
        match self.live {
            None => Vec::new(),
            Some(table) => table.columns.iter().filter(|c| self.entity.column(&c.name).is_none()).map(|c| c.name.clone()).collect(),
        }
    }

    fn type_mismatched_columns(&self) -> Vec<(&'a ormkit_models::ColumnDescriptor, String)> {
        let Some(table) = self.live else { return Vec::new() };
        self.entity
            .columns
            .iter()
            .filter_map(|declared| {
                let live_column = table.column(&declared.name)?;
                let declared_type = sql_type_name(declared.ty);
                if types_compatible(declared_type, &live_column.type_name) {
                    None
                } else {
                    Some((declared, live_column.type_name.clone()))
                }
            })
            .collect()
    }

    fn missing_indexes(&self) -> Vec<Vec<String>> {
        let declared_unique_single_column: Vec<Vec<String>> =
            self.entity.columns.iter().filter(|c| c.unique || c.indexed).map(|c| vec![c.name.clone()]).collect();

        declared_unique_single_column
            .into_iter()
            .filter(|columns| !self.live.map(|t| t.has_index_on(columns)).unwrap_or(false))
            .collect()
    }
}

/// Diff every entity in `entities` against `live`, in registration order.
/// Dropping a table is never auto-generated (spec §4.E "too dangerous").
pub fn diff(entities: &[&EntityDescriptor], live: &SqlSchema) -> Vec<Operation> {
    let mut operations = Vec::new();

    for entity in entities {
        let live_table = live.get_table(&entity.table);
        let differ = TableDiffer { entity, live: live_table };

        if live_table.is_none() {
            operations.push(Operation::CreateTable {
                table: entity.table.clone(),
                columns: entity.columns.iter().map(|c| column_spec_for(c)).collect(),
            });
            continue;
        }

        for column in differ.added_columns() {
            operations.push(Operation::AddColumn { table: entity.table.clone(), column: column_spec_for(column) });
        }

        for column in differ.dropped_columns() {
            operations.push(Operation::DropColumn { table: entity.table.clone(), column, former: None });
        }

        for (declared, live_type) in differ.type_mismatched_columns() {
            operations.push(Operation::AlterColumn {
                table: entity.table.clone(),
                column: declared.name.clone(),
                change: ormkit_migration_connector::ColumnChange::Type {
                    from: live_type_to_column_type(&live_type),
                    to: declared.ty,
                },
            });
        }

        for columns in differ.missing_indexes() {
            let name = format!("{}_{}_idx", entity.table, columns.join("_"));
            operations.push(Operation::CreateIndex {
                table: entity.table.clone(),
                index: ormkit_migration_connector::IndexSpec { name, columns, unique: false },
            });
        }
    }

    operations
}

fn live_type_to_column_type(live_type: &str) -> ormkit_models::ColumnType {
    use ormkit_models::ColumnType::*;
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
