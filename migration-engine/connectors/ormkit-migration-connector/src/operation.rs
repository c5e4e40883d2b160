//! The closed operation IR that migration scripts compile into (spec
//! §4.E "Operation IR"). Every variant renders to one or more dialect
//! statements via [`Operation::to_sql`] and, where defined, inverts via
//! [`Operation::reverse`].

use ormkit_connector::Dialect;
use ormkit_models::{ColumnType, RefAction};
use serde::{Deserialize, Serialize};

/// A column's default, stored as the already-rendered SQL token rather
/// than a structured value: the producer (the model's own
/// `ormkit_models::ColumnDefault`, for autogen, or a hand-written literal,
/// for an authored script) is responsible for quoting it. Keeping the
/// operation IR free of `ormkit_value::Value` lets a migration script file
/// round-trip through plain serde without the untagged-enum ambiguity
/// `Value` would introduce on deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnDefault {
    Literal(String),
    Function(String),
}

/// A column definition as it appears in `CreateTable` / `AddColumn`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
    pub autoincrement: bool,
    pub unique: bool,
    pub default: Option<ColumnDefault>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
            primary_key: false,
            autoincrement: false,
            unique: false,
            default: None,
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

    /// `literal` must already be a valid SQL token (quoted if it's a
    /// string), since the IR no longer carries a structured value.
    pub fn default_value(mut self, literal: impl Into<String>) -> Self {
        self.default = Some(ColumnDefault::Literal(literal.into()));
        self
    }

    pub fn default_function(mut self, name: impl Into<String>) -> Self {
        self.default = Some(ColumnDefault::Function(name.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeySpec {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub on_delete: RefAction,
    pub on_update: RefAction,
}

/// What changed on an `AlterColumn` (spec §4.E: "type/nullable/default/rename").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnChange {
    Type { from: ColumnType, to: ColumnType },
    Nullable { from: bool, to: bool },
    Default { from: Option<ColumnDefault>, to: Option<ColumnDefault> },
    Rename { from: String, to: String },
}

impl ColumnChange {
    fn reverse(&self) -> ColumnChange {
        match self {
            ColumnChange::Type { from, to } => ColumnChange::Type { from: *to, to: *from },
            ColumnChange::Nullable { from, to } => ColumnChange::Nullable { from: *to, to: *from },
            ColumnChange::Default { from, to } => ColumnChange::Default { from: to.clone(), to: from.clone() },
            ColumnChange::Rename { from, to } => ColumnChange::Rename { from: to.clone(), to: from.clone() },
        }
    }
}

/// The closed set of schema-change records migration scripts compile into
/// (spec §4.E "Operation IR", GLOSSARY). Drops and other schema-destructive
/// operations may have no reverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    CreateTable { table: String, columns: Vec<ColumnSpec> },
    DropTable { table: String },
    AddColumn { table: String, column: ColumnSpec },
    DropColumn { table: String, column: String, former: Option<ColumnSpec> },
    AlterColumn { table: String, column: String, change: ColumnChange },
    CreateIndex { table: String, index: IndexSpec },
    DropIndex { table: String, name: String, former: Option<IndexSpec> },
    CreateForeignKey { table: String, foreign_key: ForeignKeySpec },
    DropConstraint { table: String, name: String, former: Option<ForeignKeySpec> },
    Execute { sql: String, reverse_sql: Option<String> },
}

impl Operation {
    /// This operation's inverse, if one can be computed without consulting
    /// the live schema. `None` means "not reversible" (spec §4.E), not an
    /// error: callers degrade gracefully (e.g. `downgrade` stops there).
    pub fn reverse(&self) -> Option<Operation> {
        match self {
            Operation::CreateTable { table, .. } => Some(Operation::DropTable { table: table.clone() }),
            Operation::DropTable { .. } => None,
            Operation::AddColumn { table, column } => {
                Some(Operation::DropColumn { table: table.clone(), column: column.name.clone(), former: Some(column.clone()) })
            }
            Operation::DropColumn { table, former, .. } => {
                former.clone().map(|column| Operation::AddColumn { table: table.clone(), column })
            }
            Operation::AlterColumn { table, column, change } => {
                Some(Operation::AlterColumn { table: table.clone(), column: column.clone(), change: change.reverse() })
            }
            Operation::CreateIndex { table, index } => {
                Some(Operation::DropIndex { table: table.clone(), name: index.name.clone(), former: Some(index.clone()) })
            }
            Operation::DropIndex { table, former, .. } => {
                former.clone().map(|index| Operation::CreateIndex { table: table.clone(), index })
            }
            Operation::CreateForeignKey { table, foreign_key } => {
                Some(Operation::DropConstraint { table: table.clone(), name: foreign_key.name.clone(), former: Some(foreign_key.clone()) })
            }
            Operation::DropConstraint { table, former, .. } => {
                former.clone().map(|foreign_key| Operation::CreateForeignKey { table: table.clone(), foreign_key })
            }
            Operation::Execute { reverse_sql, .. } => reverse_sql.clone().map(|sql| Operation::Execute { sql, reverse_sql: None }),
        }
    }

    fn sql_type(ty: ColumnType, dialect: Dialect, autoincrement: bool) -> &'static str {
        use Dialect::*;
        match (ty, dialect, autoincrement) {
            (ColumnType::Int, Postgres, true) => "SERIAL",
            (ColumnType::Int, Sqlite, true) => "INTEGER",
            (ColumnType::Int, _, false) => "INTEGER",
            (ColumnType::Text, _, _) => "TEXT",
            (ColumnType::Float, Postgres, _) => "DOUBLE PRECISION",
            (ColumnType::Float, Sqlite, _) => "REAL",
            (ColumnType::Boolean, _, _) => "BOOLEAN",
            (ColumnType::DateTime, Postgres, _) => "TIMESTAMPTZ",
            (ColumnType::DateTime, Sqlite, _) => "DATETIME",
            (ColumnType::Uuid, Postgres, _) => "UUID",
            (ColumnType::Uuid, Sqlite, _) => "TEXT",
            (ColumnType::Json, Postgres, _) => "JSONB",
            (ColumnType::Json, Sqlite, _) => "TEXT",
        }
    }

    fn column_ddl(column: &ColumnSpec, dialect: Dialect) -> String {
        let mut parts = vec![column.name.clone(), Self::sql_type(column.ty, dialect, column.autoincrement).to_owned()];
        if column.primary_key && !(column.autoincrement && dialect == Dialect::Sqlite) {
            parts.push("PRIMARY KEY".to_owned());
        } else if column.autoincrement && dialect == Dialect::Sqlite {
            parts.push("PRIMARY KEY AUTOINCREMENT".to_owned());
        }
        if !column.nullable && !column.primary_key {
            parts.push("NOT NULL".to_owned());
        }
        if column.unique && !column.primary_key {
            parts.push("UNIQUE".to_owned());
        }
        if let Some(default) = &column.default {
            parts.push(format!("DEFAULT {}", render_default(default)));
        }
        parts.join(" ")
    }

    /// Renders this operation to one or more statements for `dialect`
    /// (spec §4.E "Each has `to_sql(dialect)` producing one or more
    /// statements").
    pub fn to_sql(&self, dialect: Dialect) -> Vec<String> {
        match self {
            Operation::CreateTable { table, columns } => {
                let cols = columns.iter().map(|c| Self::column_ddl(c, dialect)).collect::<Vec<_>>().join(", ");
                vec![format!("CREATE TABLE {} ({})", table, cols)]
            }
            Operation::DropTable { table } => vec![format!("DROP TABLE {}", table)],
            Operation::AddColumn { table, column } => {
                vec![format!("ALTER TABLE {} ADD COLUMN {}", table, Self::column_ddl(column, dialect))]
            }
            Operation::DropColumn { table, column, .. } => vec![format!("ALTER TABLE {} DROP COLUMN {}", table, column)],
            Operation::AlterColumn { table, column, change } => alter_column_sql(table, column, change, dialect),
            Operation::CreateIndex { table, index } => {
                let unique = if index.unique { "UNIQUE " } else { "" };
                vec![format!("CREATE {}INDEX {} ON {} ({})", unique, index.name, table, index.columns.join(", "))]
            }
            Operation::DropIndex { name, .. } => vec![format!("DROP INDEX {}", name)],
            Operation::CreateForeignKey { table, foreign_key } => vec![format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
                table,
                foreign_key.name,
                foreign_key.columns.join(", "),
                foreign_key.referenced_table,
                foreign_key.referenced_columns.join(", "),
                ref_action_sql(foreign_key.on_delete),
                ref_action_sql(foreign_key.on_update),
            )],
            Operation::DropConstraint { table, name, .. } => vec![format!("ALTER TABLE {} DROP CONSTRAINT {}", table, name)],
            Operation::Execute { sql, .. } => vec![sql.clone()],
        }
    }
}

fn ref_action_sql(action: RefAction) -> &'static str {
    match action {
        RefAction::Cascade => "CASCADE",
        RefAction::SetNull => "SET NULL",
        RefAction::Restrict => "RESTRICT",
        RefAction::NoAction => "NO ACTION",
    }
}

fn render_default(default: &ColumnDefault) -> String {
    match default {
        ColumnDefault::Literal(token) => token.clone(),
        ColumnDefault::Function(name) => format!("{}()", name),
    }
}

/// SQLite cannot alter a column's type, nullability, or name in place
/// (no `MODIFY`/`ALTER COLUMN`); Postgres can express each change
/// directly. SQLite migrations needing these changes go through the
/// table-rebuild dance elsewhere; here we emit what each dialect natively
/// supports and nothing more, matching §4.E's "producing one or more
/// statements" without inventing unsupported syntax.
fn alter_column_sql(table: &str, column: &str, change: &ColumnChange, dialect: Dialect) -> Vec<String> {
    match (change, dialect) {
        (ColumnChange::Rename { to, .. }, Dialect::Postgres) => {
            vec![format!("ALTER TABLE {} RENAME COLUMN {} TO {}", table, column, to)]
        }
        (ColumnChange::Rename { to, .. }, Dialect::Sqlite) => {
            vec![format!("ALTER TABLE {} RENAME COLUMN {} TO {}", table, column, to)]
        }
        (ColumnChange::Type { to, .. }, Dialect::Postgres) => {
            vec![format!("ALTER TABLE {} ALTER COLUMN {} TYPE {}", table, column, Operation::sql_type(*to, dialect, false))]
        }
        (ColumnChange::Nullable { to, .. }, Dialect::Postgres) => {
            let clause = if *to { "DROP NOT NULL" } else { "SET NOT NULL" };
            vec![format!("ALTER TABLE {} ALTER COLUMN {} {}", table, column, clause)]
        }
        (ColumnChange::Default { to: Some(default), .. }, Dialect::Postgres) => {
            vec![format!("ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}", table, column, render_default(default))]
        }
        (ColumnChange::Default { to: None, .. }, Dialect::Postgres) => {
            vec![format!("ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT", table, column)]
        }
        (_, Dialect::Sqlite) => {
            vec![format!(
                "-- sqlite cannot alter {}.{} in place; recreate the table to apply this change",
                table, column
            )]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_table_renders_columns_in_order() {
        let op = Operation::CreateTable {
            table: "users".into(),
            columns: vec![
                ColumnSpec::new("id", ColumnType::Int).autoincrement(),
                ColumnSpec::new("name", ColumnType::Text),
            ],
        };
        assert_eq!(
            op.to_sql(Dialect::Postgres),
            vec!["CREATE TABLE users (id SERIAL PRIMARY KEY, name TEXT NOT NULL)".to_owned()]
        );
        assert_eq!(
            op.to_sql(Dialect::Sqlite),
            vec!["CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL)".to_owned()]
        );
    }

    #[test]
    fn create_table_reverses_to_drop_table() {
        let op = Operation::CreateTable { table: "t".into(), columns: vec![] };
        assert_eq!(op.reverse(), Some(Operation::DropTable { table: "t".into() }));
    }

    #[test]
    fn drop_table_has_no_reverse() {
        assert_eq!(Operation::DropTable { table: "t".into() }.reverse(), None);
    }

    #[test]
    fn add_column_reverses_to_drop_column_with_former_spec() {
        let column = ColumnSpec::new("age", ColumnType::Int).nullable();
        let op = Operation::AddColumn { table: "t".into(), column: column.clone() };
        assert_eq!(op.reverse(), Some(Operation::DropColumn { table: "t".into(), column: "age".into(), former: Some(column) }));
    }

    #[test]
    fn drop_column_without_former_spec_is_not_reversible() {
        let op = Operation::DropColumn { table: "t".into(), column: "age".into(), former: None };
        assert_eq!(op.reverse(), None);
    }

    #[test]
    fn alter_column_type_change_reverses_types() {
        let change = ColumnChange::Type { from: ColumnType::Int, to: ColumnType::Text };
        let op = Operation::AlterColumn { table: "t".into(), column: "c".into(), change: change.clone() };
        assert_eq!(
            op.reverse(),
            Some(Operation::AlterColumn {
                table: "t".into(),
                column: "c".into(),
                change: ColumnChange::Type { from: ColumnType::Text, to: ColumnType::Int }
            })
        );
    }

    #[test]
    fn create_foreign_key_renders_actions() {
        let op = Operation::CreateForeignKey {
            table: "posts".into(),
            foreign_key: ForeignKeySpec {
                name: "fk_posts_author".into(),
                columns: vec!["author_id".into()],
                referenced_table: "users".into(),
                referenced_columns: vec!["id".into()],
                on_delete: RefAction::Cascade,
                on_update: RefAction::NoAction,
            },
        };
        assert_eq!(
            op.to_sql(Dialect::Postgres),
            vec!["ALTER TABLE posts ADD CONSTRAINT fk_posts_author FOREIGN KEY (author_id) REFERENCES users (id) ON DELETE CASCADE ON UPDATE NO ACTION".to_owned()]
        );
    }

    #[test]
    fn execute_with_no_reverse_sql_is_not_reversible() {
        let op = Operation::Execute { sql: "VACUUM".into(), reverse_sql: None };
        assert_eq!(op.reverse(), None);
    }

    #[test]
    fn execute_with_reverse_sql_reverses() {
        let op = Operation::Execute { sql: "DROP VIEW v".into(), reverse_sql: Some("CREATE VIEW v AS SELECT 1".into()) };
        assert_eq!(op.reverse(), Some(Operation::Execute { sql: "CREATE VIEW v AS SELECT 1".into(), reverse_sql: None }));
    }
}
