//! Pure functions from structured query descriptions to `(sql, params)`
//! pairs (spec §4.B). No I/O, no hidden state; a parameter counter is
//! threaded through every sub-emitter so nested filter trees never collide.

use ormkit_value::Value;

use crate::describe::{Columns, Delete, Insert, JoinInfo, OrderBy, Select, SoftDeleteMode, Update};
use crate::filter::{ColumnPath, Filter, Leaf, Operator};
use ormkit_connector::Dialect;

/// Threads the bound-parameter list and, for PostgreSQL, the `$n` counter.
struct ParamBuilder {
    dialect: Dialect,
    params: Vec<Value>,
}

impl ParamBuilder {
    fn new(dialect: Dialect) -> Self {
        Self { dialect, params: Vec::new() }
    }

    fn bind(&mut self, value: Value) -> String {
        self.params.push(value);
        self.dialect.placeholder(self.params.len())
    }
}

/// `(sql, params)` — the sole output shape of every builder function.
pub type Sql = (String, Vec<Value>);

pub fn build_select(select: &Select, dialect: Dialect) -> Sql {
    let mut pb = ParamBuilder::new(dialect);
    let mut sql = String::new();

    sql.push_str("SELECT ");
    if select.distinct {
        sql.push_str("DISTINCT ");
    }
    sql.push_str(&select_list(select));
    sql.push_str(&format!(" FROM {} AS _t0", select.table));

    for (i, join) in select.joins.iter().enumerate() {
        let alias = format!("_j{}", i + 1);
        sql.push_str(&format!(
            " LEFT JOIN {} AS {} ON _t0.{} = {}.{}",
            join.target_table, alias, join.local_column, alias, join.remote_column
        ));
    }

    let where_clause = compile_where(&select.filter, select.soft_delete, "_t0.", &mut pb);
    if let Some(where_clause) = where_clause {
        sql.push_str(" WHERE ");
        sql.push_str(&where_clause);
    }

    if !select.group_by.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(
            &select
                .group_by
                .iter()
                .map(|c| format!("_t0.{}", c))
                .collect::<Vec<_>>()
                .join(", "),
        );
    }

    if let Some(having) = &select.having {
        if let Some(compiled) = compile_filter(having, "_t0.", &mut pb) {
            sql.push_str(" HAVING ");
            sql.push_str(&compiled);
        }
    }

    if !select.order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order_by_list(&select.order_by));
    }

    if let Some(limit) = select.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    if let Some(offset) = select.offset {
        sql.push_str(&format!(" OFFSET {}", offset));
    }

    (sql, pb.params)
}

fn select_list(select: &Select) -> String {
    if select.columns == Columns::Count {
        return "COUNT(*) AS count".to_owned();
    }

    let base = match &select.columns {
        Columns::All => "_t0.*".to_owned(),
        Columns::Explicit(cols) => cols.iter().map(|c| format!("_t0.{}", c)).collect::<Vec<_>>().join(", "),
        Columns::Count => unreachable!(),
    };

    let joined: Vec<String> = select
        .joins
        .iter()
        .enumerate()
        .flat_map(|(i, join)| {
            let alias = format!("_j{}", i + 1);
            join.target_columns
                .iter()
                .map(move |c| format!("{alias}.{c} AS {alias}_{c}", alias = alias, c = c))
        })
        .collect();

    if joined.is_empty() {
        base
    } else {
        format!("{}, {}", base, joined.join(", "))
    }
}

fn order_by_list(order_by: &[OrderBy]) -> String {
    order_by
        .iter()
        .map(|o| format!("_t0.{} {}", o.column, if o.descending { "DESC" } else { "ASC" }))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The single soft-delete injection point (spec §9): every terminal
/// operation routes its `WHERE` clause through here. `alias` is the
/// column prefix to use (`"_t0."` for `SELECT`, where the target table is
/// aliased; `""` for `UPDATE`/`DELETE`, which reference the bare table
/// name and declare no alias).
fn compile_where(filter: &Filter, soft_delete: SoftDeleteMode, alias: &str, pb: &mut ParamBuilder) -> Option<String> {
    let user_clause = compile_filter(filter, alias, pb);

    let soft_delete_clause = match soft_delete {
        SoftDeleteMode::NotApplicable | SoftDeleteMode::WithDeleted => None,
        SoftDeleteMode::Default => Some(format!("{}deleted_at IS NULL", alias)),
        SoftDeleteMode::OnlyDeleted => Some(format!("{}deleted_at IS NOT NULL", alias)),
    };

    match (user_clause, soft_delete_clause) {
        (Some(u), Some(s)) => Some(format!("({}) AND {}", u, s)),
        (Some(u), None) => Some(u),
        (None, Some(s)) => Some(s),
        (None, None) => None,
    }
}

fn compile_filter(filter: &Filter, alias: &str, pb: &mut ParamBuilder) -> Option<String> {
    match filter {
        Filter::Const(true) => None,
        Filter::Const(false) => Some("1 = 0".to_owned()),
        Filter::And(filters) => compile_conjunction(filters, "AND", alias, pb),
        Filter::Or(filters) => compile_conjunction(filters, "OR", alias, pb),
        Filter::Not(inner) => {
            compile_filter(inner, alias, pb).map(|c| format!("NOT ({})", c)).or(Some("1 = 0".to_owned()))
        }
        Filter::Leaf(leaf) => Some(compile_leaf(leaf, alias, pb)),
    }
}

fn compile_conjunction(filters: &[Filter], joiner: &str, alias: &str, pb: &mut ParamBuilder) -> Option<String> {
    let parts: Vec<String> = filters.iter().filter_map(|f| compile_filter(f, alias, pb)).collect();
    if parts.is_empty() {
        None
    } else if parts.len() == 1 {
        Some(parts.into_iter().next().unwrap())
    } else {
        Some(format!("({})", parts.join(&format!(" {} ", joiner))))
    }
}

fn column_ref(path: &ColumnPath, alias: &str) -> String {
    format!("{}{}", alias, path.column)
}

fn json_pointer(segments: &[String]) -> String {
    format!("$.{}", segments.join("."))
}

/// Text-extraction expression for a JSON path, used by every comparison
/// operator except `has_key`/`json_contains` (spec §4.B).
fn json_text_expr(path: &ColumnPath, alias: &str, dialect: Dialect) -> String {
    let col = column_ref(path, alias);
    match dialect {
        Dialect::Postgres => {
            let (init, last) = path.json_path.split_at(path.json_path.len() - 1);
            let mut expr = col;
            for seg in init {
                expr.push_str(&format!("->'{}'", seg));
            }
            expr.push_str(&format!("->>'{}'", last[0]));
            expr
        }
        Dialect::Sqlite => format!("json_extract({}, '{}')", col, json_pointer(&path.json_path)),
    }
}

/// `->` chained jsonb expression (no text extraction), used by `has_key`
/// on PostgreSQL so the `?` operator sees a jsonb value.
fn json_object_expr_pg(path: &ColumnPath, alias: &str) -> String {
    let mut expr = column_ref(path, alias);
    for seg in &path.json_path {
        expr.push_str(&format!("->'{}'", seg));
    }
    expr
}

fn sanitize_json_key(key: &str) -> String {
    key.replace('\'', "''")
}

fn compile_leaf(leaf: &Leaf, alias: &str, pb: &mut ParamBuilder) -> String {
    let is_json = !leaf.path.json_path.is_empty();

    match leaf.op {
        Operator::HasKey => return compile_has_key(leaf, alias, pb),
        Operator::JsonContains => return compile_json_contains(leaf, alias, pb),
        _ => {}
    }

    let lhs = if is_json { json_text_expr(&leaf.path, alias, pb.dialect) } else { column_ref(&leaf.path, alias) };

    match leaf.op {
        Operator::Eq => format!("{} = {}", lhs, pb.bind(leaf.value.clone())),
        Operator::Ne => format!("{} <> {}", lhs, pb.bind(leaf.value.clone())),
        Operator::Gt => format!("{} > {}", lhs, pb.bind(leaf.value.clone())),
        Operator::Gte => format!("{} >= {}", lhs, pb.bind(leaf.value.clone())),
        Operator::Lt => format!("{} < {}", lhs, pb.bind(leaf.value.clone())),
        Operator::Lte => format!("{} <= {}", lhs, pb.bind(leaf.value.clone())),
        Operator::Like => format!("{} LIKE {}", lhs, pb.bind(leaf.value.clone())),
        Operator::ILike => compile_ilike(&lhs, leaf.value.clone(), pb),
        Operator::Contains => format!("{} LIKE {}", lhs, pb.bind(wrap_wildcards(&leaf.value))),
        Operator::IContains => compile_ilike(&lhs, wrap_wildcards(&leaf.value), pb),
        Operator::StartsWith => format!("{} LIKE {}", lhs, pb.bind(wrap_wildcard_suffix(&leaf.value))),
        Operator::IStartsWith => compile_ilike(&lhs, wrap_wildcard_suffix(&leaf.value), pb),
        Operator::EndsWith => format!("{} LIKE {}", lhs, pb.bind(wrap_wildcard_prefix(&leaf.value))),
        Operator::IEndsWith => compile_ilike(&lhs, wrap_wildcard_prefix(&leaf.value), pb),
        Operator::In => compile_in(&lhs, &leaf.value, pb, false),
        Operator::NotIn => compile_in(&lhs, &leaf.value, pb, true),
        Operator::IsNull => {
            if leaf.value.is_truthy() {
                format!("{} IS NULL", lhs)
            } else {
                format!("{} IS NOT NULL", lhs)
            }
        }
        Operator::IsNotNull => format!("{} IS NOT NULL", lhs),
        Operator::HasKey | Operator::JsonContains => unreachable!("handled above"),
    }
}

fn compile_ilike(lhs: &str, value: Value, pb: &mut ParamBuilder) -> String {
    match pb.dialect {
        Dialect::Postgres => format!("{} ILIKE {}", lhs, pb.bind(value)),
        Dialect::Sqlite => format!("lower({}) LIKE lower({})", lhs, pb.bind(value)),
    }
}

fn wrap_wildcards(value: &Value) -> Value {
    Value::from(format!("%{}%", value))
}

fn wrap_wildcard_prefix(value: &Value) -> Value {
    Value::from(format!("%{}", value))
}

fn wrap_wildcard_suffix(value: &Value) -> Value {
    Value::from(format!("{}%", value))
}

fn compile_in(lhs: &str, value: &Value, pb: &mut ParamBuilder, negate: bool) -> String {
    let items = match value {
        Value::List(items) => items.clone(),
        other => vec![other.clone()],
    };
    // An empty set is short-circuited upstream by `Filter::in_set` /
    // `not_in_set`; this is only reached when a caller builds the leaf
    // directly, so fall back to the same constant-folding rule here.
    if items.is_empty() {
        return if negate { "1 = 1".to_owned() } else { "1 = 0".to_owned() };
    }
    let placeholders: Vec<String> = items.into_iter().map(|v| pb.bind(v)).collect();
    format!("{} {}IN ({})", lhs, if negate { "NOT " } else { "" }, placeholders.join(", "))
}

fn compile_has_key(leaf: &Leaf, alias: &str, pb: &mut ParamBuilder) -> String {
    let key = leaf.value.as_str().map(str::to_owned).unwrap_or_else(|| leaf.value.to_string());
    match pb.dialect {
        Dialect::Postgres => {
            let obj = json_object_expr_pg(&leaf.path, alias);
            format!("{} ? {}", obj, pb.bind(Value::from(key)))
        }
        Dialect::Sqlite => {
            let mut segments = leaf.path.json_path.clone();
            segments.push(sanitize_json_key(&key));
            format!("json_extract({}, '{}') IS NOT NULL", column_ref(&leaf.path, alias), json_pointer(&segments))
        }
    }
}

fn compile_json_contains(leaf: &Leaf, alias: &str, pb: &mut ParamBuilder) -> String {
    let json_text = serde_json::to_string(&leaf.value).unwrap_or_else(|_| "null".to_owned());
    match pb.dialect {
        Dialect::Postgres => {
            let col = if leaf.path.json_path.is_empty() {
                column_ref(&leaf.path, alias)
            } else {
                json_object_expr_pg(&leaf.path, alias)
            };
            format!("{} @> {}::jsonb", col, pb.bind(Value::from(json_text)))
        }
        Dialect::Sqlite => {
            let col_expr = if leaf.path.json_path.is_empty() {
                format!("json({})", column_ref(&leaf.path, alias))
            } else {
                format!("json_extract({}, '{}')", column_ref(&leaf.path, alias), json_pointer(&leaf.path.json_path))
            };
            format!("{} = json({})", col_expr, pb.bind(Value::from(json_text)))
        }
    }
}

/// Panics if `insert.rows` is empty; callers (the session's flush queue)
/// never build an `Insert` with nothing to write.
pub fn build_insert(insert: &Insert, dialect: Dialect) -> Sql {
    let mut pb = ParamBuilder::new(dialect);

    let columns: Vec<String> = insert.rows[0].iter().map(|(name, _)| name.clone()).collect();
    let mut sql = format!("INSERT INTO {} ({}) VALUES ", insert.table, columns.join(", "));

    let row_groups: Vec<String> = insert
        .rows
        .iter()
        .map(|row| {
            let placeholders: Vec<String> = row.iter().map(|(_, v)| pb.bind(v.clone())).collect();
            format!("({})", placeholders.join(", "))
        })
        .collect();
    sql.push_str(&row_groups.join(", "));

    if let Some(upsert) = &insert.upsert {
        sql.push_str(&format!(" ON CONFLICT ({}) ", upsert.conflict_target.join(", ")));
        if upsert.do_nothing {
            sql.push_str("DO NOTHING");
        } else {
            let excluded = if dialect.is_postgres() { "EXCLUDED" } else { "excluded" };
            let fields: Vec<String> = upsert
                .update_fields
                .clone()
                .unwrap_or_else(|| columns.iter().filter(|c| !upsert.conflict_target.contains(c)).cloned().collect());
            let assignments: Vec<String> = fields.iter().map(|f| format!("{} = {}.{}", f, excluded, f)).collect();
            sql.push_str("DO UPDATE SET ");
            sql.push_str(&assignments.join(", "));
        }
    }

    if insert.returning {
        sql.push_str(" RETURNING *");
    }

    (sql, pb.params)
}

pub fn build_update(update: &Update, dialect: Dialect) -> Sql {
    let mut pb = ParamBuilder::new(dialect);
    let assignments: Vec<String> =
        update.set.iter().map(|(col, value)| format!("{} = {}", col, pb.bind(value.clone()))).collect();

    let mut sql = format!("UPDATE {} SET {}", update.table, assignments.join(", "));

    if let Some(where_clause) = compile_where(&update.filter, update.soft_delete, "", &mut pb) {
        sql.push_str(" WHERE ");
        sql.push_str(&where_clause);
    }

    (sql, pb.params)
}

pub fn build_delete(delete: &Delete, dialect: Dialect) -> Sql {
    let mut pb = ParamBuilder::new(dialect);
    let mut sql = format!("DELETE FROM {}", delete.table);

    if let Some(where_clause) = compile_where(&delete.filter, delete.soft_delete, "", &mut pb) {
        sql.push_str(" WHERE ");
        sql.push_str(&where_clause);
    }

    (sql, pb.params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::describe::SoftDeleteMode;
    use ormkit_value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_select_is_deterministic() {
        let select = Select::new("users").filter(Filter::eq("name", "Alice"));
        let (sql, params) = build_select(&select, Dialect::Postgres);
        assert_eq!(sql, "SELECT _t0.* FROM users AS _t0 WHERE _t0.name = $1");
        assert_eq!(params, vec![Value::from("Alice")]);

        let (sql2, params2) = build_select(&select, Dialect::Postgres);
        assert_eq!((sql, params), (sql2, params2));
    }

    #[test]
    fn sqlite_uses_question_mark_placeholders() {
        let select = Select::new("users").filter(Filter::eq("name", "Alice"));
        let (sql, _) = build_select(&select, Dialect::Sqlite);
        assert_eq!(sql, "SELECT _t0.* FROM users AS _t0 WHERE _t0.name = ?");
    }

    #[test]
    fn nested_filters_do_not_collide_param_numbers() {
        let select = Select::new("users").filter(Filter::and(vec![
            Filter::eq("name", "Alice"),
            Filter::or(vec![Filter::eq("age", 10), Filter::eq("age", 20)]),
        ]));
        let (sql, params) = build_select(&select, Dialect::Postgres);
        assert_eq!(sql, "SELECT _t0.* FROM users AS _t0 WHERE (_t0.name = $1 AND (_t0.age = $2 OR _t0.age = $3))");
        assert_eq!(params, vec![Value::from("Alice"), Value::from(10), Value::from(20)]);
    }

    #[test]
    fn soft_delete_default_injects_deleted_at_is_null() {
        let select = Select::new("articles").soft_delete(SoftDeleteMode::Default);
        let (sql, _) = build_select(&select, Dialect::Postgres);
        assert_eq!(sql, "SELECT _t0.* FROM articles AS _t0 WHERE _t0.deleted_at IS NULL");
    }

    #[test]
    fn with_deleted_suppresses_the_clause() {
        let select = Select::new("articles").soft_delete(SoftDeleteMode::WithDeleted);
        let (sql, _) = build_select(&select, Dialect::Postgres);
        assert_eq!(sql, "SELECT _t0.* FROM articles AS _t0");
    }

    #[test]
    fn only_deleted_replaces_the_clause() {
        let select = Select::new("articles").soft_delete(SoftDeleteMode::OnlyDeleted);
        let (sql, _) = build_select(&select, Dialect::Postgres);
        assert_eq!(sql, "SELECT _t0.* FROM articles AS _t0 WHERE _t0.deleted_at IS NOT NULL");
    }

    #[test]
    fn soft_delete_combines_with_user_filter() {
        let select =
            Select::new("articles").filter(Filter::eq("title", "Keep")).soft_delete(SoftDeleteMode::Default);
        let (sql, _) = build_select(&select, Dialect::Postgres);
        assert_eq!(sql, "SELECT _t0.* FROM articles AS _t0 WHERE (_t0.title = $1) AND _t0.deleted_at IS NULL");
    }

    #[test]
    fn joined_many_to_one_select_aliases_columns() {
        let select = Select::new("posts").join(JoinInfo {
            relationship: "author".into(),
            target_table: "users".into(),
            local_column: "author_id".into(),
            remote_column: "id".into(),
            target_columns: vec!["id".into(), "name".into()],
        });
        let (sql, _) = build_select(&select, Dialect::Postgres);
        assert_eq!(
            sql,
            "SELECT _t0.*, _j1.id AS _j1_id, _j1.name AS _j1_name FROM posts AS _t0 \
             LEFT JOIN users AS _j1 ON _t0.author_id = _j1.id"
        );
    }

    #[test]
    fn contains_wraps_value_in_wildcards() {
        let select = Select::new("users").filter(Filter::leaf(ColumnPath::simple("name"), Operator::Contains, "bob"));
        let (sql, params) = build_select(&select, Dialect::Postgres);
        assert_eq!(sql, "SELECT _t0.* FROM users AS _t0 WHERE _t0.name LIKE $1");
        assert_eq!(params, vec![Value::from("%bob%")]);
    }

    #[test]
    fn like_passes_value_through_unchanged() {
        let select = Select::new("users").filter(Filter::leaf(ColumnPath::simple("name"), Operator::Like, "bob%"));
        let (_, params) = build_select(&select, Dialect::Postgres);
        assert_eq!(params, vec![Value::from("bob%")]);
    }

    #[test]
    fn isnull_with_truthy_value_emits_is_null() {
        let select = Select::new("users").filter(Filter::leaf(ColumnPath::simple("deleted_at"), Operator::IsNull, true));
        let (sql, _) = build_select(&select, Dialect::Postgres);
        assert_eq!(sql, "SELECT _t0.* FROM users AS _t0 WHERE _t0.deleted_at IS NULL");
    }

    #[test]
    fn isnull_with_falsy_value_emits_is_not_null() {
        let select = Select::new("users").filter(Filter::leaf(ColumnPath::simple("deleted_at"), Operator::IsNull, false));
        let (sql, _) = build_select(&select, Dialect::Postgres);
        assert_eq!(sql, "SELECT _t0.* FROM users AS _t0 WHERE _t0.deleted_at IS NOT NULL");
    }

    #[test]
    fn json_path_emits_postgres_arrow_chain() {
        let select = Select::new("docs")
            .filter(Filter::leaf(ColumnPath::json("data", vec!["a".into(), "b".into()]), Operator::Eq, "x"));
        let (sql, _) = build_select(&select, Dialect::Postgres);
        assert_eq!(sql, "SELECT _t0.* FROM docs AS _t0 WHERE _t0.data->'a'->>'b' = $1");
    }

    #[test]
    fn json_path_emits_sqlite_json_extract() {
        let select = Select::new("docs")
            .filter(Filter::leaf(ColumnPath::json("data", vec!["a".into(), "b".into()]), Operator::Eq, "x"));
        let (sql, _) = build_select(&select, Dialect::Sqlite);
        assert_eq!(sql, "SELECT _t0.* FROM docs AS _t0 WHERE json_extract(_t0.data, '$.a.b') = ?");
    }

    #[test]
    fn has_key_emits_postgres_question_operator() {
        let select = Select::new("docs").filter(Filter::leaf(ColumnPath::simple("data"), Operator::HasKey, "k"));
        let (sql, params) = build_select(&select, Dialect::Postgres);
        assert_eq!(sql, "SELECT _t0.* FROM docs AS _t0 WHERE _t0.data ? $1");
        assert_eq!(params, vec![Value::from("k")]);
    }

    #[test]
    fn has_key_emits_sqlite_json_extract_is_not_null() {
        let select = Select::new("docs").filter(Filter::leaf(ColumnPath::simple("data"), Operator::HasKey, "k"));
        let (sql, _) = build_select(&select, Dialect::Sqlite);
        assert_eq!(sql, "SELECT _t0.* FROM docs AS _t0 WHERE json_extract(_t0.data, '$.k') IS NOT NULL");
    }

    #[test]
    fn insert_multi_row_uses_one_values_clause() {
        let rows = vec![
            vec![("name".to_owned(), Value::from("A")), ("email".to_owned(), Value::from("a@x"))],
            vec![("name".to_owned(), Value::from("B")), ("email".to_owned(), Value::from("b@x"))],
        ];
        let insert = Insert::new("users", rows).returning();
        let (sql, params) = build_insert(&insert, Dialect::Postgres);
        assert_eq!(sql, "INSERT INTO users (name, email) VALUES ($1, $2), ($3, $4) RETURNING *");
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn upsert_do_update_references_excluded() {
        let rows = vec![vec![("email".to_owned(), Value::from("a@x")), ("name".to_owned(), Value::from("New"))]];
        let insert = Insert::new("users", rows).upsert(crate::describe::Upsert {
            conflict_target: vec!["email".into()],
            update_fields: None,
            do_nothing: false,
        });
        let (sql, _) = build_insert(&insert, Dialect::Postgres);
        assert_eq!(
            sql,
            "INSERT INTO users (email, name) VALUES ($1, $2) ON CONFLICT (email) DO UPDATE SET name = EXCLUDED.name"
        );
    }

    #[test]
    fn upsert_do_nothing_on_sqlite_uses_lowercase_excluded_word_absent() {
        let rows = vec![vec![("email".to_owned(), Value::from("a@x"))]];
        let insert = Insert::new("users", rows).upsert(crate::describe::Upsert {
            conflict_target: vec!["email".into()],
            update_fields: None,
            do_nothing: true,
        });
        let (sql, _) = build_insert(&insert, Dialect::Sqlite);
        assert_eq!(sql, "INSERT INTO users (email) VALUES (?) ON CONFLICT (email) DO NOTHING");
    }

    #[test]
    fn update_emits_set_and_where() {
        let update = Update {
            table: "users".into(),
            set: vec![("name".into(), Value::from("New"))],
            filter: Filter::eq("id", 1),
            soft_delete: SoftDeleteMode::NotApplicable,
        };
        let (sql, params) = build_update(&update, Dialect::Postgres);
        assert_eq!(sql, "UPDATE users SET name = $1 WHERE id = $2");
        assert_eq!(params, vec![Value::from("New"), Value::from(1)]);
    }

    #[test]
    fn delete_emits_where() {
        let delete = Delete { table: "users".into(), filter: Filter::eq("id", 1), soft_delete: SoftDeleteMode::NotApplicable };
        let (sql, params) = build_delete(&delete, Dialect::Postgres);
        assert_eq!(sql, "DELETE FROM users WHERE id = $1");
        assert_eq!(params, vec![Value::from(1)]);
    }
}
