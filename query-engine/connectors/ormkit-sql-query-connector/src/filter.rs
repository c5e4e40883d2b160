//! The composable boolean expression tree that every terminal query
//! operation (`count`, `exists`, `delete`, `update`, `stream`, ...) filters
//! through a single builder injection point (spec §4.B, §9).
//!
//! The source exposes two surface syntaxes — keyword conjunction and a
//! composable `Q`-like object — that both lower to this one tree (§9
//! "Filter tree and Q composition"). [`Filter::from_kwargs`] models the
//! former; [`Filter::and`]/[`Filter::or`]/[`Filter::not`] model the latter.

use ormkit_value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Leaf(Leaf),
    /// A constant, produced by short-circuiting an empty `in`/`notin` set.
    Const(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub path: ColumnPath,
    pub op: Operator,
    pub value: Value,
}

/// A column, optionally followed by a JSON traversal path (`col.k1.k2`).
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPath {
    pub column: String,
    pub json_path: Vec<String>,
}

impl ColumnPath {
    pub fn simple(column: impl Into<String>) -> Self {
        Self { column: column.into(), json_path: Vec::new() }
    }

    pub fn json(column: impl Into<String>, path: Vec<String>) -> Self {
        Self { column: column.into(), json_path: path }
    }

    /// Parse a dotted path such as `profile.address.city`.
    pub fn parse(raw: &str) -> Self {
        let mut segments = raw.split('.');
        let column = segments.next().unwrap_or(raw).to_owned();
        let json_path = segments.map(str::to_owned).collect();
        Self { column, json_path }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Contains,
    IContains,
    StartsWith,
    IStartsWith,
    EndsWith,
    IEndsWith,
    HasKey,
    JsonContains,
}

impl Operator {
    /// Parse the `__op` suffix convention used by [`Filter::from_kwargs`].
    /// An unrecognised suffix falls back to `Eq` rather than erroring
    /// (spec §7 "operator unknown ⇒ falls back to `=`").
    fn from_suffix(suffix: &str) -> Operator {
        match suffix {
            "ne" => Operator::Ne,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "like" => Operator::Like,
            "ilike" => Operator::ILike,
            "in" => Operator::In,
            "notin" => Operator::NotIn,
            "isnull" => Operator::IsNull,
            "isnotnull" => Operator::IsNotNull,
            "contains" => Operator::Contains,
            "icontains" => Operator::IContains,
            "startswith" => Operator::StartsWith,
            "istartswith" => Operator::IStartsWith,
            "endswith" => Operator::EndsWith,
            "iendswith" => Operator::IEndsWith,
            "has_key" => Operator::HasKey,
            "json_contains" => Operator::JsonContains,
            _ => Operator::Eq,
        }
    }
}

impl Filter {
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    pub fn leaf(path: ColumnPath, op: Operator, value: impl Into<Value>) -> Self {
        Filter::Leaf(Leaf { path, op, value: value.into() })
    }

    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::leaf(ColumnPath::simple(column), Operator::Eq, value)
    }

    /// `IN` with an empty set short-circuits to constant false (spec §3, §7).
    pub fn in_set(column: &str, values: Vec<Value>) -> Self {
        if values.is_empty() {
            Filter::Const(false)
        } else {
            Self::leaf(ColumnPath::simple(column), Operator::In, Value::List(values))
        }
    }

    /// `NOT IN` with an empty set short-circuits to constant true.
    pub fn not_in_set(column: &str, values: Vec<Value>) -> Self {
        if values.is_empty() {
            Filter::Const(true)
        } else {
            Self::leaf(ColumnPath::simple(column), Operator::NotIn, Value::List(values))
        }
    }

    /// One conjunction built from `(path__op, value)` pairs; within a single
    /// call, leaves are AND-joined (§9).
    pub fn from_kwargs(pairs: Vec<(&str, Value)>) -> Self {
        let leaves = pairs
            .into_iter()
            .map(|(key, value)| {
                let (path, op) = match key.rsplit_once("__") {
                    Some((path, suffix)) if is_known_suffix(suffix) => (path, Operator::from_suffix(suffix)),
                    _ => (key, Operator::Eq),
                };
                Filter::Leaf(Leaf { path: ColumnPath::parse(path), op, value })
            })
            .collect();
        Filter::And(leaves)
    }
}

fn is_known_suffix(suffix: &str) -> bool {
    matches!(
        suffix,
        "ne" | "gt"
            | "gte"
            | "lt"
            | "lte"
            | "like"
            | "ilike"
            | "in"
            | "notin"
            | "isnull"
            | "isnotnull"
            | "contains"
            | "icontains"
            | "startswith"
            | "istartswith"
            | "endswith"
            | "iendswith"
            | "has_key"
            | "json_contains"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_in_short_circuits_false() {
        assert_eq!(Filter::in_set("id", vec![]), Filter::Const(false));
    }

    #[test]
    fn empty_notin_short_circuits_true() {
        assert_eq!(Filter::not_in_set("id", vec![]), Filter::Const(true));
    }

    #[test]
    fn unknown_suffix_falls_back_to_eq() {
        let f = Filter::from_kwargs(vec![("name__frobnicate", Value::from("x"))]);
        match f {
            Filter::And(leaves) => {
                assert_eq!(leaves.len(), 1);
                match &leaves[0] {
                    Filter::Leaf(l) => {
                        assert_eq!(l.op, Operator::Eq);
                        assert_eq!(l.path.column, "name__frobnicate");
                    }
                    _ => panic!("expected leaf"),
                }
            }
            _ => panic!("expected and"),
        }
    }

    #[test]
    fn known_suffix_is_stripped() {
        let f = Filter::from_kwargs(vec![("age__gte", Value::from(18))]);
        match f {
            Filter::And(leaves) => match &leaves[0] {
                Filter::Leaf(l) => {
                    assert_eq!(l.op, Operator::Gte);
                    assert_eq!(l.path.column, "age");
                }
                _ => panic!(),
            },
            _ => panic!(),
        }
    }

    #[test]
    fn dotted_path_splits_into_json_segments() {
        let path = ColumnPath::parse("profile.address.city");
        assert_eq!(path.column, "profile");
        assert_eq!(path.json_path, vec!["address".to_owned(), "city".to_owned()]);
    }
}
