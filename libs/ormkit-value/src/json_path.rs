/// Walk a JSON document following a dotted path of keys, the way the SQL
/// builder's `col.k1.k2` column paths are interpreted (see `ormkit-sql-query-connector::json_path`).
///
/// Missing keys yield `None` rather than an error — callers compile this
/// into a predicate that can never raise on absent keys, only compare false.
pub fn json_extract<'a>(value: &'a serde_json::Value, path: &[&str]) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for segment in path {
        current = current.as_object()?.get(*segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_key_is_none_not_error() {
        let doc = json!({"a": {"b": 1}});
        assert_eq!(json_extract(&doc, &["a", "missing"]), None);
    }

    #[test]
    fn nested_path_resolves() {
        let doc = json!({"a": {"b": 1}});
        assert_eq!(json_extract(&doc, &["a", "b"]), Some(&json!(1)));
    }
}
