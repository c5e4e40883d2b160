//! In-session cache keyed by `(entity, primary key)`, guaranteeing one live
//! instance per row (spec §4.D "Identity map", GLOSSARY).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use ormkit_models::Record;
use ormkit_value::Value;

/// `Value` has no `Hash`/`Eq` impl (it carries an `f64` arm), so the map
/// key is this value's tagged string form rather than the value itself.
fn key_of(value: &Value) -> String {
    match value {
        Value::String(s) => format!("s:{}", s),
        Value::Int(i) => format!("i:{}", i),
        Value::Float(f) => format!("f:{}", f),
        Value::Boolean(b) => format!("b:{}", b),
        Value::DateTime(dt) => format!("d:{}", dt.to_rfc3339()),
        Value::Uuid(u) => format!("u:{}", u),
        Value::Json(j) => format!("j:{}", j),
        Value::Null => "n:".to_owned(),
        Value::List(items) => format!("l:{:?}", items),
    }
}

#[derive(Default)]
pub struct IdentityMap {
    entries: RwLock<HashMap<(String, String), Arc<RwLock<Record>>>>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity: &str, pk: &Value) -> Option<Arc<RwLock<Record>>> {
        self.entries.read().unwrap().get(&(entity.to_owned(), key_of(pk))).cloned()
    }

    /// Inserts if absent, returning the now-canonical instance for `pk`
    /// either way — the first writer wins, matching identity-map semantics.
    pub fn get_or_insert(&self, entity: &str, pk: &Value, record: Record) -> Arc<RwLock<Record>> {
        let key = (entity.to_owned(), key_of(pk));
        let mut entries = self.entries.write().unwrap();
        entries.entry(key).or_insert_with(|| Arc::new(RwLock::new(record))).clone()
    }

    pub fn insert(&self, entity: &str, pk: &Value, record: Record) -> Arc<RwLock<Record>> {
        let key = (entity.to_owned(), key_of(pk));
        let handle = Arc::new(RwLock::new(record));
        self.entries.write().unwrap().insert(key, handle.clone());
        handle
    }

    pub fn remove(&self, entity: &str, pk: &Value) {
        self.entries.write().unwrap().remove(&(entity.to_owned(), key_of(pk)));
    }
}
