use std::collections::HashMap;

use ormkit_value::Value;

/// An entity instance: column values plus whichever relationships have
/// been loaded so far. A relationship attribute absent from `relationships`
/// has not been loaded; reading it is the caller's (or the session's)
/// responsibility to reject, default, or resolve against a live M2M
/// collection, per the relationship's lazy policy (§3, §7 "Lazy-load misuse").
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub entity: String,
    pub columns: HashMap<String, Value>,
    pub relationships: HashMap<String, RelationshipValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelationshipValue {
    ToOne(Option<Box<Record>>),
    ToMany(Vec<Record>),
}

impl Record {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            columns: HashMap::new(),
            relationships: HashMap::new(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.columns.insert(column.into(), value);
    }

    pub fn is_loaded(&self, relationship: &str) -> bool {
        self.relationships.contains_key(relationship)
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipValue> {
        self.relationships.get(name)
    }

    pub fn set_relationship(&mut self, name: impl Into<String>, value: RelationshipValue) {
        self.relationships.insert(name.into(), value);
    }
}
