use std::fmt;

use ormkit_models::{EntityDescriptor, Record};
use ormkit_value::Value;

/// One result row, column order preserved as returned by the driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(pub Vec<(String, Value)>);

impl Row {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.iter().map(|(_, v)| v)
    }
}

/// Raised when a caller asks for exactly one row (or at most one) and the
/// result set disagrees (spec §7 "Not-found").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCountError {
    pub expected: &'static str,
    pub actual: usize,
}

impl fmt::Display for RowCountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {} row(s), got {}", self.expected, self.actual)
    }
}

impl std::error::Error for RowCountError {}

/// The result of a single `execute` call: `rowcount` plus the materialized
/// rows, with the handful of terminal accessors the `ConnectionPool`
/// capability exposes (spec §6).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub rowcount: u64,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn new(rows: Vec<Row>) -> Self {
        let rowcount = rows.len() as u64;
        Self { rowcount, rows }
    }

    pub fn with_rowcount(rowcount: u64) -> Self {
        Self { rowcount, rows: Vec::new() }
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn all(&self) -> &[Row] {
        &self.rows
    }

    pub fn one(&self) -> Result<&Row, RowCountError> {
        match self.rows.len() {
            1 => Ok(&self.rows[0]),
            n => Err(RowCountError { expected: "exactly one", actual: n }),
        }
    }

    pub fn one_or_none(&self) -> Result<Option<&Row>, RowCountError> {
        match self.rows.len() {
            0 => Ok(None),
            1 => Ok(Some(&self.rows[0])),
            n => Err(RowCountError { expected: "zero or one", actual: n }),
        }
    }

    pub fn column(&self, name: &str) -> Vec<Option<&Value>> {
        self.rows.iter().map(|row| row.get(name)).collect()
    }

    pub fn tuples(&self) -> Vec<Vec<&Value>> {
        self.rows.iter().map(|row| row.values().collect()).collect()
    }

    /// Hydrate a single row into a typed `Record`, handling JSON-column
    /// deserialization per the entity's column metadata.
    pub fn to_model(&self, entity: &EntityDescriptor) -> Option<Record> {
        self.rows.first().map(|row| row_to_record(row, entity))
    }

    pub fn to_models(&self, entity: &EntityDescriptor) -> Vec<Record> {
        self.rows.iter().map(|row| row_to_record(row, entity)).collect()
    }
}

fn row_to_record(row: &Row, entity: &EntityDescriptor) -> Record {
    let mut record = Record::new(entity.name.clone());
    for (column, value) in &row.0 {
        record.set(column.clone(), value.clone());
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_rejects_empty_and_multi_row_results() {
        let empty = QueryResult::new(vec![]);
        assert!(empty.one().is_err());

        let multi = QueryResult::new(vec![Row::default(), Row::default()]);
        assert!(multi.one().is_err());

        let single = QueryResult::new(vec![Row::default()]);
        assert!(single.one().is_ok());
    }

    #[test]
    fn one_or_none_allows_zero_but_not_many() {
        let empty = QueryResult::new(vec![]);
        assert_eq!(empty.one_or_none().unwrap(), None);

        let multi = QueryResult::new(vec![Row::default(), Row::default()]);
        assert!(multi.one_or_none().is_err());
    }
}
