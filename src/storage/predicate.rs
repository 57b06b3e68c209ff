use crate::core::{Record, Value};
use std::fmt;

/// Conjunction of column equalities, the only filter the record store needs.
///
/// An empty predicate matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    conditions: Vec<(String, Value)>,
}

impl Predicate {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and_eq(column, value)
    }

    pub fn and_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().map(|(column, _)| column.as_str())
    }

    /// SQL equality: a NULL on either side never matches.
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|(column, expected)| {
            match record.get(column) {
                Some(actual) if !actual.is_null() && !expected.is_null() => actual == expected,
                _ => false,
            }
        })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conditions.is_empty() {
            return write!(f, "TRUE");
        }
        let parts: Vec<String> = self
            .conditions
            .iter()
            .map(|(column, value)| format!("{} = {}", column, value))
            .collect();
        write!(f, "{}", parts.join(" AND "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(record_id: i64, key: &str) -> Record {
        let mut record = Record::new();
        record.insert("record_id".into(), Value::Integer(record_id));
        record.insert("meta_key".into(), Value::Text(key.into()));
        record
    }

    #[test]
    fn test_conjunction() {
        let predicate = Predicate::eq("record_id", 7i64).and_eq("meta_key", "color");
        assert!(predicate.matches(&record(7, "color")));
        assert!(!predicate.matches(&record(7, "size")));
        assert!(!predicate.matches(&record(8, "color")));
        assert_eq!(predicate.to_string(), "record_id = 7 AND meta_key = color");
    }

    #[test]
    fn test_empty_matches_everything() {
        assert!(Predicate::all().matches(&record(1, "a")));
    }

    #[test]
    fn test_null_never_matches() {
        let mut row = record(1, "a");
        row.insert("meta_key".into(), Value::Null);
        assert!(!Predicate::eq("meta_key", Value::Null).matches(&row));
    }
}
