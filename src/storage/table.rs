use crate::core::{MetaError, Record, Result, TableSchema, Value};
use crate::storage::Predicate;
use std::collections::BTreeMap;

/// A single in-memory table: rows keyed by an internal row id.
#[derive(Debug, Clone)]
pub struct MemTable {
    schema: TableSchema,
    rows: BTreeMap<i64, Record>,
    next_row_id: i64,
    next_auto_value: i64,
}

impl MemTable {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
            next_row_id: 1,
            next_auto_value: 1,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Inserts a row and returns `(row_id, primary key value)`.
    ///
    /// The primary key value is 0 when the table has no integer primary key.
    pub fn insert(&mut self, record: &Record) -> Result<(i64, i64)> {
        let mut row = self.schema.normalize(record)?;

        let mut key = 0;
        let mut bump_auto = None;
        if let Some(pk) = self.schema.primary_key() {
            let pk_name = pk.name.clone();
            match row.get(&pk_name) {
                Some(Value::Null) | None if pk.auto_increment => {
                    key = self.next_auto_value;
                    row.insert(pk_name, Value::Integer(key));
                    bump_auto = Some(key);
                }
                Some(value) => {
                    key = value.as_i64().unwrap_or(0);
                    if pk.auto_increment {
                        bump_auto = Some(key);
                    }
                }
                None => {}
            }
        }

        self.check_uniqueness(&row, None)?;

        if let Some(used) = bump_auto {
            // saturates at i64::MAX; the next generated key then clashes
            // with the existing row and is rejected
            self.next_auto_value = self.next_auto_value.max(used.saturating_add(1));
        }
        let row_id = self.next_row_id;
        self.next_row_id += 1;
        self.rows.insert(row_id, row);
        Ok((row_id, key))
    }

    /// Applies `values` to one row and returns the previous version.
    pub fn update(&mut self, row_id: i64, values: &Record) -> Result<Record> {
        let old = self
            .rows
            .get(&row_id)
            .cloned()
            .ok_or_else(|| MetaError::ExecutionError(format!("Row {} not found", row_id)))?;

        let mut merged = old.clone();
        for (column, value) in values {
            merged.insert(column.clone(), value.clone());
        }
        let row = self.schema.normalize(&merged)?;
        self.check_uniqueness(&row, Some(row_id))?;

        self.rows.insert(row_id, row);
        Ok(old)
    }

    pub fn delete(&mut self, row_id: i64) -> Option<Record> {
        self.rows.remove(&row_id)
    }

    /// Puts a row back exactly as it was, bypassing validation (undo path).
    pub fn restore(&mut self, row_id: i64, row: Record) {
        self.rows.insert(row_id, row);
    }

    pub fn matching_ids(&self, predicate: &Predicate) -> Result<Vec<i64>> {
        for column in predicate.columns() {
            if self.schema.get_column(column).is_none() {
                return Err(MetaError::ColumnNotFound(
                    column.to_string(),
                    self.schema.name().to_string(),
                ));
            }
        }
        Ok(self
            .rows
            .iter()
            .filter(|(_, row)| predicate.matches(row))
            .map(|(id, _)| *id)
            .collect())
    }

    pub fn get(&self, row_id: i64) -> Option<&Record> {
        self.rows.get(&row_id)
    }

    pub fn scan(&self, predicate: &Predicate) -> Result<Vec<Record>> {
        let ids = self.matching_ids(predicate)?;
        Ok(ids
            .into_iter()
            .filter_map(|id| self.rows.get(&id).cloned())
            .collect())
    }

    fn check_uniqueness(&self, row: &Record, ignore_id: Option<i64>) -> Result<()> {
        let mut keys: Vec<(String, Vec<String>)> = self
            .schema
            .indexes
            .iter()
            .filter(|idx| idx.unique)
            .map(|idx| (idx.name.clone(), idx.columns.clone()))
            .collect();
        if let Some(pk) = self.schema.primary_key() {
            keys.push(("PRIMARY".to_string(), vec![pk.name.clone()]));
        }

        for (index_name, columns) in keys {
            let candidate: Vec<&Value> = columns
                .iter()
                .map(|c| row.get(c).unwrap_or(&Value::Null))
                .collect();
            // NULLs are distinct from each other under a unique index
            if candidate.iter().any(|v| v.is_null()) {
                continue;
            }

            let clash = self.rows.iter().any(|(id, existing)| {
                Some(*id) != ignore_id
                    && columns
                        .iter()
                        .zip(&candidate)
                        .all(|(c, v)| existing.get(c) == Some(*v))
            });
            if clash {
                let shown: Vec<String> = candidate.iter().map(|v| v.to_string()).collect();
                return Err(MetaError::ConstraintViolation(format!(
                    "Unique index '{}' on '{}' already contains ({})",
                    index_name,
                    self.schema.name(),
                    shown.join(", ")
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType, IndexDef};

    fn table() -> MemTable {
        MemTable::new(
            TableSchema::new(
                "pairs",
                vec![
                    Column::new("id", DataType::Integer).primary_key(),
                    Column::new("a", DataType::Integer),
                    Column::new("b", DataType::Text),
                ],
            )
            .with_index(IndexDef::unique("idx_pairs_ab", ["a", "b"])),
        )
    }

    fn row(a: i64, b: &str) -> Record {
        let mut record = Record::new();
        record.insert("a".into(), Value::Integer(a));
        record.insert("b".into(), Value::Text(b.into()));
        record
    }

    #[test]
    fn test_auto_increment_assigns_keys() {
        let mut t = table();
        assert_eq!(t.insert(&row(1, "x")).unwrap().1, 1);
        assert_eq!(t.insert(&row(1, "y")).unwrap().1, 2);

        let mut explicit = row(2, "x");
        explicit.insert("id".into(), Value::Integer(10));
        assert_eq!(t.insert(&explicit).unwrap().1, 10);
        assert_eq!(t.insert(&row(3, "x")).unwrap().1, 11);
    }

    #[test]
    fn test_explicit_max_key_does_not_overflow() {
        let mut t = table();
        let mut explicit = row(1, "x");
        explicit.insert("id".into(), Value::Integer(i64::MAX));
        assert_eq!(t.insert(&explicit).unwrap().1, i64::MAX);

        let err = t.insert(&row(2, "x")).unwrap_err();
        assert!(matches!(err, MetaError::ConstraintViolation(_)));
        assert_eq!(t.row_count(), 1);
    }

    #[test]
    fn test_composite_unique_index() {
        let mut t = table();
        t.insert(&row(1, "x")).unwrap();
        let err = t.insert(&row(1, "x")).unwrap_err();
        assert!(matches!(err, MetaError::ConstraintViolation(_)));
        assert_eq!(t.row_count(), 1);
    }

    #[test]
    fn test_update_checks_uniqueness_against_others() {
        let mut t = table();
        t.insert(&row(1, "x")).unwrap();
        let (second, _) = t.insert(&row(1, "y")).unwrap();

        assert!(t.update(second, &row(1, "x")).is_err());
        let old = t.update(second, &row(1, "z")).unwrap();
        assert_eq!(old["b"], Value::Text("y".into()));
        assert_eq!(t.get(second).unwrap()["b"], Value::Text("z".into()));
    }

    #[test]
    fn test_unknown_predicate_column() {
        let t = table();
        assert!(matches!(
            t.scan(&Predicate::eq("missing", 1i64)),
            Err(MetaError::ColumnNotFound(_, _))
        ));
    }
}
