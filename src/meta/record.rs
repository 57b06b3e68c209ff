use crate::core::{MetaError, Record, Result, TableSchema, Value};
use crate::storage::{Predicate, RecordStore};
use async_trait::async_trait;

/// The primary record a meta entity augments.
///
/// Field storage and validation belong to the implementor. `save` returns
/// `Ok(false)` when the record refused to save (validation), and `Err` when
/// the store failed. A successful save of a new record must assign the
/// primary key.
#[async_trait]
pub trait PrimaryRecord: Clone + Send + Sync {
    /// Returns the database table name where this record is stored.
    fn table_name(&self) -> &str;
    /// Returns the names of the core fields.
    fn field_names(&self) -> Vec<String>;
    fn primary_key(&self) -> Option<i64>;
    fn is_new_record(&self) -> bool;
    fn field(&self, name: &str) -> Result<Value>;
    fn set_field(&mut self, name: &str, value: Value) -> Result<()>;
    async fn save(&mut self, store: &dyn RecordStore) -> Result<bool>;
    async fn delete(&mut self, store: &dyn RecordStore) -> Result<bool>;
}

/// A primary record stored as one row of a store table.
///
/// The table must have an integer primary key column.
#[derive(Debug, Clone)]
pub struct TableRecord {
    schema: TableSchema,
    values: Record,
    key: Option<i64>,
}

impl TableRecord {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            values: Record::new(),
            key: None,
        }
    }

    /// Loads the row with the given primary key.
    pub async fn find(
        store: &dyn RecordStore,
        schema: TableSchema,
        key: i64,
    ) -> Result<Option<Self>> {
        let pk = Self::key_column_of(&schema)?;
        let rows = store
            .select(schema.name(), &Predicate::eq(pk, key))
            .await?;
        Ok(rows.into_iter().next().map(|values| Self {
            schema,
            values,
            key: Some(key),
        }))
    }

    /// Creates the backing table if it does not exist yet.
    pub async fn ensure_table(store: &dyn RecordStore, schema: &TableSchema) -> Result<()> {
        if store.table_exists(schema.name()).await? {
            return Ok(());
        }
        match store.create_table(schema.clone()).await {
            Ok(()) | Err(MetaError::TableExists(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Result<Self> {
        self.set_field(name, value.into())?;
        Ok(self)
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn values(&self) -> &Record {
        &self.values
    }

    fn key_column_of(schema: &TableSchema) -> Result<String> {
        schema
            .primary_key()
            .map(|col| col.name.clone())
            .ok_or_else(|| {
                MetaError::ExecutionError(format!(
                    "Table '{}' has no primary key column",
                    schema.name()
                ))
            })
    }

    /// Non-null columns without a default must be set.
    fn validate(&self) -> bool {
        self.schema.columns().iter().all(|col| {
            col.nullable
                || col.auto_increment
                || col.default.is_some()
                || self.values.get(&col.name).is_some_and(|v| !v.is_null())
        })
    }
}

#[async_trait]
impl PrimaryRecord for TableRecord {
    fn table_name(&self) -> &str {
        self.schema.name()
    }

    fn field_names(&self) -> Vec<String> {
        self.schema
            .columns()
            .iter()
            .map(|col| col.name.clone())
            .collect()
    }

    fn primary_key(&self) -> Option<i64> {
        self.key
    }

    fn is_new_record(&self) -> bool {
        self.key.is_none()
    }

    fn field(&self, name: &str) -> Result<Value> {
        if self.schema.get_column(name).is_none() {
            return Err(MetaError::ColumnNotFound(
                name.to_string(),
                self.schema.name().to_string(),
            ));
        }
        Ok(self.values.get(name).cloned().unwrap_or(Value::Null))
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        let column = self.schema.get_column(name).ok_or_else(|| {
            MetaError::ColumnNotFound(name.to_string(), self.schema.name().to_string())
        })?;
        column.validate(&value)?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    async fn save(&mut self, store: &dyn RecordStore) -> Result<bool> {
        if !self.validate() {
            return Ok(false);
        }
        let pk = Self::key_column_of(&self.schema)?;

        match self.key {
            None => {
                let key = store.insert(self.schema.name(), self.values.clone()).await?;
                self.values.insert(pk, Value::Integer(key));
                self.key = Some(key);
                Ok(true)
            }
            Some(key) => {
                let mut values = self.values.clone();
                values.remove(&pk);
                let updated = store
                    .update(self.schema.name(), values, &Predicate::eq(pk, key))
                    .await?;
                Ok(updated == 1)
            }
        }
    }

    async fn delete(&mut self, store: &dyn RecordStore) -> Result<bool> {
        let Some(key) = self.key else {
            return Ok(false);
        };
        let pk = Self::key_column_of(&self.schema)?;
        let deleted = store
            .delete(self.schema.name(), &Predicate::eq(pk, key))
            .await?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType};
    use crate::storage::MemoryStore;

    fn schema() -> TableSchema {
        TableSchema::new(
            "users",
            vec![
                Column::new("id", DataType::Integer).primary_key(),
                Column::new("name", DataType::Text).not_null(),
            ],
        )
    }

    #[tokio::test]
    async fn test_save_insert_then_update() {
        let store = MemoryStore::new();
        TableRecord::ensure_table(&store, &schema()).await.unwrap();

        let mut record = TableRecord::new(schema()).with_field("name", "alice").unwrap();
        assert!(record.is_new_record());
        assert!(record.save(&store).await.unwrap());
        assert_eq!(record.primary_key(), Some(1));
        assert_eq!(record.field("id").unwrap(), Value::Integer(1));

        record.set_field("name", "bob".into()).unwrap();
        assert!(record.save(&store).await.unwrap());

        let found = TableRecord::find(&store, schema(), 1).await.unwrap().unwrap();
        assert_eq!(found.field("name").unwrap(), Value::Text("bob".into()));
        assert!(!found.is_new_record());
    }

    #[tokio::test]
    async fn test_validation_refuses_save() {
        let store = MemoryStore::new();
        TableRecord::ensure_table(&store, &schema()).await.unwrap();

        let mut record = TableRecord::new(schema());
        assert!(!record.save(&store).await.unwrap());
        assert!(record.is_new_record());
        assert_eq!(store.row_count("users").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        TableRecord::ensure_table(&store, &schema()).await.unwrap();

        let mut record = TableRecord::new(schema()).with_field("name", "a").unwrap();
        assert!(!record.delete(&store).await.unwrap());
        record.save(&store).await.unwrap();
        assert!(record.delete(&store).await.unwrap());
        assert!(TableRecord::find(&store, schema(), 1).await.unwrap().is_none());
    }

    #[test]
    fn test_unknown_field() {
        let record = TableRecord::new(schema());
        assert!(matches!(
            record.field("age"),
            Err(MetaError::ColumnNotFound(_, _))
        ));
    }
}
