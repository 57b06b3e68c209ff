use super::cache::MetaValues;
use super::naming::default_index_name;
use crate::core::{Column, DataType, IndexDef, MetaError, Record, Result, TableSchema, Value};
use crate::storage::{Predicate, RecordStore};
use log::{debug, warn};

pub const ID_COLUMN: &str = "id";
pub const RECORD_ID_COLUMN: &str = "record_id";
pub const META_KEY_COLUMN: &str = "meta_key";
pub const META_VALUE_COLUMN: &str = "meta_value";

/// Key/value side table holding the meta attributes of one primary table.
#[derive(Debug, Clone)]
pub struct SideTable {
    name: String,
    auto_create: bool,
}

impl SideTable {
    pub fn new(name: impl Into<String>, auto_create: bool) -> Self {
        Self {
            name: name.into(),
            auto_create,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index_name(&self) -> String {
        default_index_name(&self.name, "record_key")
    }

    /// `id`, `record_id`, `meta_key`, `meta_value`, unique on `(record_id, meta_key)`.
    pub fn schema(&self) -> TableSchema {
        TableSchema::new(
            self.name.clone(),
            vec![
                Column::new(ID_COLUMN, DataType::Integer).primary_key(),
                Column::new(RECORD_ID_COLUMN, DataType::Integer)
                    .not_null()
                    .default_value(0i64),
                Column::new(META_KEY_COLUMN, DataType::Text),
                Column::new(META_VALUE_COLUMN, DataType::Json),
            ],
        )
        .with_index(IndexDef::unique(
            self.index_name(),
            [RECORD_ID_COLUMN, META_KEY_COLUMN],
        ))
    }

    /// Schema lookup, creating the table first when `create` is set.
    pub async fn exists(&self, store: &dyn RecordStore, create: bool) -> Result<bool> {
        if store.table_exists(&self.name).await? {
            return Ok(true);
        }
        if !create {
            return Ok(false);
        }
        self.create(store).await?;
        Ok(true)
    }

    /// Creates the table; losing a creation race to another writer is fine.
    pub async fn create(&self, store: &dyn RecordStore) -> Result<()> {
        match store.create_table(self.schema()).await {
            Ok(()) => {
                debug!("Created side table '{}' ({})", self.name, self.index_name());
                Ok(())
            }
            Err(MetaError::TableExists(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Reads every meta row of one record, keyed by `meta_key`.
    ///
    /// A missing table reads as empty. Any other store error, from the schema
    /// lookup or the select, triggers one attempt to create the table before
    /// reading again.
    pub async fn load(&self, store: &dyn RecordStore, record_id: i64) -> Result<MetaValues> {
        match self.read(store, record_id).await {
            Ok(values) => Ok(values),
            Err(err) => {
                warn!(
                    "Reading side table '{}' failed, retrying once: {}",
                    self.name, err
                );
                if self.auto_create {
                    self.create(store).await?;
                }
                self.read(store, record_id).await
            }
        }
    }

    async fn read(&self, store: &dyn RecordStore, record_id: i64) -> Result<MetaValues> {
        if !self.exists(store, false).await? {
            return Ok(MetaValues::new());
        }
        let predicate = Predicate::eq(RECORD_ID_COLUMN, record_id);
        match store.select(&self.name, &predicate).await {
            Ok(rows) => Ok(rows.into_iter().filter_map(decode_row).collect()),
            Err(MetaError::TableNotFound(_)) => Ok(MetaValues::new()),
            Err(err) => Err(err),
        }
    }

    /// Inserts or updates one `(record_id, meta_key)` row.
    ///
    /// `previous` is what the caller believes the table holds for `name`;
    /// `None` means no row, and any value, `Null` and `""` included, means
    /// the row exists and is updated. `meta_value` is JSON-typed, so `value`
    /// is stored unchanged.
    pub async fn write(
        &self,
        store: &dyn RecordStore,
        record_id: i64,
        name: &str,
        value: &Value,
        previous: Option<&Value>,
    ) -> Result<()> {
        if !self.exists(store, self.auto_create).await? {
            return Err(MetaError::TableNotFound(self.name.clone()));
        }

        if previous.is_none() {
            return self.insert(store, record_id, name, value.clone()).await;
        }

        let mut values = Record::new();
        values.insert(META_VALUE_COLUMN.to_string(), value.clone());
        let predicate = Predicate::eq(RECORD_ID_COLUMN, record_id).and_eq(META_KEY_COLUMN, name);
        let updated = store.update(&self.name, values, &predicate).await?;
        if updated == 0 {
            // the row vanished under us; recreate it
            self.insert(store, record_id, name, value.clone()).await?;
        }
        Ok(())
    }

    /// Deletes every meta row of one record. A missing table purges nothing.
    pub async fn purge(&self, store: &dyn RecordStore, record_id: i64) -> Result<usize> {
        if !self.exists(store, false).await? {
            return Ok(0);
        }
        store
            .delete(&self.name, &Predicate::eq(RECORD_ID_COLUMN, record_id))
            .await
    }

    async fn insert(
        &self,
        store: &dyn RecordStore,
        record_id: i64,
        name: &str,
        value: Value,
    ) -> Result<()> {
        let mut row = Record::new();
        row.insert(RECORD_ID_COLUMN.to_string(), Value::Integer(record_id));
        row.insert(META_KEY_COLUMN.to_string(), Value::from(name));
        row.insert(META_VALUE_COLUMN.to_string(), value);
        store.insert(&self.name, row).await?;
        Ok(())
    }
}

fn decode_row(mut row: Record) -> Option<(String, Value)> {
    let key = match row.remove(META_KEY_COLUMN)? {
        Value::Text(key) => key,
        _ => return None,
    };
    let value = row.remove(META_VALUE_COLUMN).unwrap_or(Value::Null);
    Some((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn side() -> SideTable {
        SideTable::new("user_meta", true)
    }

    #[test]
    fn test_schema_layout() {
        let schema = side().schema();
        let names: Vec<&str> = schema.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "record_id", "meta_key", "meta_value"]);
        assert!(schema.get_column("id").unwrap().auto_increment);
        assert!(!schema.get_column("record_id").unwrap().nullable);
        assert!(schema.get_column("meta_key").unwrap().nullable);
        assert!(schema.has_unique_index(&["record_id", "meta_key"]));
        assert_eq!(side().index_name(), "idx_user_meta_record_key");
    }

    #[tokio::test]
    async fn test_exists_creates_on_request() {
        let store = MemoryStore::new();
        assert!(!side().exists(&store, false).await.unwrap());
        assert!(side().exists(&store, true).await.unwrap());
        assert!(store.table_exists("user_meta").await.unwrap());
        // second creation is tolerated
        side().create(&store).await.unwrap();
    }

    #[tokio::test]
    async fn test_load_missing_table_is_empty() {
        let store = MemoryStore::new();
        assert!(side().load(&store, 1).await.unwrap().is_empty());
        assert!(!store.table_exists("user_meta").await.unwrap());
    }

    #[tokio::test]
    async fn test_write_insert_then_update() {
        let store = MemoryStore::new();
        let table = side();
        table.write(&store, 7, "color", &"red".into(), None).await.unwrap();
        table
            .write(&store, 7, "color", &"blue".into(), Some(&"red".into()))
            .await
            .unwrap();

        assert_eq!(store.row_count("user_meta").await.unwrap(), 1);
        let loaded = table.load(&store, 7).await.unwrap();
        assert_eq!(loaded["color"], Value::from("blue"));
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_constraint_violation() {
        let store = MemoryStore::new();
        let table = side();
        table.write(&store, 7, "color", &"red".into(), None).await.unwrap();
        let err = table
            .write(&store, 7, "color", &"blue".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MetaError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn test_json_values_round_trip() {
        let store = MemoryStore::new();
        let table = side();
        let tags = Value::Json(json!({"tags": ["a", "b"]}));
        table.write(&store, 1, "tags", &tags, None).await.unwrap();

        let raw = store
            .select("user_meta", &Predicate::eq(RECORD_ID_COLUMN, 1i64))
            .await
            .unwrap();
        assert_eq!(raw[0][META_VALUE_COLUMN], tags);
        assert_eq!(table.load(&store, 1).await.unwrap()["tags"], tags);
    }

    #[tokio::test]
    async fn test_values_keep_their_type() {
        let store = MemoryStore::new();
        let table = side();
        let bracketed = Value::Text("[1,2]".into());
        let scalar_json = Value::Json(json!(5));
        table.write(&store, 1, "a", &bracketed, None).await.unwrap();
        table.write(&store, 1, "b", &scalar_json, None).await.unwrap();

        let loaded = table.load(&store, 1).await.unwrap();
        assert!(matches!(&loaded["a"], Value::Text(text) if text == "[1,2]"));
        assert!(matches!(&loaded["b"], Value::Json(json) if *json == json!(5)));
    }

    #[tokio::test]
    async fn test_existing_empty_value_is_updated() {
        let store = MemoryStore::new();
        let table = side();
        table.write(&store, 7, "color", &"".into(), None).await.unwrap();
        table
            .write(&store, 7, "color", &"blue".into(), Some(&"".into()))
            .await
            .unwrap();
        table
            .write(&store, 7, "size", &Value::Null, None)
            .await
            .unwrap();
        table
            .write(&store, 7, "size", &3i64.into(), Some(&Value::Null))
            .await
            .unwrap();

        assert_eq!(store.row_count("user_meta").await.unwrap(), 2);
        let loaded = table.load(&store, 7).await.unwrap();
        assert_eq!(loaded["color"], Value::from("blue"));
        assert_eq!(loaded["size"], Value::Integer(3));
    }

    #[tokio::test]
    async fn test_write_without_auto_create_fails() {
        let store = MemoryStore::new();
        let table = SideTable::new("user_meta", false);
        let err = table
            .write(&store, 1, "color", &"red".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MetaError::TableNotFound(_)));
    }

    #[tokio::test]
    async fn test_purge_only_touches_one_record() {
        let store = MemoryStore::new();
        let table = side();
        table.write(&store, 1, "a", &1i64.into(), None).await.unwrap();
        table.write(&store, 1, "b", &2i64.into(), None).await.unwrap();
        table.write(&store, 2, "a", &3i64.into(), None).await.unwrap();

        assert_eq!(table.purge(&store, 1).await.unwrap(), 2);
        assert!(table.load(&store, 1).await.unwrap().is_empty());
        assert_eq!(table.load(&store, 2).await.unwrap().len(), 1);
        assert_eq!(SideTable::new("other_meta", true).purge(&store, 1).await.unwrap(), 0);
    }
}
