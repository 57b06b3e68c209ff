use super::cache::MetaCache;
use super::lifecycle::SaveStage;
use super::record::{PrimaryRecord, TableRecord};
use super::side_table::SideTable;
use super::MetaModel;
use crate::core::{MetaError, Result, TableSchema, Value};
use crate::storage::RecordStore;
use log::debug;
use std::sync::Arc;

/// A primary record plus its lazily loaded meta attributes.
///
/// Names declared on the [`MetaModel`] are routed to the side table; every
/// other name goes to the primary record.
pub struct MetaEntity<R: PrimaryRecord> {
    pub(super) model: Arc<MetaModel>,
    pub(super) record: R,
    pub(super) store: Arc<dyn RecordStore>,
    pub(super) side_table: SideTable,
    pub(super) cache: MetaCache,
    pub(super) stage: SaveStage,
}

impl<R: PrimaryRecord> MetaEntity<R> {
    /// Binds a record to its meta model.
    ///
    /// Fails when the model belongs to another table or when a declared meta
    /// name is also a core field.
    pub fn new(model: Arc<MetaModel>, record: R, store: Arc<dyn RecordStore>) -> Result<Self> {
        if model.table_name() != record.table_name() {
            return Err(MetaError::ExecutionError(format!(
                "Meta model for '{}' cannot wrap a record of '{}'",
                model.table_name(),
                record.table_name()
            )));
        }
        model.check_disjoint(&record.field_names())?;

        let cache = if record.primary_key().is_none() {
            MetaCache::empty_loaded()
        } else {
            MetaCache::not_loaded()
        };
        let side_table = SideTable::new(model.side_table(), model.config().auto_create_table);

        Ok(Self {
            model,
            record,
            store,
            side_table,
            cache,
            stage: SaveStage::Idle,
        })
    }

    /// Binds an already persisted record, loading its meta rows right away
    /// when the model asks for preloading.
    pub async fn load(
        model: Arc<MetaModel>,
        record: R,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self> {
        let mut entity = Self::new(model, record, store)?;
        if entity.model.config().preload {
            entity.ensure_loaded().await?;
        }
        Ok(entity)
    }

    pub fn model(&self) -> &MetaModel {
        &self.model
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut R {
        &mut self.record
    }

    pub fn cache(&self) -> &MetaCache {
        &self.cache
    }

    pub fn side_table(&self) -> &SideTable {
        &self.side_table
    }

    pub fn save_stage(&self) -> SaveStage {
        self.stage
    }

    pub fn primary_key(&self) -> Option<i64> {
        self.record.primary_key()
    }

    pub fn is_new_record(&self) -> bool {
        self.record.is_new_record()
    }

    /// Reads a meta attribute or, for any other name, a core field.
    pub async fn get_attribute(&mut self, name: &str) -> Result<Value> {
        if self.model.is_meta_attribute(name) {
            self.meta_attribute(name).await
        } else {
            self.record.field(name)
        }
    }

    /// Writes a meta attribute or, for any other name, a core field.
    pub async fn set_attribute(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        if self.model.is_meta_attribute(name) {
            self.set_meta_attribute(name, value).await
        } else {
            self.record.set_field(name, value.into())
        }
    }

    /// Strict meta read; `Value::Null` when the attribute has no value.
    pub async fn meta_attribute(&mut self, name: &str) -> Result<Value> {
        self.check_declared(name)?;
        self.ensure_loaded().await?;
        Ok(self.cache.get(name).cloned().unwrap_or(Value::Null))
    }

    /// Strict meta write. On an existing record in write-through mode the
    /// value is also queued for the post-save flush.
    pub async fn set_meta_attribute(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.check_declared(name)?;
        self.ensure_loaded().await?;

        let value = value.into();
        if self.model.config().write_through && !self.record.is_new_record() {
            self.enqueue_meta_update(name, value.clone())?;
        }
        self.cache.set(name, value);
        Ok(())
    }

    /// Reads all meta rows of this record into the cache.
    ///
    /// Unflushed edits are discarded, so outside of entity loading this is
    /// only useful to throw away local state.
    pub async fn load_meta_data(&mut self) -> Result<()> {
        let values = match self.record.primary_key() {
            Some(key) => self.side_table.load(self.store.as_ref(), key).await?,
            None => Default::default(),
        };
        debug!(
            "Loaded {} meta attribute(s) for '{}' #{:?}",
            values.len(),
            self.model.table_name(),
            self.record.primary_key()
        );
        self.cache.populate(values);
        Ok(())
    }

    /// Queues a write for the post-save flush; the last value per name wins.
    pub fn enqueue_meta_update(&mut self, name: &str, value: Value) -> Result<()> {
        self.check_declared(name)?;
        self.cache.enqueue(name, value);
        Ok(())
    }

    /// Writes one attribute to the side table now, creating the table if needed.
    ///
    /// The cache is only touched after the write succeeded.
    pub async fn save_meta_attribute(&mut self, name: &str, value: Value) -> Result<()> {
        self.check_declared(name)?;
        let key = self.record.primary_key().ok_or_else(|| {
            MetaError::ExecutionError(format!(
                "Cannot write meta attribute '{}' of an unsaved '{}' record",
                name,
                self.model.table_name()
            ))
        })?;

        let previous = self.cache.persisted(name).cloned();
        self.side_table
            .write(self.store.as_ref(), key, name, &value, previous.as_ref())
            .await?;
        self.cache.mark_written(name, value);
        Ok(())
    }

    pub(super) async fn ensure_loaded(&mut self) -> Result<()> {
        if !self.cache.is_loaded() {
            self.load_meta_data().await?;
        }
        Ok(())
    }

    fn check_declared(&self, name: &str) -> Result<()> {
        if self.model.is_meta_attribute(name) {
            Ok(())
        } else {
            Err(MetaError::InvalidAttribute(name.to_string()))
        }
    }
}

impl MetaEntity<TableRecord> {
    /// Loads a [`TableRecord`] by primary key and binds it to `model`.
    pub async fn find(
        model: Arc<MetaModel>,
        store: Arc<dyn RecordStore>,
        schema: TableSchema,
        key: i64,
    ) -> Result<Option<Self>> {
        match TableRecord::find(store.as_ref(), schema, key).await? {
            Some(record) => Ok(Some(Self::load(model, record, store).await?)),
            None => Ok(None),
        }
    }
}
