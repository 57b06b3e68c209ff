//! Everything an application needs to declare and use meta attributes.
//!
//! ```
//! use metarecord::prelude::*;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
//! let schema = TableSchema::new(
//!     "user",
//!     vec![
//!         Column::new("id", DataType::Integer).primary_key(),
//!         Column::new("name", DataType::Text).not_null(),
//!     ],
//! );
//! TableRecord::ensure_table(store.as_ref(), &schema).await?;
//!
//! let model = Arc::new(MetaModel::new("user", ["color"]));
//! let record = TableRecord::new(schema.clone()).with_field("name", "alice")?;
//! let mut user = MetaEntity::new(model.clone(), record, store.clone())?;
//! user.set_attribute("color", "red").await?;
//! user.save().await?;
//!
//! let key = user.primary_key().unwrap();
//! let mut reloaded = MetaEntity::find(model, store, schema, key).await?.unwrap();
//! assert_eq!(reloaded.get_attribute("color").await?, Value::from("red"));
//! # Ok::<(), MetaError>(())
//! # }).unwrap();
//! ```

pub use crate::core::{Column, DataType, IndexDef, MetaError, Record, Result, TableSchema, Value};
pub use crate::meta::{
    MetaConfig, MetaEntity, MetaModel, PrimaryRecord, SaveReport, SaveStage, TableRecord,
};
pub use crate::storage::{MemoryStore, Predicate, RecordStore};
