// ============================================================================
// metarecord Library
// ============================================================================

pub mod core;
pub mod meta;
pub mod prelude;
pub mod storage;
pub mod transaction;

// Re-export main types for convenience
pub use core::{Column, DataType, IndexDef, MetaError, Record, Result, TableSchema, Value};
pub use meta::{
    MetaCache, MetaConfig, MetaEntity, MetaModel, PrimaryRecord, SaveReport, SaveStage,
    SideTable, TableRecord, side_table_name,
};
pub use storage::{MemoryStore, Predicate, RecordStore};
pub use transaction::TransactionId;
