//! Meta attributes: named values attached to a primary record but stored as
//! key/value rows in a side table next to the record's own table.
//!
//! [`MetaModel`] declares, per primary table, which attribute names are meta
//! and how they persist. [`MetaEntity`] wraps a [`PrimaryRecord`], routes
//! attribute access, caches loaded rows, and coordinates saves and deletes
//! across both tables.

pub mod cache;
pub mod config;
pub mod entity;
pub mod lifecycle;
pub mod model;
pub mod naming;
pub mod record;
pub mod side_table;

pub use cache::{CacheState, MetaCache, MetaValues};
pub use config::MetaConfig;
pub use entity::MetaEntity;
pub use lifecycle::{SaveReport, SaveStage};
pub use model::MetaModel;
pub use naming::side_table_name;
pub use record::{PrimaryRecord, TableRecord};
pub use side_table::SideTable;
