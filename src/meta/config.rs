use crate::core::Result;
use serde::{Deserialize, Serialize};

/// Behavior switches for one entity type's meta attributes
///
/// Defaults: meta values are flushed with the entity save, removed with the
/// entity, loaded lazily, and the side table is created on first write.
/// Missing keys keep their default when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaConfig {
    /// Queue each set on an existing record and flush the queue after the
    /// primary save, instead of rewriting every cached value transactionally
    pub write_through: bool,

    /// Purge side-table rows when the entity is deleted
    pub auto_delete: bool,

    /// Load the meta cache as soon as the entity is loaded
    pub preload: bool,

    /// Create the side table on first write when it is missing
    pub auto_create_table: bool,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            write_through: false,
            auto_delete: true,
            preload: false,
            auto_create_table: true,
        }
    }
}

impl MetaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object; absent keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Enable or disable write-through on set
    pub fn write_through(mut self, enabled: bool) -> Self {
        self.write_through = enabled;
        self
    }

    /// Enable or disable purging meta rows on delete
    pub fn auto_delete(mut self, enabled: bool) -> Self {
        self.auto_delete = enabled;
        self
    }

    /// Enable or disable eager loading
    pub fn preload(mut self, enabled: bool) -> Self {
        self.preload = enabled;
        self
    }

    /// Enable or disable side-table auto-creation
    pub fn auto_create_table(mut self, enabled: bool) -> Self {
        self.auto_create_table = enabled;
        self
    }
}
