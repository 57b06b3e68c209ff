use crate::core::Value;
use std::collections::BTreeMap;

pub type MetaValues = BTreeMap<String, Value>;

/// Whether the cache reflects the side table yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CacheState {
    #[default]
    NotLoaded,
    Loaded {
        /// Authoritative current values, including unsaved changes
        current: MetaValues,
        /// Values as last read from or written to the side table
        persisted: MetaValues,
    },
}

/// Per-entity meta cache and deferred update queue.
#[derive(Debug, Clone, Default)]
pub struct MetaCache {
    state: CacheState,
    update_queue: MetaValues,
}

impl MetaCache {
    pub fn not_loaded() -> Self {
        Self::default()
    }

    /// Cache for a record that cannot have side-table rows yet.
    pub fn empty_loaded() -> Self {
        let mut cache = Self::default();
        cache.populate(MetaValues::new());
        cache
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, CacheState::Loaded { .. })
    }

    pub fn state(&self) -> &CacheState {
        &self.state
    }

    /// Replaces both current and persisted values; unflushed edits are lost.
    pub fn populate(&mut self, values: MetaValues) {
        self.state = CacheState::Loaded {
            current: values.clone(),
            persisted: values,
        };
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        match &self.state {
            CacheState::Loaded { current, .. } => current.get(name),
            CacheState::NotLoaded => None,
        }
    }

    /// Value the side table holds for `name`, as far as this cache knows.
    pub fn persisted(&self, name: &str) -> Option<&Value> {
        match &self.state {
            CacheState::Loaded { persisted, .. } => persisted.get(name),
            CacheState::NotLoaded => None,
        }
    }

    pub fn set(&mut self, name: &str, value: Value) {
        if let CacheState::NotLoaded = self.state {
            self.populate(MetaValues::new());
        }
        if let CacheState::Loaded { current, .. } = &mut self.state {
            current.insert(name.to_string(), value);
        }
    }

    /// Records a successful side-table write.
    pub fn mark_written(&mut self, name: &str, value: Value) {
        if let CacheState::NotLoaded = self.state {
            self.populate(MetaValues::new());
        }
        if let CacheState::Loaded { current, persisted } = &mut self.state {
            current.insert(name.to_string(), value.clone());
            persisted.insert(name.to_string(), value);
        }
    }

    /// Every current value, in name order. Empty when not loaded.
    pub fn entries(&self) -> Vec<(String, Value)> {
        match &self.state {
            CacheState::Loaded { current, .. } => current
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            CacheState::NotLoaded => Vec::new(),
        }
    }

    pub fn is_dirty(&self, name: &str) -> bool {
        self.get(name) != self.persisted(name)
    }

    pub fn dirty_attributes(&self) -> Vec<String> {
        match &self.state {
            CacheState::Loaded { current, persisted } => current
                .iter()
                .filter(|(k, v)| persisted.get(*k) != Some(*v))
                .map(|(k, _)| k.clone())
                .collect(),
            CacheState::NotLoaded => Vec::new(),
        }
    }

    pub fn persisted_snapshot(&self) -> Option<MetaValues> {
        match &self.state {
            CacheState::Loaded { persisted, .. } => Some(persisted.clone()),
            CacheState::NotLoaded => None,
        }
    }

    /// Puts back a persisted snapshot taken before a rolled-back save.
    pub fn restore_persisted(&mut self, snapshot: Option<MetaValues>) {
        let Some(snapshot) = snapshot else {
            self.state = CacheState::NotLoaded;
            return;
        };
        if let CacheState::Loaded { persisted, .. } = &mut self.state {
            *persisted = snapshot;
        }
    }

    /// Upserts into the update queue; the last write per name wins.
    pub fn enqueue(&mut self, name: &str, value: Value) {
        self.update_queue.insert(name.to_string(), value);
    }

    pub fn pending_updates(&self) -> &MetaValues {
        &self.update_queue
    }

    pub fn take_queue(&mut self) -> MetaValues {
        std::mem::take(&mut self.update_queue)
    }

    pub fn clear_queue(&mut self) {
        self.update_queue.clear();
    }

    /// Back to `NotLoaded` with an empty queue.
    pub fn reset(&mut self) {
        self.state = CacheState::NotLoaded;
        self.update_queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(pairs: &[(&str, &str)]) -> MetaCache {
        let mut cache = MetaCache::not_loaded();
        cache.populate(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Value::from(*v)))
                .collect(),
        );
        cache
    }

    #[test]
    fn test_not_loaded_differs_from_loaded_empty() {
        assert!(!MetaCache::not_loaded().is_loaded());
        assert!(MetaCache::empty_loaded().is_loaded());
        assert!(MetaCache::empty_loaded().entries().is_empty());
    }

    #[test]
    fn test_set_marks_dirty_until_written() {
        let mut cache = loaded(&[("color", "red")]);
        assert!(!cache.is_dirty("color"));

        cache.set("color", "blue".into());
        assert!(cache.is_dirty("color"));
        assert_eq!(cache.dirty_attributes(), vec!["color".to_string()]);
        assert_eq!(cache.persisted("color"), Some(&Value::from("red")));

        cache.mark_written("color", "blue".into());
        assert!(!cache.is_dirty("color"));
        assert!(cache.dirty_attributes().is_empty());
    }

    #[test]
    fn test_populate_discards_edits() {
        let mut cache = loaded(&[("color", "red")]);
        cache.set("color", "blue".into());
        cache.populate(MetaValues::new());
        assert_eq!(cache.get("color"), None);
    }

    #[test]
    fn test_queue_last_write_wins() {
        let mut cache = MetaCache::empty_loaded();
        cache.enqueue("color", "red".into());
        cache.enqueue("color", "blue".into());
        cache.enqueue("size", "xl".into());
        assert_eq!(cache.pending_updates().len(), 2);

        let drained = cache.take_queue();
        assert_eq!(drained["color"], Value::from("blue"));
        assert!(cache.pending_updates().is_empty());
    }

    #[test]
    fn test_restore_persisted_snapshot() {
        let mut cache = loaded(&[("color", "red")]);
        let snapshot = cache.persisted_snapshot();
        cache.mark_written("color", "blue".into());
        cache.restore_persisted(snapshot);

        assert_eq!(cache.persisted("color"), Some(&Value::from("red")));
        assert_eq!(cache.get("color"), Some(&Value::from("blue")));
    }

    #[test]
    fn test_reset() {
        let mut cache = loaded(&[("color", "red")]);
        cache.enqueue("color", "x".into());
        cache.reset();
        assert!(!cache.is_loaded());
        assert!(cache.pending_updates().is_empty());
    }
}
