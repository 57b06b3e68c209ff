use super::MetaConfig;
use super::naming::side_table_name;
use crate::core::{MetaError, Result};
use std::collections::BTreeSet;

/// Per-type declaration: which primary table, which names are meta attributes,
/// and how they are persisted.
#[derive(Debug, Clone)]
pub struct MetaModel {
    table_name: String,
    side_table: String,
    attributes: BTreeSet<String>,
    config: MetaConfig,
}

impl MetaModel {
    pub fn new<I, S>(table_name: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let table_name = table_name.into();
        Self {
            side_table: side_table_name(&table_name),
            table_name,
            attributes: attributes.into_iter().map(Into::into).collect(),
            config: MetaConfig::default(),
        }
    }

    pub fn with_config(mut self, config: MetaConfig) -> Self {
        self.config = config;
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn side_table(&self) -> &str {
        &self.side_table
    }

    pub fn config(&self) -> &MetaConfig {
        &self.config
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(String::as_str)
    }

    pub fn is_meta_attribute(&self, name: &str) -> bool {
        self.attributes.contains(name)
    }

    /// Rejects a declaration whose meta names collide with core fields.
    pub fn check_disjoint<S: AsRef<str>>(&self, core_fields: &[S]) -> Result<()> {
        let overlap: Vec<String> = core_fields
            .iter()
            .map(|field| field.as_ref())
            .filter(|field| self.attributes.contains(*field))
            .map(str::to_string)
            .collect();

        if overlap.is_empty() {
            Ok(())
        } else {
            Err(MetaError::AttributeOverlap {
                table: self.table_name.clone(),
                names: overlap,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_table_derived_once() {
        let model = MetaModel::new("{{%user}}", ["color", "size"]);
        assert_eq!(model.side_table(), "{{%user_meta}}");
        assert!(model.is_meta_attribute("color"));
        assert!(!model.is_meta_attribute("name"));
        assert_eq!(model.attributes().collect::<Vec<_>>(), vec!["color", "size"]);
    }

    #[test]
    fn test_overlap_rejected() {
        let model = MetaModel::new("user", ["color", "name"]);
        assert!(model.check_disjoint(&["id", "email"]).is_ok());

        match model.check_disjoint(&["id", "name"]) {
            Err(MetaError::AttributeOverlap { table, names }) => {
                assert_eq!(table, "user");
                assert_eq!(names, vec!["name".to_string()]);
            }
            other => panic!("expected overlap error, got {:?}", other),
        }
    }
}
