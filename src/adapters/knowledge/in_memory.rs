//! In-memory schema and knowledge providers, loadable from YAML or JSON.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::models::FieldSpec;
use crate::domain::ports::{KnowledgeBase, SchemaProvider};

/// Parse a file as JSON when its extension says so, YAML otherwise.
pub(crate) fn load_structured<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
    } else {
        serde_yaml::from_str(&text).with_context(|| format!("Invalid YAML in {}", path.display()))
    }
}

/// Field schema held in memory: source name to field map.
///
/// ```yaml
/// wells:
///   well_count: { type: integer, required: true }
///   operator: { type: categorical }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemorySchema {
    sources: BTreeMap<String, BTreeMap<String, FieldSpec>>,
}

impl InMemorySchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(
        mut self,
        source: impl Into<String>,
        field: impl Into<String>,
        spec: FieldSpec,
    ) -> Self {
        self.sources
            .entry(source.into())
            .or_default()
            .insert(field.into(), spec);
        self
    }

    /// Declare a source with no fields yet.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources.entry(source.into()).or_default();
        self
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        load_structured(path).context("Failed to load schema")
    }
}

impl SchemaProvider for InMemorySchema {
    fn sources(&self) -> BTreeSet<String> {
        self.sources.keys().cloned().collect()
    }

    fn fields_for(&self, source: &str) -> Option<BTreeMap<String, FieldSpec>> {
        self.sources.get(source).cloned()
    }
}

/// Knowledge topics held in memory as raw JSON values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemoryKnowledge {
    topics: BTreeMap<String, serde_json::Value>,
}

impl InMemoryKnowledge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_topic(mut self, topic: impl Into<String>, facts: serde_json::Value) -> Self {
        self.topics.insert(topic.into(), facts);
        self
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        load_structured(path).context("Failed to load knowledge base")
    }
}

impl KnowledgeBase for InMemoryKnowledge {
    fn get(&self, topic: &str) -> Option<serde_json::Value> {
        self.topics.get(topic).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{FieldType, DOMAIN_RULES_TOPIC};
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn schema_builder_and_queries() {
        let schema = InMemorySchema::new()
            .with_field("wells", "well_count", FieldSpec::new(FieldType::Integer))
            .with_source("empty");
        assert_eq!(schema.sources().len(), 2);
        assert!(schema.fields_for("wells").unwrap().contains_key("well_count"));
        assert!(schema.fields_for("empty").unwrap().is_empty());
        assert!(schema.fields_for("missing").is_none());
    }

    #[test]
    fn schema_loads_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "wells:\n  well_count: {{ type: integer, required: true }}\n  basin: {{ type: categorical }}"
        )
        .unwrap();

        let schema = InMemorySchema::from_file(file.path()).unwrap();
        let fields = schema.fields_for("wells").unwrap();
        assert_eq!(fields["well_count"].field_type, FieldType::Integer);
        assert!(fields["well_count"].required);
        assert!(!fields["basin"].required);
    }

    #[test]
    fn knowledge_loads_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"domain_rules": {{"required_fields": ["api_number"]}}}}"#).unwrap();

        let knowledge = InMemoryKnowledge::from_file(file.path()).unwrap();
        assert_eq!(
            knowledge.get(DOMAIN_RULES_TOPIC),
            Some(json!({"required_fields": ["api_number"]}))
        );
        assert!(knowledge.get("other").is_none());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = InMemorySchema::from_file(Path::new("/nonexistent/schema.yaml")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/schema.yaml"));
    }
}
