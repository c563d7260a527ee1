//! Read-only fact ports: the domain knowledge base and the field schema.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::models::FieldSpec;

/// Structured domain facts keyed by topic. Pure and read-only.
pub trait KnowledgeBase: Send + Sync {
    /// Facts for `topic`, or `None` when the topic is unknown.
    fn get(&self, topic: &str) -> Option<serde_json::Value>;
}

/// The external field schema, one field map per data source.
pub trait SchemaProvider: Send + Sync {
    fn sources(&self) -> BTreeSet<String>;

    /// Field map for `source`, or `None` for an unknown source.
    fn fields_for(&self, source: &str) -> Option<BTreeMap<String, FieldSpec>>;
}
