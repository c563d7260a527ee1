//! Static extraction port.
//!
//! Analyzers never read implementation source text directly; they go through
//! a [`StaticExtractor`], so a pattern-based extractor can be swapped for a
//! real parser without touching any analyzer.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::models::ImplArtifact;

/// A unit (component, function, class) defined in the implementation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedUnit {
    pub name: String,
    /// Module the unit was found in.
    pub module: String,
    /// Accepted parameter names, with the literal default when one is declared.
    pub params: BTreeMap<String, Option<String>>,
    /// Data sources the unit fetches or subscribes to.
    pub data_sources: BTreeSet<String>,
    /// Whether an event handler is wired anywhere in the unit body.
    pub event_wiring: bool,
    /// Other units instantiated inside this one.
    pub children: BTreeSet<String>,
}

impl ExtractedUnit {
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            ..Self::default()
        }
    }

    /// Heuristic for a top-level exported unit: a capitalized identifier.
    pub fn looks_exported(&self) -> bool {
        self.name.chars().next().is_some_and(char::is_uppercase)
    }

    /// Parameters that look like event handlers (`onClick`, `onSelect`, ...).
    pub fn handler_params(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str).filter(|name| {
            name.strip_prefix("on")
                .and_then(|rest| rest.chars().next())
                .is_some_and(char::is_uppercase)
        })
    }
}

/// Extracts identifiers, dependency edges, and event wiring from source text.
pub trait StaticExtractor: Send + Sync {
    /// Units defined across all modules, in module then source order.
    fn units(&self, artifact: &ImplArtifact) -> Vec<ExtractedUnit>;

    /// Field names read through the known accessor forms.
    fn field_accesses(&self, artifact: &ImplArtifact) -> BTreeSet<String>;

    /// Import specifiers (package or module paths), keyed by the module
    /// that declares them.
    fn imports(&self, artifact: &ImplArtifact) -> BTreeMap<String, BTreeSet<String>>;
}
