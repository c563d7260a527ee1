//! Specification and implementation artifacts.
//!
//! Both artifacts are replaced wholesale: a producer returns a complete new
//! value and the [`ArtifactStore`](crate::services::ArtifactStore) stamps it
//! with the next version number. Nothing edits a stored artifact in place.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

// ---------------------------------------------------------------------------
// SpecComponent
// ---------------------------------------------------------------------------

/// A single named component of the UI specification.
///
/// This is the one normalized record type every analyzer reads; producers
/// that emit loosely shaped JSON or YAML are deserialized into it once at
/// the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecComponent {
    /// Human-readable name, unique within a spec version.
    pub name: String,
    /// Abstract UI role, e.g. `bar_chart`, `table`, `card`.
    pub kind: String,
    /// Declared properties.
    #[serde(default)]
    pub props: BTreeMap<String, serde_json::Value>,
    /// Field path into the external schema (`field` or `source.field`).
    #[serde(default, alias = "data_field")]
    pub data_binding: Option<String>,
    /// Whether the component responds to user input.
    #[serde(default)]
    pub interactive: bool,
    /// Names of nested components.
    #[serde(default)]
    pub children: Vec<String>,
    /// Visible label, when it differs from the name.
    #[serde(default)]
    pub label: Option<String>,
}

impl SpecComponent {
    /// Create a component with no props, binding, or children.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            props: BTreeMap::new(),
            data_binding: None,
            interactive: false,
            children: Vec::new(),
            label: None,
        }
    }

    /// Declare a property.
    pub fn with_prop(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.props.insert(key.into(), value);
        self
    }

    /// Bind the component to a schema field path.
    pub fn bound_to(mut self, field_path: impl Into<String>) -> Self {
        self.data_binding = Some(field_path.into());
        self
    }

    /// Mark the component as interactive.
    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }

    /// Declare a nested component by name.
    pub fn with_child(mut self, child: impl Into<String>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Set the visible label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The label a user would see: the explicit label, else a string
    /// `label` or `title` prop.
    pub fn display_label(&self) -> Option<&str> {
        self.label.as_deref().or_else(|| {
            ["label", "title"]
                .iter()
                .find_map(|key| self.props.get(*key).and_then(serde_json::Value::as_str))
        })
    }

    /// The bound field name without any source qualifier.
    pub fn bound_field(&self) -> Option<&str> {
        self.data_binding
            .as_deref()
            .map(|path| path.rsplit('.').next().unwrap_or(path))
    }

    /// The source qualifier of the binding, if the path has one.
    pub fn binding_source(&self) -> Option<&str> {
        self.data_binding
            .as_deref()
            .and_then(|path| path.rsplit_once('.'))
            .map(|(source, _)| source)
    }
}

// ---------------------------------------------------------------------------
// SpecArtifact
// ---------------------------------------------------------------------------

/// The specification artifact: an ordered set of components plus the data
/// sources the spec declares.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecArtifact {
    /// Assigned by the store on `put_spec`; zero until stored.
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub components: Vec<SpecComponent>,
    /// Names of external data sources the spec relies on.
    #[serde(default)]
    pub data_sources: Vec<String>,
}

impl SpecArtifact {
    /// Create an empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a component.
    pub fn with_component(mut self, component: SpecComponent) -> Self {
        self.components.push(component);
        self
    }

    /// Declare a data source.
    pub fn with_data_source(mut self, source: impl Into<String>) -> Self {
        self.data_sources.push(source.into());
        self
    }

    /// Look up a component by exact name.
    pub fn component(&self, name: &str) -> Option<&SpecComponent> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.data_sources.is_empty()
    }

    /// Check the structural invariants analyzers rely on: every component
    /// has a non-blank name and kind, and names are unique.
    pub fn ensure_well_formed(&self) -> DomainResult<()> {
        let mut seen = HashSet::new();
        for (index, component) in self.components.iter().enumerate() {
            if component.name.trim().is_empty() {
                return Err(DomainError::MalformedArtifact(format!(
                    "component #{index} has an empty name"
                )));
            }
            if component.kind.trim().is_empty() {
                return Err(DomainError::MalformedArtifact(format!(
                    "component '{}' has an empty kind",
                    component.name
                )));
            }
            if !seen.insert(component.name.as_str()) {
                return Err(DomainError::MalformedArtifact(format!(
                    "duplicate component name '{}'",
                    component.name
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ImplArtifact
// ---------------------------------------------------------------------------

/// The implementation artifact: module name to source text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplArtifact {
    /// Assigned by the store on `put_impl`; zero until stored.
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

impl ImplArtifact {
    /// Create an empty implementation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a module.
    pub fn with_module(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.modules.insert(name.into(), source.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Versioned
// ---------------------------------------------------------------------------

/// A stored artifact version together with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u32,
    /// Round during which this version was deposited.
    pub round: u32,
    /// Producer-supplied explanation of the change.
    pub rationale: String,
    pub recorded_at: DateTime<Utc>,
    pub artifact: T,
}
