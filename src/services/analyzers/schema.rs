//! Schema alignment: bindings, declared sources, and field reads checked
//! against the external field schema.

use std::collections::BTreeSet;

use anyhow::bail;

use super::traits::{AnalysisInput, ConsistencyAnalyzer};
use crate::domain::models::{
    Conflict, ConflictKind, ConflictTarget, Severity, SpecComponent, COMPONENT_KINDS_TOPIC,
};

const NAME: &str = "schema_alignment";

#[derive(Debug, Clone, Default)]
pub struct SchemaAlignmentAnalyzer {
    /// Identifiers that are never schema fields (`length`, `map`, ...).
    builtins: BTreeSet<String>,
}

impl SchemaAlignmentAnalyzer {
    pub fn new(builtin_identifiers: &[String]) -> Self {
        Self {
            builtins: builtin_identifiers.iter().cloned().collect(),
        }
    }

    fn check_binding(input: &AnalysisInput<'_>, component: &SpecComponent) -> Vec<Conflict> {
        let (Some(binding), Some(field)) = (component.data_binding.as_deref(), component.bound_field())
        else {
            return Vec::new();
        };
        let schema = &input.context.schema;
        let path = format!("components/{}/data_binding", component.name);
        let mut conflicts = Vec::new();

        let qualifier = component.binding_source();
        let known_qualifier = match qualifier {
            Some(source) if !schema.has_source(source) => {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::DataSourceMismatch,
                        NAME,
                        Severity::High,
                        ConflictTarget::Spec,
                        format!(
                            "'{}' binds to `{binding}` but source '{source}' does not exist",
                            component.name
                        ),
                    )
                    .with_component(&component.name)
                    .with_resolution(format!(
                        "Use one of the known sources: {}",
                        join(schema.sources.keys())
                    ))
                    .at_path(path.clone()),
                );
                None
            }
            other => other,
        };

        if !schema.contains_field(field) {
            conflicts.push(
                Conflict::new(
                    ConflictKind::SchemaFieldUnknown,
                    NAME,
                    Severity::High,
                    ConflictTarget::Spec,
                    format!("'{}' binds to unknown field `{field}`", component.name),
                )
                .with_component(&component.name)
                .with_resolution("Bind to a field that exists in the schema")
                .at_path(path),
            );
            return conflicts;
        }

        let profile = input.context.kinds.profile(&component.kind);
        let field_spec = schema.lookup(known_qualifier, field);
        if let (Some(profile), Some(field_spec)) = (profile, field_spec) {
            let field_class = field_spec.field_type.class();
            if !profile.type_class.accepts(field_class) {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::TypeIncompatible,
                        NAME,
                        Severity::High,
                        ConflictTarget::Spec,
                        format!(
                            "'{}' is a {} ({} data) bound to `{field}`, which is {}",
                            component.name,
                            component.kind,
                            profile.type_class.as_str(),
                            field_class.as_str()
                        ),
                    )
                    .with_component(&component.name)
                    .with_resolution(format!(
                        "Bind a {} field or choose a kind that displays {} data",
                        profile.type_class.as_str(),
                        field_class.as_str()
                    ))
                    .at_path(path),
                );
            }
        }

        conflicts
    }
}

impl ConsistencyAnalyzer for SchemaAlignmentAnalyzer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn analyze(&self, input: &AnalysisInput<'_>) -> anyhow::Result<Vec<Conflict>> {
        input.spec.ensure_well_formed()?;
        if let Some(err) = input.context.knowledge_errors.get(COMPONENT_KINDS_TOPIC) {
            bail!("component kind catalog is unusable: {err}");
        }

        let accessed: BTreeSet<String> = input
            .extractor
            .field_accesses(input.implementation)
            .into_iter()
            .filter(|field| !self.builtins.contains(field))
            .collect();
        let has_bindings = input.spec.components.iter().any(|c| c.data_binding.is_some());
        let needs_schema = has_bindings || !input.spec.data_sources.is_empty() || !accessed.is_empty();

        let schema = &input.context.schema;
        if !needs_schema {
            return Ok(Vec::new());
        }
        let unloaded = input.context.unloaded_sources();
        if !unloaded.is_empty() {
            bail!("schema sources could not be loaded: {}", unloaded.join(", "));
        }
        if schema.sources.is_empty() {
            bail!("no schema sources are available");
        }

        let mut conflicts = Vec::new();

        for component in &input.spec.components {
            conflicts.extend(Self::check_binding(input, component));
        }

        for source in &input.spec.data_sources {
            if !schema.has_source(source) {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::DataSourceMismatch,
                        NAME,
                        Severity::High,
                        ConflictTarget::Spec,
                        format!("spec declares unknown data source '{source}'"),
                    )
                    .with_resolution(format!(
                        "Use one of the known sources: {}",
                        join(schema.sources.keys())
                    ))
                    .at_path(format!("data_sources/{source}")),
                );
            }
        }

        for field in accessed.iter().filter(|f| !schema.contains_field(f)) {
            let bound_by = input
                .spec
                .components
                .iter()
                .find(|c| c.bound_field() == Some(field.as_str()));
            let mut conflict = Conflict::new(
                ConflictKind::SchemaFieldUnknown,
                NAME,
                Severity::Medium,
                ConflictTarget::Impl,
                format!("implementation reads unknown field `{field}`"),
            )
            .with_resolution("Read a field that exists in the schema")
            .at_path(format!("fields/{field}"));
            if let Some(component) = bound_by {
                conflict = conflict.with_component(&component.name);
            }
            conflicts.push(conflict);
        }

        Ok(conflicts)
    }
}

fn join<'a>(items: impl Iterator<Item = &'a String>) -> String {
    items.map(String::as_str).collect::<Vec<_>>().join(", ")
}
