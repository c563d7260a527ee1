//! Structural alignment: does every spec component exist in the
//! implementation with the props, wiring, and nesting the spec declares?

use std::collections::BTreeSet;

use serde_json::Value;

use super::canonical::{accepts_param, canonical, UnitIndex};
use super::traits::{AnalysisInput, ConsistencyAnalyzer};
use crate::domain::models::{Conflict, ConflictKind, ConflictTarget, Severity, SpecComponent};
use crate::domain::ports::ExtractedUnit;

const NAME: &str = "structural_alignment";

#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralAlignmentAnalyzer;

impl StructuralAlignmentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn check_component(component: &SpecComponent, unit: &ExtractedUnit) -> Vec<Conflict> {
        let mut conflicts = Vec::new();
        let path = format!("components/{}", component.name);

        let missing: Vec<&str> = component
            .props
            .keys()
            .filter(|prop| !accepts_param(unit, prop))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            conflicts.push(
                Conflict::new(
                    ConflictKind::PropMismatch,
                    NAME,
                    Severity::Medium,
                    ConflictTarget::Impl,
                    format!(
                        "'{}' declares props not accepted by `{}`: {}",
                        component.name,
                        unit.name,
                        missing.join(", ")
                    ),
                )
                .with_component(&component.name)
                .with_resolution(format!("Add parameters {} to `{}`", missing.join(", "), unit.name))
                .at_path(format!("{path}/props")),
            );
        }

        for (prop, value) in &component.props {
            let Some(expected) = literal_of(value) else {
                continue;
            };
            let wanted = canonical(prop);
            let declared = unit
                .params
                .iter()
                .find(|(param, _)| canonical(param) == wanted)
                .and_then(|(_, default)| default.as_deref());
            if let Some(actual) = declared {
                if actual != expected {
                    conflicts.push(
                        Conflict::new(
                            ConflictKind::AttributeMismatch,
                            NAME,
                            Severity::Low,
                            ConflictTarget::Impl,
                            format!(
                                "'{}' sets {prop} to \"{expected}\" but `{}` defaults it to \"{actual}\"",
                                component.name, unit.name
                            ),
                        )
                        .with_component(&component.name)
                        .with_resolution(format!("Change the default of {prop} to \"{expected}\""))
                        .at_path(format!("{path}/props/{prop}")),
                    );
                }
            }
        }

        if component.interactive && !unit.event_wiring {
            conflicts.push(
                Conflict::new(
                    ConflictKind::InteractivityMismatch,
                    NAME,
                    Severity::Medium,
                    ConflictTarget::Impl,
                    format!(
                        "'{}' is interactive but `{}` wires no event handler",
                        component.name, unit.name
                    ),
                )
                .with_component(&component.name)
                .with_resolution("Wire an event handler (e.g. onClick/onChange)")
                .at_path(format!("{path}/interactive")),
            );
        }

        let nested: BTreeSet<String> = unit.children.iter().map(|c| canonical(c)).collect();
        let absent: Vec<&str> = component
            .children
            .iter()
            .filter(|child| !nested.contains(&canonical(child)))
            .map(String::as_str)
            .collect();
        if !absent.is_empty() {
            conflicts.push(
                Conflict::new(
                    ConflictKind::NestingMismatch,
                    NAME,
                    Severity::Low,
                    ConflictTarget::Impl,
                    format!(
                        "`{}` does not render declared children of '{}': {}",
                        unit.name,
                        component.name,
                        absent.join(", ")
                    ),
                )
                .with_component(&component.name)
                .with_resolution(format!("Render {} inside `{}`", absent.join(", "), unit.name))
                .at_path(format!("{path}/children")),
            );
        }

        conflicts
    }
}

impl ConsistencyAnalyzer for StructuralAlignmentAnalyzer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn analyze(&self, input: &AnalysisInput<'_>) -> anyhow::Result<Vec<Conflict>> {
        input.spec.ensure_well_formed()?;

        let units = input.extractor.units(input.implementation);
        let index = UnitIndex::new(&units);
        let mut conflicts = Vec::new();

        for component in &input.spec.components {
            match index.get(&component.name) {
                Some(unit) => conflicts.extend(Self::check_component(component, unit)),
                None => conflicts.push(
                    Conflict::new(
                        ConflictKind::MissingComponent,
                        NAME,
                        Severity::High,
                        ConflictTarget::Impl,
                        format!("'{}' ({}) is not implemented", component.name, component.kind),
                    )
                    .with_component(&component.name)
                    .with_resolution(format!("Define a `{}` unit", pascal_case(&component.name)))
                    .at_path(format!("components/{}", component.name)),
                ),
            }
        }

        let declared: BTreeSet<String> =
            input.spec.components.iter().map(|c| canonical(&c.name)).collect();
        for unit in index.iter() {
            if unit.looks_exported() && !declared.contains(&canonical(&unit.name)) {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::MissingComponent,
                        NAME,
                        Severity::Low,
                        ConflictTarget::Spec,
                        format!("`{}` in {} has no counterpart in the spec", unit.name, unit.module),
                    )
                    .with_component(&unit.name)
                    .with_resolution(format!("Declare '{}' in the spec or remove it", unit.name)),
                );
            }
        }

        Ok(conflicts)
    }
}

/// The comparable literal form of a prop value, if it is a scalar.
fn literal_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `"well count chart"` becomes `WellCountChart`.
fn pascal_case(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect()
}
