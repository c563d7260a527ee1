//! Domain knowledge checks driven by the knowledge base's rule bag.
//!
//! Every conflict from this analyzer targets the spec: these are design
//! decisions, not implementation slips.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Context};
use regex::Regex;
use serde_json::Value;

use super::traits::{AnalysisInput, ConsistencyAnalyzer};
use crate::domain::models::{
    Conflict, ConflictKind, ConflictTarget, DomainRules, SchemaSnapshot, Severity, SpecComponent,
    DOMAIN_RULES_TOPIC,
};

const NAME: &str = "domain_knowledge";

#[derive(Debug, Default, Clone, Copy)]
pub struct DomainKnowledgeAnalyzer;

/// Resolves the processing stage of a bound field.
struct StageResolver<'a> {
    rules: &'a DomainRules,
    schema: &'a SchemaSnapshot,
    patterns: Vec<Regex>,
}

impl<'a> StageResolver<'a> {
    fn new(rules: &'a DomainRules, schema: &'a SchemaSnapshot) -> anyhow::Result<Self> {
        let patterns = rules
            .stage_patterns
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("invalid stage pattern `{p}`")))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self {
            rules,
            schema,
            patterns,
        })
    }

    /// Explicit rule marker first, then the schema's marker, then the first
    /// pattern whose capture matches the field name.
    fn stage_of(&self, source: Option<&str>, field: &str) -> Option<String> {
        self.rules
            .stage_markers
            .get(field)
            .cloned()
            .or_else(|| self.schema.lookup(source, field).and_then(|f| f.stage.clone()))
            .or_else(|| {
                self.patterns.iter().find_map(|pattern| {
                    pattern
                        .captures(field)
                        .and_then(|caps| caps.get(1))
                        .map(|m| m.as_str().to_string())
                })
            })
            .map(|stage| normalize_stage(&stage))
    }
}

fn normalize_stage(stage: &str) -> String {
    stage
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

impl DomainKnowledgeAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn stage_mixing(
        components: &[SpecComponent],
        resolver: &StageResolver<'_>,
    ) -> Option<Conflict> {
        let mut stages: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for component in components {
            if let Some(field) = component.bound_field() {
                if let Some(stage) = resolver.stage_of(component.binding_source(), field) {
                    stages.entry(stage).or_default().push(&component.name);
                }
            }
        }
        if stages.len() < 2 {
            return None;
        }

        let summary = stages
            .iter()
            .map(|(stage, names)| format!("{stage}: {}", names.join(", ")))
            .collect::<Vec<_>>()
            .join("; ");
        Some(
            Conflict::new(
                ConflictKind::DangerousAffordance,
                NAME,
                Severity::High,
                ConflictTarget::Spec,
                format!("data from different processing stages is mixed in one view ({summary})"),
            )
            .with_resolution("Separate each stage into its own section or tab"),
        )
    }

    fn forbidden_pairs(rules: &DomainRules, bound: &BTreeMap<&str, &str>) -> Vec<Conflict> {
        rules
            .forbidden_cooccurrences
            .iter()
            .filter_map(|[a, b]| {
                let first = bound.get(a.as_str())?;
                let second = bound.get(b.as_str())?;
                Some(
                    Conflict::new(
                        ConflictKind::DangerousAffordance,
                        NAME,
                        Severity::High,
                        ConflictTarget::Spec,
                        format!(
                            "`{a}` ('{first}') and `{b}` ('{second}') must not be shown together"
                        ),
                    )
                    .with_component(*second)
                    .with_resolution(format!("Move `{b}` into a separate section from `{a}`")),
                )
            })
            .collect()
    }

    fn required_fields(rules: &DomainRules, components: &[SpecComponent]) -> Vec<Conflict> {
        rules
            .required_fields
            .iter()
            .filter(|field| !components.iter().any(|c| references(c, field)))
            .map(|field| {
                Conflict::new(
                    ConflictKind::InvalidDomainAssumption,
                    NAME,
                    Severity::Medium,
                    ConflictTarget::Spec,
                    format!("required field `{field}` is not presented by any component"),
                )
                .with_resolution(format!("Add a component that shows `{field}`"))
                .at_path(format!("fields/{field}"))
            })
            .collect()
    }

    fn labeling(rules: &DomainRules, component: &SpecComponent) -> Option<Conflict> {
        let label = component.display_label()?;
        let path = format!("components/{}/label", component.name);

        let convention = component
            .bound_field()
            .and_then(|field| rules.labeling.get(field));
        if let Some(expected) = convention {
            if label.trim() != expected {
                return Some(
                    Conflict::new(
                        ConflictKind::IncorrectLabeling,
                        NAME,
                        Severity::Low,
                        ConflictTarget::Spec,
                        format!("'{}' is labeled \"{label}\" instead of \"{expected}\"", component.name),
                    )
                    .with_component(&component.name)
                    .with_resolution(expected.clone())
                    .at_path(path),
                );
            }
            return None;
        }

        is_raw_identifier(label).then(|| {
            Conflict::new(
                ConflictKind::IncorrectLabeling,
                NAME,
                Severity::Low,
                ConflictTarget::Spec,
                format!("'{}' shows the raw identifier \"{label}\" as its label", component.name),
            )
            .with_component(&component.name)
            .with_resolution(humanize(label))
            .at_path(path)
        })
    }

    fn redundant_kinds(rules: &DomainRules, components: &[SpecComponent]) -> Vec<Conflict> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for component in components {
            *counts.entry(component.kind.to_lowercase()).or_default() += 1;
        }

        rules
            .redundant_kinds
            .iter()
            .filter(|[a, b]| {
                let a = a.to_lowercase();
                let b = b.to_lowercase();
                if a == b {
                    counts.get(&a).is_some_and(|n| *n >= 2)
                } else {
                    counts.contains_key(&a) && counts.contains_key(&b)
                }
            })
            .map(|[a, b]| {
                Conflict::new(
                    ConflictKind::OutOfDomainPattern,
                    NAME,
                    Severity::Low,
                    ConflictTarget::Spec,
                    format!("{a} and {b} present the same information"),
                )
                .with_resolution(format!("Keep either the {a} or the {b}"))
            })
            .collect()
    }
}

impl ConsistencyAnalyzer for DomainKnowledgeAnalyzer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn analyze(&self, input: &AnalysisInput<'_>) -> anyhow::Result<Vec<Conflict>> {
        input.spec.ensure_well_formed()?;
        if let Some(err) = input.context.knowledge_errors.get(DOMAIN_RULES_TOPIC) {
            bail!("domain rule bag is unusable: {err}");
        }

        let rules = &input.context.rules;
        let components = &input.spec.components;
        let resolver = StageResolver::new(rules, &input.context.schema)?;

        let separators: BTreeSet<String> =
            rules.separator_kinds.iter().map(|k| k.to_lowercase()).collect();
        let sectioned = components
            .iter()
            .any(|c| separators.contains(&c.kind.to_lowercase()));

        let mut conflicts = Vec::new();

        if !sectioned {
            conflicts.extend(Self::stage_mixing(components, &resolver));

            let mut bound: BTreeMap<&str, &str> = BTreeMap::new();
            for component in components {
                if let Some(field) = component.bound_field() {
                    bound.entry(field).or_insert(component.name.as_str());
                }
            }
            conflicts.extend(Self::forbidden_pairs(rules, &bound));
        }

        conflicts.extend(Self::required_fields(rules, components));
        conflicts.extend(components.iter().filter_map(|c| Self::labeling(rules, c)));
        conflicts.extend(Self::redundant_kinds(rules, components));

        Ok(conflicts)
    }
}

/// Whether a component presents `field`, through its binding or as a string
/// in one of its props (e.g. a table's column list).
fn references(component: &SpecComponent, field: &str) -> bool {
    fn mentions(value: &Value, field: &str) -> bool {
        match value {
            Value::String(s) => s == field,
            Value::Array(items) => items.iter().any(|v| mentions(v, field)),
            Value::Object(map) => map.values().any(|v| mentions(v, field)),
            _ => false,
        }
    }

    component.bound_field() == Some(field) || component.props.values().any(|v| mentions(v, field))
}

/// A label that reads like an identifier: no spaces and either separator
/// characters or a single all-lowercase token.
fn is_raw_identifier(label: &str) -> bool {
    let label = label.trim();
    if label.is_empty() || label.chars().any(char::is_whitespace) {
        return false;
    }
    if label.contains(['_', '-', '.']) {
        return true;
    }
    label.chars().any(char::is_alphabetic)
        && label
            .chars()
            .all(|c| c.is_ascii_digit() || (c.is_alphabetic() && c.is_lowercase()))
}

/// `well_count` becomes `Well Count`.
fn humanize(identifier: &str) -> String {
    identifier
        .split(['_', '-', '.'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
