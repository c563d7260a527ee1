//! Dependency compatibility: every edge the spec implies must land on
//! something the implementation actually provides.
//!
//! Edges come from three places: explicit child references, an implicit
//! data-provider edge for every data binding, and an implicit capability
//! edge for every kind whose profile names one.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::bail;

use super::canonical::{accepts_param, canonical, UnitIndex};
use super::traits::{AnalysisInput, ConsistencyAnalyzer};
use crate::domain::models::{
    Conflict, ConflictKind, ConflictTarget, KindProfile, Severity, SpecComponent,
    COMPONENT_KINDS_TOPIC,
};
use crate::domain::ports::ExtractedUnit;

const NAME: &str = "dependency_compatibility";

#[derive(Debug, Clone, Default)]
pub struct DependencyCompatibilityAnalyzer {
    /// Canonical parameter names that count as a data provider.
    data_params: BTreeSet<String>,
}

impl DependencyCompatibilityAnalyzer {
    pub fn new(data_param_names: &[String]) -> Self {
        Self {
            data_params: data_param_names.iter().map(|n| canonical(n)).collect(),
        }
    }

    fn has_data_provider(&self, unit: &ExtractedUnit) -> bool {
        !unit.data_sources.is_empty()
            || unit.params.keys().any(|p| self.data_params.contains(&canonical(p)))
    }

    fn dependency_error(component: &SpecComponent, description: String, resolution: String) -> Conflict {
        Conflict::new(
            ConflictKind::DependencyError,
            NAME,
            Severity::High,
            ConflictTarget::Impl,
            description,
        )
        .with_component(&component.name)
        .with_resolution(resolution)
        .at_path(format!("components/{}", component.name))
    }

    fn check_unit(
        &self,
        component: &SpecComponent,
        unit: &ExtractedUnit,
        profile: Option<&KindProfile>,
        imports: &[String],
    ) -> Vec<Conflict> {
        // `imports` are those of `unit.module` only
        let mut conflicts = Vec::new();

        if component.data_binding.is_some() && !self.has_data_provider(unit) {
            conflicts.push(Self::dependency_error(
                component,
                format!(
                    "'{}' is data-bound but `{}` neither fetches data nor accepts a data parameter",
                    component.name, unit.name
                ),
                format!("Pass data into `{}` or fetch it there", unit.name),
            ));
        }

        if let Some(profile) = profile {
            if let Some(capability) = &profile.capability {
                let wanted = capability.to_lowercase();
                if !imports.iter().any(|import| import.contains(&wanted)) {
                    conflicts.push(Self::dependency_error(
                        component,
                        format!(
                            "'{}' ({}) needs a {capability} capability but `{}` does not import one",
                            component.name, component.kind, unit.module
                        ),
                        format!("Import a {capability} library in the module defining `{}`", unit.name),
                    ));
                }
            }

            let missing: Vec<&str> = profile
                .required_props
                .iter()
                .filter(|prop| !accepts_param(unit, prop))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::RequiredPropMissing,
                        NAME,
                        Severity::High,
                        ConflictTarget::Impl,
                        format!(
                            "`{}` implements a {} but does not accept {}",
                            unit.name,
                            component.kind,
                            missing.join(", ")
                        ),
                    )
                    .with_component(&component.name)
                    .with_resolution(format!("Accept {} in `{}`", missing.join(", "), unit.name))
                    .at_path(format!("components/{}/props", component.name)),
                );
            }
        }

        if component.interactive && unit.handler_params().next().is_none() && !unit.event_wiring {
            conflicts.push(
                Conflict::new(
                    ConflictKind::EventContractInvalid,
                    NAME,
                    Severity::Medium,
                    ConflictTarget::Impl,
                    format!(
                        "'{}' is interactive but `{}` exposes no handler and wires no event",
                        component.name, unit.name
                    ),
                )
                .with_component(&component.name)
                .with_resolution(format!("Accept an on<Event> callback in `{}`", unit.name)),
            );
        }

        conflicts
    }
}

impl ConsistencyAnalyzer for DependencyCompatibilityAnalyzer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn analyze(&self, input: &AnalysisInput<'_>) -> anyhow::Result<Vec<Conflict>> {
        input.spec.ensure_well_formed()?;
        if let Some(err) = input.context.knowledge_errors.get(COMPONENT_KINDS_TOPIC) {
            bail!("component kind catalog is unusable: {err}");
        }
        if input.spec.components.is_empty() {
            return Ok(Vec::new());
        }

        let units = input.extractor.units(input.implementation);
        let index = UnitIndex::new(&units);
        let imports: BTreeMap<String, Vec<String>> = input
            .extractor
            .imports(input.implementation)
            .into_iter()
            .map(|(module, specs)| (module, specs.iter().map(|i| i.to_lowercase()).collect()))
            .collect();

        let mut conflicts = Vec::new();
        for component in &input.spec.components {
            for child in &component.children {
                if !index.contains(child) {
                    conflicts.push(Self::dependency_error(
                        component,
                        format!("'{}' nests '{child}', which is not defined", component.name),
                        format!("Define a unit for '{child}'"),
                    ));
                }
            }

            if let Some(unit) = index.get(&component.name) {
                let profile = input.context.kinds.profile(&component.kind);
                let unit_imports = imports.get(&unit.module).map(Vec::as_slice).unwrap_or_default();
                conflicts.extend(self.check_unit(component, unit, profile, unit_imports));
            }
        }

        Ok(conflicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryKnowledge, InMemorySchema, RegexExtractor};
    use crate::domain::models::{AnalysisConfig, ExternalContext, ImplArtifact, SpecArtifact};
    use serde_json::json;

    fn run(spec: &SpecArtifact, implementation: &ImplArtifact) -> Vec<Conflict> {
        let config = AnalysisConfig::default();
        let extractor = RegexExtractor::from_config(&config).unwrap();
        let context = ExternalContext::default();
        let input = AnalysisInput {
            spec,
            implementation,
            context: &context,
            extractor: &extractor,
        };
        DependencyCompatibilityAnalyzer::new(&config.data_param_names)
            .analyze(&input)
            .unwrap()
    }

    fn kinds(conflicts: &[Conflict]) -> Vec<ConflictKind> {
        conflicts.iter().map(|c| c.kind).collect()
    }

    #[test]
    fn satisfied_chart_has_no_dependency_conflicts() {
        let spec = SpecArtifact::new().with_component(
            SpecComponent::new("Production Chart", "line_chart").bound_to("oil_rate"),
        );
        let implementation = ImplArtifact::new().with_module(
            "chart.tsx",
            "import { LineChart } from 'recharts';\nexport const ProductionChart = ({ data }) => <LineChart data={data} />;\n",
        );
        assert!(run(&spec, &implementation).is_empty());
    }

    #[test]
    fn bare_chart_misses_provider_capability_and_props() {
        let spec = SpecArtifact::new()
            .with_component(SpecComponent::new("Well Count Chart", "bar_chart").bound_to("well_count"));
        let implementation = ImplArtifact::new()
            .with_module("chart.tsx", "export function WellCountChart() { return <svg />; }\n");

        assert_eq!(
            kinds(&run(&spec, &implementation)),
            vec![
                ConflictKind::DependencyError,
                ConflictKind::DependencyError,
                ConflictKind::RequiredPropMissing
            ]
        );
    }

    #[test]
    fn capability_imported_by_another_module_does_not_count() {
        let spec = SpecArtifact::new().with_component(
            SpecComponent::new("Production Chart", "line_chart").bound_to("oil_rate"),
        );
        let implementation = ImplArtifact::new()
            .with_module(
                "chart.tsx",
                "export const ProductionChart = ({ data }) => <svg>{data.length}</svg>;\n",
            )
            .with_module("theme.ts", "import { LineChart } from 'recharts';\n");

        let conflicts = run(&spec, &implementation);
        assert_eq!(kinds(&conflicts), vec![ConflictKind::DependencyError]);
        assert!(conflicts[0].description.contains("chart.tsx"));
    }

    #[test]
    fn fetching_unit_counts_as_provider() {
        let spec = SpecArtifact::new()
            .with_component(SpecComponent::new("Wells", "card").bound_to("well_count"));
        let implementation = ImplArtifact::new().with_module(
            "wells.tsx",
            "export function Wells() {\n  const rows = useData('wells');\n  return <div />;\n}\n",
        );
        assert!(run(&spec, &implementation).is_empty());
    }

    #[test]
    fn undefined_children_are_dependency_errors() {
        let spec = SpecArtifact::new()
            .with_component(SpecComponent::new("Page", "section").with_child("Legend"));
        let conflicts = run(&spec, &ImplArtifact::new());
        assert_eq!(kinds(&conflicts), vec![ConflictKind::DependencyError]);
        assert_eq!(conflicts[0].severity, Severity::High);
        assert_eq!(conflicts[0].target, ConflictTarget::Impl);
    }

    #[test]
    fn interactive_unit_needs_a_handler_or_wiring() {
        let spec = SpecArtifact::new().with_component(
            SpecComponent::new("Basin Filter", "filter")
                .with_prop("label", json!("Basin"))
                .interactive(),
        );
        let silent = ImplArtifact::new()
            .with_module("f.tsx", "export const BasinFilter = ({ label }) => <div>{label}</div>;\n");
        assert_eq!(kinds(&run(&spec, &silent)), vec![ConflictKind::EventContractInvalid]);

        let with_handler = ImplArtifact::new()
            .with_module("f.tsx", "export const BasinFilter = ({ label, onSelect }) => <div>{label}</div>;\n");
        assert!(run(&spec, &with_handler).is_empty());
    }

    #[test]
    fn malformed_kind_catalog_fails() {
        let knowledge = InMemoryKnowledge::new().with_topic(COMPONENT_KINDS_TOPIC, json!(7));
        let context = ExternalContext::assemble(&InMemorySchema::new(), &knowledge, &[]);
        let extractor = RegexExtractor::from_config(&AnalysisConfig::default()).unwrap();
        let spec = SpecArtifact::new();
        let implementation = ImplArtifact::new();
        let input = AnalysisInput {
            spec: &spec,
            implementation: &implementation,
            context: &context,
            extractor: &extractor,
        };
        assert!(DependencyCompatibilityAnalyzer::new(&[]).analyze(&input).is_err());
    }
}
