//! End-to-end analysis scenarios run through the standard analyzer cluster.

use serde_json::json;

use specweave::domain::models::{
    AnalysisConfig, Conflict, ConflictKind, ConflictTarget, ExternalContext, FieldSpec, FieldType,
    ImplArtifact, Severity, SpecArtifact, SpecComponent,
};
use specweave::services::AnalyzerCluster;
use specweave::{InMemoryKnowledge, InMemorySchema, RegexExtractor};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn analyze(
    spec: &SpecArtifact,
    implementation: &ImplArtifact,
    schema: &InMemorySchema,
    knowledge: &InMemoryKnowledge,
) -> Vec<Conflict> {
    let config = AnalysisConfig::default();
    let context = ExternalContext::assemble(schema, knowledge, &config.envelope_fields);
    let extractor = RegexExtractor::from_config(&config).expect("default patterns compile");
    AnalyzerCluster::standard(&config, Box::new(extractor)).run(spec, implementation, &context)
}

fn of_kind(conflicts: &[Conflict], kind: ConflictKind) -> Vec<&Conflict> {
    conflicts.iter().filter(|c| c.kind == kind).collect()
}

fn wells_schema() -> InMemorySchema {
    InMemorySchema::new()
        .with_field("wells", "operator", FieldSpec::new(FieldType::Categorical))
        .with_field("wells", "oil_rate", FieldSpec::new(FieldType::Float))
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn missing_props_are_reported_once_against_a_canonically_matched_unit() {
    let spec = SpecArtifact::new().with_component(
        SpecComponent::new("Well Count Chart", "bar_chart")
            .with_prop("title", json!("Well Count"))
            .with_prop("xAxis", json!("operator"))
            .bound_to("well_count"),
    );
    let implementation = ImplArtifact::new().with_module(
        "WellCountChart.tsx",
        "export function WellCountChart() {\n  return <div className=\"chart\" />;\n}\n",
    );

    let conflicts = analyze(&spec, &implementation, &wells_schema(), &InMemoryKnowledge::new());

    let mismatches = of_kind(&conflicts, ConflictKind::PropMismatch);
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].severity, Severity::Medium);
    assert!(mismatches[0].description.contains("title"));
    assert!(mismatches[0].description.contains("xAxis"));
    assert!(of_kind(&conflicts, ConflictKind::MissingComponent).is_empty());
}

#[test]
fn filter_with_a_default_handler_keeps_its_props_and_events() {
    let spec = SpecArtifact::new().with_component(
        SpecComponent::new("Basin Filter", "filter")
            .with_prop("label", json!("Basin"))
            .interactive(),
    );
    let implementation = ImplArtifact::new().with_module(
        "BasinFilter.tsx",
        "export const BasinFilter = ({ label, onSelect = () => {} }) => <select onChange={onSelect}>{label}</select>;\n",
    );

    let conflicts = analyze(&spec, &implementation, &wells_schema(), &InMemoryKnowledge::new());
    for kind in [
        ConflictKind::MissingComponent,
        ConflictKind::PropMismatch,
        ConflictKind::InteractivityMismatch,
        ConflictKind::EventContractInvalid,
    ] {
        assert!(of_kind(&conflicts, kind).is_empty(), "{conflicts:#?}");
    }
}

#[test]
fn unknown_bound_field_is_flagged_on_both_sides() {
    let spec = SpecArtifact::new().with_component(
        SpecComponent::new("Well Count", "kpi_card").bound_to("well_count"),
    );
    let implementation = ImplArtifact::new().with_module(
        "WellCount.tsx",
        "export const WellCount = ({ value, rows }) => <span>{rows.map(row => row.well_count)}</span>;\n",
    );

    let conflicts = analyze(&spec, &implementation, &wells_schema(), &InMemoryKnowledge::new());
    let unknown = of_kind(&conflicts, ConflictKind::SchemaFieldUnknown);

    assert_eq!(unknown.len(), 2);
    assert!(unknown
        .iter()
        .any(|c| c.severity == Severity::High && c.target == ConflictTarget::Spec));
    assert!(unknown
        .iter()
        .any(|c| c.severity == Severity::Medium && c.target == ConflictTarget::Impl));
}

#[test]
fn mixing_processing_stages_without_sectioning_is_one_dangerous_affordance() {
    let schema = InMemorySchema::new()
        .with_field("wells", "raw_oil_rate", FieldSpec::new(FieldType::Float).in_stage("stage1"))
        .with_field("wells", "oil_rate", FieldSpec::new(FieldType::Float).in_stage("stage2"))
        .with_field("wells", "water_cut", FieldSpec::new(FieldType::Float).in_stage("stage2"));
    let spec = SpecArtifact::new()
        .with_component(SpecComponent::new("Raw Rate", "line_chart").bound_to("raw_oil_rate"))
        .with_component(SpecComponent::new("Oil Rate", "line_chart").bound_to("oil_rate"))
        .with_component(SpecComponent::new("Water Cut", "line_chart").bound_to("water_cut"));

    let conflicts = analyze(&spec, &ImplArtifact::new(), &schema, &InMemoryKnowledge::new());
    let dangerous = of_kind(&conflicts, ConflictKind::DangerousAffordance);

    assert_eq!(dangerous.len(), 1);
    assert_eq!(dangerous[0].severity, Severity::High);
    assert_eq!(dangerous[0].target, ConflictTarget::Spec);
}

#[test]
fn sectioned_stages_are_not_dangerous() {
    let schema = InMemorySchema::new()
        .with_field("wells", "raw_oil_rate", FieldSpec::new(FieldType::Float).in_stage("stage1"))
        .with_field("wells", "oil_rate", FieldSpec::new(FieldType::Float).in_stage("stage2"));
    let spec = SpecArtifact::new()
        .with_component(SpecComponent::new("Raw Rate", "line_chart").bound_to("raw_oil_rate"))
        .with_component(SpecComponent::new("Oil Rate", "line_chart").bound_to("oil_rate"))
        .with_component(
            SpecComponent::new("Stages", "tabs")
                .with_child("Raw Rate")
                .with_child("Oil Rate"),
        );

    let conflicts = analyze(&spec, &ImplArtifact::new(), &schema, &InMemoryKnowledge::new());
    assert!(of_kind(&conflicts, ConflictKind::DangerousAffordance).is_empty());
}

#[test]
fn empty_artifacts_produce_no_conflicts() {
    let conflicts = analyze(
        &SpecArtifact::new(),
        &ImplArtifact::new(),
        &InMemorySchema::new(),
        &InMemoryKnowledge::new(),
    );
    assert!(conflicts.is_empty());
}

#[test]
fn domain_rules_from_the_knowledge_base_apply() {
    let knowledge = InMemoryKnowledge::new().with_topic(
        "domain_rules",
        json!({
            "required_fields": ["api_number"],
            "labeling": { "oil_rate": "Oil Rate (bbl/d)" }
        }),
    );
    let spec = SpecArtifact::new().with_component(
        SpecComponent::new("Oil", "line_chart")
            .bound_to("oil_rate")
            .with_label("oil"),
    );

    let conflicts = analyze(&spec, &ImplArtifact::new(), &wells_schema(), &knowledge);

    let assumptions = of_kind(&conflicts, ConflictKind::InvalidDomainAssumption);
    assert_eq!(assumptions.len(), 1);
    assert!(assumptions[0].description.contains("api_number"));

    let labels = of_kind(&conflicts, ConflictKind::IncorrectLabeling);
    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].suggested_resolution.as_deref(), Some("Oil Rate (bbl/d)"));
}

#[test]
fn unparseable_rule_bag_isolates_only_the_domain_analyzer() {
    let knowledge = InMemoryKnowledge::new().with_topic("domain_rules", json!(42));
    let spec = SpecArtifact::new().with_component(SpecComponent::new("Map View", "map"));

    let conflicts = analyze(&spec, &ImplArtifact::new(), &wells_schema(), &knowledge);

    let failures = of_kind(&conflicts, ConflictKind::AnalyzerFailure);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].origin_analyzer, "domain_knowledge");
    assert_eq!(failures[0].target, ConflictTarget::Both);
    // the structural analyzer still ran
    assert_eq!(of_kind(&conflicts, ConflictKind::MissingComponent).len(), 1);
}
