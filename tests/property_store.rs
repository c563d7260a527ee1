use proptest::prelude::*;

use specweave::domain::models::{
    AnalysisConfig, Conflict, ConflictKind, ConflictTarget, ExternalContext, ImplArtifact,
    Severity, SpecArtifact, SpecComponent,
};
use specweave::services::{AnalyzerCluster, ArtifactStore};
use specweave::RegexExtractor;

fn target() -> impl Strategy<Value = ConflictTarget> {
    prop_oneof![
        Just(ConflictTarget::Spec),
        Just(ConflictTarget::Impl),
        Just(ConflictTarget::Both),
        Just(ConflictTarget::Unspecified),
    ]
}

fn severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Low),
        Just(Severity::Medium),
        Just(Severity::High),
        Just(Severity::Critical),
    ]
}

fn conflict() -> impl Strategy<Value = Conflict> {
    (target(), severity(), "[A-Z][a-z]{1,6}", "[a-z ]{0,20}").prop_map(
        |(target, severity, component, description)| {
            Conflict::new(ConflictKind::PropMismatch, "generated", severity, target, description)
                .with_component(component)
        },
    )
}

fn kind() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("card"),
        Just("bar_chart"),
        Just("line_chart"),
        Just("dropdown"),
        Just("map"),
        Just("table"),
    ]
}

/// A spec with unique component names, some bound, some interactive, and an
/// implementation defining a subset of them.
fn session() -> impl Strategy<Value = (SpecArtifact, ImplArtifact)> {
    prop::collection::btree_set("[A-Z][a-z]{2,6}", 0..6)
        .prop_flat_map(|names| {
            let count = names.len();
            (
                Just(names.into_iter().collect::<Vec<_>>()),
                prop::collection::vec((kind(), any::<bool>(), any::<bool>(), any::<bool>()), count),
            )
        })
        .prop_map(|(names, traits)| {
            let mut spec = SpecArtifact::new();
            let mut source = String::new();
            for (name, (kind, bound, interactive, implemented)) in names.iter().zip(traits) {
                let mut component = SpecComponent::new(name.as_str(), kind);
                if bound {
                    component = component.bound_to("well_count");
                }
                if interactive {
                    component = component.interactive();
                }
                spec = spec.with_component(component);
                if implemented {
                    source.push_str(&format!(
                        "export const {name} = ({{ data }}) => <div>{{data.well_count}}</div>;\n"
                    ));
                }
            }
            (spec, ImplArtifact::new().with_module("page.tsx", source))
        })
}

proptest! {
    /// Property: every conflict lands in exactly the partitions its target routes to
    #[test]
    fn prop_partitions_follow_routing(conflicts in prop::collection::vec(conflict(), 0..30)) {
        let mut store = ArtifactStore::new();
        store.begin_round();
        store.replace_conflicts(conflicts.clone());

        let design: Vec<_> = conflicts.iter().filter(|c| c.target.routes_to_design()).cloned().collect();
        let implementation: Vec<_> = conflicts.iter().filter(|c| c.target.routes_to_impl()).cloned().collect();

        prop_assert_eq!(store.design_conflicts(), design.as_slice());
        prop_assert_eq!(store.impl_conflicts(), implementation.as_slice());
        prop_assert_eq!(store.conflicts_for(ConflictTarget::Both), conflicts.as_slice());
        prop_assert_eq!(store.total_conflict_count(), conflicts.len());
        prop_assert_eq!(
            store.has_high_severity(),
            conflicts.iter().any(|c| c.severity.is_blocking())
        );
    }

    /// Property: a later batch fully replaces an earlier one
    #[test]
    fn prop_replacement_discards_previous_batch(
        first in prop::collection::vec(conflict(), 1..10),
        second in prop::collection::vec(conflict(), 0..10),
    ) {
        let mut store = ArtifactStore::new();
        store.begin_round();
        store.replace_conflicts(first);
        store.begin_round();
        store.replace_conflicts(second.clone());

        prop_assert_eq!(store.current_conflicts(), second.as_slice());
        prop_assert_eq!(store.conflict_history().len(), 2);
        prop_assert_eq!(store.conflict_history()[1].round, 2);
    }

    /// Property: analysis is deterministic, sequential or parallel
    #[test]
    fn prop_cluster_is_deterministic((spec, implementation) in session()) {
        let config = AnalysisConfig::default();
        let extractor = || Box::new(RegexExtractor::from_config(&config).unwrap());
        let sequential = AnalyzerCluster::standard(&config, extractor()).parallel(false);
        let parallel = AnalyzerCluster::standard(&config, extractor()).parallel(true);
        let context = ExternalContext::default();

        let first = sequential.run(&spec, &implementation, &context);
        let again = sequential.run(&spec, &implementation, &context);
        let concurrent = parallel.run(&spec, &implementation, &context);

        prop_assert_eq!(&first, &again);
        prop_assert_eq!(&first, &concurrent);
    }
}
