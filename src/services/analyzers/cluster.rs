//! Analyzer cluster: runs every registered analyzer against one round and
//! merges their conflicts into a single batch.
//!
//! A failing analyzer never aborts the round. Its error is logged, it
//! contributes no conflicts, and one low-severity `AnalyzerFailure`
//! diagnostic takes its place.

use std::time::Instant;

use rayon::prelude::*;

use super::dependency::DependencyCompatibilityAnalyzer;
use super::domain_knowledge::DomainKnowledgeAnalyzer;
use super::schema::SchemaAlignmentAnalyzer;
use super::structural::StructuralAlignmentAnalyzer;
use super::traits::{AnalysisInput, ConsistencyAnalyzer};
use crate::domain::models::{AnalysisConfig, Conflict, ExternalContext, ImplArtifact, SpecArtifact};
use crate::domain::ports::StaticExtractor;

// ---------------------------------------------------------------------------
// AnalyzerMeasurement
// ---------------------------------------------------------------------------

/// Outcome of one analyzer for one round, with timing.
#[derive(Debug, Clone)]
pub struct AnalyzerMeasurement {
    pub analyzer_name: &'static str,
    pub conflicts: Vec<Conflict>,
    /// Set when the analyzer failed; `conflicts` then holds only the diagnostic.
    pub error: Option<String>,
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// AnalyzerCluster
// ---------------------------------------------------------------------------

/// The set of analyzers run every round.
pub struct AnalyzerCluster {
    analyzers: Vec<Box<dyn ConsistencyAnalyzer>>,
    extractor: Box<dyn StaticExtractor>,
    parallel: bool,
}

impl AnalyzerCluster {
    /// An empty cluster using `extractor` for implementation facts.
    pub fn new(extractor: Box<dyn StaticExtractor>) -> Self {
        Self {
            analyzers: Vec::new(),
            extractor,
            parallel: false,
        }
    }

    /// The four standard analyzers, in registration order structural,
    /// schema, domain, dependency.
    pub fn standard(config: &AnalysisConfig, extractor: Box<dyn StaticExtractor>) -> Self {
        let mut cluster = Self::new(extractor).parallel(config.parallel);
        cluster.add(Box::new(StructuralAlignmentAnalyzer::new()));
        cluster.add(Box::new(SchemaAlignmentAnalyzer::new(&config.builtin_identifiers)));
        cluster.add(Box::new(DomainKnowledgeAnalyzer::new()));
        cluster.add(Box::new(DependencyCompatibilityAnalyzer::new(&config.data_param_names)));
        cluster
    }

    /// Run analyzers concurrently on the rayon pool.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn add(&mut self, analyzer: Box<dyn ConsistencyAnalyzer>) {
        self.analyzers.push(analyzer);
    }

    pub fn analyzer_names(&self) -> Vec<&'static str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    /// Run every analyzer and return the merged batch, in registration order.
    pub fn run(
        &self,
        spec: &SpecArtifact,
        implementation: &ImplArtifact,
        context: &ExternalContext,
    ) -> Vec<Conflict> {
        self.run_with_details(spec, implementation, context)
            .into_iter()
            .flat_map(|m| m.conflicts)
            .collect()
    }

    /// Same as [`run`](Self::run) but keeps per-analyzer results and timings.
    pub fn run_with_details(
        &self,
        spec: &SpecArtifact,
        implementation: &ImplArtifact,
        context: &ExternalContext,
    ) -> Vec<AnalyzerMeasurement> {
        let input = AnalysisInput {
            spec,
            implementation,
            context,
            extractor: self.extractor.as_ref(),
        };
        let cluster_start = Instant::now();

        // rayon's indexed collect keeps registration order
        let measurements: Vec<AnalyzerMeasurement> = if self.parallel {
            self.analyzers
                .par_iter()
                .map(|analyzer| Self::run_one(analyzer.as_ref(), &input))
                .collect()
        } else {
            self.analyzers
                .iter()
                .map(|analyzer| Self::run_one(analyzer.as_ref(), &input))
                .collect()
        };

        tracing::info!(
            analyzer_count = measurements.len(),
            failed = measurements.iter().filter(|m| m.error.is_some()).count(),
            conflicts = measurements.iter().map(|m| m.conflicts.len()).sum::<usize>(),
            parallel = self.parallel,
            elapsed_ms = cluster_start.elapsed().as_millis() as u64,
            "Analysis complete"
        );

        measurements
    }

    fn run_one(analyzer: &dyn ConsistencyAnalyzer, input: &AnalysisInput<'_>) -> AnalyzerMeasurement {
        let start = Instant::now();
        let name = analyzer.name();

        match analyzer.analyze(input) {
            Ok(conflicts) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                tracing::debug!(
                    analyzer = name,
                    conflicts = conflicts.len(),
                    duration_ms = duration_ms,
                    "Analyzer complete"
                );
                AnalyzerMeasurement {
                    analyzer_name: name,
                    conflicts,
                    error: None,
                    duration_ms,
                }
            }
            Err(err) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                let cause = format!("{err:#}");
                tracing::warn!(
                    analyzer = name,
                    error = %cause,
                    duration_ms = duration_ms,
                    "Analyzer failed; recording diagnostic"
                );
                AnalyzerMeasurement {
                    analyzer_name: name,
                    conflicts: vec![Conflict::analyzer_failure(name, &cause)],
                    error: Some(cause),
                    duration_ms,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::RegexExtractor;
    use crate::domain::models::{ConflictKind, ConflictTarget, Severity, SpecComponent};

    struct Fixed(&'static str, usize);

    impl ConsistencyAnalyzer for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn analyze(&self, _input: &AnalysisInput<'_>) -> anyhow::Result<Vec<Conflict>> {
            Ok((0..self.1)
                .map(|i| {
                    Conflict::new(
                        ConflictKind::PropMismatch,
                        self.0,
                        Severity::Medium,
                        ConflictTarget::Impl,
                        format!("conflict {i}"),
                    )
                })
                .collect())
        }
    }

    struct Broken;

    impl ConsistencyAnalyzer for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn analyze(&self, _input: &AnalysisInput<'_>) -> anyhow::Result<Vec<Conflict>> {
            anyhow::bail!("context missing")
        }
    }

    fn cluster(parallel: bool) -> AnalyzerCluster {
        let extractor = RegexExtractor::from_config(&AnalysisConfig::default()).unwrap();
        let mut cluster = AnalyzerCluster::new(Box::new(extractor)).parallel(parallel);
        cluster.add(Box::new(Fixed("first", 2)));
        cluster.add(Box::new(Broken));
        cluster.add(Box::new(Fixed("third", 1)));
        cluster
    }

    #[test]
    fn failure_is_isolated_to_one_diagnostic() {
        for parallel in [false, true] {
            let conflicts = cluster(parallel).run(
                &SpecArtifact::new(),
                &ImplArtifact::new(),
                &ExternalContext::default(),
            );
            let origins: Vec<_> = conflicts.iter().map(|c| c.origin_analyzer.as_str()).collect();
            assert_eq!(origins, vec!["first", "first", "broken", "third"]);

            let diagnostic = &conflicts[2];
            assert_eq!(diagnostic.kind, ConflictKind::AnalyzerFailure);
            assert_eq!(diagnostic.severity, Severity::Low);
            assert!(diagnostic.description.contains("context missing"));
        }
    }

    #[test]
    fn details_carry_errors() {
        let details = cluster(false).run_with_details(
            &SpecArtifact::new(),
            &ImplArtifact::new(),
            &ExternalContext::default(),
        );
        assert_eq!(details.len(), 3);
        assert!(details[0].error.is_none());
        assert_eq!(details[1].error.as_deref(), Some("context missing"));
    }

    #[test]
    fn standard_cluster_registers_four_analyzers() {
        let config = AnalysisConfig::default();
        let cluster =
            AnalyzerCluster::standard(&config, Box::new(RegexExtractor::from_config(&config).unwrap()));
        assert_eq!(
            cluster.analyzer_names(),
            vec![
                "structural_alignment",
                "schema_alignment",
                "domain_knowledge",
                "dependency_compatibility"
            ]
        );
    }

    #[test]
    fn malformed_spec_yields_one_diagnostic_per_analyzer() {
        let spec = SpecArtifact::new()
            .with_component(SpecComponent::new("A", "card"))
            .with_component(SpecComponent::new("A", "card"));
        let config = AnalysisConfig::default();
        let cluster =
            AnalyzerCluster::standard(&config, Box::new(RegexExtractor::from_config(&config).unwrap()));
        let conflicts = cluster.run(&spec, &ImplArtifact::new(), &ExternalContext::default());
        assert_eq!(conflicts.len(), 4);
        assert!(conflicts.iter().all(|c| c.kind == ConflictKind::AnalyzerFailure));
    }
}
