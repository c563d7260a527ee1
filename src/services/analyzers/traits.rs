//! The analyzer contract.

use crate::domain::models::{Conflict, ExternalContext, ImplArtifact, SpecArtifact};
use crate::domain::ports::StaticExtractor;

/// Read-only view of one round, handed to every analyzer.
#[derive(Clone, Copy)]
pub struct AnalysisInput<'a> {
    pub spec: &'a SpecArtifact,
    pub implementation: &'a ImplArtifact,
    pub context: &'a ExternalContext,
    pub extractor: &'a dyn StaticExtractor,
}

/// A pure cross-check over the round's artifacts.
///
/// Inconsistencies are returned as conflicts. `Err` is reserved for the
/// analyzer being unable to run at all (malformed artifact, unusable
/// context); the cluster turns it into a diagnostic conflict.
pub trait ConsistencyAnalyzer: Send + Sync {
    /// Stable name, recorded as `origin_analyzer` on every conflict.
    fn name(&self) -> &'static str;

    fn analyze(&self, input: &AnalysisInput<'_>) -> anyhow::Result<Vec<Conflict>>;
}
