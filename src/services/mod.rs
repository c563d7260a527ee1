//! Services: the blackboard store, the analyzers, and the round loop.

pub mod analyzers;
pub mod artifact_store;
pub mod convergence_controller;
pub mod patching;

pub use analyzers::{
    AnalysisInput, AnalyzerCluster, AnalyzerMeasurement, ConsistencyAnalyzer,
    DependencyCompatibilityAnalyzer, DomainKnowledgeAnalyzer, SchemaAlignmentAnalyzer,
    StructuralAlignmentAnalyzer,
};
pub use artifact_store::{ArtifactStore, ConflictBatch, SessionSnapshot};
pub use convergence_controller::ConvergenceController;
pub use patching::{apply_spec_patch, apply_spec_patches};
