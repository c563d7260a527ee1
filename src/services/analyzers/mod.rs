//! Consistency analyzers for the convergence loop.
//!
//! Each analyzer is a pure function of the current spec, the current
//! implementation, and the round's [`ExternalContext`](crate::domain::models::ExternalContext).
//! None of them touch the store; the [`AnalyzerCluster`] collects their
//! outputs so the controller can swap them in as one batch.
//!
//! | Analyzer                          | Conflict family | Needs              |
//! |-----------------------------------|-----------------|--------------------|
//! | [`StructuralAlignmentAnalyzer`]   | structural      | extractor          |
//! | [`SchemaAlignmentAnalyzer`]       | schema          | schema, kinds      |
//! | [`DomainKnowledgeAnalyzer`]       | domain          | rule bag, schema   |
//! | [`DependencyCompatibilityAnalyzer`] | dependency    | extractor, kinds   |
//!
//! ## Usage
//!
//! ```ignore
//! let cluster = AnalyzerCluster::standard(&config.analysis, Box::new(extractor));
//! let conflicts = cluster.run(&spec, &implementation, &context);
//! ```

pub mod canonical;
pub mod cluster;
pub mod dependency;
pub mod domain_knowledge;
pub mod schema;
pub mod structural;
pub mod traits;

pub use canonical::{canonical, UnitIndex};
pub use cluster::{AnalyzerCluster, AnalyzerMeasurement};
pub use dependency::DependencyCompatibilityAnalyzer;
pub use domain_knowledge::DomainKnowledgeAnalyzer;
pub use schema::SchemaAlignmentAnalyzer;
pub use structural::StructuralAlignmentAnalyzer;
pub use traits::{AnalysisInput, ConsistencyAnalyzer};
