//! Specweave - consistency and convergence engine for generated UIs
//!
//! Two producers work against a shared store: one drafts a UI specification
//! from requirements, the other implements it. After every round four
//! analyzers compare the pair and report typed conflicts, and the controller
//! decides whether to stop or to send change requests back to the producer
//! responsible for each conflict.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): artifacts, conflicts, the state machine, and ports
//! - **Adapters** (`adapters`): static source extraction, in-memory context, scripted producers
//! - **Service Layer** (`services`): artifact store, analyzers, convergence controller
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use specweave::{AnalyzerCluster, ArtifactStore, ConvergenceController, Config};
//!
//! async fn converge(controller: &mut ConvergenceController) -> anyhow::Result<()> {
//!     let mut store = ArtifactStore::new();
//!     let outcome = controller.run(&mut store, "Well counts by operator", 5, 3).await?;
//!     println!("{} after {} rounds", outcome.halt_reason, outcome.rounds_used);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::{
    InMemoryKnowledge, InMemorySchema, RegexExtractor, ScriptStep, ScriptedImplProducer,
    ScriptedSession, ScriptedSpecProducer,
};
pub use domain::models::{
    Config, Conflict, ConflictKind, ConflictTarget, ConvergenceOutcome, HaltReason, ImplArtifact,
    Severity, SpecArtifact, SpecComponent,
};
pub use domain::ports::{ImplProducer, KnowledgeBase, SchemaProvider, SpecProducer, StaticExtractor};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{AnalyzerCluster, ArtifactStore, ConvergenceController};
