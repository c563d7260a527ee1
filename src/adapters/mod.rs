//! Adapters implementing the domain ports.

pub mod extraction;
pub mod knowledge;
pub mod producers;

pub use extraction::RegexExtractor;
pub use knowledge::{InMemoryKnowledge, InMemorySchema};
pub use producers::{ScriptStep, ScriptedImplProducer, ScriptedSession, ScriptedSpecProducer};
