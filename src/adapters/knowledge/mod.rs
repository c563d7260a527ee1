//! Schema and knowledge-base providers.

pub mod in_memory;

pub use in_memory::{InMemoryKnowledge, InMemorySchema};
pub(crate) use in_memory::load_structured;
