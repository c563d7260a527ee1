//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces external collaborators implement:
//! - SpecProducer / ImplProducer: artifact generators
//! - KnowledgeBase: domain facts by topic
//! - SchemaProvider: field schema per data source
//! - StaticExtractor: source-text extraction used by the analyzers
//!
//! These traits keep the convergence engine independent of any concrete
//! generator, knowledge store, or parser.

pub mod extractor;
pub mod knowledge;
pub mod producer;

pub use extractor::{ExtractedUnit, StaticExtractor};
pub use knowledge::{KnowledgeBase, SchemaProvider};
pub use producer::{ImplProducer, ImplRequest, ProducerOutput, SpecProducer, SpecRequest};
