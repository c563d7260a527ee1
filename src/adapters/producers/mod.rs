//! Producer implementations.
//!
//! Real producers are LLM-backed and live with the embedding application;
//! the scripted producers here replay recorded artifact versions for replays
//! and tests.

pub mod scripted;

pub use scripted::{ScriptStep, ScriptedImplProducer, ScriptedSession, ScriptedSpecProducer};
