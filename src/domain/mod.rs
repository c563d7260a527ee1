//! Domain layer for the specweave convergence engine
//!
//! This module contains the artifact and conflict models, the convergence
//! state machine, and the ports external collaborators implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
