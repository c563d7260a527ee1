//! Domain errors for the specweave convergence engine.
//!
//! These cover failures of the process itself. Inconsistencies between the
//! artifacts are never errors; analyzers report them as `Conflict` records.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur in the specweave system.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition { from: String, to: String, reason: String },

    #[error("Change request not found: {0}")]
    ChangeRequestNotFound(Uuid),

    #[error("Agent {responder} cannot respond to change request {id}: addressed to {receiver}")]
    NotReceiver {
        id: Uuid,
        responder: String,
        receiver: String,
    },

    #[error("Change request {0} has already been answered")]
    ChangeRequestClosed(Uuid),

    #[error("Malformed artifact: {0}")]
    MalformedArtifact(String),

    #[error("Invalid patch: {0}")]
    InvalidPatch(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Producer {producer} failed: {reason}")]
    ProducerFailed { producer: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for DomainError {
    fn from(err: serde_yaml::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
