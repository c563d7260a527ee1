pub mod artifact;
pub mod config;
pub mod conflict;
pub mod context;
pub mod convergence;
pub mod messages;

pub use artifact::{ImplArtifact, SpecArtifact, SpecComponent, Versioned};
pub use config::{AnalysisConfig, Config, ConvergenceConfig, LoggingConfig};
pub use conflict::{
    Conflict, ConflictFamily, ConflictKind, ConflictSignature, ConflictTarget, Severity,
};
pub use context::{
    DomainRules, ExternalContext, FieldSpec, FieldType, KindCatalog, KindProfile, SchemaSnapshot,
    TypeClass, COMPONENT_KINDS_TOPIC, DOMAIN_RULES_TOPIC, SCHEMA_SOURCE_ERROR_PREFIX,
};
pub use convergence::{
    decide_round, signature_multiset, ControllerState, ConvergenceOutcome, HaltReason,
    RoundDecision, RoundRecord, SeverityHistogram,
};
pub use messages::{
    AgentMessage, AgentRole, ChangeRequest, ChangeRequestResponse, ChangeRequestStatus,
    ConflictPatch, PatchOperation, RequestPriority,
};
