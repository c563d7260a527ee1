//! Producer ports - interfaces for the spec and implementation generators.
//!
//! Producers are opaque, potentially long-running collaborators (typically
//! LLM-backed). They see read-only borrows of the blackboard for the
//! duration of one call and communicate only through their return value;
//! retry and backoff are their own business.

use async_trait::async_trait;

use crate::domain::models::{
    AgentMessage, ChangeRequest, ChangeRequestResponse, Conflict, ConflictPatch, ImplArtifact,
    SpecArtifact,
};
use crate::domain::ports::KnowledgeBase;

/// Input to [`SpecProducer::produce`].
pub struct SpecRequest<'a> {
    /// The natural-language request the session was started with.
    pub requirements: &'a str,
    pub knowledge: &'a dyn KnowledgeBase,
    /// Current conflicts routed to the design list.
    pub conflicts: &'a [Conflict],
    /// Pending change requests addressed to the spec producer.
    pub change_requests: &'a [ChangeRequest],
    /// The currently stored spec, if any.
    pub previous: Option<&'a SpecArtifact>,
    pub round: u32,
}

/// Input to [`ImplProducer::produce`].
pub struct ImplRequest<'a> {
    /// The spec produced earlier in the same round.
    pub spec: &'a SpecArtifact,
    pub knowledge: &'a dyn KnowledgeBase,
    /// Current conflicts routed to the impl list.
    pub conflicts: &'a [Conflict],
    /// Pending change requests addressed to the impl producer.
    pub change_requests: &'a [ChangeRequest],
    /// The currently stored implementation, if any.
    pub previous: Option<&'a ImplArtifact>,
    pub round: u32,
}

/// What a producer hands back: a complete new artifact plus optional
/// coordination records for the controller to file.
#[derive(Debug, Clone)]
pub struct ProducerOutput<T> {
    pub artifact: T,
    pub rationale: String,
    /// Answers to change requests addressed to this producer.
    pub responses: Vec<ChangeRequestResponse>,
    pub messages: Vec<AgentMessage>,
    /// Proposals only; never applied by the controller.
    pub patches: Vec<ConflictPatch>,
}

impl<T> ProducerOutput<T> {
    pub fn new(artifact: T, rationale: impl Into<String>) -> Self {
        Self {
            artifact,
            rationale: rationale.into(),
            responses: Vec::new(),
            messages: Vec::new(),
            patches: Vec::new(),
        }
    }

    pub fn with_response(mut self, response: ChangeRequestResponse) -> Self {
        self.responses.push(response);
        self
    }

    pub fn with_message(mut self, message: AgentMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_patch(mut self, patch: ConflictPatch) -> Self {
        self.patches.push(patch);
        self
    }
}

/// Produces successive versions of the specification artifact.
#[async_trait]
pub trait SpecProducer: Send + Sync {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str;

    async fn produce(&self, request: SpecRequest<'_>) -> anyhow::Result<ProducerOutput<SpecArtifact>>;
}

/// Produces successive versions of the implementation artifact.
#[async_trait]
pub trait ImplProducer: Send + Sync {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str;

    async fn produce(&self, request: ImplRequest<'_>) -> anyhow::Result<ProducerOutput<ImplArtifact>>;
}
