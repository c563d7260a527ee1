//! Coordination records kept on the blackboard: free-form messages, change
//! requests addressed to a producer, and proposed patches.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::conflict::{ConflictTarget, Severity};

// ---------------------------------------------------------------------------
// AgentRole
// ---------------------------------------------------------------------------

/// A participant in a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Controller,
    SpecProducer,
    ImplProducer,
    /// Any other participant, e.g. a human reviewer.
    External(String),
}

impl AgentRole {
    /// The producer responsible for acting on conflicts with `target`.
    /// `Both` has no single owner and yields `None`.
    pub fn responsible_for(target: ConflictTarget) -> Option<Self> {
        match target {
            ConflictTarget::Spec | ConflictTarget::Unspecified => Some(Self::SpecProducer),
            ConflictTarget::Impl => Some(Self::ImplProducer),
            ConflictTarget::Both => None,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Controller => f.write_str("controller"),
            Self::SpecProducer => f.write_str("spec_producer"),
            Self::ImplProducer => f.write_str("impl_producer"),
            Self::External(name) => write!(f, "external:{name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// AgentMessage
// ---------------------------------------------------------------------------

/// A free-text note between participants. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub id: Uuid,
    pub sender: AgentRole,
    pub receiver: AgentRole,
    pub note: String,
    pub proposed_fix: Option<String>,
    /// Round in which the store recorded the message.
    #[serde(default)]
    pub round: u32,
    pub timestamp: DateTime<Utc>,
    /// Opaque sender-defined data.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl AgentMessage {
    pub fn new(sender: AgentRole, receiver: AgentRole, note: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            receiver,
            note: note.into(),
            proposed_fix: None,
            round: 0,
            timestamp: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_proposed_fix(mut self, fix: impl Into<String>) -> Self {
        self.proposed_fix = Some(fix.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

// ---------------------------------------------------------------------------
// ChangeRequest
// ---------------------------------------------------------------------------

/// Priority of a change request.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RequestPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl From<Severity> for RequestPriority {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Low => Self::Low,
            Severity::Medium => Self::Normal,
            Severity::High => Self::High,
            Severity::Critical => Self::Urgent,
        }
    }
}

/// Tri-state acceptance of a change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

/// A request from one participant asking another to change its artifact.
///
/// Only `status` and `response` ever change, only once, and only at the
/// receiver's instigation (enforced by the store).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub id: Uuid,
    pub sender: AgentRole,
    pub receiver: AgentRole,
    pub description: String,
    pub suggested_action: String,
    pub priority: RequestPriority,
    pub status: ChangeRequestStatus,
    pub response: Option<String>,
    #[serde(default)]
    pub round: u32,
    pub created_at: DateTime<Utc>,
}

impl ChangeRequest {
    pub fn new(
        sender: AgentRole,
        receiver: AgentRole,
        description: impl Into<String>,
        suggested_action: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            receiver,
            description: description.into(),
            suggested_action: suggested_action.into(),
            priority: RequestPriority::default(),
            status: ChangeRequestStatus::Pending,
            response: None,
            round: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: RequestPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == ChangeRequestStatus::Pending
    }
}

/// A receiver's answer to a change request, returned alongside an artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequestResponse {
    pub request_id: Uuid,
    pub accepted: bool,
    pub response: Option<String>,
}

// ---------------------------------------------------------------------------
// ConflictPatch
// ---------------------------------------------------------------------------

/// Structural edit operation of a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOperation {
    Add,
    Delete,
    Modify,
}

/// A proposed structural edit. Inert data: nothing in the convergence loop
/// applies it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictPatch {
    pub id: Uuid,
    pub target: ConflictTarget,
    pub operation: PatchOperation,
    /// e.g. `components/Well Count Chart/props/title`.
    pub path: String,
    #[serde(default)]
    pub value: serde_json::Value,
    pub conflict_id: Option<Uuid>,
    pub proposer: AgentRole,
    #[serde(default)]
    pub round: u32,
}

impl ConflictPatch {
    pub fn new(
        target: ConflictTarget,
        operation: PatchOperation,
        path: impl Into<String>,
        value: serde_json::Value,
        proposer: AgentRole,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            operation,
            path: path.into(),
            value,
            conflict_id: None,
            proposer,
            round: 0,
        }
    }

    pub fn for_conflict(mut self, conflict_id: Uuid) -> Self {
        self.conflict_id = Some(conflict_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responsible_producer_follows_target() {
        assert_eq!(
            AgentRole::responsible_for(ConflictTarget::Spec),
            Some(AgentRole::SpecProducer)
        );
        assert_eq!(
            AgentRole::responsible_for(ConflictTarget::Impl),
            Some(AgentRole::ImplProducer)
        );
        assert_eq!(
            AgentRole::responsible_for(ConflictTarget::Unspecified),
            Some(AgentRole::SpecProducer)
        );
        assert_eq!(AgentRole::responsible_for(ConflictTarget::Both), None);
    }

    #[test]
    fn priority_maps_from_severity() {
        assert_eq!(RequestPriority::from(Severity::Critical), RequestPriority::Urgent);
        assert_eq!(RequestPriority::from(Severity::Medium), RequestPriority::Normal);
    }

    #[test]
    fn priority_defaults_to_normal_on_the_wire() {
        assert_eq!(RequestPriority::default(), RequestPriority::Normal);
        let json = serde_json::to_string(&RequestPriority::default()).unwrap();
        assert_eq!(json, "\"normal\"");
    }

    #[test]
    fn new_change_request_is_pending() {
        let request = ChangeRequest::new(
            AgentRole::Controller,
            AgentRole::ImplProducer,
            "3 conflicts",
            "fix them",
        );
        assert!(request.is_pending());
        assert!(request.response.is_none());
        assert_eq!(request.priority, RequestPriority::Normal);
    }

    #[test]
    fn agent_role_display() {
        assert_eq!(AgentRole::SpecProducer.to_string(), "spec_producer");
        assert_eq!(AgentRole::External("qa".into()).to_string(), "external:qa");
    }
}
