//! The shared workspace (blackboard) for one convergence session.
//!
//! [`ArtifactStore`] owns every artifact version, the current conflict
//! partition, and the append-only coordination logs. It is created at session
//! start and passed by `&mut` to the controller, which is its only writer;
//! producers and analyzers only ever see borrowed views for the length of a
//! single call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AgentMessage, AgentRole, ChangeRequest, ChangeRequestStatus, Conflict, ConflictPatch,
    ConflictTarget, ImplArtifact, RoundRecord, SpecArtifact, Versioned,
};

/// One conflict batch as it was swapped in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictBatch {
    pub round: u32,
    pub recorded_at: DateTime<Utc>,
    pub conflicts: Vec<Conflict>,
}

/// Serializable copy of an entire session, for external audit persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub current_round: u32,
    pub spec_history: Vec<Versioned<SpecArtifact>>,
    pub impl_history: Vec<Versioned<ImplArtifact>>,
    pub design_conflicts: Vec<Conflict>,
    pub impl_conflicts: Vec<Conflict>,
    pub conflict_history: Vec<ConflictBatch>,
    pub messages: Vec<AgentMessage>,
    pub change_requests: Vec<ChangeRequest>,
    pub patches: Vec<ConflictPatch>,
    pub rounds: Vec<RoundRecord>,
}

/// The blackboard.
#[derive(Debug)]
pub struct ArtifactStore {
    session_id: Uuid,
    created_at: DateTime<Utc>,
    round: u32,
    spec_history: Vec<Versioned<SpecArtifact>>,
    impl_history: Vec<Versioned<ImplArtifact>>,
    /// The last batch, unpartitioned.
    current: Vec<Conflict>,
    design_conflicts: Vec<Conflict>,
    impl_conflicts: Vec<Conflict>,
    conflict_history: Vec<ConflictBatch>,
    messages: Vec<AgentMessage>,
    change_requests: Vec<ChangeRequest>,
    patches: Vec<ConflictPatch>,
    rounds: Vec<RoundRecord>,
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            created_at: Utc::now(),
            round: 0,
            spec_history: Vec::new(),
            impl_history: Vec::new(),
            current: Vec::new(),
            design_conflicts: Vec::new(),
            impl_conflicts: Vec::new(),
            conflict_history: Vec::new(),
            messages: Vec::new(),
            change_requests: Vec::new(),
            patches: Vec::new(),
            rounds: Vec::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    // -----------------------------------------------------------------------
    // Rounds
    // -----------------------------------------------------------------------

    /// Advance the round counter and return the new round number.
    pub fn begin_round(&mut self) -> u32 {
        self.round += 1;
        tracing::debug!(session_id = %self.session_id, round = self.round, "Round started");
        self.round
    }

    /// Zero before the first round.
    pub fn current_round(&self) -> u32 {
        self.round
    }

    pub fn record_round(&mut self, record: RoundRecord) {
        self.rounds.push(record);
    }

    pub fn round_log(&self) -> &[RoundRecord] {
        &self.rounds
    }

    // -----------------------------------------------------------------------
    // Artifacts
    // -----------------------------------------------------------------------

    /// Store a new spec version, replacing the current one wholesale.
    /// Returns the assigned version number.
    pub fn put_spec(&mut self, mut artifact: SpecArtifact, rationale: impl Into<String>) -> u32 {
        let version = self.spec_version() + 1;
        artifact.version = version;
        self.spec_history.push(Versioned {
            version,
            round: self.round,
            rationale: rationale.into(),
            recorded_at: Utc::now(),
            artifact,
        });
        tracing::debug!(round = self.round, version, "Stored spec artifact");
        version
    }

    /// Store a new implementation version, replacing the current one
    /// wholesale. Returns the assigned version number.
    pub fn put_impl(&mut self, mut artifact: ImplArtifact, rationale: impl Into<String>) -> u32 {
        let version = self.impl_version() + 1;
        artifact.version = version;
        self.impl_history.push(Versioned {
            version,
            round: self.round,
            rationale: rationale.into(),
            recorded_at: Utc::now(),
            artifact,
        });
        tracing::debug!(round = self.round, version, "Stored impl artifact");
        version
    }

    pub fn current_spec(&self) -> Option<&SpecArtifact> {
        self.spec_history.last().map(|v| &v.artifact)
    }

    pub fn current_impl(&self) -> Option<&ImplArtifact> {
        self.impl_history.last().map(|v| &v.artifact)
    }

    /// Current spec version, zero if none stored.
    pub fn spec_version(&self) -> u32 {
        self.spec_history.last().map_or(0, |v| v.version)
    }

    /// Current impl version, zero if none stored.
    pub fn impl_version(&self) -> u32 {
        self.impl_history.last().map_or(0, |v| v.version)
    }

    pub fn spec_history(&self) -> &[Versioned<SpecArtifact>] {
        &self.spec_history
    }

    pub fn impl_history(&self) -> &[Versioned<ImplArtifact>] {
        &self.impl_history
    }

    // -----------------------------------------------------------------------
    // Conflicts
    // -----------------------------------------------------------------------

    /// Swap in a new conflict batch.
    ///
    /// Both partitions are built before anything is replaced, and the swap
    /// happens under `&mut self`, so no reader can observe a half-updated set.
    /// `Spec` and unrecognised targets go to the design list, `Impl` to the
    /// impl list, `Both` to both.
    pub fn replace_conflicts(&mut self, conflicts: Vec<Conflict>) {
        let design: Vec<Conflict> = conflicts
            .iter()
            .filter(|c| c.target.routes_to_design())
            .cloned()
            .collect();
        let implementation: Vec<Conflict> = conflicts
            .iter()
            .filter(|c| c.target.routes_to_impl())
            .cloned()
            .collect();

        tracing::debug!(
            round = self.round,
            total = conflicts.len(),
            design = design.len(),
            implementation = implementation.len(),
            "Replacing conflict set"
        );

        self.conflict_history.push(ConflictBatch {
            round: self.round,
            recorded_at: Utc::now(),
            conflicts: conflicts.clone(),
        });
        self.design_conflicts = design;
        self.impl_conflicts = implementation;
        self.current = conflicts;
    }

    /// Conflicts the given target's producer must look at.
    ///
    /// `Spec` (and `Unspecified`) returns the design list, `Impl` the impl
    /// list, and `Both` the whole current batch.
    pub fn conflicts_for(&self, target: ConflictTarget) -> &[Conflict] {
        match target {
            ConflictTarget::Spec | ConflictTarget::Unspecified => &self.design_conflicts,
            ConflictTarget::Impl => &self.impl_conflicts,
            ConflictTarget::Both => &self.current,
        }
    }

    pub fn design_conflicts(&self) -> &[Conflict] {
        &self.design_conflicts
    }

    pub fn impl_conflicts(&self) -> &[Conflict] {
        &self.impl_conflicts
    }

    /// The last batch as it was handed to [`replace_conflicts`](Self::replace_conflicts).
    pub fn current_conflicts(&self) -> &[Conflict] {
        &self.current
    }

    /// Any `high` or `critical` conflict in the current batch.
    pub fn has_high_severity(&self) -> bool {
        self.current.iter().any(|c| c.severity.is_blocking())
    }

    /// Size of the current batch. A `Both` conflict counts once.
    pub fn total_conflict_count(&self) -> usize {
        self.current.len()
    }

    pub fn conflict_history(&self) -> &[ConflictBatch] {
        &self.conflict_history
    }

    // -----------------------------------------------------------------------
    // Messages, change requests, patches
    // -----------------------------------------------------------------------

    /// Append a message, stamping it with the current round.
    pub fn send_message(&mut self, mut message: AgentMessage) -> Uuid {
        message.round = self.round;
        let id = message.id;
        tracing::debug!(
            message_id = %id,
            sender = %message.sender,
            receiver = %message.receiver,
            "Message recorded"
        );
        self.messages.push(message);
        id
    }

    pub fn messages_for(&self, agent: &AgentRole) -> Vec<&AgentMessage> {
        self.messages.iter().filter(|m| &m.receiver == agent).collect()
    }

    pub fn messages(&self) -> &[AgentMessage] {
        &self.messages
    }

    /// File a change request, stamping it with the current round. The
    /// request always starts out pending.
    pub fn add_change_request(&mut self, mut request: ChangeRequest) -> Uuid {
        request.round = self.round;
        request.status = ChangeRequestStatus::Pending;
        request.response = None;
        let id = request.id;
        tracing::debug!(
            request_id = %id,
            receiver = %request.receiver,
            priority = ?request.priority,
            "Change request filed"
        );
        self.change_requests.push(request);
        id
    }

    pub fn pending_change_requests_for(&self, agent: &AgentRole) -> Vec<&ChangeRequest> {
        self.change_requests
            .iter()
            .filter(|r| &r.receiver == agent && r.is_pending())
            .collect()
    }

    pub fn change_requests(&self) -> &[ChangeRequest] {
        &self.change_requests
    }

    /// Record the receiver's answer to a change request.
    ///
    /// Only the addressed receiver may answer, and only once.
    pub fn respond_to_change_request(
        &mut self,
        id: Uuid,
        responder: &AgentRole,
        accepted: bool,
        response: Option<String>,
    ) -> DomainResult<()> {
        let request = self
            .change_requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(DomainError::ChangeRequestNotFound(id))?;

        if &request.receiver != responder {
            return Err(DomainError::NotReceiver {
                id,
                responder: responder.to_string(),
                receiver: request.receiver.to_string(),
            });
        }
        if !request.is_pending() {
            return Err(DomainError::ChangeRequestClosed(id));
        }

        request.status = if accepted {
            ChangeRequestStatus::Accepted
        } else {
            ChangeRequestStatus::Rejected
        };
        request.response = response;
        tracing::debug!(request_id = %id, accepted, "Change request answered");
        Ok(())
    }

    /// Append a proposed patch, stamping it with the current round. The
    /// patch is stored as data only.
    pub fn add_patch(&mut self, mut patch: ConflictPatch) -> Uuid {
        patch.round = self.round;
        let id = patch.id;
        tracing::debug!(patch_id = %id, target = %patch.target, path = %patch.path, "Patch proposed");
        self.patches.push(patch);
        id
    }

    pub fn patches(&self) -> &[ConflictPatch] {
        &self.patches
    }

    pub fn patches_for_conflict(&self, conflict_id: Uuid) -> Vec<&ConflictPatch> {
        self.patches
            .iter()
            .filter(|p| p.conflict_id == Some(conflict_id))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Audit
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            created_at: self.created_at,
            current_round: self.round,
            spec_history: self.spec_history.clone(),
            impl_history: self.impl_history.clone(),
            design_conflicts: self.design_conflicts.clone(),
            impl_conflicts: self.impl_conflicts.clone(),
            conflict_history: self.conflict_history.clone(),
            messages: self.messages.clone(),
            change_requests: self.change_requests.clone(),
            patches: self.patches.clone(),
            rounds: self.rounds.clone(),
        }
    }
}
