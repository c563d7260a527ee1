//! Convergence controller: drives the spec and implementation producers
//! round by round until the analyzers agree the two artifacts line up, or
//! until a halt criterion fires.
//!
//! One round is:
//!
//! 1. the spec producer drafts a spec from the requirements, the knowledge
//!    base, design-side conflicts, and change requests addressed to it;
//! 2. the impl producer builds from that spec;
//! 3. both artifacts are committed (only if both producers succeeded);
//! 4. the analyzer cluster runs and the conflict batch is swapped in;
//! 5. [`decide_round`] picks halt or continue; on continue, change
//!    requests go out to the producer responsible for each conflict.
//!
//! The controller is the only writer to the [`ArtifactStore`] during a run.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::analyzers::AnalyzerCluster;
use super::artifact_store::ArtifactStore;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    decide_round, signature_multiset, AgentRole, ChangeRequest, Conflict, ConflictSignature,
    ConflictTarget, ControllerState, ConvergenceConfig, ConvergenceOutcome, ExternalContext,
    HaltReason, ImplArtifact, RequestPriority, RoundDecision, RoundRecord, SeverityHistogram,
    SpecArtifact,
};
use crate::domain::ports::{
    ImplProducer, ImplRequest, KnowledgeBase, ProducerOutput, SchemaProvider, SpecProducer,
    SpecRequest,
};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Lifecycle events emitted through `tracing`.
#[derive(Debug)]
enum ControllerEvent<'a> {
    RunStarted {
        max_rounds: u32,
        ceiling: usize,
    },
    RoundStarted {
        round: u32,
    },
    ProducerFailed {
        round: u32,
        producer: &'a str,
        reason: &'a str,
    },
    RoundEvaluated {
        round: u32,
        conflicts: usize,
        decision: RoundDecision,
        change_requests: usize,
    },
    Halted {
        rounds_used: u32,
        reason: HaltReason,
    },
}

impl ControllerEvent<'_> {
    fn event_name(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::RoundStarted { .. } => "round_started",
            Self::ProducerFailed { .. } => "producer_failed",
            Self::RoundEvaluated { .. } => "round_evaluated",
            Self::Halted { .. } => "halted",
        }
    }
}

// ---------------------------------------------------------------------------
// ConvergenceController
// ---------------------------------------------------------------------------

/// Coordinates both producers and the analyzer cluster over a shared store.
pub struct ConvergenceController {
    spec_producer: Arc<dyn SpecProducer>,
    impl_producer: Arc<dyn ImplProducer>,
    cluster: AnalyzerCluster,
    schema: Arc<dyn SchemaProvider>,
    knowledge: Arc<dyn KnowledgeBase>,
    config: ConvergenceConfig,
    envelope_fields: Vec<String>,
    state: ControllerState,
}

impl ConvergenceController {
    pub fn new(
        spec_producer: Arc<dyn SpecProducer>,
        impl_producer: Arc<dyn ImplProducer>,
        cluster: AnalyzerCluster,
        schema: Arc<dyn SchemaProvider>,
        knowledge: Arc<dyn KnowledgeBase>,
        config: ConvergenceConfig,
    ) -> Self {
        Self {
            spec_producer,
            impl_producer,
            cluster,
            schema,
            knowledge,
            config,
            envelope_fields: Vec::new(),
            state: ControllerState::Idle,
        }
    }

    /// Field names every schema record carries regardless of source.
    pub fn with_envelope_fields(mut self, fields: Vec<String>) -> Self {
        self.envelope_fields = fields;
        self
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn config(&self) -> &ConvergenceConfig {
        &self.config
    }

    /// Return a halted controller to `Idle` so it can run again.
    pub fn reset(&mut self) -> DomainResult<()> {
        self.transition(ControllerState::Idle, "reset")
    }

    fn transition(&mut self, next: ControllerState, reason: &str) -> DomainResult<()> {
        if !self.state.can_transition_to(&next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.name(),
                to: next.name(),
                reason: reason.to_string(),
            });
        }
        tracing::debug!(from = %self.state.name(), to = %next.name(), "Controller state change");
        self.state = next;
        Ok(())
    }

    fn emit_event(&self, event: &ControllerEvent<'_>) {
        tracing::info!(
            event_name = event.event_name(),
            details = ?event,
            "Convergence event: {}",
            event.event_name()
        );
    }

    // -----------------------------------------------------------------------
    // Run loop
    // -----------------------------------------------------------------------

    /// Run rounds until a halt criterion fires.
    ///
    /// A producer failure is not an error: it halts the run with
    /// `ProducerFailed` and the outcome carries the cause. Errors are
    /// reserved for misuse (running a controller that is not idle, or a
    /// zero round budget).
    pub async fn run(
        &mut self,
        store: &mut ArtifactStore,
        requirements: &str,
        max_rounds: u32,
        acceptable_ceiling: usize,
    ) -> DomainResult<ConvergenceOutcome> {
        if max_rounds == 0 {
            return Err(DomainError::ValidationFailed(
                "max_rounds must be at least 1".to_string(),
            ));
        }
        self.transition(ControllerState::Running { round: 1 }, "run started")?;
        self.emit_event(&ControllerEvent::RunStarted {
            max_rounds,
            ceiling: acceptable_ceiling,
        });

        let mut previous: Option<BTreeMap<ConflictSignature, usize>> = None;
        let mut round = 1;

        loop {
            let started_at = Utc::now();
            store.begin_round();
            self.emit_event(&ControllerEvent::RoundStarted { round });

            let (spec_output, impl_output) = match self.produce(store, requirements, round).await {
                Ok(outputs) => outputs,
                Err(err) => {
                    let (producer, reason) = match &err {
                        DomainError::ProducerFailed { producer, reason } => {
                            (producer.clone(), reason.clone())
                        }
                        other => ("unknown".to_string(), other.to_string()),
                    };
                    self.emit_event(&ControllerEvent::ProducerFailed {
                        round,
                        producer: &producer,
                        reason: &reason,
                    });
                    let decision = RoundDecision::Halt(HaltReason::ProducerFailed);
                    let record = Self::round_record(store, round, decision, 0, started_at);
                    store.record_round(record);
                    return self.halt(store, round, HaltReason::ProducerFailed, Some(err.to_string()));
                }
            };

            let (spec, implementation) = Self::commit(store, spec_output, impl_output);

            let context = ExternalContext::assemble(
                self.schema.as_ref(),
                self.knowledge.as_ref(),
                &self.envelope_fields,
            );
            let conflicts = self.cluster.run(&spec, &implementation, &context);
            let multiset = signature_multiset(&conflicts);
            store.replace_conflicts(conflicts);

            let decision = decide_round(
                store.current_conflicts(),
                previous.as_ref(),
                round,
                max_rounds,
                acceptable_ceiling,
            );

            let emitted = match decision {
                RoundDecision::Continue if self.config.emit_change_requests => {
                    Self::emit_change_requests(store)
                }
                _ => 0,
            };

            self.emit_event(&ControllerEvent::RoundEvaluated {
                round,
                conflicts: store.total_conflict_count(),
                decision,
                change_requests: emitted,
            });
            let record = Self::round_record(store, round, decision, emitted, started_at);
            store.record_round(record);

            match decision {
                RoundDecision::Halt(reason) => return self.halt(store, round, reason, None),
                RoundDecision::Continue => {
                    previous = Some(multiset);
                    round += 1;
                    self.transition(ControllerState::Running { round }, "next round")?;
                }
            }
        }
    }

    /// Call both producers. Nothing is written to the store here.
    async fn produce(
        &self,
        store: &ArtifactStore,
        requirements: &str,
        round: u32,
    ) -> DomainResult<(ProducerOutput<SpecArtifact>, ProducerOutput<ImplArtifact>)> {
        let spec_requests = owned_requests(store, &AgentRole::SpecProducer);
        let spec_output = self
            .with_budget(
                self.spec_producer.name(),
                self.spec_producer.produce(SpecRequest {
                    requirements,
                    knowledge: self.knowledge.as_ref(),
                    conflicts: store.conflicts_for(ConflictTarget::Spec),
                    change_requests: &spec_requests,
                    previous: store.current_spec(),
                    round,
                }),
            )
            .await?;

        let impl_requests = owned_requests(store, &AgentRole::ImplProducer);
        let impl_output = self
            .with_budget(
                self.impl_producer.name(),
                self.impl_producer.produce(ImplRequest {
                    spec: &spec_output.artifact,
                    knowledge: self.knowledge.as_ref(),
                    conflicts: store.conflicts_for(ConflictTarget::Impl),
                    change_requests: &impl_requests,
                    previous: store.current_impl(),
                    round,
                }),
            )
            .await?;

        Ok((spec_output, impl_output))
    }

    /// Await a producer call under the configured wall-clock budget.
    async fn with_budget<T>(
        &self,
        producer: &str,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> DomainResult<T> {
        let result = match self.config.producer_timeout_secs {
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), call).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(DomainError::ProducerFailed {
                        producer: producer.to_string(),
                        reason: format!("timed out after {secs}s"),
                    })
                }
            },
            None => call.await,
        };

        result.map_err(|err| {
            tracing::warn!(producer, error = %format!("{err:#}"), "Producer failed");
            DomainError::ProducerFailed {
                producer: producer.to_string(),
                reason: format!("{err:#}"),
            }
        })
    }

    /// Store both artifacts and everything the producers attached to them.
    /// Returns the committed artifacts for analysis.
    fn commit(
        store: &mut ArtifactStore,
        spec_output: ProducerOutput<SpecArtifact>,
        impl_output: ProducerOutput<ImplArtifact>,
    ) -> (SpecArtifact, ImplArtifact) {
        let spec_version = store.put_spec(spec_output.artifact.clone(), spec_output.rationale.clone());
        let impl_version = store.put_impl(impl_output.artifact.clone(), impl_output.rationale.clone());
        tracing::debug!(spec_version, impl_version, "Artifacts committed");

        Self::file_attachments(store, AgentRole::SpecProducer, &spec_output);
        Self::file_attachments(store, AgentRole::ImplProducer, &impl_output);

        let mut spec = spec_output.artifact;
        spec.version = spec_version;
        let mut implementation = impl_output.artifact;
        implementation.version = impl_version;
        (spec, implementation)
    }

    /// Record responses, messages, and patches a producer returned. A
    /// response that violates the receiver rule is dropped with a warning.
    fn file_attachments<T>(store: &mut ArtifactStore, role: AgentRole, output: &ProducerOutput<T>) {
        for response in &output.responses {
            if let Err(err) = store.respond_to_change_request(
                response.request_id,
                &role,
                response.accepted,
                response.response.clone(),
            ) {
                tracing::warn!(agent = %role, error = %err, "Ignoring change request response");
            }
        }
        for message in &output.messages {
            let mut message = message.clone();
            message.sender = role.clone();
            store.send_message(message);
        }
        for patch in &output.patches {
            let mut patch = patch.clone();
            patch.proposer = role.clone();
            store.add_patch(patch);
        }
    }

    /// One change request per producer that owns at least one conflict in
    /// the current batch. Conflicts targeting both artifacts have no single
    /// owner and produce none.
    fn emit_change_requests(store: &mut ArtifactStore) -> usize {
        let mut owned: BTreeMap<String, (AgentRole, Vec<&Conflict>)> = BTreeMap::new();
        for conflict in store.current_conflicts() {
            if let Some(role) = AgentRole::responsible_for(conflict.target) {
                owned
                    .entry(role.to_string())
                    .or_insert_with(|| (role, Vec::new()))
                    .1
                    .push(conflict);
            }
        }

        let requests: Vec<ChangeRequest> = owned
            .into_values()
            .map(|(receiver, conflicts)| change_request_for(receiver, &conflicts))
            .collect();
        let emitted = requests.len();
        for request in requests {
            store.add_change_request(request);
        }
        emitted
    }

    fn round_record(
        store: &ArtifactStore,
        round: u32,
        decision: RoundDecision,
        change_requests_emitted: usize,
        started_at: chrono::DateTime<Utc>,
    ) -> RoundRecord {
        RoundRecord {
            round,
            spec_version: store.spec_version(),
            impl_version: store.impl_version(),
            conflict_count: store.total_conflict_count(),
            severities: SeverityHistogram::from_conflicts(store.current_conflicts()),
            decision,
            change_requests_emitted,
            started_at,
            finished_at: Utc::now(),
        }
    }

    fn halt(
        &mut self,
        store: &ArtifactStore,
        rounds_used: u32,
        reason: HaltReason,
        failure: Option<String>,
    ) -> DomainResult<ConvergenceOutcome> {
        self.transition(ControllerState::Halted(reason), reason.as_str())?;
        self.emit_event(&ControllerEvent::Halted { rounds_used, reason });

        Ok(ConvergenceOutcome {
            spec_artifact: store.current_spec().cloned(),
            impl_artifact: store.current_impl().cloned(),
            unresolved_conflicts: store.current_conflicts().to_vec(),
            rounds_used,
            halt_reason: reason,
            failure,
        })
    }
}

/// Pending change requests for `agent`, cloned so the request borrow does
/// not outlive the store read.
fn owned_requests(store: &ArtifactStore, agent: &AgentRole) -> Vec<ChangeRequest> {
    store
        .pending_change_requests_for(agent)
        .into_iter()
        .cloned()
        .collect()
}

/// Summarize `conflicts` into one request addressed to `receiver`, with the
/// priority of the worst conflict.
fn change_request_for(receiver: AgentRole, conflicts: &[&Conflict]) -> ChangeRequest {
    let priority = conflicts
        .iter()
        .map(|c| RequestPriority::from(c.severity))
        .max()
        .unwrap_or_default();
    let description = conflicts
        .iter()
        .map(|c| format!("[{}] {}: {}", c.severity, c.kind, c.description))
        .collect::<Vec<_>>()
        .join("\n");
    let action = conflicts
        .iter()
        .filter_map(|c| c.suggested_resolution.as_deref())
        .collect::<Vec<_>>()
        .join("\n");

    ChangeRequest::new(AgentRole::Controller, receiver, description, action).with_priority(priority)
}
