//! Scripted producers that replay a fixed sequence of artifact versions.
//!
//! Each call to `produce` consumes the next step. Once the script runs out
//! the last step repeats, which models a producer that cannot improve any
//! further.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::adapters::knowledge::in_memory::load_structured;
use crate::adapters::knowledge::{InMemoryKnowledge, InMemorySchema};
use crate::domain::models::{ChangeRequest, ChangeRequestResponse, ImplArtifact, SpecArtifact};
use crate::domain::ports::{ImplProducer, ImplRequest, ProducerOutput, SpecProducer, SpecRequest};

/// One scripted producer turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptStep<T> {
    #[serde(default)]
    pub artifact: Option<T>,
    #[serde(default)]
    pub rationale: String,
    /// When set, the turn fails with this message.
    #[serde(default)]
    pub fail: Option<String>,
    /// Simulated latency before answering.
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

impl<T> ScriptStep<T> {
    pub fn produce(artifact: T, rationale: impl Into<String>) -> Self {
        Self {
            artifact: Some(artifact),
            rationale: rationale.into(),
            fail: None,
            delay_ms: None,
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            artifact: None,
            rationale: String::new(),
            fail: Some(reason.into()),
            delay_ms: None,
        }
    }

    pub fn delayed(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }
}

/// Step cursor shared by both scripted producers.
#[derive(Debug)]
struct Script<T> {
    steps: Vec<ScriptStep<T>>,
    cursor: AtomicUsize,
    accept_change_requests: bool,
}

impl<T: Clone> Script<T> {
    fn new(steps: Vec<ScriptStep<T>>) -> Self {
        Self {
            steps,
            cursor: AtomicUsize::new(0),
            accept_change_requests: false,
        }
    }

    async fn next(
        &self,
        producer: &str,
        change_requests: &[ChangeRequest],
    ) -> Result<ProducerOutput<T>> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        let Some(step) = self.steps.get(index).or_else(|| self.steps.last()) else {
            bail!("{producer} has an empty script");
        };

        if let Some(delay) = step.delay_ms {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if let Some(reason) = &step.fail {
            bail!("{producer} step {} failed: {reason}", index + 1);
        }
        let Some(artifact) = step.artifact.clone() else {
            bail!("{producer} step {} has neither an artifact nor a failure", index + 1);
        };

        tracing::debug!(producer, step = index + 1, "Scripted producer answered");

        let mut output = ProducerOutput::new(artifact, step.rationale.clone());
        if self.accept_change_requests {
            for request in change_requests {
                output = output.with_response(ChangeRequestResponse {
                    request_id: request.id,
                    accepted: true,
                    response: Some(format!("addressed in step {}", index + 1)),
                });
            }
        }
        Ok(output)
    }

    fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Producers
// ---------------------------------------------------------------------------

/// Replays spec versions.
#[derive(Debug)]
pub struct ScriptedSpecProducer {
    script: Script<SpecArtifact>,
}

impl ScriptedSpecProducer {
    pub fn new(steps: Vec<ScriptStep<SpecArtifact>>) -> Self {
        Self {
            script: Script::new(steps),
        }
    }

    /// Accept every change request handed to this producer.
    pub fn accepting_change_requests(mut self) -> Self {
        self.script.accept_change_requests = true;
        self
    }

    /// Number of `produce` calls so far.
    pub fn calls(&self) -> usize {
        self.script.calls()
    }
}

#[async_trait]
impl SpecProducer for ScriptedSpecProducer {
    fn name(&self) -> &str {
        "scripted_spec_producer"
    }

    async fn produce(&self, request: SpecRequest<'_>) -> Result<ProducerOutput<SpecArtifact>> {
        self.script.next(self.name(), request.change_requests).await
    }
}

/// Replays implementation versions.
#[derive(Debug)]
pub struct ScriptedImplProducer {
    script: Script<ImplArtifact>,
}

impl ScriptedImplProducer {
    pub fn new(steps: Vec<ScriptStep<ImplArtifact>>) -> Self {
        Self {
            script: Script::new(steps),
        }
    }

    /// Accept every change request handed to this producer.
    pub fn accepting_change_requests(mut self) -> Self {
        self.script.accept_change_requests = true;
        self
    }

    /// Number of `produce` calls so far.
    pub fn calls(&self) -> usize {
        self.script.calls()
    }
}

#[async_trait]
impl ImplProducer for ScriptedImplProducer {
    fn name(&self) -> &str {
        "scripted_impl_producer"
    }

    async fn produce(&self, request: ImplRequest<'_>) -> Result<ProducerOutput<ImplArtifact>> {
        self.script.next(self.name(), request.change_requests).await
    }
}

// ---------------------------------------------------------------------------
// Session files
// ---------------------------------------------------------------------------

/// A recorded session: requirements, external context, and both scripts.
///
/// ```yaml
/// requirements: Show well counts per operator
/// schema:
///   wells:
///     well_count: { type: integer }
/// knowledge:
///   domain_rules: { required_fields: [api_number] }
/// spec_steps:
///   - artifact: { components: [...] }
///     rationale: initial draft
/// impl_steps:
///   - artifact: { modules: { "chart.tsx": "..." } }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptedSession {
    #[serde(default)]
    pub requirements: String,
    #[serde(default)]
    pub schema: InMemorySchema,
    #[serde(default)]
    pub knowledge: InMemoryKnowledge,
    #[serde(default)]
    pub spec_steps: Vec<ScriptStep<SpecArtifact>>,
    #[serde(default)]
    pub impl_steps: Vec<ScriptStep<ImplArtifact>>,
    /// Whether the scripted producers accept change requests addressed to them.
    #[serde(default)]
    pub accept_change_requests: bool,
}

impl ScriptedSession {
    pub fn from_file(path: &Path) -> Result<Self> {
        load_structured(path)
    }

    /// Build the two producers this session describes.
    pub fn producers(&self) -> (ScriptedSpecProducer, ScriptedImplProducer) {
        let mut spec = ScriptedSpecProducer::new(self.spec_steps.clone());
        let mut implementation = ScriptedImplProducer::new(self.impl_steps.clone());
        if self.accept_change_requests {
            spec = spec.accepting_change_requests();
            implementation = implementation.accepting_change_requests();
        }
        (spec, implementation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AgentRole, SpecComponent};

    fn spec_request<'a>(
        knowledge: &'a InMemoryKnowledge,
        change_requests: &'a [ChangeRequest],
    ) -> SpecRequest<'a> {
        SpecRequest {
            requirements: "show wells",
            knowledge,
            conflicts: &[],
            change_requests,
            previous: None,
            round: 1,
        }
    }

    #[tokio::test]
    async fn replays_steps_then_repeats_last() {
        let first = SpecArtifact::new().with_component(SpecComponent::new("A", "card"));
        let second = SpecArtifact::new().with_component(SpecComponent::new("B", "card"));
        let producer = ScriptedSpecProducer::new(vec![
            ScriptStep::produce(first, "one"),
            ScriptStep::produce(second, "two"),
        ]);
        let knowledge = InMemoryKnowledge::new();

        let a = producer.produce(spec_request(&knowledge, &[])).await.unwrap();
        let b = producer.produce(spec_request(&knowledge, &[])).await.unwrap();
        let c = producer.produce(spec_request(&knowledge, &[])).await.unwrap();

        assert_eq!(a.artifact.components[0].name, "A");
        assert_eq!(b.rationale, "two");
        assert_eq!(c.artifact.components[0].name, "B");
        assert_eq!(producer.calls(), 3);
    }

    #[tokio::test]
    async fn failing_step_is_an_error() {
        let producer = ScriptedSpecProducer::new(vec![ScriptStep::fail("model unavailable")]);
        let knowledge = InMemoryKnowledge::new();
        let err = producer.produce(spec_request(&knowledge, &[])).await.unwrap_err();
        assert!(err.to_string().contains("model unavailable"));
    }

    #[tokio::test]
    async fn empty_script_is_an_error() {
        let producer = ScriptedSpecProducer::new(Vec::new());
        let knowledge = InMemoryKnowledge::new();
        assert!(producer.produce(spec_request(&knowledge, &[])).await.is_err());
    }

    #[tokio::test]
    async fn accepting_producer_answers_change_requests() {
        let producer = ScriptedSpecProducer::new(vec![ScriptStep::produce(SpecArtifact::new(), "")])
            .accepting_change_requests();
        let knowledge = InMemoryKnowledge::new();
        let request = ChangeRequest::new(
            AgentRole::Controller,
            AgentRole::SpecProducer,
            "rename",
            "use title case",
        );
        let requests = [request.clone()];

        let output = producer
            .produce(spec_request(&knowledge, &requests))
            .await
            .unwrap();
        assert_eq!(output.responses.len(), 1);
        assert_eq!(output.responses[0].request_id, request.id);
        assert!(output.responses[0].accepted);
    }

    #[test]
    fn session_parses_from_yaml() {
        let yaml = r#"
requirements: Show well counts
schema:
  wells:
    well_count: { type: integer }
knowledge:
  domain_rules:
    required_fields: [api_number]
spec_steps:
  - artifact:
      components:
        - { name: Well Count Chart, kind: bar_chart, data_field: well_count }
    rationale: draft
impl_steps:
  - fail: timeout
"#;
        let session: ScriptedSession = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(session.spec_steps.len(), 1);
        assert_eq!(session.impl_steps[0].fail.as_deref(), Some("timeout"));
        assert!(!session.accept_change_requests);
        let (spec, implementation) = session.producers();
        assert_eq!(spec.calls(), 0);
        assert_eq!(implementation.calls(), 0);
    }
}
