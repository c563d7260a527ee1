//! Convergence state machine types and the halt decision.
//!
//! The controller moves `Idle -> Running(round) -> Halted(reason)`. After each
//! round's conflict batch is stored, [`decide_round`] evaluates the halt
//! criteria in a fixed priority order.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::artifact::{ImplArtifact, SpecArtifact};
use super::conflict::{Conflict, ConflictSignature, Severity};

// ---------------------------------------------------------------------------
// HaltReason
// ---------------------------------------------------------------------------

/// Why a convergence run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HaltReason {
    /// No conflicts remain.
    Converged,
    /// Only a few low/medium conflicts remain.
    AcceptableQuality,
    /// The conflict set did not change between two consecutive rounds.
    Stalemate,
    /// The round budget ran out with conflicts outstanding.
    MaxRoundsReached,
    /// A producer failed; the round was aborted.
    ProducerFailed,
}

impl HaltReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Converged => "Converged",
            Self::AcceptableQuality => "AcceptableQuality",
            Self::Stalemate => "Stalemate",
            Self::MaxRoundsReached => "MaxRoundsReached",
            Self::ProducerFailed => "ProducerFailed",
        }
    }

    /// Whether the artifacts are fit to hand off.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Converged | Self::AcceptableQuality)
    }
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ControllerState
// ---------------------------------------------------------------------------

/// Lifecycle of a [`ConvergenceController`](crate::services::ConvergenceController).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    Idle,
    Running { round: u32 },
    Halted(HaltReason),
}

impl ControllerState {
    pub fn name(&self) -> String {
        match self {
            Self::Idle => "Idle".to_string(),
            Self::Running { round } => format!("Running({round})"),
            Self::Halted(reason) => format!("Halted({reason})"),
        }
    }

    /// Valid transitions: Idle -> Running(1), Running(n) -> Running(n + 1),
    /// Running(_) -> Halted(_), Halted(_) -> Idle (reset).
    pub fn can_transition_to(&self, next: &ControllerState) -> bool {
        match (self, next) {
            (Self::Idle, Self::Running { round }) => *round == 1,
            (Self::Running { round: current }, Self::Running { round }) => *round == current + 1,
            (Self::Running { .. }, Self::Halted(_)) => true,
            (Self::Halted(_), Self::Idle) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Halted(_))
    }
}

// ---------------------------------------------------------------------------
// RoundDecision
// ---------------------------------------------------------------------------

/// What the controller does after evaluating a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum RoundDecision {
    Continue,
    Halt(HaltReason),
}

/// Count conflicts per `(kind, component, target)` signature.
pub fn signature_multiset(conflicts: &[Conflict]) -> BTreeMap<ConflictSignature, usize> {
    let mut multiset = BTreeMap::new();
    for conflict in conflicts {
        *multiset.entry(conflict.signature()).or_insert(0) += 1;
    }
    multiset
}

/// Evaluate the halt criteria for a finished round, in order:
///
/// 1. no conflicts: `Converged`
/// 2. nothing `high`/`critical` and fewer than `acceptable_ceiling`
///    conflicts: `AcceptableQuality`
/// 3. same signature multiset as the previous round: `Stalemate`
/// 4. `round == max_rounds`: `MaxRoundsReached`
/// 5. otherwise `Continue`
pub fn decide_round(
    conflicts: &[Conflict],
    previous: Option<&BTreeMap<ConflictSignature, usize>>,
    round: u32,
    max_rounds: u32,
    acceptable_ceiling: usize,
) -> RoundDecision {
    if conflicts.is_empty() {
        return RoundDecision::Halt(HaltReason::Converged);
    }

    let blocking = conflicts.iter().any(|c| c.severity.is_blocking());
    if !blocking && conflicts.len() < acceptable_ceiling {
        return RoundDecision::Halt(HaltReason::AcceptableQuality);
    }

    if previous.is_some_and(|prev| *prev == signature_multiset(conflicts)) {
        return RoundDecision::Halt(HaltReason::Stalemate);
    }

    if round >= max_rounds {
        return RoundDecision::Halt(HaltReason::MaxRoundsReached);
    }

    RoundDecision::Continue
}

// ---------------------------------------------------------------------------
// RoundRecord
// ---------------------------------------------------------------------------

/// Conflict counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityHistogram {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

impl SeverityHistogram {
    pub fn from_conflicts(conflicts: &[Conflict]) -> Self {
        let mut histogram = Self::default();
        for conflict in conflicts {
            match conflict.severity {
                Severity::Low => histogram.low += 1,
                Severity::Medium => histogram.medium += 1,
                Severity::High => histogram.high += 1,
                Severity::Critical => histogram.critical += 1,
            }
        }
        histogram
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high + self.critical
    }
}

/// Audit entry for one completed round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    pub spec_version: u32,
    pub impl_version: u32,
    pub conflict_count: usize,
    pub severities: SeverityHistogram,
    pub decision: RoundDecision,
    /// Change requests emitted at the end of the round.
    pub change_requests_emitted: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ConvergenceOutcome
// ---------------------------------------------------------------------------

/// Result of [`ConvergenceController::run`](crate::services::ConvergenceController::run).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceOutcome {
    /// Latest stored spec version, if any round committed one.
    pub spec_artifact: Option<SpecArtifact>,
    /// Latest stored impl version, if any round committed one.
    pub impl_artifact: Option<ImplArtifact>,
    pub unresolved_conflicts: Vec<Conflict>,
    pub rounds_used: u32,
    pub halt_reason: HaltReason,
    /// Producer failure cause when `halt_reason` is `ProducerFailed`.
    pub failure: Option<String>,
}
