//! Conflict records produced by the consistency analyzers.
//!
//! A [`Conflict`] describes one detected inconsistency between the two
//! artifacts or between an artifact and external facts. Conflicts are
//! produced fresh every round and are never edited afterwards; their id is
//! derived from their content so that re-running analysis on identical
//! inputs reproduces identical ids.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// How serious a conflict is. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// `high` or `critical`: blocks the acceptable-quality exit.
    pub fn is_blocking(&self) -> bool {
        *self >= Self::High
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ConflictTarget
// ---------------------------------------------------------------------------

/// Which artifact (and therefore which producer) must act on a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictTarget {
    Spec,
    Impl,
    Both,
    /// A target the sender did not recognise. Routed like `Spec`.
    #[serde(other)]
    Unspecified,
}

impl ConflictTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spec => "spec",
            Self::Impl => "impl",
            Self::Both => "both",
            Self::Unspecified => "unspecified",
        }
    }

    /// Whether a conflict with this target belongs in the design list.
    pub fn routes_to_design(&self) -> bool {
        matches!(self, Self::Spec | Self::Both | Self::Unspecified)
    }

    /// Whether a conflict with this target belongs in the impl list.
    pub fn routes_to_impl(&self) -> bool {
        matches!(self, Self::Impl | Self::Both)
    }
}

impl fmt::Display for ConflictTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ConflictKind
// ---------------------------------------------------------------------------

/// The analyzer family a conflict kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictFamily {
    Structural,
    Schema,
    Domain,
    Dependency,
    Diagnostic,
}

/// The conflict-kind taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConflictKind {
    // structural
    MissingComponent,
    PropMismatch,
    AttributeMismatch,
    InteractivityMismatch,
    NestingMismatch,
    // schema
    SchemaFieldUnknown,
    TypeIncompatible,
    DataSourceMismatch,
    // domain
    DangerousAffordance,
    InvalidDomainAssumption,
    IncorrectLabeling,
    OutOfDomainPattern,
    // dependency
    DependencyError,
    RequiredPropMissing,
    EventContractInvalid,
    /// Synthesized when an analyzer itself fails.
    AnalyzerFailure,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingComponent => "MissingComponent",
            Self::PropMismatch => "PropMismatch",
            Self::AttributeMismatch => "AttributeMismatch",
            Self::InteractivityMismatch => "InteractivityMismatch",
            Self::NestingMismatch => "NestingMismatch",
            Self::SchemaFieldUnknown => "SchemaFieldUnknown",
            Self::TypeIncompatible => "TypeIncompatible",
            Self::DataSourceMismatch => "DataSourceMismatch",
            Self::DangerousAffordance => "DangerousAffordance",
            Self::InvalidDomainAssumption => "InvalidDomainAssumption",
            Self::IncorrectLabeling => "IncorrectLabeling",
            Self::OutOfDomainPattern => "OutOfDomainPattern",
            Self::DependencyError => "DependencyError",
            Self::RequiredPropMissing => "RequiredPropMissing",
            Self::EventContractInvalid => "EventContractInvalid",
            Self::AnalyzerFailure => "AnalyzerFailure",
        }
    }

    pub fn family(&self) -> ConflictFamily {
        match self {
            Self::MissingComponent
            | Self::PropMismatch
            | Self::AttributeMismatch
            | Self::InteractivityMismatch
            | Self::NestingMismatch => ConflictFamily::Structural,
            Self::SchemaFieldUnknown | Self::TypeIncompatible | Self::DataSourceMismatch => {
                ConflictFamily::Schema
            }
            Self::DangerousAffordance
            | Self::InvalidDomainAssumption
            | Self::IncorrectLabeling
            | Self::OutOfDomainPattern => ConflictFamily::Domain,
            Self::DependencyError | Self::RequiredPropMissing | Self::EventContractInvalid => {
                ConflictFamily::Dependency
            }
            Self::AnalyzerFailure => ConflictFamily::Diagnostic,
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Conflict
// ---------------------------------------------------------------------------

/// One detected inconsistency.
///
/// Built with [`Conflict::new`] and the `with_*` helpers; each helper
/// re-derives the id, so the id always reflects the final content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Conflict {
    /// Content-derived (UUID v5) identifier.
    pub id: Uuid,
    pub kind: ConflictKind,
    /// Name of the analyzer that produced the conflict.
    pub origin_analyzer: String,
    pub description: String,
    pub affected_component: Option<String>,
    pub suggested_resolution: Option<String>,
    pub severity: Severity,
    pub target: ConflictTarget,
    /// Structural path into the target artifact, e.g. `components/Chart/props/title`.
    pub path: Option<String>,
}

impl Conflict {
    /// Create a conflict with no component, resolution, or path.
    pub fn new(
        kind: ConflictKind,
        origin_analyzer: impl Into<String>,
        severity: Severity,
        target: ConflictTarget,
        description: impl Into<String>,
    ) -> Self {
        let mut conflict = Self {
            id: Uuid::nil(),
            kind,
            origin_analyzer: origin_analyzer.into(),
            description: description.into(),
            affected_component: None,
            suggested_resolution: None,
            severity,
            target,
            path: None,
        };
        conflict.rekey();
        conflict
    }

    /// Attach the affected component name.
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.affected_component = Some(component.into());
        self.rekey();
        self
    }

    /// Attach a suggested resolution.
    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.suggested_resolution = Some(resolution.into());
        self.rekey();
        self
    }

    /// Attach a structural path.
    pub fn at_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self.rekey();
        self
    }

    /// The diagnostic recorded when an analyzer fails outright.
    pub fn analyzer_failure(analyzer: &str, cause: &str) -> Self {
        Self::new(
            ConflictKind::AnalyzerFailure,
            analyzer,
            Severity::Low,
            ConflictTarget::Both,
            format!("analyzer '{analyzer}' failed: {cause}"),
        )
    }

    /// The identity used for stalemate detection.
    pub fn signature(&self) -> ConflictSignature {
        ConflictSignature {
            kind: self.kind,
            component: self.affected_component.clone(),
            target: self.target,
        }
    }

    fn rekey(&mut self) {
        let key = format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.kind,
            self.origin_analyzer,
            self.affected_component.as_deref().unwrap_or_default(),
            self.target,
            self.severity,
            self.path.as_deref().unwrap_or_default(),
            self.description,
        );
        self.id = Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes());
    }
}

/// `(kind, component, target)`: two rounds with equal signature multisets
/// are considered stuck.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConflictSignature {
    pub kind: ConflictKind,
    pub component: Option<String>,
    pub target: ConflictTarget,
}
