#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rust_2018_idioms,
    missing_docs
)]

//! Model-2 reasoning: record loading, severity grading, pattern rules,
//! knowledge-graph cause ranking, confidence, and the output guardrail.

/// Telemetry builder/hook for pipeline stages.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Domain data structures shared by every stage.
#[path = "../module.rs"]
pub mod module;

/// CSV/JSON record loader.
#[path = "../loader.rs"]
pub mod loader;

/// Reference-range severity grading.
#[path = "../severity.rs"]
pub mod severity;

/// Declarative pattern engine.
#[path = "../patterns/main.rs"]
pub mod patterns;

/// Observation extraction and cause ranking.
#[path = "../causes.rs"]
pub mod causes;

/// Confidence aggregation.
#[path = "../confidence.rs"]
pub mod confidence;

/// Derived metrics hook.
#[path = "../derived.rs"]
pub mod derived;

/// Output sanitization.
#[path = "../guardrail/main.rs"]
pub mod guardrail;

/// Stage sequencing and document assembly.
#[path = "../pipeline.rs"]
pub mod pipeline;

pub use causes::{CauseReport, ObservationExtractor, ProbableCauseRanker};
pub use confidence::{ConfidenceAggregator, ConfidenceComponents, ConfidenceResult};
pub use derived::{CardioRisk, DerivedMetrics, DerivedReport, NoDerived, RiskBand, StandardDerived};
pub use guardrail::{GuardOutcome, GuardrailError, OutputGuard, REDACTION_MARKER};
pub use loader::{LoaderError, RecordLoader};
pub use module::{Direction, LoadedReport, ParameterRecord, PatientContext, StatusFlag};
pub use patterns::{Pattern, PatternEngine, PatternReport};
pub use pipeline::{DocumentMetadata, Model2Document, Model2Pipeline, SanitizedDocument, DISCLAIMER};
pub use severity::{SeverityClassifier, SeverityLabel, SeverityLevel};
pub use telemetry::{PipelineTelemetry, PipelineTelemetryBuilder};
