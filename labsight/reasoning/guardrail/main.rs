//! Output guardrail: strips treatment language before anything is persisted.

/// Guard and redaction pass.
pub mod guard;
/// Phrase matching.
pub mod helper;

pub use guard::{
    GuardOutcome, GuardrailError, OutputGuard, RECOMMENDATIONS_KEY, RECOMMENDATIONS_RENAMED,
    REDACTION_MARKER,
};
pub use helper::TermInspector;
