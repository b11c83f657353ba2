use serde_json::{Map, Value};
use thiserror::Error;

use super::helper::TermInspector;

/// Replacement written over every redacted string.
pub const REDACTION_MARKER: &str = "[REDACTED_BY_GUARDRAILS]";

/// Top-level key that is never allowed through under its own name.
pub const RECOMMENDATIONS_KEY: &str = "recommendations";

/// Name the recommendations key is moved to.
pub const RECOMMENDATIONS_RENAMED: &str = "recommendations_removed_by_guardrails";

/// Errors raised while building a guard.
#[derive(Debug, Error)]
pub enum GuardrailError {
    /// The configured term list did not compile.
    #[error("forbidden term list: {0}")]
    Terms(#[from] regex::Error),
}

/// What a sanitize pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardOutcome {
    /// String leaves replaced by the marker.
    pub redacted: usize,
    /// Whether a top-level recommendations key was renamed.
    pub renamed_recommendations: bool,
}

/// Final safety pass over an assembled document.
#[derive(Debug, Clone)]
pub struct OutputGuard {
    inspector: TermInspector,
}

impl OutputGuard {
    /// Builds a guard for the given phrases.
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Result<Self, GuardrailError> {
        Ok(Self {
            inspector: TermInspector::new(terms)?,
        })
    }

    /// Sanitizes `document` in place. Never fails; non-string leaves pass through.
    pub fn sanitize(&self, document: &mut Value) -> GuardOutcome {
        let mut outcome = GuardOutcome::default();
        if let Value::Object(map) = document {
            outcome.renamed_recommendations = rename_recommendations(map);
        }
        outcome.redacted = self.walk(document);
        outcome
    }

    fn walk(&self, value: &mut Value) -> usize {
        match value {
            Value::String(text) => {
                if self.inspector.is_forbidden(text) {
                    *value = Value::String(REDACTION_MARKER.to_string());
                    1
                } else {
                    0
                }
            }
            Value::Array(items) => items.iter_mut().map(|item| self.walk(item)).sum(),
            Value::Object(map) => map.values_mut().map(|item| self.walk(item)).sum(),
            Value::Null | Value::Bool(_) | Value::Number(_) => 0,
        }
    }
}

fn rename_recommendations(map: &mut Map<String, Value>) -> bool {
    match map.remove(RECOMMENDATIONS_KEY) {
        Some(value) => {
            map.insert(RECOMMENDATIONS_RENAMED.to_string(), value);
            true
        }
        None => false,
    }
}
