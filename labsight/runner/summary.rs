use std::fmt::Write as _;

use serde_json::Value;

const PATTERN_SUPPORT: usize = 3;
const TOP_CAUSES: usize = 5;
const CAUSE_SUPPORT: usize = 2;

/// Plain-text digest of a sanitized Model-2 document.
///
/// Reads the guarded JSON rather than the typed document so redactions carry over.
#[must_use]
pub fn human_summary(document: &Value) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Report: {}", text(&document["metadata"]["base"]));
    out.push('\n');

    out.push_str("Key Patterns Detected:\n");
    let mut any_pattern = false;
    if let Some(patterns) = document["patterns"]["patterns"].as_object() {
        for (name, pattern) in patterns.iter().filter(|(_, p)| p["present"] == true) {
            any_pattern = true;
            let qualifier = pattern
                .get("type")
                .or_else(|| pattern.get("severity"))
                .map(text)
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "- {name}: {qualifier} (support: {})",
                joined(&pattern["support"], PATTERN_SUPPORT)
            );
        }
    }
    if !any_pattern {
        out.push_str("- none\n");
    }
    out.push('\n');

    out.push_str("Top Probable Causes:\n");
    let causes = document["probable_causes"]["causes"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default();
    if causes.is_empty() {
        out.push_str("- none\n");
    }
    for cause in causes.iter().take(TOP_CAUSES) {
        let _ = writeln!(
            out,
            "- {} (score: {}) support: {}",
            text(&cause["cause"]),
            text(&cause["score"]),
            joined(&cause["support"], CAUSE_SUPPORT)
        );
    }
    out.push('\n');

    let cardio = &document["derived"]["cardio"];
    if cardio.is_object() {
        let _ = writeln!(
            out,
            "Cardiovascular risk band: {} (score {})",
            text(&cardio["band"]),
            text(&cardio["score"])
        );
    }
    let confidence = &document["confidence"];
    let _ = writeln!(out, "Overall confidence: {}", text(&confidence["score"]));
    if let Some(explanation) = confidence["explanation"].as_str().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "Confidence explanation: {explanation}");
    }
    out.push('\n');

    out.push_str("Notes:\n");
    let _ = writeln!(out, "{}", text(&document["disclaimer_note"]));
    out
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn joined(values: &Value, limit: usize) -> String {
    values
        .as_array()
        .map(|items| {
            items
                .iter()
                .take(limit)
                .map(text)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}
