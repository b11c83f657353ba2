use serde::Serialize;

use labsight_knowledge::round3;

use crate::{causes::CauseReport, module::LoadedReport, patterns::PatternReport};

const PRESENCE_WEIGHT: f64 = 0.4;
const PATTERN_WEIGHT: f64 = 0.4;
const KG_WEIGHT: f64 = 0.2;
const MISSING_LISTED: usize = 6;

/// Per-signal inputs to the overall score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ConfidenceComponents {
    /// Share of parameters carrying a value.
    pub presence: f64,
    /// Mean severity weight of present patterns.
    pub pattern: f64,
    /// Normalized score of the top cause.
    pub kg: f64,
}

/// Explainable confidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceResult {
    /// Weighted score in [0, 1].
    pub score: f64,
    /// Inputs.
    pub components: ConfidenceComponents,
    /// Plain-language caveats.
    pub explanation: String,
}

/// Fuses presence, pattern, and cause signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceAggregator;

impl ConfidenceAggregator {
    /// Scores one report.
    #[must_use]
    pub fn aggregate(
        &self,
        report: &LoadedReport,
        patterns: &PatternReport,
        causes: &CauseReport,
    ) -> ConfidenceResult {
        let components = ConfidenceComponents {
            presence: presence(report),
            pattern: pattern_strength(patterns),
            // Normalized, so any matched evidence reads as 1.0 here.
            kg: causes.top_score(),
        };
        let score = round3(
            PATTERN_WEIGHT.mul_add(
                components.pattern,
                PRESENCE_WEIGHT.mul_add(components.presence, KG_WEIGHT * components.kg),
            ),
        )
        .clamp(0.0, 1.0);
        let missing: Vec<&str> = report
            .parameters
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name.as_str())
            .collect();
        ConfidenceResult {
            score,
            components,
            explanation: explain(report.present_count() == 0, &components, &missing),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn presence(report: &LoadedReport) -> f64 {
    let total = report.parameters.len();
    if total == 0 {
        return 0.0;
    }
    round3((report.present_count() as f64 / total as f64).min(1.0))
}

#[allow(clippy::cast_precision_loss)]
fn pattern_strength(patterns: &PatternReport) -> f64 {
    let weights: Vec<f64> = patterns
        .present()
        .map(|(_, pattern)| {
            if pattern.severity.is_some_and(|s| s.is_severe()) {
                1.0
            } else {
                0.5
            }
        })
        .collect();
    if weights.is_empty() {
        return 0.0;
    }
    round3((weights.iter().sum::<f64>() / weights.len() as f64).min(1.0))
}

fn explain(no_values: bool, components: &ConfidenceComponents, missing: &[&str]) -> String {
    if no_values {
        return "Low confidence because no laboratory parameters were available to evaluate.".into();
    }
    let mut reasons = Vec::new();
    if components.presence < 0.5 {
        let mut reason = String::from(
            "several relevant laboratory parameters are missing, limiting diagnostic certainty",
        );
        if !missing.is_empty() {
            let listed = missing
                .iter()
                .take(MISSING_LISTED)
                .copied()
                .collect::<Vec<_>>()
                .join(", ");
            let more = if missing.len() > MISSING_LISTED { "..." } else { "" };
            reason.push_str(&format!(" (missing: {listed}{more})"));
        }
        reasons.push(reason);
    }
    if components.pattern < 0.7 {
        reasons.push(
            "some detected patterns overlap or lack confirmatory markers".to_string(),
        );
    }
    if reasons.is_empty() {
        "High confidence due to complete and consistent laboratory evidence.".into()
    } else {
        format!("Moderate confidence because {}.", reasons.join("; "))
    }
}
