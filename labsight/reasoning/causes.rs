use std::sync::Arc;

use indexmap::IndexMap;
use labsight_knowledge::{KnowledgeGraph, LabConfig, ProbableCause};
use serde::Serialize;

use crate::{
    module::{observation, LoadedReport},
    patterns::PatternReport,
    severity::SeverityClassifier,
};

/// Ranked causes as they appear in the output document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CauseReport {
    /// Causes by descending normalized score.
    pub causes: Vec<ProbableCause>,
    /// Prior-fused scores before normalization.
    pub raw_scores: IndexMap<String, f64>,
}

impl CauseReport {
    /// Normalized score of the strongest cause, 0 when nothing matched.
    #[must_use]
    pub fn top_score(&self) -> f64 {
        self.causes.first().map_or(0.0, |c| c.score)
    }
}

/// Builds the observation list fed to the knowledge graph.
#[derive(Debug, Clone)]
pub struct ObservationExtractor {
    config: Arc<LabConfig>,
    classifier: SeverityClassifier,
}

impl ObservationExtractor {
    /// Creates an extractor.
    #[must_use]
    pub fn new(config: Arc<LabConfig>) -> Self {
        Self {
            classifier: SeverityClassifier::new(Arc::clone(&config)),
            config,
        }
    }

    /// Support tokens of present patterns, then key-parameter observations.
    ///
    /// For key parameters an explicit status flag wins over the graded value.
    /// A token seen in both passes is kept twice and corroborates itself.
    #[must_use]
    pub fn extract(&self, report: &LoadedReport, patterns: &PatternReport) -> Vec<String> {
        let mut tokens: Vec<String> = patterns
            .present()
            .flat_map(|(_, pattern)| pattern.support.iter().cloned())
            .collect();

        for parameter in self.config.key_parameters() {
            let direction = match report.status.get(parameter) {
                Some(flag) => flag.direction(),
                None => {
                    let value = report.value(parameter);
                    if value.is_none() {
                        continue;
                    }
                    self.classifier
                        .label_from_range(parameter, value, &report.patient)
                        .label
                        .direction()
                }
            };
            if let Some(direction) = direction {
                tokens.push(observation(parameter, direction));
            }
        }
        tokens
    }
}

/// Ranks probable causes through the knowledge graph.
#[derive(Debug, Clone)]
pub struct ProbableCauseRanker {
    config: Arc<LabConfig>,
    graph: Arc<KnowledgeGraph>,
}

impl ProbableCauseRanker {
    /// Creates a ranker over a shared graph.
    #[must_use]
    pub const fn new(config: Arc<LabConfig>, graph: Arc<KnowledgeGraph>) -> Self {
        Self { config, graph }
    }

    /// Runs inference with the configured priors.
    #[must_use]
    pub fn rank<S: AsRef<str>>(&self, observations: &[S]) -> CauseReport {
        let inference = self.graph.infer_causes(observations, self.config.priors());
        CauseReport {
            causes: inference.causes,
            raw_scores: inference.fused,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        module::{PatientContext, StatusFlag},
        patterns::PatternEngine,
    };
    use labsight_knowledge::Gender;

    fn setup() -> (Arc<LabConfig>, ObservationExtractor, PatternEngine, ProbableCauseRanker) {
        let config = Arc::new(LabConfig::builtin());
        let graph = Arc::new(config.knowledge_graph().unwrap());
        (
            Arc::clone(&config),
            ObservationExtractor::new(Arc::clone(&config)),
            PatternEngine::new(SeverityClassifier::new(Arc::clone(&config))),
            ProbableCauseRanker::new(config, graph),
        )
    }

    fn report(values: &[(&str, f64)]) -> LoadedReport {
        let mut report = LoadedReport {
            patient: PatientContext {
                gender: Some(Gender::Female),
                ..PatientContext::default()
            },
            ..LoadedReport::default()
        };
        for (name, value) in values {
            report.parameters.insert((*name).to_string(), Some(*value));
        }
        report
    }

    #[test]
    fn pattern_support_comes_first_then_key_parameters() {
        let (_, extractor, engine, ranker) = setup();
        let report = report(&[("Hemoglobin", 6.5), ("MCV", 109.6), ("Platelets", 180.0)]);
        let patterns = engine.detect(&report.parameters, &report.patient);
        let observations = extractor.extract(&report, &patterns);
        assert_eq!(
            observations,
            ["Hemoglobin_LOW", "MCV_HIGH", "Hemoglobin_LOW", "MCV_HIGH"]
        );

        // Both caps reach 1.0; the tie keeps first-encountered order.
        let ranked = ranker.rank(&observations);
        let top: Vec<_> = ranked.causes[..2].iter().map(|c| c.cause.as_str()).collect();
        assert_eq!(top, ["Iron_Deficiency", "Vitamin_B12_Deficiency"]);
        assert!((ranked.raw_scores["Vitamin_B12_Deficiency"] - 1.0).abs() < f64::EPSILON);
        assert_eq!(ranked.causes[1].support.len(), 4);
    }

    #[test]
    fn borderline_glucose_reaches_no_metabolic_cause() {
        let (_, extractor, engine, ranker) = setup();
        let mut report = report(&[("Glucose_Fasting", 100.0)]);
        for flagged in [false, true] {
            if flagged {
                report.status.insert("Glucose_Fasting".into(), StatusFlag::Normal);
            }
            let patterns = engine.detect(&report.parameters, &report.patient);
            let observations = extractor.extract(&report, &patterns);
            assert_eq!(observations, ["Glucose_Fasting_AT_OR_ABOVE_100"]);
            let ranked = ranker.rank(&observations);
            assert!(ranked.causes.iter().all(|c| c.cause != "Diabetes_Mellitus"
                && c.cause != "Insulin_Resistance"));
        }
    }

    #[test]
    fn status_flag_overrides_grading() {
        let (_, extractor, engine, _) = setup();
        let mut report = report(&[("LDL", 120.0), ("CRP", 30.0)]);
        report.status.insert("LDL".into(), StatusFlag::High);
        report.status.insert("CRP".into(), StatusFlag::Normal);
        let patterns = engine.detect(&report.parameters, &report.patient);
        let observations = extractor.extract(&report, &patterns);
        // CRP still appears through the inflammation pattern
        assert_eq!(observations, ["CRP_HIGH", "LDL_HIGH"]);
    }

    #[test]
    fn status_without_value_still_counts() {
        let (_, extractor, _, _) = setup();
        let mut report = LoadedReport::default();
        report.status.insert("Platelets".into(), StatusFlag::Low);
        let observations = extractor.extract(&report, &PatternReport::default());
        assert_eq!(observations, ["Platelets_LOW"]);
    }

    #[test]
    fn ranking_reports_raw_and_normalized_scores() {
        let (_, _, _, ranker) = setup();
        let ranked = ranker.rank(&["Hemoglobin_LOW", "MCV_HIGH"]);
        assert!((ranked.top_score() - 1.0).abs() < f64::EPSILON);
        let top = &ranked.causes[0];
        assert_eq!(top.cause, "Vitamin_B12_Deficiency");
        assert!(ranked.raw_scores[&top.cause] <= 1.0);
        assert!(ranked
            .causes
            .iter()
            .all(|c| c.score > 0.0 && !c.support.is_empty()));

        let empty: [&str; 0] = [];
        assert!(ranker.rank(&empty).causes.is_empty());
    }
}
