use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    module::{observation, Direction, PatientContext},
    severity::{SeverityClassifier, SeverityLabel, SeverityLevel},
};

use super::rules::{Condition, Mode, PatternRule, RULES};

/// One pattern verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pattern {
    /// Whether the rule fired.
    pub present: bool,
    /// Subtype, for typed rules.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Most extreme grade among the matched conditions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<SeverityLevel>,
    /// Set for rules that declare companion parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isolated: Option<bool>,
    /// Observation tokens that triggered the pattern.
    pub support: Vec<String>,
    /// Matched severity notes.
    pub note: String,
}

impl Pattern {
    fn absent(rule: &PatternRule) -> Self {
        Self {
            present: false,
            kind: None,
            severity: None,
            isolated: (!rule.companions.is_empty()).then_some(false),
            support: Vec::new(),
            note: String::new(),
        }
    }
}

/// All pattern verdicts for one report, keyed by rule name in catalogue order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatternReport {
    /// Verdicts.
    pub patterns: IndexMap<String, Pattern>,
}

impl PatternReport {
    /// Present patterns in catalogue order.
    pub fn present(&self) -> impl Iterator<Item = (&str, &Pattern)> {
        self.patterns
            .iter()
            .filter(|(_, p)| p.present)
            .map(|(name, p)| (name.as_str(), p))
    }
}

struct Match {
    token: String,
    label: SeverityLabel,
}

/// Stateless rule matcher.
#[derive(Debug, Clone)]
pub struct PatternEngine {
    classifier: SeverityClassifier,
    rules: Vec<PatternRule>,
}

impl PatternEngine {
    /// Engine over the built-in rule catalogue.
    #[must_use]
    pub fn new(classifier: SeverityClassifier) -> Self {
        Self::with_rules(classifier, RULES.to_vec())
    }

    /// Engine over a custom rule list.
    #[must_use]
    pub const fn with_rules(classifier: SeverityClassifier, rules: Vec<PatternRule>) -> Self {
        Self { classifier, rules }
    }

    /// Evaluates every rule. Missing parameters simply fail their conditions.
    #[must_use]
    pub fn detect(
        &self,
        parameters: &IndexMap<String, Option<f64>>,
        patient: &PatientContext,
    ) -> PatternReport {
        let mut report = PatternReport::default();
        for rule in &self.rules {
            let pattern = self.evaluate(rule, parameters, patient);
            report.patterns.insert(rule.name.to_string(), pattern);
        }
        report
    }

    fn evaluate(
        &self,
        rule: &PatternRule,
        parameters: &IndexMap<String, Option<f64>>,
        patient: &PatientContext,
    ) -> Pattern {
        let matches: Vec<Match> = rule
            .conditions
            .iter()
            .filter_map(|condition| self.check(*condition, parameters, patient))
            .collect();
        let present = match rule.mode {
            Mode::All => matches.len() == rule.conditions.len(),
            Mode::Any => !matches.is_empty(),
        };
        if !present {
            return Pattern::absent(rule);
        }

        let mut support: Vec<String> = matches.iter().map(|m| m.token.clone()).collect();
        let kind = rule.typing.map(|typing| {
            let label = self.grade(typing.parameter, parameters, patient);
            match label.label.direction() {
                Some(Direction::Low) => {
                    support.push(observation(typing.parameter, Direction::Low));
                    typing.when_low
                }
                Some(Direction::High) => {
                    support.push(observation(typing.parameter, Direction::High));
                    typing.when_high
                }
                None => typing.otherwise,
            }
            .to_string()
        });
        support.extend(
            rule.supporting
                .iter()
                .filter_map(|condition| self.check(*condition, parameters, patient))
                .map(|m| m.token),
        );

        let isolated = (!rule.companions.is_empty()).then(|| {
            !rule
                .companions
                .iter()
                .any(|condition| self.check(*condition, parameters, patient).is_some())
        });

        let severity = matches
            .iter()
            .map(|m| m.label.label)
            .reduce(|worst, next| {
                if next.extremity() > worst.extremity() {
                    next
                } else {
                    worst
                }
            });
        let note = matches
            .iter()
            .map(|m| m.label.note.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        Pattern {
            present,
            kind,
            severity,
            isolated,
            support,
            note,
        }
    }

    fn check(
        &self,
        condition: Condition,
        parameters: &IndexMap<String, Option<f64>>,
        patient: &PatientContext,
    ) -> Option<Match> {
        let parameter = condition.parameter();
        let label = self.grade(parameter, parameters, patient);
        let hit = match condition {
            Condition::Low(_) => label.label.is_low(),
            Condition::High(_) => label.label.is_high(),
            Condition::AtLeast(_, threshold) => label.value.is_some_and(|v| v >= threshold),
        };
        if !hit {
            return None;
        }
        let token = match condition {
            Condition::Low(_) => observation(parameter, Direction::Low),
            Condition::High(_) => observation(parameter, Direction::High),
            Condition::AtLeast(_, _) if label.label.is_high() => {
                observation(parameter, Direction::High)
            }
            // in-range threshold hits stay out of the evidence graph
            Condition::AtLeast(_, threshold) => threshold_token(parameter, threshold),
        };
        Some(Match { token, label })
    }

    fn grade(
        &self,
        parameter: &str,
        parameters: &IndexMap<String, Option<f64>>,
        patient: &PatientContext,
    ) -> SeverityLabel {
        let value = parameters.get(parameter).copied().flatten();
        self.classifier.label_from_range(parameter, value, patient)
    }
}

fn threshold_token(parameter: &str, threshold: f64) -> String {
    format!("{parameter}_AT_OR_ABOVE_{threshold}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use labsight_knowledge::{Gender, LabConfig};
    use std::sync::Arc;

    fn engine() -> PatternEngine {
        PatternEngine::new(SeverityClassifier::new(Arc::new(LabConfig::builtin())))
    }

    fn params(values: &[(&str, Option<f64>)]) -> IndexMap<String, Option<f64>> {
        values.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    fn female() -> PatientContext {
        PatientContext {
            gender: Some(Gender::Female),
            ..PatientContext::default()
        }
    }

    #[test]
    fn macrocytic_anemia_without_thrombocytopenia() {
        let report = engine().detect(
            &params(&[
                ("Hemoglobin", Some(6.5)),
                ("MCV", Some(109.6)),
                ("Platelets", Some(180.0)),
            ]),
            &female(),
        );
        let anemia = &report.patterns["anemia"];
        assert!(anemia.present);
        assert_eq!(anemia.kind.as_deref(), Some("macrocytic"));
        assert_eq!(anemia.support, ["Hemoglobin_LOW", "MCV_HIGH"]);
        assert_eq!(anemia.severity, Some(SeverityLevel::SevereLow));
        assert!(!report.patterns["thrombocytopenia"].present);
        assert_eq!(report.patterns["thrombocytopenia"].isolated, Some(false));
    }

    #[test]
    fn microcytic_anemia_collects_rdw_support() {
        let report = engine().detect(
            &params(&[
                ("Hemoglobin", Some(9.0)),
                ("MCV", Some(70.0)),
                ("RDW", Some(17.0)),
            ]),
            &female(),
        );
        let anemia = &report.patterns["anemia"];
        assert_eq!(anemia.kind.as_deref(), Some("microcytic"));
        assert_eq!(anemia.support, ["Hemoglobin_LOW", "MCV_LOW", "RDW_HIGH"]);
    }

    #[test]
    fn borderline_values_do_not_trigger() {
        let report = engine().detect(&params(&[("Hemoglobin", Some(12.1))]), &female());
        assert!(!report.patterns["anemia"].present);
    }

    #[test]
    fn isolation_depends_on_companions() {
        let engine = engine();
        let alone = engine.detect(&params(&[("Platelets", Some(90.0)), ("WBC", Some(7.0))]), &female());
        assert_eq!(alone.patterns["thrombocytopenia"].isolated, Some(true));

        let with_wbc = engine.detect(
            &params(&[("Platelets", Some(90.0)), ("WBC", Some(2.5)), ("Hemoglobin", Some(8.0))]),
            &female(),
        );
        assert_eq!(with_wbc.patterns["thrombocytopenia"].isolated, Some(false));
        assert!(with_wbc.patterns["pancytopenia"].present);
        assert_eq!(
            with_wbc.patterns["pancytopenia"].support,
            ["Hemoglobin_LOW", "WBC_LOW", "Platelets_LOW"]
        );
    }

    #[test]
    fn metabolic_thresholds_use_raw_values() {
        let report = engine().detect(
            &params(&[("HbA1c", Some(5.7)), ("HDL", Some(55.0))]),
            &PatientContext::default(),
        );
        let metabolic = &report.patterns["metabolic_syndrome_signals"];
        assert!(metabolic.present);
        assert_eq!(metabolic.support, ["HbA1c_HIGH"]);
        assert!(report.patterns["hyperglycemia"].present);
    }

    #[test]
    fn in_range_threshold_hit_gets_its_own_token() {
        let report = engine().detect(
            &params(&[("Glucose_Fasting", Some(100.0))]),
            &PatientContext::default(),
        );
        let metabolic = &report.patterns["metabolic_syndrome_signals"];
        assert!(metabolic.present);
        assert_eq!(metabolic.severity, Some(SeverityLevel::BorderlineHigh));
        assert_eq!(metabolic.support, ["Glucose_Fasting_AT_OR_ABOVE_100"]);
        assert!(!report.patterns["hyperglycemia"].present);

        let high = engine().detect(
            &params(&[("Glucose_Fasting", Some(130.0))]),
            &PatientContext::default(),
        );
        assert_eq!(
            high.patterns["metabolic_syndrome_signals"].support,
            ["Glucose_Fasting_HIGH"]
        );
    }

    #[test]
    fn dyslipidemia_note_joins_matches() {
        let report = engine().detect(
            &params(&[("LDL", Some(190.0)), ("Triglycerides", Some(400.0))]),
            &PatientContext::default(),
        );
        let lipids = &report.patterns["dyslipidemia"];
        assert_eq!(lipids.support, ["LDL_HIGH", "Triglycerides_HIGH"]);
        assert_eq!(lipids.severity, Some(SeverityLevel::VerySevereHigh));
        assert_eq!(lipids.note.split("; ").count(), 2);
    }

    #[test]
    fn empty_input_detects_nothing() {
        let report = engine().detect(&IndexMap::new(), &PatientContext::default());
        assert_eq!(report.patterns.len(), RULES.len());
        assert_eq!(report.present().count(), 0);
    }
}
