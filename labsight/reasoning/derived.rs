use indexmap::IndexMap;
use serde::Serialize;

use labsight_knowledge::{round3, Gender};

use crate::module::LoadedReport;

/// Cardiovascular risk band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    /// Score below 0.3.
    Low,
    /// Score below 0.6.
    Moderate,
    /// Score of 0.6 or more.
    High,
    /// No lipid values to judge from.
    Unknown,
}

impl RiskBand {
    /// Lower-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Unknown => "unknown",
        }
    }
}

/// Cardiovascular risk summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardioRisk {
    /// Band.
    pub band: RiskBand,
    /// Additive factor score in [0, 1].
    pub score: f64,
    /// Factors that contributed, in evaluation order.
    pub factors: Vec<String>,
}

/// Derived metrics for one report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedReport {
    /// Metric name to value; `None` when inputs are missing or a ratio divides by zero.
    #[serde(flatten)]
    pub metrics: IndexMap<String, Option<f64>>,
    /// Risk band, if the implementation computes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardio: Option<CardioRisk>,
}

/// Pluggable derived-metrics stage.
pub trait DerivedMetrics: Send + Sync {
    /// Label used in logs.
    fn label(&self) -> &str;

    /// Computes metrics from the loaded values.
    fn compute(&self, report: &LoadedReport) -> DerivedReport;
}

/// Computes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDerived;

impl DerivedMetrics for NoDerived {
    fn label(&self) -> &str {
        "none"
    }

    fn compute(&self, _report: &LoadedReport) -> DerivedReport {
        DerivedReport::default()
    }
}

/// Lipid and leukocyte ratios plus an additive cardiovascular band.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDerived;

const RATIOS: &[(&str, &str, &str)] = &[
    ("TG_HDL_Ratio", "Triglycerides", "HDL"),
    ("LDL_HDL_Ratio", "LDL", "HDL"),
    ("TC_HDL_Ratio", "Total_Cholesterol", "HDL"),
    ("NLR", "Neutrophils", "Lymphocytes"),
];

const LIPIDS: &[&str] = &["Total_Cholesterol", "LDL", "HDL", "Triglycerides"];

impl DerivedMetrics for StandardDerived {
    fn label(&self) -> &str {
        "standard"
    }

    fn compute(&self, report: &LoadedReport) -> DerivedReport {
        let mut metrics: IndexMap<String, Option<f64>> = RATIOS
            .iter()
            .map(|(name, numerator, denominator)| {
                let value = ratio(report.value(numerator), report.value(denominator));
                ((*name).to_string(), value)
            })
            .collect();
        let non_hdl = match (report.value("Total_Cholesterol"), report.value("HDL")) {
            (Some(tc), Some(hdl)) => Some(round3(tc - hdl)),
            _ => None,
        };
        metrics.insert("Non_HDL_Cholesterol".into(), non_hdl);
        let cardio = cardio_risk(report, &metrics);
        DerivedReport {
            metrics,
            cardio: Some(cardio),
        }
    }
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(round3(n / d)),
        _ => None,
    }
}

/// Additive factor score over lipid, glycaemic, and demographic inputs.
#[must_use]
pub fn cardio_risk(report: &LoadedReport, metrics: &IndexMap<String, Option<f64>>) -> CardioRisk {
    if LIPIDS.iter().all(|name| report.value(name).is_none()) {
        return CardioRisk {
            band: RiskBand::Unknown,
            score: 0.0,
            factors: Vec::new(),
        };
    }
    let metric = |name: &str| metrics.get(name).copied().flatten();
    let age_threshold = match report.patient.gender {
        Some(Gender::Female) => 55,
        _ => 45,
    };
    let checks: [(&str, f64, bool); 7] = [
        ("LDL >= 160", 0.25, report.value("LDL").is_some_and(|v| v >= 160.0)),
        ("HDL < 40", 0.2, report.value("HDL").is_some_and(|v| v < 40.0)),
        ("TG/HDL > 3.5", 0.2, metric("TG_HDL_Ratio").is_some_and(|v| v > 3.5)),
        (
            "Total cholesterol >= 240",
            0.15,
            report.value("Total_Cholesterol").is_some_and(|v| v >= 240.0),
        ),
        ("TC/HDL > 5", 0.1, metric("TC_HDL_Ratio").is_some_and(|v| v > 5.0)),
        (
            "Diabetic glycaemia",
            0.1,
            report.value("HbA1c").is_some_and(|v| v >= 6.5)
                || report.value("Glucose_Fasting").is_some_and(|v| v >= 126.0),
        ),
        (
            "Age",
            0.1,
            report.patient.age.is_some_and(|age| age >= age_threshold),
        ),
    ];

    let mut score = 0.0;
    let mut factors = Vec::new();
    for (factor, weight, hit) in checks {
        if hit {
            score += weight;
            factors.push(factor.to_string());
        }
    }
    let score = round3(f64::min(score, 1.0));
    let band = if score >= 0.6 {
        RiskBand::High
    } else if score >= 0.3 {
        RiskBand::Moderate
    } else {
        RiskBand::Low
    };
    CardioRisk {
        band,
        score,
        factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::PatientContext;

    fn report(values: &[(&str, Option<f64>)]) -> LoadedReport {
        let mut report = LoadedReport::default();
        for (name, value) in values {
            report.parameters.insert((*name).to_string(), *value);
        }
        report
    }

    #[test]
    fn ratios_handle_missing_and_zero() {
        let derived = StandardDerived.compute(&report(&[
            ("Triglycerides", Some(200.0)),
            ("HDL", Some(0.0)),
            ("LDL", Some(100.0)),
            ("Neutrophils", Some(70.0)),
            ("Lymphocytes", Some(20.0)),
        ]));
        assert_eq!(derived.metrics["TG_HDL_Ratio"], None);
        assert_eq!(derived.metrics["TC_HDL_Ratio"], None);
        assert_eq!(derived.metrics["NLR"], Some(3.5));
    }

    #[test]
    fn band_accumulates_factors() {
        let mut atherogenic = report(&[
            ("LDL", Some(190.0)),
            ("HDL", Some(35.0)),
            ("Triglycerides", Some(250.0)),
            ("Total_Cholesterol", Some(260.0)),
        ]);
        atherogenic.patient = PatientContext {
            age: Some(60),
            ..PatientContext::default()
        };
        let derived = StandardDerived.compute(&atherogenic);
        let cardio = derived.cardio.unwrap();
        assert_eq!(cardio.band, RiskBand::High);
        assert_eq!(cardio.score, 1.0);
        assert_eq!(cardio.factors[0], "LDL >= 160");

        let healthy = StandardDerived.compute(&report(&[("LDL", Some(90.0)), ("HDL", Some(60.0))]));
        assert_eq!(healthy.cardio.unwrap().band, RiskBand::Low);
    }

    #[test]
    fn no_lipids_means_unknown_band() {
        let derived = StandardDerived.compute(&report(&[("Hemoglobin", Some(14.0))]));
        assert_eq!(derived.cardio.unwrap().band, RiskBand::Unknown);
        assert_eq!(NoDerived.compute(&LoadedReport::default()), DerivedReport::default());
    }

    #[test]
    fn serializes_flat_with_cardio_key() {
        let derived = StandardDerived.compute(&report(&[("LDL", Some(90.0)), ("HDL", Some(45.0))]));
        let json = serde_json::to_value(&derived).unwrap();
        assert_eq!(json["LDL_HDL_Ratio"], 2.0);
        assert_eq!(json["cardio"]["band"], "low");
        assert!(json["NLR"].is_null());
    }
}
