/// How a rule's conditions combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every condition must hold.
    All,
    /// At least one condition must hold.
    Any,
}

/// Test applied to one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    /// Graded low (borderline excluded).
    Low(&'static str),
    /// Graded high (borderline excluded).
    High(&'static str),
    /// Raw value at or above a threshold. Supports as `<Param>_HIGH` only when
    /// the value is also graded high, otherwise as `<Param>_AT_OR_ABOVE_<t>`.
    AtLeast(&'static str, f64),
}

impl Condition {
    /// Parameter under test.
    #[must_use]
    pub const fn parameter(self) -> &'static str {
        match self {
            Self::Low(p) | Self::High(p) | Self::AtLeast(p, _) => p,
        }
    }
}

/// Subtype read from a secondary parameter once the pattern is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Typing {
    /// Secondary parameter.
    pub parameter: &'static str,
    /// Type when the secondary parameter is low.
    pub when_low: &'static str,
    /// Type when it is high.
    pub when_high: &'static str,
    /// Type otherwise.
    pub otherwise: &'static str,
}

/// Declarative pattern rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternRule {
    /// Pattern name used as the output key.
    pub name: &'static str,
    /// Combination mode.
    pub mode: Mode,
    /// Triggering conditions.
    pub conditions: &'static [Condition],
    /// Co-occurring abnormalities that make the pattern non-isolated.
    pub companions: &'static [Condition],
    /// Optional subtype.
    pub typing: Option<Typing>,
    /// Extra support added when they hold; they never trigger the pattern.
    pub supporting: &'static [Condition],
}

impl PatternRule {
    const fn new(name: &'static str, mode: Mode, conditions: &'static [Condition]) -> Self {
        Self {
            name,
            mode,
            conditions,
            companions: &[],
            typing: None,
            supporting: &[],
        }
    }

    const fn isolated_unless(mut self, companions: &'static [Condition]) -> Self {
        self.companions = companions;
        self
    }

    const fn typed(mut self, typing: Typing) -> Self {
        self.typing = Some(typing);
        self
    }

    const fn supported_by(mut self, supporting: &'static [Condition]) -> Self {
        self.supporting = supporting;
        self
    }
}

use Condition::{AtLeast, High, Low};
use Mode::{All, Any};

/// Built-in rule catalogue, in output order.
pub const RULES: &[PatternRule] = &[
    PatternRule::new("anemia", All, &[Low("Hemoglobin")])
        .typed(Typing {
            parameter: "MCV",
            when_low: "microcytic",
            when_high: "macrocytic",
            otherwise: "normocytic",
        })
        .supported_by(&[High("RDW")]),
    PatternRule::new(
        "polycythemia",
        Any,
        &[High("Hemoglobin"), High("RBC"), High("Hematocrit")],
    ),
    PatternRule::new("thrombocytopenia", Any, &[Low("Platelets")])
        .isolated_unless(&[Low("WBC"), Low("Hemoglobin")]),
    PatternRule::new("thrombocytosis", Any, &[High("Platelets")]),
    PatternRule::new("leukocytosis", Any, &[High("WBC")]),
    PatternRule::new("leukopenia", Any, &[Low("WBC")])
        .isolated_unless(&[Low("Hemoglobin"), Low("Platelets")]),
    PatternRule::new(
        "pancytopenia",
        All,
        &[Low("Hemoglobin"), Low("WBC"), Low("Platelets")],
    ),
    PatternRule::new("neutrophilia", Any, &[High("Neutrophils")]),
    PatternRule::new("lymphocytosis", Any, &[High("Lymphocytes")]),
    PatternRule::new("eosinophilia", Any, &[High("Eosinophils")]),
    PatternRule::new(
        "dyslipidemia",
        Any,
        &[
            High("Total_Cholesterol"),
            High("LDL"),
            High("Triglycerides"),
        ],
    ),
    PatternRule::new(
        "metabolic_syndrome_signals",
        Any,
        &[
            High("Triglycerides"),
            Low("HDL"),
            AtLeast("Glucose_Fasting", 100.0),
            AtLeast("HbA1c", 5.7),
        ],
    ),
    PatternRule::new(
        "hyperglycemia",
        Any,
        &[High("Glucose_Fasting"), High("HbA1c")],
    ),
    PatternRule::new(
        "renal_dysfunction",
        Any,
        &[High("Creatinine"), High("Urea_BUN")],
    ),
    PatternRule::new("hepatic_injury", Any, &[High("SGOT"), High("SGPT")]),
    PatternRule::new(
        "cholestasis",
        All,
        &[High("ALP"), High("Total_Bilirubin")],
    ),
    PatternRule::new("inflammation", Any, &[High("CRP"), High("ESR")]),
    PatternRule::new("hypothyroid_pattern", All, &[High("TSH")]),
    PatternRule::new("hyperthyroid_pattern", All, &[Low("TSH")]),
    PatternRule::new("hyponatremia", All, &[Low("Sodium")]),
    PatternRule::new("hyperkalemia", All, &[High("Potassium")]),
];
