use std::{fmt, sync::Arc};

use labsight_knowledge::{LabConfig, ReferenceRange};
use serde::{Deserialize, Serialize};

use crate::module::{Direction, ParameterRecord, PatientContext};

/// Ordinal severity scale plus the terminal states for values that cannot be graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityLevel {
    /// Below half of the lower bound.
    VerySevereLow,
    /// Below 70% of the lower bound.
    SevereLow,
    /// Below the lower bound.
    Low,
    /// Inside the range, within 5% of the span from the lower bound.
    BorderlineLow,
    /// Inside the range.
    Normal,
    /// Inside the range, within 5% of the span from the upper bound.
    BorderlineHigh,
    /// Above the upper bound.
    High,
    /// Above 1.5x the upper bound.
    SevereHigh,
    /// Above 2x the upper bound.
    VerySevereHigh,
    /// No value was reported.
    Missing,
    /// No reference range is configured.
    UnknownRange,
    /// The value is not a finite number.
    Unparseable,
}

impl SeverityLevel {
    /// Snake-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VerySevereLow => "very_severe_low",
            Self::SevereLow => "severe_low",
            Self::Low => "low",
            Self::BorderlineLow => "borderline_low",
            Self::Normal => "normal",
            Self::BorderlineHigh => "borderline_high",
            Self::High => "high",
            Self::SevereHigh => "severe_high",
            Self::VerySevereHigh => "very_severe_high",
            Self::Missing => "missing",
            Self::UnknownRange => "unknown_range",
            Self::Unparseable => "unparseable",
        }
    }

    /// Out of range on the low side. Borderline values do not count.
    #[must_use]
    pub const fn is_low(self) -> bool {
        matches!(self, Self::Low | Self::SevereLow | Self::VerySevereLow)
    }

    /// Out of range on the high side. Borderline values do not count.
    #[must_use]
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High | Self::SevereHigh | Self::VerySevereHigh)
    }

    /// Direction of an out-of-range value.
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        if self.is_low() {
            Some(Direction::Low)
        } else if self.is_high() {
            Some(Direction::High)
        } else {
            None
        }
    }

    /// True for the `severe` and `very_severe` grades.
    #[must_use]
    pub const fn is_severe(self) -> bool {
        matches!(
            self,
            Self::SevereLow | Self::VerySevereLow | Self::SevereHigh | Self::VerySevereHigh
        )
    }

    /// Distance from `normal` on the ordinal scale; terminal states rank below everything.
    #[must_use]
    pub const fn extremity(self) -> u8 {
        match self {
            Self::VerySevereLow | Self::VerySevereHigh => 4,
            Self::SevereLow | Self::SevereHigh => 3,
            Self::Low | Self::High => 2,
            Self::BorderlineLow | Self::BorderlineHigh => 1,
            Self::Normal | Self::Missing | Self::UnknownRange | Self::Unparseable => 0,
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Graded value with a human note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityLabel {
    /// Value that was graded.
    pub value: Option<f64>,
    /// Severity grade.
    pub label: SeverityLevel,
    /// Human-readable note.
    pub note: String,
    /// Signed distance from the nearest bound; zero inside the range.
    pub distance: Option<f64>,
}

/// Grades values against the configured reference ranges.
#[derive(Debug, Clone)]
pub struct SeverityClassifier {
    config: Arc<LabConfig>,
}

impl SeverityClassifier {
    /// Creates a classifier.
    #[must_use]
    pub const fn new(config: Arc<LabConfig>) -> Self {
        Self { config }
    }

    /// Grades `value` for `parameter`. Never fails; ungradable inputs get a terminal label.
    #[must_use]
    pub fn label_from_range(
        &self,
        parameter: &str,
        value: Option<f64>,
        patient: &PatientContext,
    ) -> SeverityLabel {
        let Some(value) = value else {
            return SeverityLabel {
                value: None,
                label: SeverityLevel::Missing,
                note: "No value".into(),
                distance: None,
            };
        };
        let Some(range) = self.config.reference_range(parameter, patient.gender) else {
            return SeverityLabel {
                value: Some(value),
                label: SeverityLevel::UnknownRange,
                note: "No reference range".into(),
                distance: None,
            };
        };
        if !value.is_finite() {
            return SeverityLabel {
                value: Some(value),
                label: SeverityLevel::Unparseable,
                note: value.to_string(),
                distance: None,
            };
        }
        grade(value, &range)
    }

    /// Grades a loaded record. A unit read off the raw value stands in for a
    /// range declared without one.
    #[must_use]
    pub fn label_record(&self, record: &ParameterRecord, patient: &PatientContext) -> SeverityLabel {
        let range = self.config.reference_range(&record.name, patient.gender);
        match (record.value, range, record.unit.as_deref()) {
            (Some(value), Some(mut range), Some(unit))
                if value.is_finite() && range.unit.trim().is_empty() =>
            {
                range.unit = unit.to_string();
                grade(value, &range)
            }
            _ => self.label_from_range(&record.name, record.value, patient),
        }
    }
}

/// Grades a finite value against a resolved range.
#[must_use]
pub fn grade(value: f64, range: &ReferenceRange) -> SeverityLabel {
    let ReferenceRange { low, high, .. } = *range;
    let (label, distance) = if value < low {
        let label = if value < 0.5 * low {
            SeverityLevel::VerySevereLow
        } else if value < 0.7 * low {
            SeverityLevel::SevereLow
        } else {
            SeverityLevel::Low
        };
        (label, value - low)
    } else if value > high {
        let label = if value > 2.0 * high {
            SeverityLevel::VerySevereHigh
        } else if value > 1.5 * high {
            SeverityLevel::SevereHigh
        } else {
            SeverityLevel::High
        };
        (label, value - high)
    } else {
        let span = if (high - low).abs() > f64::EPSILON {
            high - low
        } else if high == 0.0 {
            1.0
        } else {
            high
        };
        let border = 0.05 * span;
        let label = if value - low <= border {
            SeverityLevel::BorderlineLow
        } else if high - value <= border {
            SeverityLevel::BorderlineHigh
        } else {
            SeverityLevel::Normal
        };
        (label, 0.0)
    };
    SeverityLabel {
        value: Some(value),
        label,
        note: note(value, range),
        distance: Some(distance),
    }
}

fn note(value: f64, range: &ReferenceRange) -> String {
    let unit = range.unit.trim();
    if unit.is_empty() {
        format!("{value} (reference {} - {})", range.low, range.high)
    } else {
        format!(
            "{value} {unit} (reference {} - {} {unit})",
            range.low, range.high
        )
    }
}
