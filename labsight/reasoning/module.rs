use indexmap::IndexMap;
use labsight_knowledge::Gender;
use serde::{Deserialize, Serialize};

/// Status flag printed next to a value on the lab report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusFlag {
    /// Below range.
    Low,
    /// Above range.
    High,
    /// Within range.
    Normal,
}

impl StatusFlag {
    /// Parses `LOW`/`HIGH`/`NORMAL`, their single-letter forms, and phrases such as
    /// `critical high`. Anything else yields `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_ascii_uppercase();
        match upper.as_str() {
            "L" | "LOW" => Some(Self::Low),
            "H" | "HIGH" => Some(Self::High),
            "N" | "NORMAL" => Some(Self::Normal),
            _ if upper.contains("LOW") => Some(Self::Low),
            _ if upper.contains("HIGH") => Some(Self::High),
            _ => None,
        }
    }

    /// Abnormal direction, `None` for `NORMAL`.
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::Low => Some(Direction::Low),
            Self::High => Some(Direction::High),
            Self::Normal => None,
        }
    }
}

/// Direction of an abnormal finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Below range.
    Low,
    /// Above range.
    High,
}

impl Direction {
    /// Suffix used in observation tokens.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::High => "HIGH",
        }
    }
}

/// Builds the observation token `<Param>_<LOW|HIGH>`.
#[must_use]
pub fn observation(parameter: &str, direction: Direction) -> String {
    format!("{parameter}_{}", direction.suffix())
}

/// Demographics and identifiers that accompany a report.
///
/// Only `gender` influences numeric logic (range selection); the rest is carried through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientContext {
    /// Age in whole years.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    /// Reported gender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    /// Opaque patient identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    /// File name recorded inside the report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Report date as printed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_date: Option<String>,
}

/// One canonical parameter with everything the loader found for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterRecord {
    /// Canonical name.
    pub name: String,
    /// Numeric value, `None` when absent or not castable.
    pub value: Option<f64>,
    /// Unit suffix stripped from the raw value.
    pub unit: Option<String>,
    /// Explicit status flag.
    pub status: Option<StatusFlag>,
    /// Free-text note.
    pub note: Option<String>,
}

/// Normalized form of one input record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadedReport {
    /// Demographics.
    pub patient: PatientContext,
    /// Canonical parameter values in input order.
    pub parameters: IndexMap<String, Option<f64>>,
    /// Units recovered during casting.
    pub units: IndexMap<String, String>,
    /// Explicit status flags.
    pub status: IndexMap<String, StatusFlag>,
    /// Free-text notes.
    pub notes: IndexMap<String, String>,
}

impl LoadedReport {
    /// Joined per-parameter records, in input order.
    #[must_use]
    pub fn records(&self) -> Vec<ParameterRecord> {
        self.parameters
            .iter()
            .map(|(name, value)| ParameterRecord {
                name: name.clone(),
                value: *value,
                unit: self.units.get(name).cloned(),
                status: self.status.get(name).copied(),
                note: self.notes.get(name).cloned(),
            })
            .collect()
    }

    /// Number of parameters carrying a value.
    #[must_use]
    pub fn present_count(&self) -> usize {
        self.parameters.values().filter(|v| v.is_some()).count()
    }

    /// Value of a parameter, if present.
    #[must_use]
    pub fn value(&self, parameter: &str) -> Option<f64> {
        self.parameters.get(parameter).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_accepts_variants() {
        assert_eq!(StatusFlag::parse("low"), Some(StatusFlag::Low));
        assert_eq!(StatusFlag::parse(" H "), Some(StatusFlag::High));
        assert_eq!(StatusFlag::parse("Normal"), Some(StatusFlag::Normal));
        assert_eq!(StatusFlag::parse("critical high"), Some(StatusFlag::High));
        assert_eq!(StatusFlag::parse("see comment"), None);
    }

    #[test]
    fn records_join_side_tables() {
        let mut report = LoadedReport::default();
        report.parameters.insert("Hemoglobin".into(), Some(9.1));
        report.parameters.insert("MCV".into(), None);
        report.units.insert("Hemoglobin".into(), "g/dL".into());
        report.status.insert("Hemoglobin".into(), StatusFlag::Low);
        report.notes.insert("MCV".into(), "clotted".into());

        let records = report.records();
        assert_eq!(records[0].unit.as_deref(), Some("g/dL"));
        assert_eq!(records[0].status, Some(StatusFlag::Low));
        assert_eq!(records[1].note.as_deref(), Some("clotted"));
        assert_eq!(report.present_count(), 1);
        assert_eq!(observation("MCV", Direction::High), "MCV_HIGH");
    }
}
