use std::{fs, path::Path, sync::Arc};

use labsight_knowledge::{Gender, LabConfig};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::module::{LoadedReport, PatientContext, StatusFlag};

/// Fatal failures while reading a report record.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// File could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// Input path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// CSV framing error.
    #[error("malformed CSV in {path}: {source}")]
    Csv {
        /// Input path.
        path: String,
        /// Underlying error.
        source: csv::Error,
    },
    /// JSON syntax error.
    #[error("malformed JSON in {path}: {source}")]
    Json {
        /// Input path.
        path: String,
        /// Underlying error.
        source: serde_json::Error,
    },
    /// Well-formed document of the wrong shape.
    #[error("malformed record in {path}: {reason}")]
    Malformed {
        /// Input path.
        path: String,
        /// What was wrong.
        reason: String,
    },
    /// Header without a data row, or an empty object.
    #[error("{path} contains no record")]
    Empty {
        /// Input path.
        path: String,
    },
    /// Internal pattern failed to compile.
    #[error("loader pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Where a raw column ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Column {
    Metadata(String),
    Status(String),
    Note(String),
    Parameter(String),
}

/// Numeric value with the unit text that followed it.
#[derive(Debug, Clone, PartialEq)]
struct Cast {
    value: f64,
    unit: Option<String>,
}

/// Reads one flat CSV row or JSON object and normalizes it into a [`LoadedReport`].
#[derive(Debug, Clone)]
pub struct RecordLoader {
    config: Arc<LabConfig>,
    parenthesized: Regex,
    separators: Regex,
    number: Regex,
}

impl RecordLoader {
    /// Creates a loader over the given configuration.
    pub fn new(config: Arc<LabConfig>) -> Result<Self, LoaderError> {
        Ok(Self {
            config,
            parenthesized: Regex::new(r"\(([^)]+)\)")?,
            separators: Regex::new(r"[^0-9A-Za-z]+")?,
            number: Regex::new(r"^([-+]?[0-9,]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)\s*(.*)$")?,
        })
    }

    /// Loads `path`, choosing JSON for a `.json` extension and CSV otherwise.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<LoadedReport, LoaderError> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            let raw = fs::read_to_string(path).map_err(|source| LoaderError::Io {
                path: path.display().to_string(),
                source,
            })?;
            self.load_json_str(&raw, &path.display().to_string())
        } else {
            let reader = csv::ReaderBuilder::new()
                .flexible(true)
                .from_path(path)
                .map_err(|source| csv_error(path, source))?;
            self.load_csv(reader, &path.display().to_string())
        }
    }

    /// Normalizes the first data row of a CSV document.
    pub fn load_csv_str(&self, raw: &str, origin: &str) -> Result<LoadedReport, LoaderError> {
        let reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(raw.as_bytes());
        self.load_csv(reader, origin)
    }

    fn load_csv<R: std::io::Read>(
        &self,
        mut reader: csv::Reader<R>,
        origin: &str,
    ) -> Result<LoadedReport, LoaderError> {
        let headers = reader
            .headers()
            .map_err(|source| csv_error(origin, source))?
            .clone();
        let row = match reader.records().next() {
            Some(row) => row.map_err(|source| csv_error(origin, source))?,
            None => {
                return Err(LoaderError::Empty {
                    path: origin.to_string(),
                })
            }
        };

        let mut report = LoadedReport::default();
        for (header, raw) in headers.iter().zip(row.iter()) {
            let raw = raw.trim();
            match self.classify(header) {
                Column::Metadata(key) => self.apply_metadata(&mut report.patient, &key, raw),
                Column::Status(name) => record_status(&mut report, name, raw),
                Column::Note(name) => {
                    if !raw.is_empty() {
                        report.notes.insert(name, raw.to_string());
                    }
                }
                Column::Parameter(name) => self.record_value(&mut report, name, raw),
            }
        }
        Ok(report)
    }

    /// Normalizes a JSON object.
    pub fn load_json_str(&self, raw: &str, origin: &str) -> Result<LoadedReport, LoaderError> {
        let document: Value = serde_json::from_str(raw).map_err(|source| LoaderError::Json {
            path: origin.to_string(),
            source,
        })?;
        let Value::Object(fields) = document else {
            return Err(LoaderError::Malformed {
                path: origin.to_string(),
                reason: "expected a JSON object at the top level".into(),
            });
        };
        if fields.is_empty() {
            return Err(LoaderError::Empty {
                path: origin.to_string(),
            });
        }

        let mut report = LoadedReport::default();
        for (header, value) in fields {
            let text = match &value {
                Value::String(s) => s.trim().to_string(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            match self.classify(&header) {
                Column::Metadata(key) => self.apply_metadata(&mut report.patient, &key, &text),
                Column::Status(name) => record_status(&mut report, name, &text),
                Column::Note(name) => {
                    if !text.is_empty() {
                        report.notes.insert(name, text);
                    }
                }
                Column::Parameter(name) => match value {
                    Value::Null => {
                        report.parameters.insert(name, None);
                    }
                    Value::Number(n) => {
                        report.parameters.insert(name, n.as_f64().filter(|v| v.is_finite()));
                    }
                    Value::String(_) => {
                        if let Some(cast) = self.cast(&text) {
                            store_cast(&mut report, name, cast);
                        } else if text.is_empty() {
                            report.parameters.insert(name, None);
                        } else if let Some(flag) = StatusFlag::parse(&text) {
                            report.status.insert(name, flag);
                        } else {
                            report.notes.insert(name, text);
                        }
                    }
                    Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
                        report.notes.insert(name, text);
                    }
                },
            }
        }
        Ok(report)
    }

    /// Punctuation and parenthesis normalization of a raw header.
    #[must_use]
    pub fn normalize_header(&self, raw: &str) -> String {
        let text = self.parenthesized.replace_all(raw.trim(), " $1");
        let text = text.replace('%', " percent");
        self.separators
            .replace_all(&text, "_")
            .trim_matches('_')
            .to_string()
    }

    /// Canonical parameter name for a raw header.
    #[must_use]
    pub fn canonical_name(&self, raw: &str) -> String {
        self.canonicalize(&self.normalize_header(raw))
    }

    fn canonicalize(&self, normalized: &str) -> String {
        if let Some(alias) = self.config.alias(&normalized.to_ascii_lowercase()) {
            return alias.to_string();
        }
        normalized
            .split('_')
            .map(|token| {
                if self.config.is_acronym(token) {
                    token.to_ascii_uppercase()
                } else {
                    capitalize(token)
                }
            })
            .collect::<Vec<_>>()
            .join("_")
    }

    fn classify(&self, header: &str) -> Column {
        let normalized = self.normalize_header(header);
        let lower = normalized.to_ascii_lowercase();
        for (suffix, status) in [("_status", true), ("_note", false)] {
            if lower.len() > suffix.len() && lower.ends_with(suffix) {
                let base = self.canonicalize(&normalized[..normalized.len() - suffix.len()]);
                return if status {
                    Column::Status(base)
                } else {
                    Column::Note(base)
                };
            }
        }
        let canonical = self.canonicalize(&normalized);
        if self.config.is_metadata_key(&canonical) {
            Column::Metadata(canonical.to_ascii_lowercase())
        } else {
            Column::Parameter(canonical)
        }
    }

    /// Casts a raw cell: strips thousands separators and keeps any trailing unit.
    fn cast(&self, raw: &str) -> Option<Cast> {
        let captures = self.number.captures(raw.trim())?;
        let value: f64 = captures.get(1)?.as_str().replace(',', "").parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        let unit = captures
            .get(2)
            .map(|m| m.as_str().trim())
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        Some(Cast { value, unit })
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn apply_metadata(&self, patient: &mut PatientContext, key: &str, raw: &str) {
        let text = (!raw.is_empty()).then(|| raw.to_string());
        match key {
            "age" => {
                patient.age = self
                    .cast(raw)
                    .map(|cast| cast.value)
                    .filter(|age| *age >= 0.0)
                    .map(|age| age.trunc() as u32);
            }
            "gender" => patient.gender = Gender::parse(raw),
            "patient_id" => patient.patient_id = text,
            "filename" => patient.filename = text,
            "report_date" => patient.report_date = text,
            other => debug!(key = other, "metadata key ignored"),
        }
    }

    fn record_value(&self, report: &mut LoadedReport, name: String, raw: &str) {
        if let Some(cast) = self.cast(raw) {
            store_cast(report, name, cast);
        } else {
            if !raw.is_empty() {
                debug!(parameter = %name, raw, "value not numeric; treated as missing");
            }
            report.parameters.insert(name, None);
        }
    }
}

fn store_cast(report: &mut LoadedReport, name: String, cast: Cast) {
    if let Some(unit) = cast.unit {
        report.units.insert(name.clone(), unit);
    }
    report.parameters.insert(name, Some(cast.value));
}

fn record_status(report: &mut LoadedReport, name: String, raw: &str) {
    if raw.is_empty() {
        return;
    }
    match StatusFlag::parse(raw) {
        Some(flag) => {
            report.status.insert(name, flag);
        }
        None => debug!(parameter = %name, raw, "unrecognized status flag dropped"),
    }
}

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

fn csv_error(path: impl AsRef<Path>, source: csv::Error) -> LoaderError {
    let path = path.as_ref().display().to_string();
    match source.kind() {
        csv::ErrorKind::Io(_) => match source.into_kind() {
            csv::ErrorKind::Io(source) => LoaderError::Io { path, source },
            other => LoaderError::Malformed {
                path,
                reason: format!("{other:?}"),
            },
        },
        _ => LoaderError::Csv { path, source },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn loader() -> RecordLoader {
        RecordLoader::new(Arc::new(LabConfig::builtin())).unwrap()
    }

    #[test]
    fn normalizes_headers() {
        let loader = loader();
        assert_eq!(loader.normalize_header(" Hemoglobin (Hb) "), "Hemoglobin_Hb");
        assert_eq!(loader.normalize_header("Neutrophils %"), "Neutrophils_percent");
        assert_eq!(loader.canonical_name("HGB"), "Hemoglobin");
        assert_eq!(loader.canonical_name("hdl cholesterol"), "HDL");
        assert_eq!(loader.canonical_name("serum ggt level"), "Serum_GGT_Level");
        assert_eq!(loader.canonical_name("hba1c-ratio"), "HBA1C_Ratio");
    }

    #[test]
    fn csv_row_routes_columns() {
        let csv = "Age,Gender,Hemoglobin,Hemoglobin_status,MCV,MCV_note,Platelet Count,WBC\n\
                   34.7,F,6.5 g/dL,low,109.6,large cells,\"1,80\",abc\n";
        let report = loader().load_csv_str(csv, "inline.csv").unwrap();
        assert_eq!(report.patient.age, Some(34));
        assert_eq!(report.patient.gender, Some(Gender::Female));
        assert_eq!(report.value("Hemoglobin"), Some(6.5));
        assert_eq!(report.units["Hemoglobin"], "g/dL");
        assert_eq!(report.status["Hemoglobin"], StatusFlag::Low);
        assert_eq!(report.notes["MCV"], "large cells");
        assert_eq!(report.value("Platelets"), Some(180.0));
        assert_eq!(report.parameters["WBC"], None);
        assert!(!report.parameters.contains_key("Age"));
    }

    #[test]
    fn json_object_routes_strings() {
        let json = r#"{
            "gender": "male",
            "Hemoglobin": 14.2,
            "MCV": "88 fL",
            "RDW": "HIGH",
            "CRP": "hemolysed sample",
            "LDL": null,
            "Extra": {"a": 1}
        }"#;
        let report = loader().load_json_str(json, "inline.json").unwrap();
        assert_eq!(report.patient.gender, Some(Gender::Male));
        assert_eq!(report.value("MCV"), Some(88.0));
        assert_eq!(report.status["RDW"], StatusFlag::High);
        assert_eq!(report.notes["CRP"], "hemolysed sample");
        assert_eq!(report.notes["Extra"], r#"{"a":1}"#);
        assert_eq!(report.parameters["LDL"], None);
        assert_eq!(
            report.parameters.keys().collect::<Vec<_>>(),
            ["Hemoglobin", "MCV", "LDL"]
        );
    }

    #[test]
    fn empty_and_malformed_inputs_fail() {
        let loader = loader();
        assert!(matches!(
            loader.load_csv_str("Hemoglobin,MCV\n", "h.csv"),
            Err(LoaderError::Empty { .. })
        ));
        assert!(matches!(
            loader.load_json_str("{}", "e.json"),
            Err(LoaderError::Empty { .. })
        ));
        assert!(matches!(
            loader.load_json_str("[1, 2]", "a.json"),
            Err(LoaderError::Malformed { .. })
        ));
        assert!(matches!(
            loader.load_json_str("{", "b.json"),
            Err(LoaderError::Json { .. })
        ));
    }

    #[test]
    fn loads_from_disk() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("report.JSON");
        fs::write(&path, r#"{"Platelets": 90}"#).unwrap();
        let report = loader().load(&path).unwrap();
        assert_eq!(report.value("Platelets"), Some(90.0));

        let missing = loader().load(tmp.path().join("absent.csv")).unwrap_err();
        assert!(matches!(missing, LoaderError::Io { .. }));
    }
}
