use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use labsight_knowledge::{KnowledgeGraph, LabConfig};
use serde::Serialize;
use serde_json::{json, Value};
use shared_logging::LogLevel;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{
    causes::{CauseReport, ObservationExtractor, ProbableCauseRanker},
    confidence::{ConfidenceAggregator, ConfidenceResult},
    derived::{DerivedMetrics, DerivedReport, StandardDerived},
    guardrail::{GuardOutcome, OutputGuard},
    loader::{LoaderError, RecordLoader},
    module::{LoadedReport, PatientContext, StatusFlag},
    patterns::{PatternEngine, PatternReport},
    severity::{SeverityClassifier, SeverityLabel},
    telemetry::PipelineTelemetry,
};

/// Fixed disclaimer attached to every document.
pub const DISCLAIMER: &str = "Model-2 deterministic + KG reasoning. Not a diagnosis.";

/// Where the document came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    /// Input path as given.
    pub input_file: String,
    /// Input file name without extension.
    pub base: String,
    /// Demographics carried through from the record.
    #[serde(flatten)]
    pub patient: PatientContext,
}

impl DocumentMetadata {
    /// Metadata for an input path.
    #[must_use]
    pub fn for_input(path: &Path, patient: PatientContext) -> Self {
        let base = path
            .file_stem()
            .map_or_else(|| "report".to_string(), |s| s.to_string_lossy().into_owned());
        Self {
            input_file: path.display().to_string(),
            base,
            patient,
        }
    }
}

/// Typed Model-2 document, serialized only at the output boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model2Document {
    /// Provenance.
    pub metadata: DocumentMetadata,
    /// Canonical values.
    pub parameters: IndexMap<String, Option<f64>>,
    /// Explicit status flags.
    pub status: IndexMap<String, StatusFlag>,
    /// Free-text notes.
    pub notes: IndexMap<String, String>,
    /// Derived metrics.
    pub derived: DerivedReport,
    /// Pattern verdicts.
    pub patterns: PatternReport,
    /// Ranked causes.
    pub probable_causes: CauseReport,
    /// Grade of every numeric parameter.
    pub severity: IndexMap<String, SeverityLabel>,
    /// Overall confidence.
    pub confidence: ConfidenceResult,
    /// Disclaimer.
    pub disclaimer_note: String,
}

/// Guarded JSON ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedDocument {
    /// Sanitized JSON tree.
    pub value: Value,
    /// What the guard changed.
    pub outcome: GuardOutcome,
}

/// Sequences every Model-2 stage over shared read-only configuration.
pub struct Model2Pipeline {
    config: Arc<LabConfig>,
    graph: Arc<KnowledgeGraph>,
    loader: RecordLoader,
    classifier: SeverityClassifier,
    patterns: PatternEngine,
    extractor: ObservationExtractor,
    ranker: ProbableCauseRanker,
    confidence: ConfidenceAggregator,
    derived: Box<dyn DerivedMetrics>,
    guard: OutputGuard,
    telemetry: Option<PipelineTelemetry>,
}

impl std::fmt::Debug for Model2Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model2Pipeline")
            .field("edges", &self.graph.len())
            .field("derived", &self.derived.label())
            .field("telemetry", &self.telemetry)
            .finish_non_exhaustive()
    }
}

impl Model2Pipeline {
    /// Builds every stage from `config`, with standard derived metrics.
    pub fn new(config: Arc<LabConfig>) -> Result<Self> {
        let graph = Arc::new(
            config
                .knowledge_graph()
                .context("building knowledge graph")?,
        );
        let classifier = SeverityClassifier::new(Arc::clone(&config));
        Ok(Self {
            loader: RecordLoader::new(Arc::clone(&config))?,
            patterns: PatternEngine::new(classifier.clone()),
            extractor: ObservationExtractor::new(Arc::clone(&config)),
            ranker: ProbableCauseRanker::new(Arc::clone(&config), Arc::clone(&graph)),
            confidence: ConfidenceAggregator,
            derived: Box::new(StandardDerived),
            guard: OutputGuard::new(config.forbidden_terms())?,
            classifier,
            graph,
            config,
            telemetry: None,
        })
    }

    /// Replaces the derived-metrics stage.
    #[must_use]
    pub fn with_derived(mut self, derived: Box<dyn DerivedMetrics>) -> Self {
        self.derived = derived;
        self
    }

    /// Attaches a telemetry sink.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: PipelineTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Shared configuration.
    #[must_use]
    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    /// Shared evidence graph.
    #[must_use]
    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    /// Loads one record from disk.
    pub fn load(&self, path: &Path) -> Result<LoadedReport, LoaderError> {
        self.loader.load(path)
    }

    /// Runs every analysis stage over a loaded report.
    #[instrument(skip_all, fields(base = %metadata.base))]
    pub fn analyze(&self, report: &LoadedReport, metadata: DocumentMetadata) -> Model2Document {
        let run_id = Uuid::new_v4();
        let derived = self.derived.compute(report);
        let patterns = self.patterns.detect(&report.parameters, &report.patient);
        let observations = self.extractor.extract(report, &patterns);
        debug!(?observations, "observations extracted");
        let probable_causes = self.ranker.rank(&observations);
        let severity: IndexMap<String, SeverityLabel> = report
            .records()
            .iter()
            .filter(|record| record.value.is_some())
            .map(|record| {
                let label = self.classifier.label_record(record, &report.patient);
                (record.name.clone(), label)
            })
            .collect();
        let confidence = self
            .confidence
            .aggregate(report, &patterns, &probable_causes);

        self.emit(
            LogLevel::Info,
            "model2.analyze.completed",
            json!({
                "run_id": run_id.to_string(),
                "base": metadata.base,
                "parameters": report.parameters.len(),
                "present": report.present_count(),
                "patterns": patterns.present().map(|(name, _)| name).collect::<Vec<_>>(),
                "observations": observations,
                "causes": probable_causes.causes.len(),
                "confidence": confidence.score,
            }),
        );

        Model2Document {
            metadata,
            parameters: report.parameters.clone(),
            status: report.status.clone(),
            notes: report.notes.clone(),
            derived,
            patterns,
            probable_causes,
            severity,
            confidence,
            disclaimer_note: DISCLAIMER.to_string(),
        }
    }

    /// Serializes the document and runs the guardrail over it.
    pub fn sanitize(&self, document: &Model2Document) -> Result<SanitizedDocument> {
        let mut value = serde_json::to_value(document).context("serializing Model-2 document")?;
        let outcome = self.guard.sanitize(&mut value);
        if outcome.redacted > 0 || outcome.renamed_recommendations {
            warn!(redacted = outcome.redacted, "guardrail modified document");
            self.emit(
                LogLevel::Warn,
                "model2.guardrail.redacted",
                json!({
                    "base": document.metadata.base,
                    "redacted": outcome.redacted,
                    "renamed_recommendations": outcome.renamed_recommendations,
                }),
            );
        }
        Ok(SanitizedDocument { value, outcome })
    }

    /// Load, analyze, and sanitize in one call.
    pub fn process(&self, path: &Path) -> Result<SanitizedDocument> {
        let report = self
            .load(path)
            .with_context(|| format!("loading {}", path.display()))?;
        let metadata = DocumentMetadata::for_input(path, report.patient.clone());
        let document = self.analyze(&report, metadata);
        self.sanitize(&document)
    }

    fn emit(&self, level: LogLevel, message: &str, metadata: Value) {
        if let Some(telemetry) = &self.telemetry {
            if let Err(err) = telemetry.log(level, message, metadata) {
                warn!(error = %err, "telemetry write failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{derived::NoDerived, severity::SeverityLevel};
    use labsight_knowledge::Gender;
    use shared_logging::read_records;
    use tempfile::tempdir;

    fn pipeline() -> Model2Pipeline {
        Model2Pipeline::new(Arc::new(LabConfig::builtin())).unwrap()
    }

    fn report(values: &[(&str, Option<f64>)], gender: Option<Gender>) -> LoadedReport {
        let mut report = LoadedReport {
            patient: PatientContext {
                gender,
                ..PatientContext::default()
            },
            ..LoadedReport::default()
        };
        for (name, value) in values {
            report.parameters.insert((*name).to_string(), *value);
        }
        report
    }

    fn metadata(name: &str) -> DocumentMetadata {
        DocumentMetadata::for_input(Path::new(name), PatientContext::default())
    }

    #[test]
    fn macrocytic_anemia_scenario() {
        let pipeline = pipeline();
        let report = report(
            &[
                ("Hemoglobin", Some(6.5)),
                ("MCV", Some(109.6)),
                ("Platelets", Some(180.0)),
            ],
            Some(Gender::Female),
        );
        let doc = pipeline.analyze(&report, metadata("a.csv"));
        let anemia = &doc.patterns.patterns["anemia"];
        assert!(anemia.present);
        assert_eq!(anemia.kind.as_deref(), Some("macrocytic"));
        assert!(!doc.patterns.patterns["thrombocytopenia"].present);
        let b12 = doc
            .probable_causes
            .causes
            .iter()
            .find(|c| c.cause == "Vitamin_B12_Deficiency")
            .unwrap();
        assert!((b12.score - 1.0).abs() < f64::EPSILON);
        assert_eq!(doc.severity.len(), 3);
        assert!((0.0..=1.0).contains(&doc.confidence.score));
    }

    #[test]
    fn all_missing_scenario() {
        let pipeline = pipeline();
        let report = report(
            &[("Hemoglobin", None), ("MCV", None), ("Platelets", None)],
            None,
        );
        let doc = pipeline.analyze(&report, metadata("b.csv"));
        assert_eq!(doc.patterns.present().count(), 0);
        assert_eq!(doc.confidence.components.presence, 0.0);
        assert!(doc.probable_causes.causes.is_empty());
        assert!(doc.severity.is_empty());
        assert_eq!(
            doc.confidence.explanation,
            "Low confidence because no laboratory parameters were available to evaluate."
        );
    }

    #[test]
    fn borderline_glucose_does_not_suggest_diabetes() {
        let pipeline = pipeline();
        let doc = pipeline.analyze(
            &report(&[("Glucose_Fasting", Some(100.0))], None),
            metadata("g.csv"),
        );
        assert!(doc.patterns.patterns["metabolic_syndrome_signals"].present);
        assert!(doc.probable_causes.causes.is_empty());
        assert_eq!(doc.severity["Glucose_Fasting"].label, SeverityLevel::BorderlineHigh);
    }

    #[test]
    fn document_keys_and_disclaimer() {
        let pipeline = pipeline();
        let doc = pipeline.analyze(&report(&[("LDL", Some(180.0))], None), metadata("c.json"));
        let sanitized = pipeline.sanitize(&doc).unwrap();
        let keys: Vec<_> = sanitized.value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            [
                "metadata",
                "parameters",
                "status",
                "notes",
                "derived",
                "patterns",
                "probable_causes",
                "severity",
                "confidence",
                "disclaimer_note"
            ]
        );
        assert_eq!(sanitized.value["metadata"]["base"], "c");
        assert_eq!(sanitized.value["disclaimer_note"], DISCLAIMER);
        assert_eq!(sanitized.value["probable_causes"]["causes"][0]["source"], "kg");
        assert!(sanitized.value["derived"]["cardio"]["band"].is_string());
    }

    #[test]
    fn treatment_language_is_redacted() {
        let pipeline = pipeline();
        let mut report = report(&[("Glucose_Fasting", Some(180.0))], None);
        report
            .notes
            .insert("Glucose_Fasting".into(), "Doctor: start Metformin".into());
        let doc = pipeline.analyze(&report, metadata("d.csv"));
        let sanitized = pipeline.sanitize(&doc).unwrap();
        assert_eq!(sanitized.outcome.redacted, 1);
        assert!(!sanitized.value.to_string().to_lowercase().contains("metformin"));
    }

    #[test]
    fn analysis_is_deterministic() {
        let pipeline = pipeline();
        let report = report(
            &[
                ("Hemoglobin", Some(9.0)),
                ("MCV", Some(70.0)),
                ("RDW", Some(17.0)),
                ("CRP", Some(12.0)),
            ],
            Some(Gender::Male),
        );
        let first = pipeline.sanitize(&pipeline.analyze(&report, metadata("x.csv"))).unwrap();
        let second = pipeline.sanitize(&pipeline.analyze(&report, metadata("x.csv"))).unwrap();
        assert_eq!(first.value.to_string(), second.value.to_string());
    }

    #[test]
    fn custom_derived_stage_and_telemetry() {
        let tmp = tempdir().unwrap();
        let log = tmp.path().join("pipeline.log");
        let telemetry = PipelineTelemetry::builder("model2.pipeline")
            .log_path(&log)
            .build()
            .unwrap();
        let pipeline = pipeline()
            .with_derived(Box::new(NoDerived))
            .with_telemetry(telemetry);
        let doc = pipeline.analyze(&report(&[("WBC", Some(15.0))], None), metadata("e.csv"));
        assert!(doc.derived.metrics.is_empty());
        assert!(doc.derived.cardio.is_none());

        let records = read_records(&log).unwrap();
        assert_eq!(records[0].message, "model2.analyze.completed");
        assert!(records[0].metadata["run_id"].is_string());
        assert_eq!(records[0].metadata["patterns"][0], "leukocytosis");
    }
}
