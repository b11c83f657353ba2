use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use labsight_knowledge::LabConfig;
use labsight_reasoning::{DocumentMetadata, Model2Pipeline};
use serde_json::Value;
use shared_logging::{JsonLogger, LogRecord};
use tracing::{error, info, warn};

use crate::summary::human_summary;

/// Subdirectory of the output directory that receives every artifact.
pub const OUTPUT_SUBDIR: &str = "model2_outputs";

/// Error log file name, relative to the output directory.
pub const ERROR_LOG: &str = "error_log.txt";

const MODULE: &str = "model2.runner";

/// Files produced by a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunArtifacts {
    /// `<base>.model2.json`.
    pub json_path: PathBuf,
    /// `<base>.model2.txt`.
    pub text_path: PathBuf,
    /// Copy of the raw input, when copying succeeded.
    pub raw_copy: Option<PathBuf>,
    /// Sanitized document as written.
    pub document: Value,
    /// Leaves the guardrail redacted.
    pub redacted: usize,
}

/// Persists Model-2 documents and records failures.
#[derive(Debug)]
pub struct Model2Runner {
    pipeline: Model2Pipeline,
}

impl Model2Runner {
    /// Wraps an assembled pipeline.
    #[must_use]
    pub const fn new(pipeline: Model2Pipeline) -> Self {
        Self { pipeline }
    }

    /// Builds a runner over `config` with the standard stages.
    pub fn from_config(config: LabConfig) -> Result<Self> {
        Ok(Self::new(Model2Pipeline::new(Arc::new(config))?))
    }

    /// Underlying pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Model2Pipeline {
        &self.pipeline
    }

    /// Processes `input` into `output_dir/model2_outputs/`.
    ///
    /// On failure an `ERROR` record is appended to `output_dir/error_log.txt`
    /// and the error is returned.
    pub fn run(&self, input: &Path, output_dir: &Path) -> Result<RunArtifacts> {
        match self.try_run(input, output_dir) {
            Ok(artifacts) => {
                info!(
                    json = %artifacts.json_path.display(),
                    text = %artifacts.text_path.display(),
                    "model2 outputs written"
                );
                Ok(artifacts)
            }
            Err(err) => {
                error!(input = %input.display(), error = %format!("{err:#}"), "model2 run failed");
                if let Err(log_err) = record_failure(input, output_dir, &err) {
                    error!(error = %log_err, "could not append to error log");
                }
                Err(err)
            }
        }
    }

    fn try_run(&self, input: &Path, output_dir: &Path) -> Result<RunArtifacts> {
        let target = output_dir.join(OUTPUT_SUBDIR);
        fs::create_dir_all(&target)
            .with_context(|| format!("creating output directory {}", target.display()))?;

        let report = self
            .pipeline
            .load(input)
            .with_context(|| format!("loading {}", input.display()))?;
        let raw_copy = copy_raw_input(input, &target);

        let metadata = DocumentMetadata::for_input(input, report.patient.clone());
        let base = metadata.base.clone();
        let document = self.pipeline.analyze(&report, metadata);
        let sanitized = self.pipeline.sanitize(&document)?;

        let json_path = target.join(format!("{base}.model2.json"));
        let text_path = target.join(format!("{base}.model2.txt"));
        let mut body = serde_json::to_string_pretty(&sanitized.value)?;
        body.push('\n');
        fs::write(&json_path, body)
            .with_context(|| format!("writing {}", json_path.display()))?;
        fs::write(&text_path, human_summary(&sanitized.value))
            .with_context(|| format!("writing {}", text_path.display()))?;

        Ok(RunArtifacts {
            json_path,
            text_path,
            raw_copy,
            document: sanitized.value,
            redacted: sanitized.outcome.redacted,
        })
    }
}

fn copy_raw_input(input: &Path, target: &Path) -> Option<PathBuf> {
    let name = input.file_name()?.to_string_lossy();
    let destination = target.join(format!("raw_input_{name}"));
    match fs::copy(input, &destination) {
        Ok(_) => Some(destination),
        Err(err) => {
            warn!(error = %err, "raw input not copied; continuing");
            None
        }
    }
}

/// Appends an `ERROR` record for `input` to `output_dir/error_log.txt`.
pub fn record_failure(input: &Path, output_dir: &Path, err: &anyhow::Error) -> Result<()> {
    let logger = JsonLogger::new(output_dir.join(ERROR_LOG))?;
    logger.log(&LogRecord::failure(MODULE, input, &format!("{err:#}")))
}
