use std::{fs, path::Path};

use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    catalog,
    graph::{EdgeSpec, GraphError, KnowledgeGraph},
    ranges::{Gender, ReferenceRange, ReferenceSpec},
};

/// Errors raised while building a [`LabConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Overlay file could not be read.
    #[error("reading config {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Overlay document is not valid TOML for this schema.
    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A prior outside [0, 1].
    #[error("prior for {cause} is {value}, expected a value in [0, 1]")]
    InvalidPrior {
        /// Cause name.
        cause: String,
        /// Offending prior.
        value: f64,
    },
    /// A malformed reference range.
    #[error("reference range for {parameter}: {reason}")]
    InvalidRange {
        /// Parameter name.
        parameter: String,
        /// What is wrong with it.
        reason: String,
    },
    /// The edge table does not form a valid graph.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Read-only clinical configuration shared by every pipeline stage.
///
/// Built once at startup and passed by reference; nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct LabConfig {
    aliases: IndexMap<String, String>,
    acronyms: IndexSet<String>,
    metadata_keys: IndexSet<String>,
    key_parameters: Vec<String>,
    reference_ranges: IndexMap<String, ReferenceSpec>,
    priors: IndexMap<String, f64>,
    edges: Vec<EdgeSpec>,
    forbidden_terms: Vec<String>,
}

/// Optional TOML document layered on top of the built-in catalogue.
///
/// Maps replace entries with the same key; lists are appended.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigOverlay {
    #[serde(default)]
    acronyms: Vec<String>,
    #[serde(default)]
    key_parameters: Vec<String>,
    #[serde(default)]
    forbidden_terms: Vec<String>,
    #[serde(default)]
    aliases: IndexMap<String, String>,
    #[serde(default)]
    priors: IndexMap<String, f64>,
    #[serde(default)]
    reference_ranges: IndexMap<String, ReferenceSpec>,
    #[serde(default)]
    edges: Vec<EdgeSpec>,
}

impl LabConfig {
    /// The built-in catalogue.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            aliases: catalog::ALIASES
                .iter()
                .map(|(raw, canonical)| ((*raw).to_string(), (*canonical).to_string()))
                .collect(),
            acronyms: catalog::ACRONYMS.iter().map(|s| (*s).to_string()).collect(),
            metadata_keys: catalog::METADATA_KEYS.iter().map(|s| (*s).to_string()).collect(),
            key_parameters: catalog::KEY_PARAMETERS.iter().map(|s| (*s).to_string()).collect(),
            reference_ranges: catalog::reference_ranges().into_iter().collect(),
            priors: catalog::PRIORS
                .iter()
                .map(|(cause, prior)| ((*cause).to_string(), *prior))
                .collect(),
            edges: catalog::EDGES
                .iter()
                .map(|(source, relation, target, weight)| {
                    EdgeSpec::new(*source, *relation, *target, *weight)
                })
                .collect(),
            forbidden_terms: catalog::FORBIDDEN_TERMS.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Built-in catalogue overlaid with a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let overlay: ConfigOverlay = toml::from_str(raw)?;
        let mut config = Self::builtin();
        config.apply(overlay);
        config.validate()?;
        Ok(config)
    }

    /// Built-in catalogue overlaid with a TOML file.
    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    fn apply(&mut self, overlay: ConfigOverlay) {
        self.aliases.extend(
            overlay
                .aliases
                .into_iter()
                .map(|(raw, canonical)| (raw.to_ascii_lowercase(), canonical)),
        );
        self.acronyms.extend(
            overlay
                .acronyms
                .into_iter()
                .map(|token| token.to_ascii_lowercase()),
        );
        for param in overlay.key_parameters {
            if !self.key_parameters.contains(&param) {
                self.key_parameters.push(param);
            }
        }
        self.reference_ranges.extend(overlay.reference_ranges);
        self.priors.extend(overlay.priors);
        self.edges.extend(overlay.edges);
        self.forbidden_terms.extend(overlay.forbidden_terms);
    }

    /// Checks priors, ranges, and the edge table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some((cause, value)) = self
            .priors
            .iter()
            .find(|(_, p)| !(0.0..=1.0).contains(*p))
        {
            return Err(ConfigError::InvalidPrior {
                cause: cause.clone(),
                value: *value,
            });
        }
        for (parameter, spec) in &self.reference_ranges {
            if let Some(reason) = spec.problem() {
                return Err(ConfigError::InvalidRange {
                    parameter: parameter.clone(),
                    reason,
                });
            }
        }
        self.knowledge_graph()?;
        Ok(())
    }

    /// Builds the evidence graph from the configured edge table.
    pub fn knowledge_graph(&self) -> Result<KnowledgeGraph, GraphError> {
        KnowledgeGraph::from_edges(self.edges.iter().cloned())
    }

    /// Canonical name registered for a lower-cased normalized header.
    #[must_use]
    pub fn alias(&self, normalized_lower: &str) -> Option<&str> {
        self.aliases.get(normalized_lower).map(String::as_str)
    }

    /// True when `token` is upper-cased in canonical names.
    #[must_use]
    pub fn is_acronym(&self, token: &str) -> bool {
        self.acronyms.contains(&token.to_ascii_lowercase())
    }

    /// True when `key` names report metadata rather than a measurement.
    #[must_use]
    pub fn is_metadata_key(&self, key: &str) -> bool {
        self.metadata_keys.contains(&key.to_ascii_lowercase())
    }

    /// Parameters whose status flags feed observations.
    #[must_use]
    pub fn key_parameters(&self) -> &[String] {
        &self.key_parameters
    }

    /// Resolved reference range for a parameter and patient gender.
    #[must_use]
    pub fn reference_range(&self, parameter: &str, gender: Option<Gender>) -> Option<ReferenceRange> {
        self.reference_ranges
            .get(parameter)
            .and_then(|spec| spec.resolve(gender))
    }

    /// Cause priors.
    #[must_use]
    pub const fn priors(&self) -> &IndexMap<String, f64> {
        &self.priors
    }

    /// Declarative edge table.
    #[must_use]
    pub fn edges(&self) -> &[EdgeSpec] {
        &self.edges
    }

    /// Phrases the output guardrail redacts.
    #[must_use]
    pub fn forbidden_terms(&self) -> &[String] {
        &self.forbidden_terms
    }
}

impl Default for LabConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalogue_is_valid() {
        let config = LabConfig::builtin();
        config.validate().unwrap();
        assert_eq!(config.alias("hgb"), Some("Hemoglobin"));
        assert!(config.is_acronym("HDL"));
        assert!(config.is_metadata_key("Patient_ID"));
        assert!(config.key_parameters().iter().any(|p| p == "MCV"));
        assert!(!config.knowledge_graph().unwrap().is_empty());
    }

    #[test]
    fn resolves_sex_specific_ranges() {
        let config = LabConfig::builtin();
        let female = config.reference_range("Hemoglobin", Some(Gender::Female)).unwrap();
        assert_eq!((female.low, female.high), (12.0, 15.5));
        let unknown = config.reference_range("Hemoglobin", None).unwrap();
        assert_eq!(unknown.low, 13.5);
        assert!(config.reference_range("Mystery", None).is_none());
    }

    #[test]
    fn overlay_extends_catalogue() {
        let raw = r#"
            acronyms = ["ggtp"]
            forbidden_terms = ["start warfarin"]

            [aliases]
            "Gamma_GT" = "GGTP"

            [priors]
            Liver_Injury = 0.2

            [reference_ranges.GGTP]
            unit = "U/L"
            low = 8.0
            high = 61.0

            [[edges]]
            source = "GGTP_HIGH"
            relation = "possible_cause"
            target = "Liver_Injury"
            weight = 0.5
        "#;
        let config = LabConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.alias("gamma_gt"), Some("GGTP"));
        assert!(config.is_acronym("ggtp"));
        assert_eq!(config.priors()["Liver_Injury"], 0.2);
        assert_eq!(config.reference_range("GGTP", None).unwrap().high, 61.0);
        assert!(config.forbidden_terms().iter().any(|t| t == "start warfarin"));
        let graph = config.knowledge_graph().unwrap();
        assert_eq!(graph.query("GGTP_HIGH").count(), 1);
    }

    #[test]
    fn overlay_rejects_invalid_values() {
        let err = LabConfig::from_toml_str("[priors]\nIron_Deficiency = 2.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPrior { .. }));

        let err = LabConfig::from_toml_str(
            "[[edges]]\nsource = \"A_LOW\"\nrelation = \"r\"\ntarget = \"B\"\nweight = 0.0\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Graph(_)));

        let err = LabConfig::from_toml_str("[reference_ranges.X]\nlow = 3.0\nhigh = 1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRange { .. }));

        assert!(matches!(
            LabConfig::from_toml_str("unknown_key = 1").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }
}
