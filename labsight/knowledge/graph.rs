use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Damping applied to every edge weight before it is added to a cause's evidence.
pub const EVIDENCE_DAMPING: f64 = 0.8;

/// Declarative edge: observation --relation--> cause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    /// Observation token, e.g. `MCV_LOW`.
    pub source: String,
    /// Relation label, e.g. `possible_cause`.
    pub relation: String,
    /// Cause node name.
    pub target: String,
    /// Edge weight in (0, 1].
    pub weight: f64,
}

impl EdgeSpec {
    /// Creates an edge declaration.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        relation: impl Into<String>,
        target: impl Into<String>,
        weight: f64,
    ) -> Self {
        Self {
            source: source.into(),
            relation: relation.into(),
            target: target.into(),
            weight,
        }
    }

    /// Audit trace written into a cause's support list.
    #[must_use]
    pub fn trace(&self) -> String {
        format!("{}->{}->{}", self.source, self.relation, self.target)
    }
}

/// Smallest accepted edge weight. Lighter edges would round to a zero score.
pub const MIN_EDGE_WEIGHT: f64 = 0.001;

/// Errors raised while building the graph.
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    /// Weight outside [`MIN_EDGE_WEIGHT`, 1].
    #[error("edge {observation}->{cause} has weight {weight}, expected a value in [0.001, 1]")]
    InvalidWeight {
        /// Edge source observation.
        observation: String,
        /// Edge target cause.
        cause: String,
        /// Offending weight.
        weight: f64,
    },
    /// Blank source, relation, or target.
    #[error("edge #{index} has an empty {field}")]
    EmptyNode {
        /// Position in the edge table.
        index: usize,
        /// Which column was empty.
        field: &'static str,
    },
}

/// Where a probable cause came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CauseSource {
    /// Knowledge-graph inference.
    Kg,
}

/// One ranked cause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbableCause {
    /// Cause node name.
    pub cause: String,
    /// Score relative to the strongest cause, in [0, 1].
    pub score: f64,
    /// Edge traces that contributed, in accumulation order.
    pub support: Vec<String>,
    /// Provenance tag.
    pub source: CauseSource,
}

/// Full result of [`KnowledgeGraph::infer_causes`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CauseInference {
    /// Causes sorted by normalized score, ties in first-encountered order.
    pub causes: Vec<ProbableCause>,
    /// Damped, capped evidence sums before priors.
    pub combined: IndexMap<String, f64>,
    /// Scores after prior fusion, before normalization.
    pub fused: IndexMap<String, f64>,
}

/// Immutable observation -> cause evidence graph.
///
/// Edges are stored once in table order; `outgoing` indexes them by source.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    edges: Vec<EdgeSpec>,
    outgoing: IndexMap<String, Vec<usize>>,
}

impl KnowledgeGraph {
    /// Builds the graph from an edge table, validating each row.
    pub fn from_edges(edges: impl IntoIterator<Item = EdgeSpec>) -> Result<Self, GraphError> {
        let mut graph = Self::default();
        for (index, edge) in edges.into_iter().enumerate() {
            for (field, value) in [
                ("source", &edge.source),
                ("relation", &edge.relation),
                ("target", &edge.target),
            ] {
                if value.trim().is_empty() {
                    return Err(GraphError::EmptyNode { index, field });
                }
            }
            if !(MIN_EDGE_WEIGHT..=1.0).contains(&edge.weight) {
                return Err(GraphError::InvalidWeight {
                    observation: edge.source,
                    cause: edge.target,
                    weight: edge.weight,
                });
            }
            graph
                .outgoing
                .entry(edge.source.clone())
                .or_default()
                .push(graph.edges.len());
            graph.edges.push(edge);
        }
        Ok(graph)
    }

    /// Outgoing edges of an observation, in table order.
    pub fn query<'a>(&'a self, observation: &str) -> impl Iterator<Item = &'a EdgeSpec> + 'a {
        self.outgoing
            .get(observation)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.edges[idx])
    }

    /// The whole edge table.
    #[must_use]
    pub fn edges(&self) -> &[EdgeSpec] {
        &self.edges
    }

    /// Number of edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// True when the graph has no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Aggregates evidence for every cause reachable from `observations`.
    ///
    /// Evidence is summed with damping and capped at 1.0, so several corroborating
    /// observations outrank a single strong one. Scores are then fused with the
    /// priors and divided by the maximum, which makes the result a relative ranking.
    #[must_use]
    pub fn infer_causes<S: AsRef<str>>(
        &self,
        observations: &[S],
        priors: &IndexMap<String, f64>,
    ) -> CauseInference {
        let mut combined: IndexMap<String, f64> = IndexMap::new();
        let mut support: IndexMap<String, Vec<String>> = IndexMap::new();

        for observation in observations {
            for edge in self.query(observation.as_ref()) {
                let score = combined.entry(edge.target.clone()).or_insert(0.0);
                *score = (*score + edge.weight * EVIDENCE_DAMPING).min(1.0);
                support
                    .entry(edge.target.clone())
                    .or_default()
                    .push(edge.trace());
            }
        }

        let fused: IndexMap<String, f64> = combined
            .iter()
            .map(|(cause, score)| {
                let prior = priors.get(cause).copied().unwrap_or(0.0);
                (cause.clone(), round3(score * (1.0 + prior)).min(1.0))
            })
            .collect();

        let max = fused.values().copied().fold(0.0_f64, f64::max);
        let mut causes: Vec<ProbableCause> = fused
            .iter()
            .map(|(cause, score)| ProbableCause {
                cause: cause.clone(),
                score: if max > 0.0 { round3(score / max) } else { 0.0 },
                support: support.get(cause).cloned().unwrap_or_default(),
                source: CauseSource::Kg,
            })
            .collect();
        causes.sort_by(|a, b| b.score.total_cmp(&a.score));

        CauseInference {
            causes,
            combined,
            fused,
        }
    }
}

/// Rounds to three decimals.
#[must_use]
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> KnowledgeGraph {
        KnowledgeGraph::from_edges([
            EdgeSpec::new("Hemoglobin_LOW", "possible_cause", "Iron_Deficiency", 0.6),
            EdgeSpec::new("Hemoglobin_LOW", "possible_cause", "Blood_Loss", 0.5),
            EdgeSpec::new("MCV_LOW", "possible_cause", "Iron_Deficiency", 0.7),
            EdgeSpec::new("MCV_LOW", "possible_cause", "Thalassemia_Trait", 0.5),
            EdgeSpec::new("CRP_HIGH", "suggests", "Inflammation", 0.2),
        ])
        .unwrap()
    }

    #[test]
    fn query_preserves_table_order() {
        let graph = graph();
        let targets: Vec<_> = graph.query("Hemoglobin_LOW").map(|e| e.target.as_str()).collect();
        assert_eq!(targets, ["Iron_Deficiency", "Blood_Loss"]);
        assert_eq!(graph.query("Unknown_HIGH").count(), 0);
    }

    #[test]
    fn corroborating_observations_add_up() {
        let graph = graph();
        let priors = IndexMap::new();
        let hb_only = graph.infer_causes(&["Hemoglobin_LOW"], &priors);
        let mcv_only = graph.infer_causes(&["MCV_LOW"], &priors);
        let both = graph.infer_causes(&["Hemoglobin_LOW", "MCV_LOW"], &priors);

        let iron = |inf: &CauseInference| inf.combined["Iron_Deficiency"];
        assert!(iron(&both) > iron(&hb_only));
        assert!(iron(&both) > iron(&mcv_only));
        assert!((iron(&both) - 1.0).abs() < f64::EPSILON);
        assert_eq!(
            both.causes[0].support,
            [
                "Hemoglobin_LOW->possible_cause->Iron_Deficiency",
                "MCV_LOW->possible_cause->Iron_Deficiency"
            ]
        );
    }

    #[test]
    fn normalization_pins_top_cause_to_one() {
        let graph = graph();
        let inference = graph.infer_causes(&["CRP_HIGH"], &IndexMap::new());
        assert_eq!(inference.causes.len(), 1);
        assert!((inference.causes[0].score - 1.0).abs() < f64::EPSILON);
        assert!((inference.fused["Inflammation"] - 0.16).abs() < 1e-9);
    }

    #[test]
    fn priors_scale_before_normalizing() {
        let graph = graph();
        let mut priors = IndexMap::new();
        priors.insert("Blood_Loss".to_string(), 0.5);
        let inference = graph.infer_causes(&["Hemoglobin_LOW"], &priors);
        // 0.4 * 1.5 = 0.6 beats 0.48
        assert_eq!(inference.causes[0].cause, "Blood_Loss");
        assert!((inference.causes[1].score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn ties_keep_first_encountered_order() {
        let graph = KnowledgeGraph::from_edges([
            EdgeSpec::new("A_HIGH", "r", "Second", 0.5),
            EdgeSpec::new("A_HIGH", "r", "First", 0.5),
        ])
        .unwrap();
        let inference = graph.infer_causes(&["A_HIGH"], &IndexMap::new());
        let names: Vec<_> = inference.causes.iter().map(|c| c.cause.as_str()).collect();
        assert_eq!(names, ["Second", "First"]);
    }

    #[test]
    fn unmatched_observations_yield_nothing() {
        let inference = graph().infer_causes(&["Sodium_LOW"], &IndexMap::new());
        assert!(inference.causes.is_empty());
        assert!(inference.combined.is_empty());
        let empty: [&str; 0] = [];
        assert!(graph().infer_causes(&empty, &IndexMap::new()).causes.is_empty());
    }

    #[test]
    fn lightest_edge_still_scores_one() {
        let graph =
            KnowledgeGraph::from_edges([EdgeSpec::new("A_HIGH", "r", "Faint", MIN_EDGE_WEIGHT)])
                .unwrap();
        let inference = graph.infer_causes(&["A_HIGH"], &IndexMap::new());
        assert!(inference.fused["Faint"] > 0.0);
        assert!((inference.causes[0].score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_bad_rows() {
        let err = KnowledgeGraph::from_edges([EdgeSpec::new("A_LOW", "r", "B", 1.5)]).unwrap_err();
        assert!(matches!(err, GraphError::InvalidWeight { .. }));
        let err = KnowledgeGraph::from_edges([EdgeSpec::new("A_LOW", "r", "B", 0.0005)]).unwrap_err();
        assert!(matches!(err, GraphError::InvalidWeight { .. }));
        let err = KnowledgeGraph::from_edges([EdgeSpec::new("A_LOW", " ", "B", 0.5)]).unwrap_err();
        assert_eq!(err, GraphError::EmptyNode { index: 0, field: "relation" });
    }
}
