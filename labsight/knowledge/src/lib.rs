#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Labsight clinical knowledge: reference ranges, cause priors, and the
//! observation -> cause evidence graph used by Model-2.

/// Built-in clinical catalogue.
#[path = "../catalog.rs"]
pub mod catalog;

/// Runtime configuration and TOML overlays.
#[path = "../config.rs"]
pub mod config;

/// Evidence graph and cause inference.
#[path = "../graph.rs"]
pub mod graph;

/// Reference range declarations.
#[path = "../ranges.rs"]
pub mod ranges;

pub use config::{ConfigError, LabConfig};
pub use graph::{
    round3, CauseInference, CauseSource, EdgeSpec, GraphError, KnowledgeGraph, ProbableCause,
    EVIDENCE_DAMPING, MIN_EDGE_WEIGHT,
};
pub use ranges::{Bounds, Gender, ReferenceRange, ReferenceSpec};
