#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Model-2 orchestration boundary: persistence, failure logging, and the text summary.

/// Run orchestration and persistence.
#[path = "../runner.rs"]
pub mod runner;

/// Human-readable summary.
#[path = "../summary.rs"]
pub mod summary;

pub use runner::{record_failure, Model2Runner, RunArtifacts, ERROR_LOG, OUTPUT_SUBDIR};
pub use summary::human_summary;
