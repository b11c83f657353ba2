//! Declarative physiological pattern detection.

/// Rule matcher and pattern verdicts.
pub mod engine;
/// Built-in rule catalogue.
pub mod rules;

pub use engine::{Pattern, PatternEngine, PatternReport};
pub use rules::{Condition, Mode, PatternRule, Typing, RULES};
