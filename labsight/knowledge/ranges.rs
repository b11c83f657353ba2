use serde::{Deserialize, Serialize};

/// Patient gender as far as reference ranges are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male patient.
    Male,
    /// Female patient.
    Female,
    /// Anything else that was reported.
    Other,
}

impl Gender {
    /// Parses a free-text gender field. Blank input yields `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match trimmed.to_ascii_lowercase().as_str() {
            "m" | "male" | "man" => Self::Male,
            "f" | "female" | "woman" => Self::Female,
            _ => Self::Other,
        })
    }
}

/// A low/high pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower bound (inclusive).
    pub low: f64,
    /// Upper bound (inclusive).
    pub high: f64,
}

impl Bounds {
    /// Creates a bounds pair.
    #[must_use]
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    fn is_valid(self) -> bool {
        self.low.is_finite() && self.high.is_finite() && self.low <= self.high
    }
}

/// Reference range declaration for one parameter, either direct or keyed by population.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSpec {
    /// Display unit.
    #[serde(default)]
    pub unit: String,
    /// Direct lower bound.
    #[serde(default)]
    pub low: Option<f64>,
    /// Direct upper bound.
    #[serde(default)]
    pub high: Option<f64>,
    /// Range for adults of any sex.
    #[serde(default)]
    pub adult: Option<Bounds>,
    /// Range for adult men.
    #[serde(default)]
    pub adult_male: Option<Bounds>,
    /// Range for adult women.
    #[serde(default)]
    pub adult_female: Option<Bounds>,
}

/// Resolved range for a single lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceRange {
    /// Lower bound.
    pub low: f64,
    /// Upper bound.
    pub high: f64,
    /// Display unit.
    pub unit: String,
}

impl ReferenceSpec {
    /// Declares a direct low/high range.
    #[must_use]
    pub fn direct(low: f64, high: f64, unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            low: Some(low),
            high: Some(high),
            ..Self::default()
        }
    }

    /// Declares separate adult male and female ranges.
    #[must_use]
    pub fn by_sex(male: Bounds, female: Bounds, unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            adult_male: Some(male),
            adult_female: Some(female),
            ..Self::default()
        }
    }

    /// Declares a generic adult range.
    #[must_use]
    pub fn adult(bounds: Bounds, unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            adult: Some(bounds),
            ..Self::default()
        }
    }

    /// Resolves the bounds that apply to a patient.
    ///
    /// Order: direct low/high, the key matching a known gender, then
    /// `adult_male`, `adult_female`, `adult`.
    #[must_use]
    pub fn resolve(&self, gender: Option<Gender>) -> Option<ReferenceRange> {
        let direct = match (self.low, self.high) {
            (Some(low), Some(high)) => Some(Bounds::new(low, high)),
            _ => None,
        };
        let preferred = match gender {
            Some(Gender::Male) => self.adult_male,
            Some(Gender::Female) => self.adult_female,
            Some(Gender::Other) | None => None,
        };
        direct
            .or(preferred)
            .or(self.adult_male)
            .or(self.adult_female)
            .or(self.adult)
            .map(|bounds| ReferenceRange {
                low: bounds.low,
                high: bounds.high,
                unit: self.unit.clone(),
            })
    }

    /// Returns a description of the first malformed bound, if any.
    #[must_use]
    pub fn problem(&self) -> Option<String> {
        if self.low.is_some() != self.high.is_some() {
            return Some("direct range needs both low and high".into());
        }
        if let (Some(low), Some(high)) = (self.low, self.high) {
            if !Bounds::new(low, high).is_valid() {
                return Some(format!("direct range {low}..{high} is not ordered"));
            }
        }
        [
            ("adult", self.adult),
            ("adult_male", self.adult_male),
            ("adult_female", self.adult_female),
        ]
        .into_iter()
        .find_map(|(key, bounds)| {
            bounds
                .filter(|b| !b.is_valid())
                .map(|b| format!("{key} range {}..{} is not ordered", b.low, b.high))
        })
    }
}
