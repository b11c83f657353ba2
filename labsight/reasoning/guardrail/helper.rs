use regex::{Regex, RegexBuilder};

/// Case-insensitive matcher over a fixed list of forbidden phrases.
#[derive(Debug, Clone)]
pub struct TermInspector {
    pattern: Option<Regex>,
}

impl TermInspector {
    /// Compiles the phrase list into one alternation. Phrases are matched literally.
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Result<Self, regex::Error> {
        let alternatives: Vec<String> = terms
            .iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .map(regex::escape)
            .collect();
        if alternatives.is_empty() {
            return Ok(Self { pattern: None });
        }
        let pattern = RegexBuilder::new(&alternatives.join("|"))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// True when `text` contains any forbidden phrase.
    #[must_use]
    pub fn is_forbidden(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(text))
    }
}
