// src/keywords.rs
//! Case-insensitive substring matching of tracked terms against normalized text.

/// Fixed term list, lowercased once up front.
#[derive(Debug, Clone, Default)]
pub struct KeywordMatcher {
    terms: Vec<String>,
    lowered: Vec<String>,
}

impl KeywordMatcher {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let terms: Vec<String> = terms.into_iter().map(Into::into).collect();
        let lowered = terms.iter().map(|t| t.to_lowercase()).collect();
        Self { terms, lowered }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns the configured terms found in `text`, in configured order.
    /// Terms are reported as configured, not lowercased.
    pub fn matches(&self, text: &str) -> Vec<String> {
        if self.terms.is_empty() {
            return Vec::new();
        }
        let haystack = text.to_lowercase();
        self.terms
            .iter()
            .zip(self.lowered.iter())
            .filter(|(_, needle)| haystack.contains(needle.as_str()))
            .map(|(term, _)| term.clone())
            .collect()
    }
}

/// One-shot helper for callers that do not keep a matcher around.
pub fn match_keywords<S: AsRef<str>>(text: &str, terms: &[S]) -> Vec<String> {
    KeywordMatcher::new(terms.iter().map(|t| t.as_ref().to_string())).matches(text)
}
