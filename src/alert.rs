// src/alert.rs
//! Folds a batch's outcomes into one alert report.

use std::fmt::Write as _;

use crate::evaluator::{EvaluationOutcome, Outcome};

const SEPARATOR_WIDTH: usize = 60;
const NO_KEYWORDS: &str = "none";

/// Alert-worthy outcomes of one run, in source order. Empty means nothing to
/// send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertReport {
    entries: Vec<EvaluationOutcome>,
}

impl AlertReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[EvaluationOutcome] {
        &self.entries
    }

    pub fn subject(&self) -> String {
        format!("[Monitor] {} alert(s) - review", self.entries.len())
    }

    /// Plain-text body, one block per alert.
    pub fn body(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(out, "URL: {}", entry.identifier);
            match &entry.outcome {
                Outcome::FetchFailure { reason } => {
                    // failures carry no separator
                    let _ = writeln!(out, "  ERROR: {reason}");
                    continue;
                }
                Outcome::Evaluated {
                    changed,
                    matched_keywords,
                    diff_snippet,
                } => {
                    let keywords = if matched_keywords.is_empty() {
                        NO_KEYWORDS.to_string()
                    } else {
                        matched_keywords.join(", ")
                    };
                    let _ = writeln!(out, "  Changes detected: {changed}");
                    let _ = writeln!(out, "  Keywords found: {keywords}");
                    if !diff_snippet.is_empty() {
                        let _ = writeln!(out, "  Diff (snippet):");
                        let _ = writeln!(out, "{diff_snippet}");
                    }
                }
            }
            let _ = writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH));
        }
        out.truncate(out.trim_end_matches('\n').len());
        out
    }
}

/// Keeps only alert-worthy outcomes, preserving order.
pub fn aggregate<'a, I>(outcomes: I) -> AlertReport
where
    I: IntoIterator<Item = &'a EvaluationOutcome>,
{
    let entries = outcomes
        .into_iter()
        .filter(|o| o.outcome.is_alert_worthy())
        .cloned()
        .collect();
    AlertReport { entries }
}
