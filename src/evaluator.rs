//! # Source evaluation
//! Per-source pipeline: fetch → normalize → fingerprint → compare → match →
//! diff → record. A fetch failure stops that source only; its prior record is
//! left untouched and the rest of the batch carries on.
//!
//! Batches run sources concurrently (bounded, input order preserved) against
//! a read-only view of the prior [`Snapshots`], then merge the new records in
//! a single pass. The state object goes in by value and comes back out; there
//! is no shared mutable store.

use futures::stream::{self, StreamExt};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;

use crate::diff::{self, DEFAULT_MAX_LINES};
use crate::fetch::Fetcher;
use crate::fingerprint::fingerprint;
use crate::keywords::KeywordMatcher;
use crate::normalize::Normalizer;
use crate::store::{SourceRecord, Snapshots, MAX_STORED_CHARS};

/// Hard ceiling on in-flight fetches regardless of configuration.
pub const MAX_CONCURRENCY: usize = 16;
pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    FetchFailure {
        reason: String,
    },
    Evaluated {
        changed: bool,
        matched_keywords: Vec<String>,
        diff_snippet: String,
    },
}

impl Outcome {
    /// Fetch failure, content change, or any keyword hit.
    pub fn is_alert_worthy(&self) -> bool {
        match self {
            Outcome::FetchFailure { .. } => true,
            Outcome::Evaluated {
                changed,
                matched_keywords,
                ..
            } => *changed || !matched_keywords.is_empty(),
        }
    }

    fn quiet() -> Self {
        Outcome::Evaluated {
            changed: false,
            matched_keywords: Vec::new(),
            diff_snippet: String::new(),
        }
    }
}

/// Exactly one per source per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationOutcome {
    pub identifier: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Copy)]
pub struct EvaluatorSettings {
    pub diff_max_lines: usize,
    pub max_stored_chars: usize,
    pub max_concurrency: usize,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            diff_max_lines: DEFAULT_MAX_LINES,
            max_stored_chars: MAX_STORED_CHARS,
            max_concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Result of one batch: outcomes in source order plus the updated state.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub outcomes: Vec<EvaluationOutcome>,
    pub snapshots: Snapshots,
}

impl BatchResult {
    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::FetchFailure { .. }))
            .count()
    }
}

pub struct SourceEvaluator {
    fetcher: Arc<dyn Fetcher>,
    normalizer: Arc<dyn Normalizer>,
    matcher: Arc<KeywordMatcher>,
    settings: EvaluatorSettings,
}

impl SourceEvaluator {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        normalizer: Arc<dyn Normalizer>,
        matcher: KeywordMatcher,
    ) -> Self {
        Self {
            fetcher,
            normalizer,
            matcher: Arc::new(matcher),
            settings: EvaluatorSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: EvaluatorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &EvaluatorSettings {
        &self.settings
    }

    /// Evaluates one source against its prior record. Returns the outcome and,
    /// on a successful fetch, the replacement record.
    pub async fn evaluate(
        &self,
        identifier: &str,
        prior: Option<&SourceRecord>,
        now: i64,
    ) -> (EvaluationOutcome, Option<SourceRecord>) {
        tracing::info!(source = %identifier, "checking source");
        counter!("monitor_sources_checked_total").increment(1);

        let t0 = Instant::now();
        let fetched = self.fetcher.fetch(identifier).await;
        histogram!("monitor_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let raw = match fetched {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(source = %identifier, error = %e, "fetch failed");
                counter!("monitor_fetch_failures_total").increment(1);
                let outcome = EvaluationOutcome {
                    identifier: identifier.to_string(),
                    outcome: Outcome::FetchFailure {
                        reason: e.to_string(),
                    },
                };
                return (outcome, None);
            }
        };

        let normalizer = Arc::clone(&self.normalizer);
        let matcher = Arc::clone(&self.matcher);
        let prior = prior.cloned();
        let settings = self.settings;
        // Normalize, hash, match and diff are CPU-bound; keep them off the
        // task that polls the other in-flight fetches.
        let analyzed = tokio::task::spawn_blocking(move || {
            analyze(normalizer.as_ref(), &matcher, prior.as_ref(), &raw, settings, now)
        })
        .await;

        let Analysis { outcome, record } = match analyzed {
            Ok(a) => a,
            Err(e) => {
                tracing::error!(source = %identifier, error = %e, "analysis task failed");
                let outcome = EvaluationOutcome {
                    identifier: identifier.to_string(),
                    outcome: Outcome::FetchFailure {
                        reason: format!("analysis failed: {e}"),
                    },
                };
                return (outcome, None);
            }
        };

        match &outcome {
            Outcome::Evaluated {
                changed,
                matched_keywords,
                ..
            } if outcome.is_alert_worthy() => {
                if *changed {
                    counter!("monitor_changed_total").increment(1);
                }
                if !matched_keywords.is_empty() {
                    counter!("monitor_keyword_hits_total").increment(matched_keywords.len() as u64);
                }
                tracing::info!(
                    source = %identifier,
                    changed = *changed,
                    keywords = matched_keywords.len(),
                    "source flagged"
                );
            }
            _ => tracing::debug!(source = %identifier, "unchanged"),
        }

        (
            EvaluationOutcome {
                identifier: identifier.to_string(),
                outcome,
            },
            Some(record),
        )
    }

    /// Evaluates every source, then folds successful records into `snapshots`.
    pub async fn evaluate_batch(
        &self,
        sources: &[String],
        mut snapshots: Snapshots,
        now: i64,
    ) -> BatchResult {
        let limit = self
            .settings
            .max_concurrency
            .clamp(1, MAX_CONCURRENCY)
            .min(sources.len().max(1));

        let results: Vec<(EvaluationOutcome, Option<SourceRecord>)> = {
            let prior = &snapshots;
            stream::iter(
                sources
                    .iter()
                    .map(|id| self.evaluate(id, prior.get(id), now)),
            )
            .buffered(limit)
            .collect()
            .await
        };

        let mut outcomes = Vec::with_capacity(results.len());
        for (outcome, record) in results {
            if let Some(record) = record {
                snapshots.upsert(outcome.identifier.clone(), record);
            }
            outcomes.push(outcome);
        }

        BatchResult {
            outcomes,
            snapshots,
        }
    }
}

struct Analysis {
    outcome: Outcome,
    record: SourceRecord,
}

/// Everything after the fetch: normalize, fingerprint, compare, match, diff.
fn analyze(
    normalizer: &dyn Normalizer,
    matcher: &KeywordMatcher,
    prior: Option<&SourceRecord>,
    raw: &str,
    settings: EvaluatorSettings,
    now: i64,
) -> Analysis {
    let text = normalizer.extract_text(raw);
    let content_hash = fingerprint(&text);
    let changed = prior.map_or(true, |p| p.content_hash != content_hash);
    let matched_keywords = matcher.matches(&text);

    let outcome = if changed || !matched_keywords.is_empty() {
        let previous = prior.map(|p| p.truncated_text.as_str()).unwrap_or("");
        Outcome::Evaluated {
            changed,
            diff_snippet: diff::summarize(previous, &text, settings.diff_max_lines),
            matched_keywords,
        }
    } else {
        Outcome::quiet()
    };

    let record = SourceRecord::capture(content_hash, &text, settings.max_stored_chars, now);
    Analysis { outcome, record }
}
