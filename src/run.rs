// src/run.rs
//! One complete monitoring run.
//!
//! Order matters: state is saved before anything is dispatched, so a failed
//! or slow notification never costs change history. A save failure aborts the
//! run before dispatch; the unsaved changes are detected again next run.

use anyhow::{Context, Result};
use metrics::counter;
use std::sync::Arc;

use crate::alert::{aggregate, AlertReport};
use crate::config::MonitorConfig;
use crate::evaluator::{EvaluationOutcome, SourceEvaluator};
use crate::fetch::HttpFetcher;
use crate::keywords::KeywordMatcher;
use crate::normalize::HtmlTextExtractor;
use crate::notify::NotifierMux;
use crate::store::SnapshotStore;

/// What happened in a run, for the caller to print.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcomes: Vec<EvaluationOutcome>,
    pub failures: usize,
    pub report: AlertReport,
    /// `None` when there was nothing to send or dispatch was disabled.
    pub notified: Option<bool>,
}

impl RunSummary {
    pub fn checked(&self) -> usize {
        self.outcomes.len()
    }

    pub fn status_line(&self) -> String {
        let delivery = match self.notified {
            Some(true) => "notification sent",
            Some(false) => "notification NOT sent",
            None => "no notification",
        };
        format!(
            "checked {} source(s), {} fetch failure(s), {} alert(s), {}",
            self.checked(),
            self.failures,
            self.report.len(),
            delivery
        )
    }
}

/// Evaluator wired to the real HTTP fetcher and HTML extractor.
pub fn build_evaluator(cfg: &MonitorConfig) -> Result<SourceEvaluator> {
    let fetcher = HttpFetcher::new(&cfg.user_agent, cfg.fetch_timeout())
        .context("building HTTP client")?;
    Ok(SourceEvaluator::new(
        Arc::new(fetcher),
        Arc::new(HtmlTextExtractor),
        KeywordMatcher::new(cfg.keywords.iter().cloned()),
    )
    .with_settings(cfg.evaluator_settings()))
}

pub struct Monitor {
    sources: Vec<String>,
    evaluator: SourceEvaluator,
    store: SnapshotStore,
    notifier: Option<NotifierMux>,
}

impl Monitor {
    pub fn new(sources: Vec<String>, evaluator: SourceEvaluator, store: SnapshotStore) -> Self {
        Self {
            sources,
            evaluator,
            store,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: NotifierMux) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Runs the batch with the current wall clock.
    pub async fn run_once(&self) -> Result<RunSummary> {
        self.run_at(chrono::Utc::now().timestamp()).await
    }

    /// Runs the batch, stamping records with `now` (unix seconds).
    pub async fn run_at(&self, now: i64) -> Result<RunSummary> {
        crate::metrics::ensure_metrics_described();

        self.store.ensure_writable().await.with_context(|| {
            format!("state file {} is not writable", self.store.path().display())
        })?;

        let snapshots = self.store.load().await;
        tracing::info!(
            sources = self.sources.len(),
            known = snapshots.len(),
            "run started"
        );

        let batch = self
            .evaluator
            .evaluate_batch(&self.sources, snapshots, now)
            .await;
        let failures = batch.failures();

        self.store
            .save(&batch.snapshots)
            .await
            .with_context(|| format!("saving state to {}", self.store.path().display()))?;

        let report = aggregate(&batch.outcomes);
        counter!("monitor_alerts_total").increment(report.len() as u64);

        let notified = match (&self.notifier, report.is_empty()) {
            (_, true) => None,
            (None, false) => {
                tracing::info!("dispatch disabled; alert not sent");
                None
            }
            (Some(mux), false) => Some(mux.dispatch(&report.subject(), &report.body()).await),
        };

        Ok(RunSummary {
            outcomes: batch.outcomes,
            failures,
            report,
            notified,
        })
    }
}
