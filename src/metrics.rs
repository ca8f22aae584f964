// src/metrics.rs
//! Run metrics. Counters go through the `metrics` facade and are no-ops
//! unless a recorder is installed; with `MONITOR_METRICS_FILE` set, a
//! Prometheus recorder is installed and its exposition text is written to
//! that file at the end of the run (node-exporter text-file collector style).

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

pub const ENV_METRICS_FILE: &str = "MONITOR_METRICS_FILE";

/// One-time metric descriptions so series show up with help text.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("monitor_sources_checked_total", "Sources fetched this run.");
        describe_counter!(
            "monitor_fetch_failures_total",
            "Sources whose fetch failed (network, timeout, non-2xx)."
        );
        describe_counter!("monitor_changed_total", "Sources whose content hash changed.");
        describe_counter!(
            "monitor_keyword_hits_total",
            "Tracked terms found across all sources."
        );
        describe_counter!("monitor_alerts_total", "Alert-worthy outcomes reported.");
        describe_histogram!("monitor_fetch_ms", "Fetch duration in milliseconds.");
        describe_gauge!("monitor_last_run_ts", "Unix ts when the last run finished.");
    });
}

pub struct RunMetrics {
    handle: PrometheusHandle,
    path: PathBuf,
}

impl RunMetrics {
    /// Installs the recorder when `MONITOR_METRICS_FILE` is set.
    pub fn from_env() -> Result<Option<Self>> {
        match std::env::var(ENV_METRICS_FILE) {
            Ok(p) if !p.trim().is_empty() => Self::install(PathBuf::from(p)).map(Some),
            _ => Ok(None),
        }
    }

    pub fn install(path: PathBuf) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Atomically replaces the metrics file with the current exposition.
    pub fn flush(&self, last_run_ts: i64) -> Result<()> {
        gauge!("monitor_last_run_ts").set(last_run_ts as f64);
        let tmp = self.path.with_extension("prom.tmp");
        std::fs::write(&tmp, self.render())
            .with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}
