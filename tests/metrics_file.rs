// tests/metrics_file.rs
// Installs the global Prometheus recorder, so it lives in its own test binary.
mod common;

use change_monitor::keywords::KeywordMatcher;
use change_monitor::metrics::RunMetrics;
use change_monitor::{FetchError, Monitor, SnapshotStore, SourceEvaluator};
use common::{Identity, ScriptedFetcher};
use std::sync::Arc;

#[tokio::test]
async fn run_counters_land_in_metrics_file() {
    let dir = tempfile::tempdir().unwrap();
    let prom = dir.path().join("monitor.prom");
    let metrics = RunMetrics::install(prom.clone()).unwrap();

    let fetcher = ScriptedFetcher::new();
    fetcher.ok("A", "voluntariado abierto");
    fetcher.fail("B", FetchError::Status { status: 503 });
    let monitor = Monitor::new(
        vec!["A".into(), "B".into()],
        SourceEvaluator::new(fetcher, Arc::new(Identity), KeywordMatcher::new(["voluntariado"])),
        SnapshotStore::new(dir.path().join("snapshots.json")),
    );
    monitor.run_at(100).await.unwrap();
    metrics.flush(100).unwrap();

    let text = std::fs::read_to_string(&prom).unwrap();
    assert!(text.contains("monitor_sources_checked_total 2"), "{text}");
    assert!(text.contains("monitor_fetch_failures_total 1"), "{text}");
    assert!(text.contains("monitor_alerts_total 2"), "{text}");
    assert!(text.contains("monitor_last_run_ts 100"), "{text}");
    assert!(!dir.path().join("monitor.prom.tmp").exists());
}
