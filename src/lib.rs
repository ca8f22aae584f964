// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod alert;
pub mod config;
pub mod diff;
pub mod evaluator;
pub mod fetch;
pub mod fingerprint;
pub mod keywords;
pub mod metrics;
pub mod normalize;
pub mod notify;
pub mod run;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::alert::{aggregate, AlertReport};
pub use crate::config::MonitorConfig;
pub use crate::evaluator::{BatchResult, EvaluationOutcome, Outcome, SourceEvaluator};
pub use crate::fetch::{FetchError, Fetcher};
pub use crate::notify::{Notifier, NotifierMux, NotifyError};
pub use crate::run::{Monitor, RunSummary};
pub use crate::store::{SnapshotStore, Snapshots, SourceRecord, StoreError};
