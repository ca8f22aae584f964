//! change-monitor: batch entry point.
//! Checks every configured source once, persists snapshots, and sends one
//! consolidated alert when anything changed, matched, or failed.
//!
//! Exit status is 0 whenever the run completes, even with alerts or failed
//! sources; only setup failures (config, unwritable state) exit non-zero.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use change_monitor::config::load_config_default;
use change_monitor::metrics::RunMetrics;
use change_monitor::run::build_evaluator;
use change_monitor::{Monitor, NotifierMux, SnapshotStore};

#[derive(Debug, Parser)]
#[command(name = "change-monitor", version, about)]
struct Cli {
    /// Config file (TOML or JSON). Defaults to $MONITOR_CONFIG_PATH, then config/monitor.{toml,json}.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the state file location.
    #[arg(long)]
    state: Option<PathBuf>,

    /// Evaluate and persist, but do not send notifications.
    #[arg(long)]
    no_notify: bool,
}

/// Compact logs by default; `MONITOR_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("change_monitor=info,warn"));

    let json = std::env::var("MONITOR_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact().with_target(false)).init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut cfg = load_config_default(cli.config.as_deref())?;
    if let Some(state) = cli.state {
        cfg.state_path = state;
    }
    tracing::info!(
        sources = cfg.sources.len(),
        keywords = cfg.keywords.len(),
        state = %cfg.state_path.display(),
        "config loaded"
    );

    let run_metrics = RunMetrics::from_env()?;

    let evaluator = build_evaluator(&cfg)?;
    let mut monitor = Monitor::new(
        cfg.sources.clone(),
        evaluator,
        SnapshotStore::new(cfg.state_path.clone()),
    );
    if !cli.no_notify {
        let mux = NotifierMux::from_env();
        if mux.is_empty() {
            tracing::warn!(
                "no notification channel configured (set SMTP_SERVER, SMTP_USER, SMTP_PASS, ALERT_TO or SLACK_WEBHOOK_URL)"
            );
        } else {
            tracing::info!(channels = ?mux.channel_names(), "notification channels ready");
        }
        monitor = monitor.with_notifier(mux);
    }

    let summary = monitor.run_once().await?;

    if summary.report.is_empty() {
        println!("No changes and no keywords found.");
    } else {
        println!("ALERTS:\n{}", summary.report.body());
        if summary.notified == Some(false) {
            println!("Alert could not be delivered; see logs.");
        }
    }

    if let Some(m) = run_metrics {
        if let Err(e) = m.flush(chrono::Utc::now().timestamp()) {
            tracing::warn!(error = %e, path = %m.path().display(), "metrics file not written");
        }
    }

    tracing::info!("{}", summary.status_line());
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "run aborted");
            eprintln!("change-monitor: {e:#}");
            ExitCode::FAILURE
        }
    }
}
