// src/config/monitor.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::diff::DEFAULT_MAX_LINES;
use crate::evaluator::{EvaluatorSettings, DEFAULT_CONCURRENCY, MAX_CONCURRENCY};
use crate::fetch::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::store::{DEFAULT_STATE_PATH, MAX_STORED_CHARS};

pub const ENV_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";

fn default_state_path() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_PATH)
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_max_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}
fn default_diff_max_lines() -> usize {
    DEFAULT_MAX_LINES
}
fn default_max_stored_chars() -> usize {
    MAX_STORED_CHARS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Addresses to check, in report order.
    pub sources: Vec<String>,
    /// Tracked terms; matched case-insensitively.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_diff_max_lines")]
    pub diff_max_lines: usize,
    #[serde(default = "default_max_stored_chars")]
    pub max_stored_chars: usize,
}

impl MonitorConfig {
    pub fn new(sources: Vec<String>, keywords: Vec<String>) -> Self {
        Self {
            sources,
            keywords,
            state_path: default_state_path(),
            user_agent: default_user_agent(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_concurrency: default_max_concurrency(),
            diff_max_lines: default_diff_max_lines(),
            max_stored_chars: default_max_stored_chars(),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn evaluator_settings(&self) -> EvaluatorSettings {
        EvaluatorSettings {
            diff_max_lines: self.diff_max_lines,
            max_stored_chars: self.max_stored_chars,
            max_concurrency: self.max_concurrency,
        }
    }

    /// Trims and dedups the lists (first occurrence wins), clamps limits.
    fn sanitize(mut self) -> Result<Self> {
        self.sources = clean_list(self.sources);
        self.keywords = clean_list(self.keywords);
        if self.sources.is_empty() {
            bail!("config lists no sources");
        }
        if self.fetch_timeout_secs == 0 {
            self.fetch_timeout_secs = default_fetch_timeout_secs();
        }
        self.max_concurrency = self.max_concurrency.clamp(1, MAX_CONCURRENCY);
        if self.user_agent.trim().is_empty() {
            self.user_agent = default_user_agent();
        }
        Ok(self)
    }
}

/// Load from an explicit path. Supports TOML or JSON.
pub fn load_config_from(path: &Path) -> Result<MonitorConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading monitor config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing monitor config {}", path.display()))
}

/// Resolve the config path and load it:
/// 1) `explicit` (CLI flag)
/// 2) $MONITOR_CONFIG_PATH
/// 3) config/monitor.toml
/// 4) config/monitor.json
pub fn load_config_default(explicit: Option<&Path>) -> Result<MonitorConfig> {
    if let Some(p) = explicit {
        return load_config_from(p);
    }
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        }
        bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
    }
    for candidate in ["config/monitor.toml", "config/monitor.json"] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return load_config_from(&p);
        }
    }
    Err(anyhow!(
        "no monitor config found (pass --config, set {ENV_CONFIG_PATH}, or add config/monitor.toml)"
    ))
}

fn parse_config(s: &str, hint_ext: &str) -> Result<MonitorConfig> {
    let parsed = match hint_ext {
        "toml" => toml::from_str::<MonitorConfig>(s).map_err(anyhow::Error::from),
        "json" => serde_json::from_str::<MonitorConfig>(s).map_err(anyhow::Error::from),
        _ => serde_json::from_str::<MonitorConfig>(s)
            .map_err(anyhow::Error::from)
            .or_else(|_| toml::from_str::<MonitorConfig>(s).map_err(anyhow::Error::from)),
    };
    parsed?.sanitize()
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|it| it.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}
