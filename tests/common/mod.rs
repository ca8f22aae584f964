// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use change_monitor::normalize::Normalizer;
use change_monitor::{FetchError, Fetcher, Notifier, NotifyError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Scripted fetcher: url → body or error. Unknown urls 404.
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: Mutex<HashMap<String, Result<String, FetchError>>>,
    pub calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn ok(&self, url: &str, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(body.to_string()));
    }

    pub fn fail(&self, url: &str, err: FetchError) {
        self.pages.lock().unwrap().insert(url.to_string(), Err(err));
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or(Err(FetchError::Status { status: 404 }))
    }
}

/// Passes bodies through untouched.
pub struct Identity;

impl Normalizer for Identity {
    fn extract_text(&self, raw: &str) -> String {
        raw.to_string()
    }
}

/// Records every message; optionally fails.
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
    pub attempts: Arc<AtomicUsize>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn new(fail: bool) -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            attempts: Arc::new(AtomicUsize::new(0)),
            fail,
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NotifyError::Transport {
                channel: "recording",
                detail: "smtp down".into(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
