// src/notify/mod.rs
//! Outbound alert delivery.
//!
//! Channels are optional and configured from the environment. A run with no
//! channel configured logs that nothing was sent and carries on.

pub mod email;
pub mod slack;

use async_trait::async_trait;
use thiserror::Error;

pub use email::EmailNotifier;
pub use slack::SlackNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{channel} not configured: {detail}")]
    NotConfigured {
        channel: &'static str,
        detail: String,
    },
    #[error("{channel} message could not be built: {detail}")]
    Build {
        channel: &'static str,
        detail: String,
    },
    #[error("{channel} delivery failed: {detail}")]
    Transport {
        channel: &'static str,
        detail: String,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
    fn name(&self) -> &'static str;
}

/// Fans a message out to every configured channel.
#[derive(Default)]
pub struct NotifierMux {
    channels: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Email when the SMTP variables are complete, Slack when
    /// `SLACK_WEBHOOK_URL` is set.
    pub fn from_env() -> Self {
        let mut mux = Self::new();
        match EmailNotifier::from_env() {
            Ok(email) => mux.push(Box::new(email)),
            Err(e @ NotifyError::NotConfigured { .. }) => tracing::info!("{e}"),
            Err(e) => tracing::warn!(error = %e, "email channel disabled"),
        }
        if let Some(slack) = SlackNotifier::from_env() {
            mux.push(Box::new(slack));
        }
        mux
    }

    pub fn push(&mut self, channel: Box<dyn Notifier>) {
        self.channels.push(channel);
    }

    pub fn with(mut self, channel: Box<dyn Notifier>) -> Self {
        self.push(channel);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Best effort: returns true if at least one channel delivered.
    /// Failures are logged, never propagated.
    pub async fn dispatch(&self, subject: &str, body: &str) -> bool {
        if self.channels.is_empty() {
            tracing::warn!("no notification channel configured; alert not sent");
            return false;
        }
        let mut delivered = 0usize;
        for ch in &self.channels {
            match ch.send(subject, body).await {
                Ok(()) => {
                    tracing::info!(channel = ch.name(), "alert delivered");
                    delivered += 1;
                }
                Err(e) => tracing::warn!(channel = ch.name(), error = %e, "alert not delivered"),
            }
        }
        delivered > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Counting {
        async fn send(&self, _subject: &str, _body: &str) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NotifyError::Transport {
                    channel: "test",
                    detail: "boom".into(),
                })
            } else {
                Ok(())
            }
        }
        fn name(&self) -> &'static str {
            "test"
        }
    }

    #[tokio::test]
    async fn empty_mux_reports_not_sent() {
        assert!(!NotifierMux::new().dispatch("s", "b").await);
    }

    #[tokio::test]
    async fn one_success_is_enough() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mux = NotifierMux::new()
            .with(Box::new(Counting {
                calls: calls.clone(),
                fail: true,
            }))
            .with(Box::new(Counting {
                calls: calls.clone(),
                fail: false,
            }));
        assert!(mux.dispatch("s", "b").await);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn all_failing_is_not_sent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mux = NotifierMux::new().with(Box::new(Counting {
            calls: calls.clone(),
            fail: true,
        }));
        assert!(!mux.dispatch("s", "b").await);
    }
}
