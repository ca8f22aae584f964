use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{Notifier, NotifyError};

const CHANNEL: &str = "slack";

/// Incoming-webhook poster. Slack caps message text, so long bodies are cut.
pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
    timeout: Duration,
}

const MAX_TEXT_CHARS: usize = 35_000;

impl SlackNotifier {
    pub fn from_env() -> Option<Self> {
        std::env::var("SLACK_WEBHOOK_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(Self::new)
    }

    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    fn payload(subject: &str, body: &str) -> serde_json::Value {
        let text = format!("*{subject}*\n```\n{body}\n```");
        let text = crate::store::truncate_chars(&text, MAX_TEXT_CHARS);
        serde_json::json!({ "text": text })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let transport = |detail: String| NotifyError::Transport {
            channel: CHANNEL,
            detail,
        };
        self.client
            .post(&self.webhook_url)
            .timeout(self.timeout)
            .json(&Self::payload(subject, body))
            .send()
            .await
            .map_err(|e| transport(format!("slack post: {e}")))?
            .error_for_status()
            .map_err(|e| transport(format!("slack non-2xx: {e}")))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        CHANNEL
    }
}
