use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};
use std::time::Duration;

use super::{Notifier, NotifyError};

const CHANNEL: &str = "email";
const DEFAULT_SMTP_PORT: u16 = 465;
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// SMTP over implicit TLS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
    pub to: String,
}

impl SmtpSettings {
    /// Reads `SMTP_SERVER`, `SMTP_PORT`, `SMTP_USER`, `SMTP_PASS`, `ALERT_TO`
    /// and optional `ALERT_FROM` (defaults to the SMTP user).
    pub fn from_env() -> Result<Self, NotifyError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, NotifyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let missing: Vec<&str> = ["SMTP_SERVER", "SMTP_USER", "SMTP_PASS", "ALERT_TO"]
            .into_iter()
            .filter(|&k| get(k).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(NotifyError::NotConfigured {
                channel: CHANNEL,
                detail: format!("missing {}", missing.join(", ")),
            });
        }

        let port = match get("SMTP_PORT") {
            None => DEFAULT_SMTP_PORT,
            Some(p) => p.parse().map_err(|_| NotifyError::NotConfigured {
                channel: CHANNEL,
                detail: format!("invalid SMTP_PORT {p:?}"),
            })?,
        };

        let user = get("SMTP_USER").unwrap_or_default();
        Ok(Self {
            server: get("SMTP_SERVER").unwrap_or_default(),
            port,
            from: get("ALERT_FROM").unwrap_or_else(|| user.clone()),
            user,
            pass: get("SMTP_PASS").unwrap_or_default(),
            to: get("ALERT_TO").unwrap_or_default(),
        })
    }
}

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    pub fn from_env() -> Result<Self, NotifyError> {
        Self::new(&SmtpSettings::from_env()?)
    }

    pub fn new(s: &SmtpSettings) -> Result<Self, NotifyError> {
        let build_err = |detail: String| NotifyError::Build {
            channel: CHANNEL,
            detail,
        };

        let creds = Credentials::new(s.user.clone(), s.pass.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&s.server)
            .map_err(|e| build_err(format!("invalid SMTP_SERVER: {e}")))?
            .port(s.port)
            .timeout(Some(SMTP_TIMEOUT))
            .credentials(creds)
            .build();

        let from = s
            .from
            .parse::<Mailbox>()
            .map_err(|e| build_err(format!("invalid sender {:?}: {e}", s.from)))?;
        let to = s
            .to
            .parse::<Mailbox>()
            .map_err(|e| build_err(format!("invalid ALERT_TO {:?}: {e}", s.to)))?;

        Ok(Self { mailer, from, to })
    }

    fn message(&self, subject: &str, body: &str) -> Result<Message, NotifyError> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotifyError::Build {
                channel: CHANNEL,
                detail: e.to_string(),
            })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let msg = self.message(subject, body)?;
        self.mailer
            .send(msg)
            .await
            .map_err(|e| NotifyError::Transport {
                channel: CHANNEL,
                detail: e.to_string(),
            })?;
        tracing::info!(to = %self.to, "email sent");
        Ok(())
    }

    fn name(&self) -> &'static str {
        CHANNEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| m.get(k).cloned()
    }

    #[test]
    fn missing_vars_are_listed() {
        let err = SmtpSettings::from_lookup(lookup(&[("SMTP_SERVER", "smtp.test")])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("SMTP_USER"));
        assert!(msg.contains("SMTP_PASS"));
        assert!(msg.contains("ALERT_TO"));
        assert!(!msg.contains("SMTP_SERVER"));
    }

    #[test]
    fn defaults_port_and_sender() {
        let s = SmtpSettings::from_lookup(lookup(&[
            ("SMTP_SERVER", "smtp.test"),
            ("SMTP_USER", "bot@test.org"),
            ("SMTP_PASS", "secret"),
            ("ALERT_TO", "ops@test.org"),
        ]))
        .unwrap();
        assert_eq!(s.port, 465);
        assert_eq!(s.from, "bot@test.org");
    }

    #[test]
    fn bad_port_is_rejected() {
        let r = SmtpSettings::from_lookup(lookup(&[
            ("SMTP_SERVER", "smtp.test"),
            ("SMTP_PORT", "smtp"),
            ("SMTP_USER", "bot@test.org"),
            ("SMTP_PASS", "secret"),
            ("ALERT_TO", "ops@test.org"),
        ]));
        assert!(matches!(r, Err(NotifyError::NotConfigured { .. })));
    }

    #[tokio::test]
    async fn builds_plain_text_message() {
        let s = SmtpSettings {
            server: "smtp.test".into(),
            port: 465,
            user: "bot@test.org".into(),
            pass: "x".into(),
            from: "bot@test.org".into(),
            to: "ops@test.org".into(),
        };
        let n = EmailNotifier::new(&s).unwrap();
        let msg = n.message("[Monitor] 1 alert(s) - review", "URL: x").unwrap();
        let raw = String::from_utf8(msg.formatted()).unwrap();
        assert!(raw.contains("Subject: [Monitor] 1 alert(s) - review"));
        assert!(raw.contains("To: ops@test.org"));
    }
}
