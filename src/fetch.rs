// src/fetch.rs
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_USER_AGENT: &str = concat!("change-monitor/", env!("CARGO_PKG_VERSION"));

/// Anything that stops us from getting a 2xx body. The engine only carries
/// the message through to the report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP status {status}")]
    Status { status: u16 },
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("client setup failed: {0}")]
    Client(String),
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Raw body of `url`, or why it could not be retrieved.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed fetcher with a fixed user agent and per-request timeout.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else if let Some(status) = e.status() {
            FetchError::Status {
                status: status.as_u16(),
            }
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?
            .error_for_status()
            .map_err(|e| self.classify(e))?;
        resp.text().await.map_err(|e| self.classify(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One-shot HTTP server on loopback: reads the request, waits `delay`,
    /// writes `response` verbatim and closes.
    async fn serve_once(response: &'static str, delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = sock.read(&mut buf).await;
            tokio::time::sleep(delay).await;
            let _ = sock.write_all(response.as_bytes()).await;
            let _ = sock.shutdown().await;
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn non_success_status_is_status_error() {
        let url = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            Duration::ZERO,
        )
        .await;
        let f = HttpFetcher::new(DEFAULT_USER_AGENT, Duration::from_secs(5)).unwrap();
        assert_eq!(f.fetch(&url).await, Err(FetchError::Status { status: 503 }));
    }

    #[tokio::test]
    async fn slow_server_hits_client_timeout() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nhi",
            Duration::from_secs(3),
        )
        .await;
        let f = HttpFetcher::new(DEFAULT_USER_AGENT, Duration::from_secs(1)).unwrap();
        assert_eq!(f.fetch(&url).await, Err(FetchError::Timeout { secs: 1 }));
    }

    #[tokio::test]
    async fn success_returns_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 2\r\nConnection: close\r\n\r\nhi",
            Duration::ZERO,
        )
        .await;
        let f = HttpFetcher::new(DEFAULT_USER_AGENT, Duration::from_secs(5)).unwrap();
        assert_eq!(f.fetch(&url).await.as_deref(), Ok("hi"));
    }

    #[test]
    fn messages_are_readable() {
        assert_eq!(FetchError::Status { status: 503 }.to_string(), "HTTP status 503");
        assert_eq!(FetchError::Timeout { secs: 20 }.to_string(), "timed out after 20s");
    }

    #[test]
    fn client_builds_with_defaults() {
        let f = HttpFetcher::new(DEFAULT_USER_AGENT, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .unwrap();
        assert_eq!(f.timeout(), Duration::from_secs(20));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let f = HttpFetcher::new(DEFAULT_USER_AGENT, Duration::from_secs(2)).unwrap();
        // Port 9 on loopback: nothing listens there in CI.
        let err = f.fetch("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_) | FetchError::Timeout { .. }));
    }
}
