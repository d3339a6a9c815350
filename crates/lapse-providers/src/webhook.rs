//! Chat webhook notifications

use async_trait::async_trait;
use lapse_api::Instruction;
use lapse_cloud_api::{ActionExecutor, CloudError, CloudResult};
use lapse_util::RateLimiter;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Timeout for a single webhook POST
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Shortest pause between rate-limit checks
const MIN_THROTTLE_WAIT: Duration = Duration::from_millis(10);

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

/// Posts `Notify` instructions to a chat webhook.
///
/// Every other instruction is handed to the inner executor, so a notifier
/// wraps whatever actually stops and tags instances. Posts are throttled
/// per channel.
pub struct WebhookNotifier {
    client: Client,
    url: String,
    limiter: Mutex<RateLimiter>,
    inner: Arc<dyn ActionExecutor>,
}

impl WebhookNotifier {
    pub fn new(
        url: impl Into<String>,
        max_messages_per_second: u32,
        inner: Arc<dyn ActionExecutor>,
    ) -> CloudResult<Self> {
        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .connect_timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| CloudError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            limiter: Mutex::new(RateLimiter::new(
                max_messages_per_second.max(1),
                Duration::from_secs(1),
            )),
            inner,
        })
    }

    async fn throttle(&self, channel: &str) {
        loop {
            let wait = {
                let mut limiter = self.limiter.lock().await;
                if limiter.check(channel) {
                    return;
                }
                limiter.wait_time(channel)
            };
            debug!(channel, wait_ms = wait.as_millis() as u64, "Webhook throttled");
            tokio::time::sleep(wait.max(MIN_THROTTLE_WAIT)).await;
        }
    }

    async fn post(&self, channel: &str, text: &str) -> CloudResult<()> {
        self.throttle(channel).await;

        let response = self
            .client
            .post(&self.url)
            .json(&WebhookMessage { channel, text })
            .send()
            .await
            .map_err(|e| CloudError::ActionFailed(format!("webhook request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(channel, status = %status, "Webhook rejected message");
            return Err(CloudError::ActionFailed(format!(
                "webhook returned {}",
                status
            )));
        }

        debug!(channel, "Webhook message delivered");
        Ok(())
    }
}

#[async_trait]
impl ActionExecutor for WebhookNotifier {
    async fn execute(&self, instruction: &Instruction) -> CloudResult<()> {
        match instruction {
            Instruction::Notify {
                channel, message, ..
            } => self.post(channel, message).await,
            other => self.inner.execute(other).await,
        }
    }

    async fn announce(&self, channel: &str, message: &str) -> CloudResult<()> {
        self.post(channel, message).await
    }

    fn is_dry_run(&self) -> bool {
        self.inner.is_dry_run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapse_cloud_api::MockExecutor;
    use lapse_util::InstanceId;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accept one HTTP request, answer with `status`, and return the body
    async fn serve_once(listener: TcpListener, status: &'static str) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let body = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before full request");
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            let Some(split) = text.find("\r\n\r\n") else {
                continue;
            };
            let length = text[..split]
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            let body = &text[split + 4..];
            if body.len() >= length {
                break body.to_string();
            }
        };

        let response = format!("HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n", status);
        socket.write_all(response.as_bytes()).await.unwrap();
        body
    }

    fn notify() -> Instruction {
        Instruction::Notify {
            instance_id: InstanceId::new("i-1"),
            channel: "#ops".into(),
            message: "i-1: will be stopped".into(),
        }
    }

    #[tokio::test]
    async fn posts_channel_and_text() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        let server = tokio::spawn(serve_once(listener, "200 OK"));

        let inner = Arc::new(MockExecutor::new());
        let notifier = WebhookNotifier::new(url, 1, inner.clone()).unwrap();
        notifier.execute(&notify()).await.unwrap();

        let body: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(body["channel"], "#ops");
        assert_eq!(body["text"], "i-1: will be stopped");
        assert!(inner.executed().is_empty());
    }

    #[tokio::test]
    async fn error_status_fails_instruction() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        let server = tokio::spawn(serve_once(listener, "500 Internal Server Error"));

        let notifier = WebhookNotifier::new(url, 1, Arc::new(MockExecutor::new())).unwrap();
        let result = notifier.execute(&notify()).await;
        server.await.unwrap();

        assert!(matches!(result, Err(CloudError::ActionFailed(msg)) if msg.contains("500")));
    }

    #[tokio::test]
    async fn announcements_are_posted() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        let server = tokio::spawn(serve_once(listener, "200 OK"));

        let inner = Arc::new(MockExecutor::new());
        let notifier = WebhookNotifier::new(url, 1, inner.clone()).unwrap();
        notifier.announce("#ops", "run failed").await.unwrap();

        let body: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(body["channel"], "#ops");
        assert_eq!(body["text"], "run failed");
        assert!(inner.announcements().is_empty());
    }

    #[tokio::test]
    async fn other_instructions_go_to_inner_executor() {
        let inner = Arc::new(MockExecutor::dry_run());
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/unused", 1, inner.clone()).unwrap();

        let stop = Instruction::Stop {
            instance_id: InstanceId::new("i-1"),
        };
        notifier.execute(&stop).await.unwrap();

        assert_eq!(inner.executed(), vec![stop]);
        assert!(notifier.is_dry_run());
    }
}
