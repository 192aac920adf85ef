use crate::config::UpstreamConfig;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{Instrument, info, warn};

/// Produces a completion-shaped reply for one user message.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, message: &str) -> anyhow::Result<Value>;
}

/// Stub backend that echoes the message back in completion shape.
#[derive(Clone, Default)]
pub struct StubChatBackend;

#[async_trait]
impl ChatBackend for StubChatBackend {
    async fn complete(&self, message: &str) -> anyhow::Result<Value> {
        Ok(json!({
            "object": "chat.completion",
            "model": "stub",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": format!("You said: {message}")},
                "finish_reason": "stop"
            }]
        }))
    }
}

/// Backend for any OpenAI-compatible `/v1/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiChatBackend {
    cfg: UpstreamConfig,
    client: reqwest::Client,
}

impl OpenAiChatBackend {
    pub fn new(cfg: UpstreamConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(cfg.timeout).build()?;
        Ok(Self { cfg, client })
    }

    fn request_body(&self, message: &str) -> Value {
        json!({
            "model": self.cfg.model,
            "messages": [
                {"role": "system", "content": self.cfg.system_prompt},
                {"role": "user", "content": message},
            ],
        })
    }
}

#[async_trait]
impl ChatBackend for OpenAiChatBackend {
    async fn complete(&self, message: &str) -> anyhow::Result<Value> {
        let url = self.cfg.base_url.join("/v1/chat/completions")?;
        let body = self.request_body(message);
        let mut last_err = None;
        for attempt in 0..=self.cfg.retries {
            let mut request = self.client.post(url.clone()).json(&body);
            if let Some(token) = &self.cfg.api_key {
                request = request.bearer_auth(token);
            }
            match request.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp.json::<Value>().await?);
                    }
                    let detail = resp.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!(
                        "chat upstream status {} on attempt {}: {}",
                        status,
                        attempt + 1,
                        detail.chars().take(120).collect::<String>()
                    ));
                }
                Err(err) => {
                    last_err = Some(anyhow::anyhow!(
                        "chat upstream request failed on attempt {}: {err}",
                        attempt + 1
                    ));
                }
            }

            if attempt < self.cfg.retries {
                sleep(backoff_delay(self.cfg.backoff_base, attempt)).await;
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("chat upstream request failed")))
    }
}

/// Linear backoff before retry `attempt + 1`; saturates instead of overflowing.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt.saturating_add(1))
}

/// Front door for the `/chat` route; logs and forwards to the configured backend.
#[derive(Clone)]
pub struct ChatRelay {
    backend: Arc<dyn ChatBackend>,
}

impl ChatRelay {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    pub async fn relay(&self, message: &str) -> anyhow::Result<Value> {
        let span = tracing::info_span!("chat_relay", chars = message.chars().count());
        match self.backend.complete(message).instrument(span).await {
            Ok(reply) => Ok(reply),
            Err(err) => {
                warn!(?err, "chat backend call failed");
                Err(err)
            }
        }
    }
}

/// Picks the upstream backend when one is configured, otherwise the stub.
pub fn chat_backend_from_config(upstream: Option<&UpstreamConfig>) -> Arc<dyn ChatBackend> {
    let Some(cfg) = upstream else {
        info!("no chat upstream configured; using stub chat backend");
        return Arc::new(StubChatBackend);
    };
    match OpenAiChatBackend::new(cfg.clone()) {
        Ok(backend) => {
            info!(base_url = %cfg.base_url, model = %cfg.model, "using OpenAI-compatible chat backend");
            Arc::new(backend)
        }
        Err(err) => {
            warn!(?err, "configured chat upstream but failed to init HTTP backend; using stub");
            Arc::new(StubChatBackend)
        }
    }
}
