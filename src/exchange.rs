use crate::widget::{Speaker, Widget};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{Instrument, info_span, warn};

/// Reply shown when the endpoint's answer cannot be read.
pub const REPLY_FALLBACK: &str = "[error]";

/// Outbound body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message: String,
}

/// Reads `choices[0].message.content`, falling back to [`REPLY_FALLBACK`].
pub fn decode_reply(body: &Value) -> String {
    body.get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .filter(|content| !content.is_empty())
        .unwrap_or(REPLY_FALLBACK)
        .to_string()
}

/// Carries one chat message to the endpoint and hands back the raw JSON body.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, message: &ChatMessage) -> anyhow::Result<Value>;
}

/// Transport that posts to `{base}/chat` over HTTP.
#[derive(Clone)]
pub struct HttpChatTransport {
    endpoint: url::Url,
    client: reqwest::Client,
}

impl HttpChatTransport {
    pub fn new(base: &url::Url) -> anyhow::Result<Self> {
        let endpoint = base.join("/chat")?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("pounce-widget/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send(&self, message: &ChatMessage) -> anyhow::Result<Value> {
        // Status is not inspected: an error body without `choices` decodes to the fallback.
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(message)
            .send()
            .await?;
        Ok(resp.json::<Value>().await?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Input was blank; nothing was sent or logged.
    Ignored,
    Exchanged { reply: String },
}

impl Widget {
    /// Runs one message exchange for the current input.
    ///
    /// Transport and decode failures surface as a single [`REPLY_FALLBACK`] bot entry; the
    /// widget stays usable for the next submission.
    pub async fn submit(&mut self, transport: &dyn ChatTransport) -> Submission {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return Submission::Ignored;
        }
        self.log.push(Speaker::User, text.clone());
        self.input.clear();
        self.log.scroll_to_end();

        let span = info_span!("chat_exchange", chars = text.chars().count());
        let outcome = transport
            .send(&ChatMessage { message: text })
            .instrument(span)
            .await;
        let reply = match outcome {
            Ok(body) => decode_reply(&body),
            Err(err) => {
                warn!(?err, "chat exchange failed");
                REPLY_FALLBACK.to_string()
            }
        };
        self.log.push(Speaker::Bot, reply.clone());
        self.log.scroll_to_end();
        Submission::Exchanged { reply }
    }
}
