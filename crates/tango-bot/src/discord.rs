//! Discord REST adapter: the [`ChatPort`] implementation.

use async_trait::async_trait;
use reqwest::StatusCode;
use tango_core::{ChannelId, ChatError, ChatPort, MessageId};

/// Base URL for the Discord REST API.
pub const API_BASE: &str = "https://discord.com/api/v10";

/// Thin [`ChatPort`] wrapper around the Discord REST API.
pub struct DiscordRest {
    http: reqwest::Client,
    auth: String,
    base: String,
}

impl DiscordRest {
    /// Create a client for the public API.
    #[must_use]
    pub fn new(bot_token: &str) -> Self {
        Self::with_base(bot_token, API_BASE)
    }

    /// Create a client against an alternate base URL.
    #[must_use]
    pub fn with_base(bot_token: &str, base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth: format!("Bot {bot_token}"),
            base: base.into(),
        }
    }

    async fn get(&self, path: &str, kind: &'static str) -> Result<reqwest::Response, ChatError> {
        let response = self
            .http
            .get(format!("{}{path}", self.base))
            .header("Authorization", &self.auth)
            .send()
            .await
            .map_err(|e| ChatError::Http(e.to_string()))?;
        check_status(response, kind).await
    }

    async fn post_message(
        &self,
        channel: ChannelId,
        body: &serde_json::Value,
    ) -> Result<MessageId, ChatError> {
        let response = self
            .http
            .post(format!("{}/channels/{channel}/messages", self.base))
            .header("Authorization", &self.auth)
            .json(body)
            .send()
            .await
            .map_err(|e| ChatError::Http(e.to_string()))?;
        let response = check_status(response, "channel").await?;
        let created: CreatedMessage = response
            .json()
            .await
            .map_err(|e| ChatError::Malformed(e.to_string()))?;
        created
            .id
            .parse()
            .map(MessageId)
            .map_err(|_| ChatError::Malformed(format!("non-numeric message id {}", created.id)))
    }
}

/// Map 404/403 to `NotFound` and other non-success statuses to `Api`.
async fn check_status(
    response: reqwest::Response,
    kind: &'static str,
) -> Result<reqwest::Response, ChatError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
        return Err(ChatError::NotFound(kind));
    }
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(ChatError::Api {
            status: status.as_u16(),
            detail,
        });
    }
    Ok(response)
}

#[derive(serde::Deserialize)]
struct CreatedMessage {
    id: String,
}

fn send_body(content: &str) -> serde_json::Value {
    serde_json::json!({ "content": content })
}

fn reply_body(content: &str, reference: MessageId) -> serde_json::Value {
    serde_json::json!({
        "content": content,
        "message_reference": {
            "message_id": reference.to_string(),
            "fail_if_not_exists": false,
        },
    })
}

#[async_trait]
impl ChatPort for DiscordRest {
    async fn resolve_channel(&self, channel: ChannelId) -> Result<(), ChatError> {
        self.get(&format!("/channels/{channel}"), "channel").await?;
        Ok(())
    }

    async fn resolve_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), ChatError> {
        self.get(&format!("/channels/{channel}/messages/{message}"), "message")
            .await?;
        Ok(())
    }

    async fn reply(
        &self,
        channel: ChannelId,
        message: MessageId,
        text: &str,
    ) -> Result<MessageId, ChatError> {
        self.post_message(channel, &reply_body(text, message)).await
    }

    async fn send(&self, channel: ChannelId, text: &str) -> Result<MessageId, ChatError> {
        self.post_message(channel, &send_body(text)).await
    }
}
