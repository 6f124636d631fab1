//! Bot API transport over blocking HTTP long polling.

use crate::error::{RelayError, Result};
use crate::types::{
    ChannelPost, ChatKind, ChatMessage, Cursor, MessageId, SourceId, SubscriberId, Update,
    UpdateId, UpdatePayload,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{ParseMode, SendOptions, Transport};

const API_BASE: &str = "https://api.telegram.org";

/// Headroom added to the HTTP read timeout on top of the long-poll timeout,
/// so the client never gives up on a poll the server is still holding open.
const READ_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// [`Transport`] implementation against the Bot API.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport for the given API token. `poll_timeout` is the
    /// long-poll timeout the loop will pass to `fetch_updates`; the HTTP
    /// read timeout is derived from it.
    pub fn new(token: &str, poll_timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(poll_timeout + READ_TIMEOUT_MARGIN)
            .build()
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", API_BASE, token),
        })
    }

    fn call<T: DeserializeOwned>(&self, method: &str, params: &serde_json::Value) -> Result<T> {
        let url = format!("{}/{}", self.base_url, method);

        let response = self
            .client
            .post(&url)
            .json(params)
            .send()
            .map_err(|e| RelayError::Transport(format!("{}: {}", method, e)))?;

        let envelope: ApiResponse<T> = response
            .json()
            .map_err(|e| RelayError::Transport(format!("{}: invalid response: {}", method, e)))?;

        if !envelope.ok {
            let description = envelope
                .description
                .unwrap_or_else(|| "unknown API error".to_string());
            return Err(RelayError::Transport(format!("{}: {}", method, description)));
        }

        envelope
            .result
            .ok_or_else(|| RelayError::Transport(format!("{}: missing result", method)))
    }
}

impl Transport for HttpTransport {
    fn fetch_updates(&self, cursor: Cursor, timeout: Duration) -> Result<Vec<Update>> {
        let mut params = json!({ "timeout": timeout.as_secs() });
        if let Some(offset) = cursor.position() {
            params["offset"] = json!(offset.0);
        }

        let raw: Vec<RawUpdate> = self.call("getUpdates", &params)?;
        Ok(raw.into_iter().map(RawUpdate::into_update).collect())
    }

    fn forward_message(&self, to: SubscriberId, from: SourceId, message: MessageId) -> Result<()> {
        let params = json!({
            "chat_id": to.0,
            "from_chat_id": from.0,
            "message_id": message.0,
        });
        let _: serde_json::Value = self.call("forwardMessage", &params)?;
        Ok(())
    }

    fn send_message(&self, to: SubscriberId, text: &str, options: SendOptions) -> Result<()> {
        let mut params = json!({
            "chat_id": to.0,
            "text": text,
            "disable_web_page_preview": !options.link_preview,
        });
        if options.parse_mode == ParseMode::Markdown {
            params["parse_mode"] = json!("Markdown");
        }
        let _: serde_json::Value = self.call("sendMessage", &params)?;
        Ok(())
    }
}

// --- Wire format ---

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct RawUpdate {
    update_id: i64,
    message: Option<RawMessage>,
    channel_post: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    message_id: i64,
    chat: RawChat,
    text: Option<String>,
    caption: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawChat {
    id: i64,
    #[serde(rename = "type")]
    kind: String,
}

impl RawUpdate {
    fn into_update(self) -> Update {
        let payload = if let Some(post) = self.channel_post {
            UpdatePayload::Post(ChannelPost {
                source: SourceId(post.chat.id),
                message_id: MessageId(post.message_id),
                text: post.text,
                caption: post.caption,
            })
        } else if let Some(message) = self.message {
            UpdatePayload::Message(ChatMessage {
                chat: SubscriberId(message.chat.id),
                kind: chat_kind(&message.chat.kind),
                text: message.text,
            })
        } else {
            UpdatePayload::Other
        };

        Update {
            id: UpdateId(self.update_id),
            payload,
        }
    }
}

fn chat_kind(raw: &str) -> ChatKind {
    match raw {
        "private" => ChatKind::Private,
        "group" | "supergroup" => ChatKind::Group,
        "channel" => ChatKind::Channel,
        _ => ChatKind::Other,
    }
}
