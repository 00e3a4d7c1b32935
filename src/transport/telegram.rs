//! Telegram Bot API adapter

use super::{
    ChatTransport, EditOutcome, OutgoingMessage, ReplyMarkup, TransportError, TransportErrorKind,
};
use crate::message::{ChatId, MessageId, MessageKind};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Bot API client
pub struct TelegramTransport {
    client: Client,
    base_url: String,
}

impl TelegramTransport {
    pub fn new(token: &str) -> Result<Self, TransportError> {
        Self::with_api_url(token, DEFAULT_API_URL)
    }

    /// Point at a self-hosted Bot API server
    pub fn with_api_url(token: &str, api_url: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TransportError::unknown(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{token}", api_url.trim_end_matches('/')),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, TransportError> {
        let response = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    TransportError::network(format!("Connection failed: {e}"))
                } else {
                    TransportError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::network(format!("Failed to read response: {e}")))?;

        parse_response(method, status, &text)
    }
}

// ============================================================================
// Request building
// ============================================================================

fn markup_json(markup: &ReplyMarkup) -> Value {
    match markup {
        ReplyMarkup::Inline(rows) => json!({
            "inline_keyboard": rows
                .iter()
                .map(|row| row
                    .iter()
                    .map(|b| json!({ "text": b.text, "callback_data": b.callback_data }))
                    .collect::<Vec<_>>())
                .collect::<Vec<_>>()
        }),
        ReplyMarkup::Keyboard(rows) => json!({
            "keyboard": rows
                .iter()
                .map(|row| row.iter().map(|text| json!({ "text": text })).collect::<Vec<_>>())
                .collect::<Vec<_>>(),
            "resize_keyboard": true
        }),
        ReplyMarkup::RemoveKeyboard => json!({ "remove_keyboard": true }),
    }
}

fn common_fields(body: &mut Map<String, Value>, message: &OutgoingMessage) {
    if let Some(mode) = message.parse_mode {
        body.insert("parse_mode".to_string(), json!(mode));
    }
}

/// Method name and JSON body for sending `message`
pub(crate) fn send_request(chat: ChatId, message: &OutgoingMessage) -> (&'static str, Value) {
    let mut body = Map::new();
    body.insert("chat_id".to_string(), json!(chat));
    let method = match message.kind {
        MessageKind::Text => {
            body.insert("text".to_string(), json!(message.text));
            if message.disable_link_preview {
                body.insert(
                    "link_preview_options".to_string(),
                    json!({ "is_disabled": true }),
                );
            }
            "sendMessage"
        }
        MessageKind::Photo => {
            body.insert("photo".to_string(), json!(message.media));
            body.insert("caption".to_string(), json!(message.text));
            "sendPhoto"
        }
    };
    common_fields(&mut body, message);
    if let Some(markup) = &message.markup {
        body.insert("reply_markup".to_string(), markup_json(markup));
    }
    (method, Value::Object(body))
}

/// Method name and JSON body for editing message `id` into `message`
pub(crate) fn edit_request(
    chat: ChatId,
    id: MessageId,
    message: &OutgoingMessage,
) -> (&'static str, Value) {
    let mut body = Map::new();
    body.insert("chat_id".to_string(), json!(chat));
    body.insert("message_id".to_string(), json!(id));
    let method = match message.kind {
        MessageKind::Text => {
            body.insert("text".to_string(), json!(message.text));
            if message.disable_link_preview {
                body.insert(
                    "link_preview_options".to_string(),
                    json!({ "is_disabled": true }),
                );
            }
            "editMessageText"
        }
        MessageKind::Photo => {
            body.insert("caption".to_string(), json!(message.text));
            "editMessageCaption"
        }
    };
    common_fields(&mut body, message);
    body.insert(
        "reply_markup".to_string(),
        markup_json(&ReplyMarkup::Inline(message.inline_rows().to_vec())),
    );
    (method, Value::Object(body))
}

// ============================================================================
// Response parsing
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

pub(crate) fn classify_error(status: u16, description: &str) -> TransportError {
    let lower = description.to_lowercase();
    let message = format!("Telegram API error {status}: {description}");
    match status {
        429 => TransportError::rate_limited(message),
        400 if lower.contains("message is not modified") => TransportError::not_modified(message),
        400 if lower.contains("not found") => TransportError::not_found(message),
        400 | 403 => TransportError::rejected(message),
        500..=599 => TransportError::network(message),
        _ => TransportError::unknown(message),
    }
}

pub(crate) fn parse_response<T: DeserializeOwned>(
    method: &str,
    status: u16,
    body: &str,
) -> Result<T, TransportError> {
    let parsed: ApiResponse<T> = serde_json::from_str(body).map_err(|e| {
        TransportError::unknown(format!("Failed to parse {method} response: {e} - body: {body}"))
    })?;

    if !parsed.ok {
        let code = parsed.error_code.unwrap_or(status);
        return Err(classify_error(code, parsed.description.as_deref().unwrap_or_default()));
    }

    parsed
        .result
        .ok_or_else(|| TransportError::unknown(format!("{method} returned no result")))
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_message(
        &self,
        chat: ChatId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, TransportError> {
        let (method, body) = send_request(chat, message);
        let sent: SentMessage = self.call(method, &body).await?;
        Ok(MessageId(sent.message_id))
    }

    async fn edit_message_text(
        &self,
        chat: ChatId,
        id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<EditOutcome, TransportError> {
        let (method, body) = edit_request(chat, id, message);
        // Result is the edited message, or `true` for inline messages
        match self.call::<Value>(method, &body).await {
            Ok(_) => Ok(EditOutcome::Edited),
            Err(e) if e.kind == TransportErrorKind::NotModified => Ok(EditOutcome::Unchanged),
            Err(e) => Err(e),
        }
    }

    async fn delete_message(&self, chat: ChatId, id: MessageId) -> Result<bool, TransportError> {
        let body = json!({ "chat_id": chat, "message_id": id });
        match self.call::<bool>("deleteMessage", &body).await {
            Ok(deleted) => Ok(deleted),
            Err(e) if matches!(e.kind, TransportErrorKind::NotFound | TransportErrorKind::Rejected) => {
                tracing::debug!(chat_id = %chat, message_id = %id, error = %e, "Message not deleted");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: &str,
        alert: bool,
    ) -> Result<(), TransportError> {
        let body = json!({
            "callback_query_id": callback_id,
            "text": text,
            "show_alert": alert,
        });
        self.call::<bool>("answerCallbackQuery", &body).await.map(|_| ())
    }
}
