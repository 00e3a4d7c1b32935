//! Chat, message and button types shared by the renderer and transports

use crate::payload::ButtonPayload;
use crate::route::Key;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat identifier assigned by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message identifier, unique within a chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a rendered message. Only messages of the same kind can be
/// edited into one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Photo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    #[serde(rename = "MarkdownV2")]
    MarkdownV2,
    #[serde(rename = "HTML")]
    Html,
}

/// Inline button with its callback payload
#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub text: String,
    pub payload: ButtonPayload,
}

impl Button {
    pub fn new(text: impl Into<String>, payload: ButtonPayload) -> Self {
        Self {
            text: text.into(),
            payload,
        }
    }

    /// Button that opens `route`
    pub fn route(route: impl Key, text: impl Into<String>) -> Self {
        Self::new(text, ButtonPayload::route(route))
    }

    /// Button that fires `action` of `route`
    pub fn action(route: impl Key, action: impl Key, text: impl Into<String>) -> Self {
        Self::new(text, ButtonPayload::action(route, action))
    }

    /// Universal go-back button
    pub fn back(text: impl Into<String>) -> Self {
        Self::new(text, ButtonPayload::back())
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.payload = self.payload.with_field(key, value);
        self
    }
}

/// A message the handler wants displayed
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSpec {
    pub kind: MessageKind,
    /// Message text, or the caption of a photo
    pub text: String,
    /// Photo file id or URL; required for [`MessageKind::Photo`]
    pub media: Option<String>,
    pub inline_keyboard: Vec<Vec<Button>>,
    /// Custom reply keyboard rows. Transports cannot edit these in place.
    pub reply_keyboard: Option<Vec<Vec<String>>>,
    pub parse_mode: Option<ParseMode>,
    pub disable_link_preview: bool,
}

impl MessageSpec {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Text,
            text: text.into(),
            media: None,
            inline_keyboard: Vec::new(),
            reply_keyboard: None,
            parse_mode: None,
            disable_link_preview: false,
        }
    }

    pub fn photo(media: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Photo,
            media: Some(media.into()),
            ..Self::text(caption)
        }
    }

    pub fn with_buttons(mut self, rows: Vec<Vec<Button>>) -> Self {
        self.inline_keyboard = rows;
        self
    }

    pub fn with_reply_keyboard(mut self, rows: Vec<Vec<String>>) -> Self {
        self.reply_keyboard = Some(rows);
        self
    }

    pub fn with_parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    pub fn without_link_preview(mut self) -> Self {
        self.disable_link_preview = true;
        self
    }
}

/// Entry of the rendered-message cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedMessage {
    pub id: MessageId,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}
