//! Inbound updates as seen by the dispatcher

use crate::message::{ChatId, MessageId};
use serde::{Deserialize, Serialize};

/// Who sent an update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub user_id: i64,
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: MessageId,
    pub text: String,
}

/// Button press
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    /// Message carrying the pressed button, if still known
    pub message_id: Option<MessageId>,
    /// Raw callback data
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateKind {
    Command(IncomingMessage),
    Message(IncomingMessage),
    Callback(CallbackQuery),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub chat_id: ChatId,
    pub from: Option<Sender>,
    pub kind: UpdateKind,
}

impl Update {
    /// Text message; text starting with `/` becomes a command
    pub fn message(chat_id: ChatId, id: MessageId, text: impl Into<String>) -> Self {
        let message = IncomingMessage {
            id,
            text: text.into(),
        };
        let kind = if message.text.starts_with('/') {
            UpdateKind::Command(message)
        } else {
            UpdateKind::Message(message)
        };
        Self {
            chat_id,
            from: None,
            kind,
        }
    }

    pub fn callback(chat_id: ChatId, id: impl Into<String>, data: Option<String>) -> Self {
        Self {
            chat_id,
            from: None,
            kind: UpdateKind::Callback(CallbackQuery {
                id: id.into(),
                message_id: None,
                data,
            }),
        }
    }

    pub fn with_sender(mut self, sender: Sender) -> Self {
        self.from = Some(sender);
        self
    }

    /// Message or command text
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            UpdateKind::Command(m) | UpdateKind::Message(m) => Some(&m.text),
            UpdateKind::Callback(_) => None,
        }
    }

    pub fn language_code(&self) -> Option<&str> {
        self.from.as_ref()?.language_code.as_deref()
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            UpdateKind::Command(_) => "command",
            UpdateKind::Message(_) => "message",
            UpdateKind::Callback(_) => "callback",
        }
    }
}

/// Command word of `/cmd@botname args`, without the slash and suffix
pub fn command_word(text: &str) -> Option<&str> {
    let rest = text.strip_prefix('/')?;
    let token = rest.split_whitespace().next().unwrap_or_default();
    let word = token.split('@').next().unwrap_or_default();
    Some(word)
}
