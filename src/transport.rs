//! Chat transport seam
//!
//! The dialog core talks to the messenger only through [`ChatTransport`].
//! [`TelegramTransport`] speaks the Bot API over HTTP; [`ConsoleTransport`]
//! prints to the terminal for local runs.

mod console;
mod telegram;

pub use console::ConsoleTransport;
pub use telegram::TelegramTransport;

use crate::message::{ChatId, MessageId, MessageKind, MessageSpec, ParseMode};
use crate::payload::PayloadError;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Transport error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::RateLimited, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::NotFound, message)
    }

    pub fn not_modified(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::NotModified, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Rejected, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Unknown, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection failures and timeouts
    Network,
    /// Flood control (429)
    RateLimited,
    /// Message or chat no longer exists
    NotFound,
    /// Edit with identical content
    NotModified,
    /// Request refused by the API (400, 403)
    Rejected,
    Unknown,
}

/// Result of an in-place edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Edited,
    /// Content was identical; the message keeps its id
    Unchanged,
}

/// Inline button with its encoded callback data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyMarkup {
    Inline(Vec<Vec<InlineButton>>),
    Keyboard(Vec<Vec<String>>),
    RemoveKeyboard,
}

/// A message ready for the wire: button payloads already encoded
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub kind: MessageKind,
    pub text: String,
    pub media: Option<String>,
    pub markup: Option<ReplyMarkup>,
    pub parse_mode: Option<ParseMode>,
    pub disable_link_preview: bool,
}

impl OutgoingMessage {
    /// Encode every button payload of `spec`. A reply keyboard takes the
    /// markup slot over inline buttons.
    pub fn from_spec(spec: &MessageSpec) -> Result<Self, PayloadError> {
        let markup = if let Some(rows) = &spec.reply_keyboard {
            Some(ReplyMarkup::Keyboard(rows.clone()))
        } else if spec.inline_keyboard.is_empty() {
            None
        } else {
            let rows = spec
                .inline_keyboard
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|button| {
                            Ok(InlineButton {
                                text: button.text.clone(),
                                callback_data: button.payload.encode()?,
                            })
                        })
                        .collect::<Result<Vec<_>, PayloadError>>()
                })
                .collect::<Result<Vec<_>, PayloadError>>()?;
            Some(ReplyMarkup::Inline(rows))
        };

        Ok(Self {
            kind: spec.kind,
            text: spec.text.clone(),
            media: spec.media.clone(),
            markup,
            parse_mode: spec.parse_mode,
            disable_link_preview: spec.disable_link_preview,
        })
    }

    /// Throwaway message that removes the custom reply keyboard
    pub fn remove_keyboard() -> Self {
        Self {
            kind: MessageKind::Text,
            text: "...".to_string(),
            media: None,
            markup: Some(ReplyMarkup::RemoveKeyboard),
            parse_mode: None,
            disable_link_preview: false,
        }
    }

    /// Inline rows, the only markup an edit can carry
    pub fn inline_rows(&self) -> &[Vec<InlineButton>] {
        match &self.markup {
            Some(ReplyMarkup::Inline(rows)) => rows,
            _ => &[],
        }
    }
}

/// Messenger operations the dialog core needs
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(
        &self,
        chat: ChatId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, TransportError>;

    /// Replace text (or caption) and inline buttons of an existing message
    async fn edit_message_text(
        &self,
        chat: ChatId,
        id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<EditOutcome, TransportError>;

    /// `Ok(false)` when the messenger refused (already gone, too old)
    async fn delete_message(&self, chat: ChatId, id: MessageId) -> Result<bool, TransportError>;

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: &str,
        alert: bool,
    ) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn send_message(
        &self,
        chat: ChatId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, TransportError> {
        (**self).send_message(chat, message).await
    }

    async fn edit_message_text(
        &self,
        chat: ChatId,
        id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<EditOutcome, TransportError> {
        (**self).edit_message_text(chat, id, message).await
    }

    async fn delete_message(&self, chat: ChatId, id: MessageId) -> Result<bool, TransportError> {
        (**self).delete_message(chat, id).await
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: &str,
        alert: bool,
    ) -> Result<(), TransportError> {
        (**self).answer_callback(callback_id, text, alert).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Button;
    use crate::payload::CALLBACK_DATA_LIMIT;
    use crate::testing::TestRoute;

    #[test]
    fn test_from_spec_encodes_buttons() {
        let spec = MessageSpec::text("Pick one").with_buttons(vec![vec![
            Button::route(TestRoute::Catalog, "Catalog"),
            Button::back("Back"),
        ]]);
        let outgoing = OutgoingMessage::from_spec(&spec).unwrap();
        assert_eq!(
            outgoing.inline_rows(),
            [vec![
                InlineButton {
                    text: "Catalog".to_string(),
                    callback_data: r#"{"t":"catalog"}"#.to_string(),
                },
                InlineButton {
                    text: "Back".to_string(),
                    callback_data: r#"{"t":"$back"}"#.to_string(),
                },
            ]]
        );
    }

    #[test]
    fn test_reply_keyboard_takes_markup_slot() {
        let spec = MessageSpec::text("Settings")
            .with_buttons(vec![vec![Button::back("Back")]])
            .with_reply_keyboard(vec![vec!["English".to_string(), "Русский".to_string()]]);
        let outgoing = OutgoingMessage::from_spec(&spec).unwrap();
        assert!(matches!(outgoing.markup, Some(ReplyMarkup::Keyboard(_))));
        assert!(outgoing.inline_rows().is_empty());
    }

    #[test]
    fn test_oversized_payload_fails_encoding() {
        let spec = MessageSpec::text("x").with_buttons(vec![vec![Button::route(
            TestRoute::Item,
            "Item",
        )
        .with_field("blob", "y".repeat(CALLBACK_DATA_LIMIT))]]);
        assert!(matches!(
            OutgoingMessage::from_spec(&spec),
            Err(PayloadError::TooLarge { .. })
        ));
    }
}
