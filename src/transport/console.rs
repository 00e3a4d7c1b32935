//! Terminal transport for local runs
//!
//! Every inline button printed gets a number; the demo maps `:N` input back
//! to that button's callback data.

use super::{ChatTransport, EditOutcome, OutgoingMessage, ReplyMarkup, TransportError};
use crate::message::{ChatId, MessageId, MessageKind};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct ConsoleTransport {
    next_id: AtomicI64,
    /// Callback data by button number
    buttons: Mutex<HashMap<usize, String>>,
}

impl ConsoleTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback data of button `number`, as last printed
    pub fn button_data(&self, number: usize) -> Option<String> {
        self.buttons.lock().ok()?.get(&number).cloned()
    }

    fn print(&self, header: &str, message: &OutgoingMessage) {
        let prefix = match message.kind {
            MessageKind::Text => String::new(),
            MessageKind::Photo => format!("[photo {}] ", message.media.as_deref().unwrap_or("?")),
        };
        println!("{header} {prefix}{}", message.text);

        match &message.markup {
            Some(ReplyMarkup::Inline(rows)) => {
                let Ok(mut buttons) = self.buttons.lock() else {
                    return;
                };
                for row in rows {
                    let cells: Vec<String> = row
                        .iter()
                        .map(|button| {
                            let number = buttons.len() + 1;
                            buttons.insert(number, button.callback_data.clone());
                            format!("[{number}: {}]", button.text)
                        })
                        .collect();
                    println!("    {}", cells.join(" "));
                }
            }
            Some(ReplyMarkup::Keyboard(rows)) => {
                for row in rows {
                    println!("    keyboard: {}", row.join(" | "));
                }
            }
            Some(ReplyMarkup::RemoveKeyboard) | None => {}
        }
    }
}

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn send_message(
        &self,
        chat: ChatId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, TransportError> {
        let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.print(&format!("[{chat}] #{id}"), message);
        Ok(id)
    }

    async fn edit_message_text(
        &self,
        chat: ChatId,
        id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<EditOutcome, TransportError> {
        self.print(&format!("[{chat}] #{id} (edited)"), message);
        Ok(EditOutcome::Edited)
    }

    async fn delete_message(&self, chat: ChatId, id: MessageId) -> Result<bool, TransportError> {
        tracing::debug!(chat_id = %chat, message_id = %id, "Console message deleted");
        Ok(true)
    }

    async fn answer_callback(
        &self,
        _callback_id: &str,
        text: &str,
        alert: bool,
    ) -> Result<(), TransportError> {
        println!("{} {text}", if alert { "(!)" } else { "(i)" });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Button, MessageSpec};
    use crate::testing::TestRoute;

    #[tokio::test]
    async fn test_buttons_are_numbered_across_messages() {
        let transport = ConsoleTransport::new();
        let first = MessageSpec::text("One").with_buttons(vec![vec![
            Button::route(TestRoute::Catalog, "Catalog"),
            Button::route(TestRoute::Settings, "Settings"),
        ]]);
        let second = MessageSpec::text("Two").with_buttons(vec![vec![Button::back("Back")]]);

        let a = transport
            .send_message(ChatId(1), &OutgoingMessage::from_spec(&first).unwrap())
            .await
            .unwrap();
        let b = transport
            .send_message(ChatId(1), &OutgoingMessage::from_spec(&second).unwrap())
            .await
            .unwrap();

        assert_eq!((a, b), (MessageId(1), MessageId(2)));
        assert_eq!(transport.button_data(2).as_deref(), Some(r#"{"t":"settings"}"#));
        assert_eq!(transport.button_data(3).as_deref(), Some(r#"{"t":"$back"}"#));
        assert_eq!(transport.button_data(4), None);
    }
}
