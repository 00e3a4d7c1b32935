//! Renderer and reconciler
//!
//! Turns a handler's desired message list into transport calls against what
//! the chat already shows, then records the result in the session's
//! rendered-message cache.

mod plan;
#[cfg(test)]
mod proptests;

pub use plan::RenderPlan;

use crate::bot::BotError;
use crate::message::{ChatId, MessageId, MessageKind, MessageSpec, RenderedMessage};
use crate::observer::{DispatchEvent, Observer};
use crate::route::Key;
use crate::session::Session;
use crate::transport::{ChatTransport, OutgoingMessage};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Discard what is shown and send fresh messages
    pub resend: bool,
    /// Remove the custom reply keyboard even if the state change does not
    /// call for it
    pub remove_reply_keyboard: bool,
}

impl RenderOptions {
    pub fn resend() -> Self {
        Self {
            resend: true,
            ..Self::default()
        }
    }
}

/// Reply-keyboard ownership of the state being left and the one entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardTransition {
    /// `None` when the prior state is unknown
    pub prior: Option<bool>,
    pub next: bool,
}

impl KeyboardTransition {
    /// Editing cannot swap a reply keyboard, so any change means resending.
    /// An unknown prior state counts as having none.
    pub fn forces_resend(self) -> bool {
        self.prior.unwrap_or(false) != self.next
    }

    pub fn needs_removal(self) -> bool {
        !self.next && self.prior != Some(false)
    }
}

/// Transport plus telemetry for one render
pub struct Renderer<'a> {
    transport: &'a dyn ChatTransport,
    observer: &'a dyn Observer,
}

impl<'a> Renderer<'a> {
    pub fn new(transport: &'a dyn ChatTransport, observer: &'a dyn Observer) -> Self {
        Self {
            transport,
            observer,
        }
    }

    /// Reconcile `messages` against the chat's rendered cache.
    ///
    /// After success the cache holds exactly one entry per desired message;
    /// edited positions keep their message ids.
    pub async fn render<R: Key>(
        &self,
        session: &Session<R>,
        messages: &[MessageSpec],
        keyboards: KeyboardTransition,
        options: RenderOptions,
    ) -> Result<Vec<RenderedMessage>, BotError> {
        let chat_id = session.chat_id();
        let outgoing = encode_all(messages)?;
        let kinds: Vec<MessageKind> = messages.iter().map(|m| m.kind).collect();

        let resend =
            options.resend || keyboards.forces_resend() || session.resend_flag().await?;
        let keyboard_removed = options.remove_reply_keyboard || keyboards.needs_removal();

        if keyboard_removed {
            self.remove_reply_keyboard(chat_id).await?;
        }

        let previous = session.rendered().await?;
        let mut plan = RenderPlan::build(&previous, &kinds, resend);
        let mut deletes = 0;

        for &id in &plan.deletes {
            let failure = match self.transport.delete_message(chat_id, id).await {
                Ok(true) => None,
                Ok(false) => Some("not deleted".to_string()),
                Err(e) => Some(e.to_string()),
            };
            if let Some(reason) = failure {
                self.observer.on_event(&DispatchEvent::ResendFallback {
                    chat_id,
                    message_id: id,
                    reason,
                });
                plan = RenderPlan::send_all(outgoing.len());
                break;
            }
            deletes += 1;
        }

        let mut rendered = Vec::with_capacity(outgoing.len());
        for &(id, index) in &plan.edits {
            self.transport
                .edit_message_text(chat_id, id, &outgoing[index])
                .await?;
            rendered.push(RenderedMessage {
                id,
                kind: kinds[index],
            });
        }
        for &index in &plan.sends {
            let id = self.transport.send_message(chat_id, &outgoing[index]).await?;
            rendered.push(RenderedMessage {
                id,
                kind: kinds[index],
            });
        }

        session.set_rendered(&rendered).await?;
        session.clear_resend_flag().await?;

        self.observer.on_event(&DispatchEvent::Rendered {
            chat_id,
            edits: plan.edits.len(),
            deletes,
            sends: plan.sends.len(),
            resend,
            keyboard_removed,
        });
        Ok(rendered)
    }

    /// Send `messages` as new messages without touching any cache
    pub async fn send_fresh(
        &self,
        chat_id: ChatId,
        messages: &[MessageSpec],
    ) -> Result<Vec<RenderedMessage>, BotError> {
        let outgoing = encode_all(messages)?;
        let mut sent = Vec::with_capacity(outgoing.len());
        for (message, spec) in outgoing.iter().zip(messages) {
            let id = self.transport.send_message(chat_id, message).await?;
            sent.push(RenderedMessage {
                id,
                kind: spec.kind,
            });
        }
        Ok(sent)
    }

    /// The transport has no standalone keyboard removal: send a throwaway
    /// message carrying the removal and delete it
    async fn remove_reply_keyboard(&self, chat_id: ChatId) -> Result<(), BotError> {
        let id: MessageId = self
            .transport
            .send_message(chat_id, &OutgoingMessage::remove_keyboard())
            .await?;
        match self.transport.delete_message(chat_id, id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(chat_id = %chat_id, message_id = %id, "Keyboard removal message not deleted");
            }
            Err(e) => {
                tracing::warn!(chat_id = %chat_id, message_id = %id, error = %e, "Failed to delete keyboard removal message");
            }
        }
        Ok(())
    }
}

fn encode_all(messages: &[MessageSpec]) -> Result<Vec<OutgoingMessage>, BotError> {
    messages
        .iter()
        .map(|m| OutgoingMessage::from_spec(m).map_err(BotError::from))
        .collect()
}
