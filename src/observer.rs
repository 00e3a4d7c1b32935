//! Dispatch telemetry
//!
//! The dispatcher and renderer report what they did through an injected
//! [`Observer`]. [`TracingObserver`] forwards to `tracing`; tests record
//! events instead.

use crate::config::Environment;
use crate::message::{ChatId, MessageId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    /// A route or action handler ran
    Dispatched {
        chat_id: ChatId,
        route: &'static str,
        action: Option<&'static str>,
        trigger: &'static str,
        states_before: Vec<String>,
        states_after: Vec<String>,
    },
    /// No route claimed the update
    Unmatched {
        chat_id: ChatId,
        kind: &'static str,
    },
    ValidatorRejected {
        chat_id: ChatId,
        route: &'static str,
    },
    /// The empty sentinel was popped before handling free text
    EmptyStateCorrected {
        chat_id: ChatId,
        states_before: Vec<String>,
        states_after: Vec<String>,
    },
    WentBack {
        chat_id: ChatId,
        target: &'static str,
        popped: usize,
        states_after: Vec<String>,
    },
    Rendered {
        chat_id: ChatId,
        edits: usize,
        deletes: usize,
        sends: usize,
        resend: bool,
        keyboard_removed: bool,
    },
    /// A deletion failed and the render fell back to sending everything
    ResendFallback {
        chat_id: ChatId,
        message_id: MessageId,
        reason: String,
    },
}

pub trait Observer: Send + Sync {
    fn on_event(&self, event: &DispatchEvent);
}

/// Logs events through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver {
    environment: Environment,
}

impl TracingObserver {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }
}

/// Stack dumps are chatty: `info` while developing, `debug` in production
macro_rules! stack_dump {
    ($env:expr, $($arg:tt)+) => {
        match $env {
            Environment::Development => tracing::info!($($arg)+),
            Environment::Production => tracing::debug!($($arg)+),
        }
    };
}

impl Observer for TracingObserver {
    fn on_event(&self, event: &DispatchEvent) {
        match event {
            DispatchEvent::Dispatched {
                chat_id,
                route,
                action,
                trigger,
                states_before,
                states_after,
            } => stack_dump!(
                self.environment,
                chat_id = %chat_id,
                route,
                action = action.unwrap_or_default(),
                trigger,
                ?states_before,
                ?states_after,
                "Update dispatched"
            ),
            DispatchEvent::Unmatched { chat_id, kind } => {
                tracing::debug!(chat_id = %chat_id, kind, "No route matched update");
            }
            DispatchEvent::ValidatorRejected { chat_id, route } => {
                tracing::debug!(chat_id = %chat_id, route, "Validator rejected update");
            }
            DispatchEvent::EmptyStateCorrected {
                chat_id,
                states_before,
                states_after,
            } => stack_dump!(
                self.environment,
                chat_id = %chat_id,
                ?states_before,
                ?states_after,
                "Empty state corrected"
            ),
            DispatchEvent::WentBack {
                chat_id,
                target,
                popped,
                states_after,
            } => stack_dump!(
                self.environment,
                chat_id = %chat_id,
                target,
                popped,
                ?states_after,
                "Went back"
            ),
            DispatchEvent::Rendered {
                chat_id,
                edits,
                deletes,
                sends,
                resend,
                keyboard_removed,
            } => tracing::debug!(
                chat_id = %chat_id,
                edits,
                deletes,
                sends,
                resend,
                keyboard_removed,
                "Rendered"
            ),
            DispatchEvent::ResendFallback {
                chat_id,
                message_id,
                reason,
            } => tracing::warn!(
                chat_id = %chat_id,
                message_id = %message_id,
                reason = %reason,
                "Deletion failed, resending all messages"
            ),
        }
    }
}
