//! Router/dispatcher
//!
//! Matches each update to one route (or action), applies the session
//! effects around the handler call and commits the resulting transition.
//! One chat's updates must be fed one at a time; [`crate::BotRuntime`]
//! takes care of that.

mod context;
mod go_back;
mod matching;

pub use context::{HandlerContext, Trigger};

use crate::bot::{Bot, BotError};
use crate::observer::DispatchEvent;
use crate::payload::ButtonPayload;
use crate::route::{Flow, Key, Schema};
use crate::session::{Session, StackEntry};
use crate::update::{Update, UpdateKind};
use matching::match_update;

/// What happened to an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A route or action handler ran
    Dispatched {
        route: &'static str,
        action: Option<&'static str>,
        flow: Flow,
    },
    /// Universal back button
    WentBack,
    /// Back button with nothing to go back to
    NothingToGoBackTo,
    /// The route validator refused the update
    Rejected { route: &'static str },
    /// No route claimed the update
    Unmatched,
}

impl<S: Schema> Bot<S> {
    /// Process one update for its chat
    pub async fn handle_update(&self, update: &Update) -> Result<DispatchOutcome, BotError> {
        let session = self.session(update.chat_id);

        let payload = match &update.kind {
            UpdateKind::Callback(query) => {
                let payload = ButtonPayload::decode(query.data.as_deref());
                if payload.is_back() {
                    let went_back = self.go_back(update).await?;
                    return Ok(if went_back {
                        DispatchOutcome::WentBack
                    } else {
                        DispatchOutcome::NothingToGoBackTo
                    });
                }
                payload
            }
            UpdateKind::Message(_) => {
                self.correct_empty_state(&session).await?;
                ButtonPayload::default()
            }
            UpdateKind::Command(_) => ButtonPayload::default(),
        };

        let states_before = session.states().await?;
        let current = session.current().await?;

        let Some(matched) = match_update(&self.registry, &update.kind, current, &payload) else {
            self.observer.on_event(&DispatchEvent::Unmatched {
                chat_id: update.chat_id,
                kind: update.kind_name(),
            });
            return Ok(DispatchOutcome::Unmatched);
        };
        let (route_id, action) = (matched.route, matched.action);
        let Some(route) = self.registry.get(route_id) else {
            return Ok(DispatchOutcome::Unmatched);
        };

        // Stale data of a route entered forward. Actions act on the data of
        // their route, so they never count as entering it.
        if action.is_none() && current.is_some_and(|c| c != StackEntry::Route(route_id)) {
            session.delete_state_data(route_id).await?;
        }

        match update.kind {
            UpdateKind::Command(_) => {
                if self.config.entry_route == Some(route_id) {
                    tracing::debug!(chat_id = %update.chat_id, route = route_id.name(), "Entry route keeps session");
                } else {
                    session.clear().await?;
                }
                session.push(self.config.default_route).await?;
                session.set_resend_flag().await?;
            }
            UpdateKind::Message(_) => session.set_resend_flag().await?,
            UpdateKind::Callback(_) => {}
        }

        let cx = HandlerContext::load(self, update, route_id, action, false, current).await?;

        if let Some(validator) = route.validator_fn() {
            if !validator(&cx) {
                self.observer.on_event(&DispatchEvent::ValidatorRejected {
                    chat_id: update.chat_id,
                    route: route_id.name(),
                });
                return Ok(DispatchOutcome::Rejected {
                    route: route_id.name(),
                });
            }
        }

        let handler = match action {
            Some(a) => route
                .get_action(a)
                .map(|def| &def.handler)
                .ok_or_else(|| BotError::handler(format!("Action {} vanished", a.name())))?,
            None => route.handler(),
        };
        let flow = handler.handle(&cx).await?;

        if flow == Flow::Advance {
            session.push(route_id).await?;
        }

        self.observer.on_event(&DispatchEvent::Dispatched {
            chat_id: update.chat_id,
            route: route_id.name(),
            action: action.map(Key::name),
            trigger: cx.trigger().as_str(),
            states_before,
            states_after: session.states().await?,
        });

        Ok(DispatchOutcome::Dispatched {
            route: route_id.name(),
            action: action.map(Key::name),
            flow,
        })
    }

    /// Pop the empty sentinel when free text arrives for a state that
    /// takes input
    async fn correct_empty_state(&self, session: &Session<S::Route>) -> Result<(), BotError> {
        let (previous, current) = session.previous_and_current().await?;
        let Some(StackEntry::Route(previous)) = previous else {
            return Ok(());
        };
        if current != Some(StackEntry::Empty) {
            return Ok(());
        }

        let waits = self
            .registry
            .get(previous)
            .is_some_and(|r| r.is_waiting_for_input());
        if !waits && !self.registry.anyone_accepts_input_in(previous) {
            return Ok(());
        }

        let states_before = session.states().await?;
        session.pop().await?;
        self.observer.on_event(&DispatchEvent::EmptyStateCorrected {
            chat_id: session.chat_id(),
            states_before,
            states_after: session.states().await?,
        });
        Ok(())
    }
}
