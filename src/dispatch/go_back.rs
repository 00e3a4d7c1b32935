//! Universal back navigation

use super::HandlerContext;
use crate::bot::{Bot, BotError};
use crate::observer::DispatchEvent;
use crate::route::{Key, Schema};
use crate::session::StackEntry;
use crate::update::Update;

impl<S: Schema> Bot<S> {
    /// Replay the previous route in step-back mode, then pop the stack
    /// through that route and drop its children's state data.
    ///
    /// Returns `false` when there is no registered previous route.
    pub(crate) async fn go_back(&self, update: &Update) -> Result<bool, BotError> {
        let session = self.session(update.chat_id);
        let (previous, current) = session.previous_and_current().await?;

        let Some(StackEntry::Route(target)) = previous else {
            tracing::debug!(chat_id = %update.chat_id, "Nothing to go back to");
            return Ok(false);
        };
        let Some(route) = self.registry.get(target) else {
            return Ok(false);
        };

        let cx = HandlerContext::load(self, update, target, None, true, current).await?;
        // Flow is ignored, the collapse below sets the stack
        let _ = route.handler().handle(&cx).await?;

        let popped = session.pop_through(target).await?;
        for &child in route.child_routes() {
            session.delete_state_data(child).await?;
        }

        self.observer.on_event(&DispatchEvent::WentBack {
            chat_id: update.chat_id,
            target: target.name(),
            popped,
            states_after: session.states().await?,
        });
        Ok(true)
    }
}
