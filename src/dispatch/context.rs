//! Per-update handler context
//!
//! Built once per dispatched update and passed by reference to the route
//! handler (and validator). Everything a handler does to the chat goes
//! through here.

use crate::bot::{Bot, BotError};
use crate::message::{Button, ChatId, MessageSpec, RenderedMessage};
use crate::paging::Paging;
use crate::payload::ButtonPayload;
use crate::render::{KeyboardTransition, RenderOptions, Renderer};
use crate::route::{Key, Schema};
use crate::session::{Session, StackEntry, StateData};
use crate::update::{Update, UpdateKind};

const DEFAULT_GO_BACK_TEXT: &str = "Go back";

/// What caused the handler to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Command,
    Message,
    Callback,
    Action,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Command => "command",
            Trigger::Message => "message",
            Trigger::Callback => "callback",
            Trigger::Action => "action",
        }
    }

    pub(crate) fn of(update: &Update, action: bool) -> Self {
        match update.kind {
            UpdateKind::Command(_) => Trigger::Command,
            UpdateKind::Message(_) => Trigger::Message,
            UpdateKind::Callback(_) if action => Trigger::Action,
            UpdateKind::Callback(_) => Trigger::Callback,
        }
    }
}

pub struct HandlerContext<'a, S: Schema> {
    pub(crate) bot: &'a Bot<S>,
    pub(crate) session: Session<S::Route>,
    pub(crate) update: &'a Update,
    pub(crate) route: S::Route,
    pub(crate) action: Option<S::Action>,
    pub(crate) trigger: Trigger,
    pub(crate) step_back: bool,
    pub(crate) state_before: Option<StackEntry<S::Route>>,
    pub(crate) payload: ButtonPayload,
    pub(crate) data: StateData,
}

impl<'a, S: Schema> HandlerContext<'a, S> {
    /// Build the context, loading the route's state data and merging the
    /// callback payload into it
    pub(crate) async fn load(
        bot: &'a Bot<S>,
        update: &'a Update,
        route: S::Route,
        action: Option<S::Action>,
        step_back: bool,
        state_before: Option<StackEntry<S::Route>>,
    ) -> Result<Self, BotError> {
        let session = bot.session(update.chat_id);
        let payload = match &update.kind {
            UpdateKind::Callback(query) => ButtonPayload::decode(query.data.as_deref()),
            _ => ButtonPayload::default(),
        };
        let stored = session.state_data(route).await?;
        let data = united_data(stored, &payload, route, action.is_some());

        Ok(Self {
            bot,
            session,
            update,
            route,
            action,
            trigger: Trigger::of(update, action.is_some()),
            step_back,
            state_before,
            payload,
            data,
        })
    }

    // ========================================================================
    // Update facts
    // ========================================================================

    pub fn chat_id(&self) -> ChatId {
        self.update.chat_id
    }

    pub fn route(&self) -> S::Route {
        self.route
    }

    pub fn action(&self) -> Option<S::Action> {
        self.action
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    pub fn is_command(&self) -> bool {
        self.trigger == Trigger::Command
    }

    pub fn is_message(&self) -> bool {
        self.trigger == Trigger::Message
    }

    pub fn is_callback(&self) -> bool {
        self.trigger == Trigger::Callback
    }

    pub fn is_action(&self) -> bool {
        self.trigger == Trigger::Action
    }

    /// Replayed by go-back
    pub fn is_step_back(&self) -> bool {
        self.step_back
    }

    /// Entering this route from a different, known state
    pub fn is_step_forward(&self) -> bool {
        !self.step_back
            && self
                .state_before
                .is_some_and(|s| s != StackEntry::Route(self.route))
    }

    /// Stack tail when the update arrived
    pub fn state_before(&self) -> Option<StackEntry<S::Route>> {
        self.state_before
    }

    pub fn update(&self) -> &Update {
        self.update
    }

    /// Message or command text
    pub fn text(&self) -> Option<&str> {
        self.update.text()
    }

    pub fn language_code(&self) -> Option<&str> {
        self.update.language_code()
    }

    pub fn payload(&self) -> &ButtonPayload {
        &self.payload
    }

    /// Stored state data of this route merged with the callback payload
    pub fn data(&self) -> &StateData {
        &self.data
    }

    pub fn session(&self) -> &Session<S::Route> {
        &self.session
    }

    pub fn bot(&self) -> &Bot<S> {
        self.bot
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    fn renderer(&self) -> Renderer<'_> {
        Renderer::new(self.bot.transport.as_ref(), self.bot.observer.as_ref())
    }

    fn keyboards(&self, prior: Option<StackEntry<S::Route>>) -> KeyboardTransition {
        let registry = &self.bot.registry;
        KeyboardTransition {
            prior: prior.map(|entry| entry.route().is_some_and(|r| registry.has_reply_keyboard(r))),
            next: registry.has_reply_keyboard(self.route),
        }
    }

    pub async fn render(&self, messages: &[MessageSpec]) -> Result<Vec<RenderedMessage>, BotError> {
        self.render_with(messages, RenderOptions::default()).await
    }

    pub async fn render_with(
        &self,
        messages: &[MessageSpec],
        options: RenderOptions,
    ) -> Result<Vec<RenderedMessage>, BotError> {
        self.renderer()
            .render(
                &self.session,
                messages,
                self.keyboards(self.state_before),
                options,
            )
            .await
    }

    /// Reconcile against another chat's session
    pub async fn render_to_chat(
        &self,
        chat_id: ChatId,
        messages: &[MessageSpec],
        options: RenderOptions,
    ) -> Result<Vec<RenderedMessage>, BotError> {
        let session = self.bot.session(chat_id);
        let prior = session.current().await?;
        self.renderer()
            .render(&session, messages, self.keyboards(prior), options)
            .await
    }

    /// Send fresh messages to another chat. Its next render resends.
    pub async fn send_to_chat(
        &self,
        chat_id: ChatId,
        messages: &[MessageSpec],
    ) -> Result<Vec<RenderedMessage>, BotError> {
        let sent = self.renderer().send_fresh(chat_id, messages).await?;
        self.bot.session(chat_id).set_resend_flag().await?;
        Ok(sent)
    }

    /// Replay the previous route and collapse the stack to below it.
    /// Handlers calling this usually return [`crate::Flow::Stay`].
    pub async fn go_back(&self) -> Result<bool, BotError> {
        self.bot.go_back(self.update).await
    }

    /// Answer a button press with a toast (or alert). For other updates,
    /// show `text` as a standalone message with a go-back button and,
    /// unless `keep_state`, park the stack on the empty state.
    pub async fn notify(&self, text: &str, alert: bool, keep_state: bool) -> Result<(), BotError> {
        if let UpdateKind::Callback(query) = &self.update.kind {
            self.bot
                .transport
                .answer_callback(&query.id, text, alert)
                .await?;
            return Ok(());
        }

        self.render_with(&self.empty_state_message(text), RenderOptions::resend())
            .await?;
        if !keep_state {
            self.session.push_empty().await?;
        }
        Ok(())
    }

    // ========================================================================
    // Components
    // ========================================================================

    /// Button opening `route`
    pub fn button(&self, route: S::Route, text: impl Into<String>) -> Button {
        Button::route(route, text)
    }

    /// Button firing `action` of `route`
    pub fn action_button(&self, route: S::Route, action: S::Action, text: impl Into<String>) -> Button {
        Button::action(route, action, text)
    }

    pub fn go_back_button(&self, text: Option<&str>) -> Button {
        let text = text.map_or_else(
            || match &self.bot.config.texts.go_back {
                Some(key) => self.t(key),
                None => DEFAULT_GO_BACK_TEXT.to_string(),
            },
            str::to_string,
        );
        Button::back(text)
    }

    pub fn go_back_row(&self, text: Option<&str>) -> Vec<Button> {
        vec![self.go_back_button(text)]
    }

    pub fn go_back_layout(&self, text: Option<&str>) -> Vec<Vec<Button>> {
        vec![self.go_back_row(text)]
    }

    /// Single text message with the go-back layout
    pub fn empty_state_message(&self, text: &str) -> Vec<MessageSpec> {
        vec![MessageSpec::text(text).with_buttons(self.go_back_layout(None))]
    }

    /// Paging helper bound to this route
    pub fn paging(&self) -> Paging<'_, 'a, S> {
        Paging::new(self)
    }

    // ========================================================================
    // Translation
    // ========================================================================

    pub fn t(&self, key: &str) -> String {
        self.t_with(key, None, &[])
    }

    pub fn t_with(&self, key: &str, count: Option<i64>, vars: &[String]) -> String {
        self.bot
            .translator
            .translate(self.language_code(), key, count, vars)
    }
}

/// Stored data overlaid with the payload. Route callbacks only contribute
/// when they target this route; actions always do.
pub(crate) fn united_data<R: Key>(
    mut stored: StateData,
    payload: &ButtonPayload,
    route: R,
    is_action: bool,
) -> StateData {
    if !is_action && payload.target != route.name() {
        return stored;
    }
    for (key, value) in &payload.extra {
        stored.fields.insert(key.clone(), value.clone());
    }
    if let Some(page) = payload.page {
        stored.page = Some(page);
    }
    if payload.search == Some(false) {
        stored.search = None;
    }
    stored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestAction, TestRoute};

    fn stored() -> StateData {
        let mut data = StateData {
            page: Some(3),
            search: Some("widgets".to_string()),
            ..StateData::default()
        };
        data.set("sort", "price");
        data
    }

    #[test]
    fn test_route_callback_merges_only_own_payload() {
        let own = ButtonPayload::route(TestRoute::Catalog)
            .with_page(5)
            .with_field("sort", "name");
        let data = united_data(stored(), &own, TestRoute::Catalog, false);
        assert_eq!(data.page, Some(5));
        assert_eq!(data.get("sort"), Some(&serde_json::json!("name")));
        assert_eq!(data.search.as_deref(), Some("widgets"));

        let foreign = ButtonPayload::route(TestRoute::Item).with_page(9);
        assert_eq!(united_data(stored(), &foreign, TestRoute::Catalog, false), stored());
    }

    #[test]
    fn test_action_payload_always_merges() {
        let payload = ButtonPayload::action(TestRoute::Item, TestAction::Like).with_field("id", 7);
        let data = united_data(StateData::default(), &payload, TestRoute::Item, true);
        assert_eq!(data.get("id"), Some(&serde_json::json!(7)));
    }

    #[test]
    fn test_search_false_clears_query() {
        let payload = ButtonPayload::route(TestRoute::Catalog).with_search(false);
        let data = united_data(stored(), &payload, TestRoute::Catalog, false);
        assert_eq!(data.search, None);
        assert_eq!(data.page, Some(3));
    }
}
