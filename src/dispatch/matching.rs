//! Update-to-route matching

use crate::payload::ButtonPayload;
use crate::route::{Key, RouteRegistry, Schema};
use crate::session::StackEntry;
use crate::update::{command_word, UpdateKind};

/// Route (and optional action) selected for an update
pub(crate) struct Matched<S: Schema> {
    pub route: S::Route,
    pub action: Option<S::Action>,
}

/// First route, in registration order, that claims the update.
///
/// `current` is the stack tail before any dispatch effect; `payload` is the
/// decoded callback data (empty for non-callbacks).
pub(crate) fn match_update<S: Schema>(
    registry: &RouteRegistry<S>,
    kind: &UpdateKind,
    current: Option<StackEntry<S::Route>>,
    payload: &ButtonPayload,
) -> Option<Matched<S>> {
    match kind {
        UpdateKind::Command(message) => {
            let word = command_word(&message.text)?;
            registry
                .iter()
                .find(|r| r.accepts().command && r.command_aliases().iter().any(|a| a == word))
                .map(|r| Matched {
                    route: r.id(),
                    action: None,
                })
        }
        UpdateKind::Message(message) => {
            if message.text.starts_with('/') {
                return None;
            }
            let state = current?.route()?;
            registry
                .iter()
                .find(|r| r.accepts_input_in(state))
                .map(|r| Matched {
                    route: r.id(),
                    action: None,
                })
        }
        UpdateKind::Callback(_) => {
            let target = payload.target_route::<S::Route>()?;
            let route = registry.get(target)?;
            match &payload.action {
                None => route.accepts().callback.then_some(Matched {
                    route: target,
                    action: None,
                }),
                Some(name) => {
                    let action = S::Action::parse(name)?;
                    let def = route.get_action(action)?;
                    let is_current = current == Some(StackEntry::Route(target));
                    (def.state_independent() || is_current).then_some(Matched {
                        route: target,
                        action: Some(action),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ChatId, MessageId};
    use crate::route::Route;
    use crate::testing::{Scripted, TestAction, TestRoute, TestSchema};
    use crate::update::Update;

    fn registry() -> RouteRegistry<TestSchema> {
        RouteRegistry::new(vec![
            Route::new(TestRoute::Menu, Scripted::advance())
                .on_command()
                .on_callback()
                .commands(["start", "menu"]),
            Route::new(TestRoute::Catalog, Scripted::advance())
                .on_command()
                .on_callback()
                .on_message(),
            Route::new(TestRoute::Search, Scripted::advance())
                .on_message()
                .states_for_input([TestRoute::Catalog, TestRoute::Search]),
            Route::new(TestRoute::Item, Scripted::advance())
                .on_callback()
                .action(TestAction::Refresh, Scripted::stay())
                .global_action(TestAction::Like, Scripted::stay()),
        ])
        .unwrap()
    }

    fn matched(
        update: &Update,
        current: Option<StackEntry<TestRoute>>,
    ) -> Option<(TestRoute, Option<TestAction>)> {
        let payload = match &update.kind {
            UpdateKind::Callback(q) => ButtonPayload::decode(q.data.as_deref()),
            _ => ButtonPayload::default(),
        };
        match_update(&registry(), &update.kind, current, &payload).map(|m| (m.route, m.action))
    }

    fn text(s: &str) -> Update {
        Update::message(ChatId(1), MessageId(1), s)
    }

    fn press(payload: &ButtonPayload) -> Update {
        Update::callback(ChatId(1), "cb", Some(payload.encode().unwrap()))
    }

    #[test]
    fn test_command_aliases_and_bot_suffix() {
        assert_eq!(matched(&text("/start"), None), Some((TestRoute::Menu, None)));
        assert_eq!(matched(&text("/menu@shop_bot now"), None), Some((TestRoute::Menu, None)));
        assert_eq!(matched(&text("/catalog"), None), Some((TestRoute::Catalog, None)));
        // Search does not accept commands
        assert_eq!(matched(&text("/search"), None), None);
    }

    #[test]
    fn test_message_goes_to_first_route_accepting_current_state() {
        let in_catalog = Some(StackEntry::Route(TestRoute::Catalog));
        assert_eq!(matched(&text("widgets"), in_catalog), Some((TestRoute::Catalog, None)));

        let in_search = Some(StackEntry::Route(TestRoute::Search));
        assert_eq!(matched(&text("widgets"), in_search), Some((TestRoute::Search, None)));

        assert_eq!(matched(&text("widgets"), Some(StackEntry::Route(TestRoute::Menu))), None);
        assert_eq!(matched(&text("widgets"), Some(StackEntry::Empty)), None);
        assert_eq!(matched(&text("widgets"), None), None);
    }

    #[test]
    fn test_callback_targets_route() {
        let update = press(&ButtonPayload::route(TestRoute::Catalog).with_page(2));
        assert_eq!(matched(&update, None), Some((TestRoute::Catalog, None)));

        // Search takes no callbacks
        assert_eq!(matched(&press(&ButtonPayload::route(TestRoute::Search)), None), None);
        assert_eq!(matched(&Update::callback(ChatId(1), "cb", Some("junk".into())), None), None);
    }

    #[test]
    fn test_action_requires_current_state_unless_independent() {
        let refresh = press(&ButtonPayload::action(TestRoute::Item, TestAction::Refresh));
        let like = press(&ButtonPayload::action(TestRoute::Item, TestAction::Like));
        let in_item = Some(StackEntry::Route(TestRoute::Item));
        let in_menu = Some(StackEntry::Route(TestRoute::Menu));

        assert_eq!(
            matched(&refresh, in_item),
            Some((TestRoute::Item, Some(TestAction::Refresh)))
        );
        assert_eq!(matched(&refresh, in_menu), None);
        assert_eq!(
            matched(&like, in_menu),
            Some((TestRoute::Item, Some(TestAction::Like)))
        );

        // Action not declared on the target route
        let foreign = press(&ButtonPayload::action(TestRoute::Catalog, TestAction::Like));
        assert_eq!(matched(&foreign, Some(StackEntry::Route(TestRoute::Catalog))), None);
    }
}
