//! Static route registry
//!
//! Routes and actions are closed enums. Any `Copy` enum deriving
//! `strum::EnumString` and `strum::IntoStaticStr` is a [`Key`]; a bot ties
//! its route and action enums together with a [`Schema`].

use crate::bot::BotError;
use crate::dispatch::HandlerContext;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Identifier of a route or action, resolvable to and from a stable name
pub trait Key: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    fn name(self) -> &'static str;

    fn parse(name: &str) -> Option<Self>;
}

impl<T> Key for T
where
    T: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static + FromStr,
    &'static str: From<T>,
{
    fn name(self) -> &'static str {
        self.into()
    }

    fn parse(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

/// Action type for bots whose routes have no sub-actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoAction {}

impl FromStr for NoAction {
    type Err = ();

    fn from_str(_: &str) -> Result<Self, Self::Err> {
        Err(())
    }
}

impl From<NoAction> for &'static str {
    fn from(action: NoAction) -> Self {
        match action {}
    }
}

/// Binds the route and action identifiers of one bot
pub trait Schema: Send + Sync + 'static {
    type Route: Key;
    type Action: Key;
}

/// What the dispatcher should do with the stack after a handler returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Push the handled route (unless it already is the tail)
    Advance,
    /// Handled without state progression
    Stay,
}

pub type HandlerResult = Result<Flow, BotError>;

/// Route or action handler
#[async_trait]
pub trait Handler<S: Schema>: Send + Sync {
    async fn handle(&self, cx: &HandlerContext<'_, S>) -> HandlerResult;
}

/// Predicate run before a handler; `false` aborts dispatch silently
pub type Validator<S> = Arc<dyn Fn(&HandlerContext<'_, S>) -> bool + Send + Sync>;

/// Update kinds a route listens to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accepts {
    pub command: bool,
    pub message: bool,
    pub callback: bool,
}

pub struct ActionDef<S: Schema> {
    pub(crate) handler: Arc<dyn Handler<S>>,
    pub(crate) state_independent: bool,
}

impl<S: Schema> ActionDef<S> {
    pub fn state_independent(&self) -> bool {
        self.state_independent
    }
}

/// A named conversational state with its handler and sub-actions
pub struct Route<S: Schema> {
    id: S::Route,
    handler: Arc<dyn Handler<S>>,
    accepts: Accepts,
    commands: Vec<String>,
    states_for_input: Vec<S::Route>,
    children: Vec<S::Route>,
    waits_for_input: bool,
    reply_keyboard: bool,
    validator: Option<Validator<S>>,
    actions: HashMap<S::Action, ActionDef<S>>,
}

impl<S: Schema> Route<S> {
    pub fn new(id: S::Route, handler: impl Handler<S> + 'static) -> Self {
        Self {
            id,
            handler: Arc::new(handler),
            accepts: Accepts::default(),
            commands: vec![id.name().to_string()],
            states_for_input: vec![id],
            children: Vec::new(),
            waits_for_input: false,
            reply_keyboard: false,
            validator: None,
            actions: HashMap::new(),
        }
    }

    pub fn on_command(mut self) -> Self {
        self.accepts.command = true;
        self
    }

    pub fn on_message(mut self) -> Self {
        self.accepts.message = true;
        self
    }

    pub fn on_callback(mut self) -> Self {
        self.accepts.callback = true;
        self
    }

    /// Replace the default command alias (the route name)
    pub fn commands<I, T>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.commands = aliases.into_iter().map(Into::into).collect();
        self
    }

    /// States in which free text is routed here (default: this route)
    pub fn states_for_input(mut self, states: impl IntoIterator<Item = S::Route>) -> Self {
        self.states_for_input = states.into_iter().collect();
        self
    }

    /// Routes whose state data is dropped when going back to this route
    pub fn children(mut self, children: impl IntoIterator<Item = S::Route>) -> Self {
        self.children = children.into_iter().collect();
        self
    }

    pub fn waits_for_input(mut self) -> Self {
        self.waits_for_input = true;
        self
    }

    pub fn with_reply_keyboard(mut self) -> Self {
        self.reply_keyboard = true;
        self
    }

    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&HandlerContext<'_, S>) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Action that only fires while this route is the current state
    pub fn action(mut self, action: S::Action, handler: impl Handler<S> + 'static) -> Self {
        self.actions.insert(
            action,
            ActionDef {
                handler: Arc::new(handler),
                state_independent: false,
            },
        );
        self
    }

    /// Action that fires regardless of the current state
    pub fn global_action(mut self, action: S::Action, handler: impl Handler<S> + 'static) -> Self {
        self.actions.insert(
            action,
            ActionDef {
                handler: Arc::new(handler),
                state_independent: true,
            },
        );
        self
    }

    pub fn id(&self) -> S::Route {
        self.id
    }

    pub fn accepts(&self) -> Accepts {
        self.accepts
    }

    pub fn command_aliases(&self) -> &[String] {
        &self.commands
    }

    pub fn input_states(&self) -> &[S::Route] {
        &self.states_for_input
    }

    pub fn child_routes(&self) -> &[S::Route] {
        &self.children
    }

    pub fn is_waiting_for_input(&self) -> bool {
        self.waits_for_input
    }

    pub fn has_reply_keyboard(&self) -> bool {
        self.reply_keyboard
    }

    pub fn get_action(&self, action: S::Action) -> Option<&ActionDef<S>> {
        self.actions.get(&action)
    }

    pub(crate) fn handler(&self) -> &Arc<dyn Handler<S>> {
        &self.handler
    }

    pub(crate) fn validator_fn(&self) -> Option<&Validator<S>> {
        self.validator.as_ref()
    }

    /// Whether free text typed while `state` is current is routed here
    pub fn accepts_input_in(&self, state: S::Route) -> bool {
        self.accepts.message && self.states_for_input.contains(&state)
    }
}

impl<S: Schema> fmt::Debug for Route<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.id)
            .field("accepts", &self.accepts)
            .field("commands", &self.commands)
            .field("states_for_input", &self.states_for_input)
            .field("children", &self.children)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Route registered twice: {0}")]
    DuplicateRoute(String),
    #[error("Route name uses the reserved '$' prefix: {0}")]
    ReservedName(String),
    #[error("Command alias /{alias} is claimed by both {first} and {second}")]
    DuplicateCommand {
        alias: String,
        first: String,
        second: String,
    },
    #[error("Route {route} references unregistered route {missing}")]
    UnknownRoute { route: String, missing: String },
    #[error("Configured route is not registered: {0}")]
    MissingConfiguredRoute(String),
}

/// Ordered set of routes; earlier routes win when several could match
pub struct RouteRegistry<S: Schema> {
    routes: Vec<Route<S>>,
    index: HashMap<S::Route, usize>,
}

impl<S: Schema> RouteRegistry<S> {
    pub fn new(routes: Vec<Route<S>>) -> Result<Self, RegistryError> {
        let mut index = HashMap::new();
        for (position, route) in routes.iter().enumerate() {
            let name = route.id.name();
            if name.starts_with('$') {
                return Err(RegistryError::ReservedName(name.to_string()));
            }
            if index.insert(route.id, position).is_some() {
                return Err(RegistryError::DuplicateRoute(name.to_string()));
            }
        }

        let mut aliases: HashMap<&str, S::Route> = HashMap::new();
        for route in &routes {
            let referenced = route.children.iter().chain(&route.states_for_input);
            if let Some(missing) = referenced.into_iter().find(|r| !index.contains_key(*r)) {
                return Err(RegistryError::UnknownRoute {
                    route: route.id.name().to_string(),
                    missing: missing.name().to_string(),
                });
            }
            if !route.accepts.command {
                continue;
            }
            let mut seen = HashSet::new();
            for alias in route.commands.iter().filter(|a| seen.insert(a.as_str())) {
                if let Some(first) = aliases.insert(alias, route.id) {
                    return Err(RegistryError::DuplicateCommand {
                        alias: alias.clone(),
                        first: first.name().to_string(),
                        second: route.id.name().to_string(),
                    });
                }
            }
        }

        Ok(Self { routes, index })
    }

    pub fn get(&self, id: S::Route) -> Option<&Route<S>> {
        self.index.get(&id).map(|&i| &self.routes[i])
    }

    pub fn contains(&self, id: S::Route) -> bool {
        self.index.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route<S>> {
        self.routes.iter()
    }

    /// Whether another route takes free text while `state` is current.
    /// A route's own default input state does not count.
    pub fn anyone_accepts_input_in(&self, state: S::Route) -> bool {
        self.routes
            .iter()
            .any(|r| r.id != state && r.accepts_input_in(state))
    }

    pub fn has_reply_keyboard(&self, id: S::Route) -> bool {
        self.get(id).is_some_and(Route::has_reply_keyboard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Scripted, TestRoute, TestSchema};

    fn route(id: TestRoute) -> Route<TestSchema> {
        Route::new(id, Scripted::advance())
    }

    #[test]
    fn test_key_names_round_trip() {
        assert_eq!(TestRoute::Catalog.name(), "catalog");
        assert_eq!(TestRoute::parse("catalog"), Some(TestRoute::Catalog));
        assert_eq!(TestRoute::parse("$empty"), None);
        assert_eq!(NoAction::parse("anything"), None);
    }

    #[test]
    fn test_defaults() {
        let r = route(TestRoute::Search).on_message();
        assert_eq!(r.command_aliases(), ["search".to_string()]);
        assert_eq!(r.input_states(), [TestRoute::Search]);
        assert!(r.accepts_input_in(TestRoute::Search));
        assert!(!r.accepts_input_in(TestRoute::Menu));
        assert!(!route(TestRoute::Search).accepts_input_in(TestRoute::Search));
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let err = RouteRegistry::new(vec![route(TestRoute::Menu), route(TestRoute::Menu)])
            .err()
            .unwrap();
        assert_eq!(err, RegistryError::DuplicateRoute("menu".to_string()));
    }

    #[test]
    fn test_unknown_child_rejected() {
        let err = RouteRegistry::new(vec![route(TestRoute::Menu).children([TestRoute::Item])])
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::UnknownRoute { .. }));
    }

    #[test]
    fn test_duplicate_command_alias_rejected() {
        let err = RouteRegistry::new(vec![
            route(TestRoute::Menu).on_command().commands(["start", "menu"]),
            route(TestRoute::Catalog).on_command().commands(["start"]),
        ])
        .err()
        .unwrap();
        assert_eq!(
            err,
            RegistryError::DuplicateCommand {
                alias: "start".to_string(),
                first: "menu".to_string(),
                second: "catalog".to_string(),
            }
        );
    }

    #[test]
    fn test_input_acceptance_lookup() {
        let registry = RouteRegistry::new(vec![
            route(TestRoute::Menu),
            route(TestRoute::Catalog),
            route(TestRoute::Search)
                .on_message()
                .states_for_input([TestRoute::Catalog, TestRoute::Search]),
        ])
        .unwrap();
        assert!(registry.anyone_accepts_input_in(TestRoute::Catalog));
        assert!(!registry.anyone_accepts_input_in(TestRoute::Menu));
        // Search listing itself is not another route's acceptance
        assert!(!registry.anyone_accepts_input_in(TestRoute::Search));
    }

    #[test]
    fn test_own_input_state_is_not_counted() {
        let registry = RouteRegistry::new(vec![
            route(TestRoute::Menu),
            route(TestRoute::Catalog).on_message(),
        ])
        .unwrap();
        assert!(!registry.anyone_accepts_input_in(TestRoute::Catalog));
    }
}
