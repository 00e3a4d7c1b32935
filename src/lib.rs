//! Dialog-stack middle tier for chat bots
//!
//! A bot is a set of routes. Each chat keeps a stack of visited routes plus
//! per-route state data; updates are matched to a route, its handler renders
//! messages that the renderer reconciles against what the chat already shows,
//! and a universal "go back" button unwinds the stack.

pub mod bot;
pub mod config;
pub mod dispatch;
pub mod i18n;
pub mod message;
pub mod observer;
pub mod paging;
pub mod payload;
pub mod render;
pub mod route;
pub mod runtime;
pub mod session;
pub mod store;
pub mod transport;
pub mod update;

#[cfg(test)]
mod testing;

pub use bot::{Bot, BotBuilder, BotError};
pub use config::{AppConfig, BotConfig, DefaultTexts, Environment};
pub use dispatch::{DispatchOutcome, HandlerContext, Trigger};
pub use message::{Button, ChatId, MessageId, MessageSpec, ParseMode};
pub use paging::{Page, PageRequest, PageSource, PagingError, PagingOptions};
pub use payload::ButtonPayload;
pub use render::RenderOptions;
pub use route::{Flow, Handler, HandlerResult, NoAction, Route, RouteRegistry, Schema};
pub use runtime::BotRuntime;
pub use session::{Session, StackEntry, StateData};
pub use update::Update;
