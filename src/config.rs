//! Bot and process configuration

use crate::route::Schema;
use std::fmt;
use std::path::PathBuf;
use strum::{Display, EnumString};

/// Default page size of the paging helper
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// Deployment environment; development dumps state stacks at `info`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Translator keys for framework-provided texts. `None` uses the built-in
/// English text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultTexts {
    pub go_back: Option<String>,
    /// Receives the current page and page count as `{0}` and `{1}`
    pub paging_helper: Option<String>,
    pub clear_search: Option<String>,
}

/// Static configuration of one bot
pub struct BotConfig<S: Schema> {
    /// Pushed after a command clears the session
    pub default_route: S::Route,
    /// Command route exempt from session clearing
    pub entry_route: Option<S::Route>,
    pub page_size: u32,
    pub environment: Environment,
    pub texts: DefaultTexts,
}

impl<S: Schema> Clone for BotConfig<S> {
    fn clone(&self) -> Self {
        Self {
            default_route: self.default_route,
            entry_route: self.entry_route,
            page_size: self.page_size,
            environment: self.environment,
            texts: self.texts.clone(),
        }
    }
}

impl<S: Schema> fmt::Debug for BotConfig<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("default_route", &self.default_route)
            .field("entry_route", &self.entry_route)
            .field("page_size", &self.page_size)
            .field("environment", &self.environment)
            .field("texts", &self.texts)
            .finish()
    }
}

impl<S: Schema> BotConfig<S> {
    pub fn new(default_route: S::Route) -> Self {
        Self {
            default_route,
            entry_route: None,
            page_size: DEFAULT_PAGE_SIZE,
            environment: Environment::default(),
            texts: DefaultTexts::default(),
        }
    }

    pub fn with_entry_route(mut self, route: S::Route) -> Self {
        self.entry_route = Some(route);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_texts(mut self, texts: DefaultTexts) -> Self {
        self.texts = texts;
        self
    }
}

/// Process configuration read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub environment: Environment,
    /// SQLite session database; `None` keeps sessions in memory
    pub db_path: Option<PathBuf>,
    pub page_size: u32,
    /// Chat the console demo plays as
    pub chat_id: i64,
    /// Set: talk to Telegram. Unset: console transport.
    pub telegram_token: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let environment = lookup("DIALOG_ENV")
            .and_then(|v| {
                v.parse()
                    .map_err(|_| tracing::warn!(value = %v, "Unknown DIALOG_ENV, using development"))
                    .ok()
            })
            .unwrap_or_default();

        let page_size = lookup("DIALOG_PAGE_SIZE")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let chat_id = lookup("DIALOG_CHAT_ID")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        Self {
            environment,
            db_path: lookup("DIALOG_DB_PATH")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            page_size,
            chat_id,
            telegram_token: lookup("TELEGRAM_BOT_TOKEN").filter(|v| !v.is_empty()),
        }
    }
}
