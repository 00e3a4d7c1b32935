//! Bot assembly: registry, configuration and the injected collaborators

use crate::config::BotConfig;
use crate::i18n::{KeyPathTranslator, Translator};
use crate::message::ChatId;
use crate::observer::{Observer, TracingObserver};
use crate::payload::PayloadError;
use crate::route::{Key, RegistryError, RouteRegistry, Schema};
use crate::session::Session;
use crate::store::{MemoryStore, SessionStore, StoreError};
use crate::transport::{ChatTransport, TransportError};
use std::sync::Arc;
use thiserror::Error;

/// Error returned by handlers and the dispatcher
#[derive(Debug, Error)]
pub enum BotError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),
    #[error("Invalid route registry: {0}")]
    Registry(#[from] RegistryError),
    #[error("Handler failed: {0}")]
    Handler(String),
}

impl BotError {
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }
}

/// A configured bot. Cheap to share behind an `Arc`; holds no per-chat state.
pub struct Bot<S: Schema> {
    pub(crate) registry: RouteRegistry<S>,
    pub(crate) config: BotConfig<S>,
    pub(crate) store: Arc<dyn SessionStore>,
    pub(crate) transport: Arc<dyn ChatTransport>,
    pub(crate) translator: Arc<dyn Translator>,
    pub(crate) observer: Arc<dyn Observer>,
}

impl<S: Schema> Bot<S> {
    pub fn builder(
        registry: RouteRegistry<S>,
        config: BotConfig<S>,
        transport: Arc<dyn ChatTransport>,
    ) -> BotBuilder<S> {
        BotBuilder {
            registry,
            config,
            transport,
            store: None,
            translator: None,
            observer: None,
        }
    }

    pub fn registry(&self) -> &RouteRegistry<S> {
        &self.registry
    }

    pub fn config(&self) -> &BotConfig<S> {
        &self.config
    }

    pub fn translator(&self) -> &dyn Translator {
        self.translator.as_ref()
    }

    /// Session handle for `chat_id`
    pub fn session(&self, chat_id: ChatId) -> Session<S::Route> {
        Session::new(Arc::clone(&self.store), chat_id)
    }
}

pub struct BotBuilder<S: Schema> {
    registry: RouteRegistry<S>,
    config: BotConfig<S>,
    transport: Arc<dyn ChatTransport>,
    store: Option<Arc<dyn SessionStore>>,
    translator: Option<Arc<dyn Translator>>,
    observer: Option<Arc<dyn Observer>>,
}

impl<S: Schema> BotBuilder<S> {
    /// Defaults to an in-memory store
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Defaults to rendering key paths verbatim
    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Defaults to [`TracingObserver`]
    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Result<Bot<S>, BotError> {
        let configured = std::iter::once(self.config.default_route).chain(self.config.entry_route);
        for route in configured {
            if !self.registry.contains(route) {
                return Err(RegistryError::MissingConfiguredRoute(route.name().to_string()).into());
            }
        }

        let environment = self.config.environment;
        Ok(Bot {
            registry: self.registry,
            config: self.config,
            transport: self.transport,
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemoryStore::new())),
            translator: self
                .translator
                .unwrap_or_else(|| Arc::new(KeyPathTranslator)),
            observer: self
                .observer
                .unwrap_or_else(|| Arc::new(TracingObserver::new(environment))),
        })
    }
}
