//! Mock implementations for testing
//!
//! A small route schema, scripted handlers, a recording transport and a
//! recording observer, so dispatch can be exercised without any network.

use crate::bot::{Bot, BotError};
use crate::config::BotConfig;
use crate::dispatch::{HandlerContext, Trigger};
use crate::message::{ChatId, MessageId, MessageSpec};
use crate::observer::{DispatchEvent, Observer};
use crate::route::{Flow, Handler, HandlerResult, Route, RouteRegistry, Schema};
use crate::session::{StackEntry, StateData};
use crate::store::{MemoryStore, SessionStore};
use crate::transport::{ChatTransport, EditOutcome, OutgoingMessage, TransportError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use strum::{EnumString, IntoStaticStr};

// ============================================================================
// Test schema
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TestRoute {
    Menu,
    Catalog,
    Item,
    Search,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TestAction {
    Like,
    Refresh,
}

pub struct TestSchema;

impl Schema for TestSchema {
    type Route = TestRoute;
    type Action = TestAction;
}

// ============================================================================
// Scripted handler
// ============================================================================

/// What a scripted handler saw
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerCall {
    pub route: TestRoute,
    pub action: Option<TestAction>,
    pub trigger: Trigger,
    pub step_back: bool,
    pub step_forward: bool,
    pub state_before: Option<StackEntry<TestRoute>>,
    pub data: StateData,
}

pub type CallLog = Arc<Mutex<Vec<HandlerCall>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// What a scripted handler does besides logging
#[derive(Debug, Clone)]
enum Effect {
    Nothing,
    Render(Vec<MessageSpec>),
    Notify { text: String, keep_state: bool },
    GoBack,
    Fail,
}

/// Handler with a fixed flow and an optional side effect
#[allow(dead_code)]
pub struct Scripted {
    flow: Flow,
    effect: Effect,
    log: Option<CallLog>,
}

#[allow(dead_code)]
impl Scripted {
    pub fn advance() -> Self {
        Self {
            flow: Flow::Advance,
            effect: Effect::Nothing,
            log: None,
        }
    }

    pub fn stay() -> Self {
        Self {
            flow: Flow::Stay,
            ..Self::advance()
        }
    }

    pub fn logged(mut self, log: &CallLog) -> Self {
        self.log = Some(Arc::clone(log));
        self
    }

    pub fn renders(mut self, texts: &[&str]) -> Self {
        self.effect = Effect::Render(texts.iter().map(|t| MessageSpec::text(*t)).collect());
        self
    }

    pub fn notifies(mut self, text: &str, keep_state: bool) -> Self {
        self.effect = Effect::Notify {
            text: text.to_string(),
            keep_state,
        };
        self
    }

    pub fn goes_back(mut self) -> Self {
        self.effect = Effect::GoBack;
        self
    }

    pub fn fails(mut self) -> Self {
        self.effect = Effect::Fail;
        self
    }
}

#[async_trait]
impl Handler<TestSchema> for Scripted {
    async fn handle(&self, cx: &HandlerContext<'_, TestSchema>) -> HandlerResult {
        if let Some(log) = &self.log {
            log.lock().unwrap().push(HandlerCall {
                route: cx.route(),
                action: cx.action(),
                trigger: cx.trigger(),
                step_back: cx.is_step_back(),
                step_forward: cx.is_step_forward(),
                state_before: cx.state_before(),
                data: cx.data().clone(),
            });
        }
        match &self.effect {
            Effect::Nothing => {}
            Effect::Render(messages) => {
                cx.render(messages).await?;
            }
            Effect::Notify { text, keep_state } => cx.notify(text, false, *keep_state).await?,
            Effect::GoBack => {
                cx.go_back().await?;
            }
            Effect::Fail => return Err(BotError::handler("scripted failure")),
        }
        Ok(self.flow)
    }
}

// ============================================================================
// Mock transport
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    Send {
        chat: ChatId,
        id: MessageId,
        message: OutgoingMessage,
    },
    Edit {
        chat: ChatId,
        id: MessageId,
        message: OutgoingMessage,
    },
    Delete {
        chat: ChatId,
        id: MessageId,
    },
    Answer {
        callback_id: String,
        text: String,
        alert: bool,
    },
}

/// Transport that records every call
#[allow(dead_code)]
pub struct MockTransport {
    next_id: AtomicI64,
    fail_deletes: AtomicBool,
    calls: Mutex<Vec<TransportCall>>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(100),
            fail_deletes: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make every deletion report "not deleted"
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn count(&self, pred: impl Fn(&TransportCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn send_count(&self) -> usize {
        self.count(|c| matches!(c, TransportCall::Send { .. }))
    }

    pub fn edit_count(&self) -> usize {
        self.count(|c| matches!(c, TransportCall::Edit { .. }))
    }

    pub fn delete_count(&self) -> usize {
        self.count(|c| matches!(c, TransportCall::Delete { .. }))
    }

    /// Texts of sent messages, in order
    pub fn sent_texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                TransportCall::Send { message, .. } => Some(message.text.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send_message(
        &self,
        chat: ChatId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, TransportError> {
        let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.calls.lock().unwrap().push(TransportCall::Send {
            chat,
            id,
            message: message.clone(),
        });
        Ok(id)
    }

    async fn edit_message_text(
        &self,
        chat: ChatId,
        id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<EditOutcome, TransportError> {
        self.calls.lock().unwrap().push(TransportCall::Edit {
            chat,
            id,
            message: message.clone(),
        });
        Ok(EditOutcome::Edited)
    }

    async fn delete_message(&self, chat: ChatId, id: MessageId) -> Result<bool, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(TransportCall::Delete { chat, id });
        Ok(!self.fail_deletes.load(Ordering::SeqCst))
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: &str,
        alert: bool,
    ) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push(TransportCall::Answer {
            callback_id: callback_id.to_string(),
            text: text.to_string(),
            alert,
        });
        Ok(())
    }
}

// ============================================================================
// Recording observer
// ============================================================================

#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<DispatchEvent>>,
}

#[allow(dead_code)]
impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Observer for RecordingObserver {
    fn on_event(&self, event: &DispatchEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// Bot fixture
// ============================================================================

/// Bot over an in-memory store with handles on its collaborators
#[allow(dead_code)]
pub struct TestBot {
    pub bot: Bot<TestSchema>,
    pub store: Arc<MemoryStore>,
    pub transport: Arc<MockTransport>,
    pub observer: Arc<RecordingObserver>,
}

#[allow(dead_code)]
pub fn test_bot(routes: Vec<Route<TestSchema>>, config: BotConfig<TestSchema>) -> TestBot {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(MockTransport::new());
    let observer = Arc::new(RecordingObserver::new());
    let bot = Bot::builder(
        RouteRegistry::new(routes).unwrap(),
        config,
        transport.clone() as Arc<dyn ChatTransport>,
    )
    .store(store.clone() as Arc<dyn SessionStore>)
    .observer(observer.clone() as Arc<dyn Observer>)
    .build()
    .unwrap();
    TestBot {
        bot,
        store,
        transport,
        observer,
    }
}
