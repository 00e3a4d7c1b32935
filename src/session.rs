//! Per-chat session: state stack, state data, resend flag and the
//! rendered-message cache, all persisted through a [`SessionStore`].

#[cfg(test)]
mod proptests;

use crate::message::{ChatId, RenderedMessage};
use crate::route::Key;
use crate::store::{SessionStore, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;

/// Stack entry meaning "no route active"
pub const EMPTY_STATE: &str = "$empty";

/// Decoded state stack element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackEntry<R> {
    Route(R),
    Empty,
}

impl<R: Key> StackEntry<R> {
    pub fn as_str(self) -> &'static str {
        match self {
            StackEntry::Route(route) => route.name(),
            StackEntry::Empty => EMPTY_STATE,
        }
    }

    /// `None` for entries that name no known route
    pub fn parse(raw: &str) -> Option<Self> {
        if raw == EMPTY_STATE {
            Some(StackEntry::Empty)
        } else {
            R::parse(raw).map(StackEntry::Route)
        }
    }

    pub fn route(self) -> Option<R> {
        match self {
            StackEntry::Route(route) => Some(route),
            StackEntry::Empty => None,
        }
    }

    pub fn is_empty(self) -> bool {
        matches!(self, StackEntry::Empty)
    }
}

/// State-scoped data blob: reserved paging fields plus caller fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateData {
    #[serde(rename = "$page", default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(rename = "$search", default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StateData {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.page.is_none() && self.search.is_none() && self.fields.is_empty()
    }
}

/// Handle on one chat's persisted session
pub struct Session<R> {
    store: Arc<dyn SessionStore>,
    chat_id: ChatId,
    _route: PhantomData<fn() -> R>,
}

impl<R> Clone for Session<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            chat_id: self.chat_id,
            _route: PhantomData,
        }
    }
}

impl<R: Key> Session<R> {
    pub fn new(store: Arc<dyn SessionStore>, chat_id: ChatId) -> Self {
        Self {
            store,
            chat_id,
            _route: PhantomData,
        }
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    fn stack_key(&self) -> String {
        format!("chat:{}:states", self.chat_id)
    }

    fn state_data_key(&self) -> String {
        format!("chat:{}:state_data", self.chat_id)
    }

    fn resend_key(&self) -> String {
        format!("chat:{}:resend", self.chat_id)
    }

    fn rendered_key(&self) -> String {
        format!("chat:{}:rendered", self.chat_id)
    }

    // ========================================================================
    // State stack
    // ========================================================================

    /// Raw stack contents, oldest first
    pub async fn states(&self) -> StoreResult<Vec<String>> {
        self.store.list_range(&self.stack_key(), 0, -1).await
    }

    /// Tail of the stack. Unknown entries surface as `None`.
    pub async fn current(&self) -> StoreResult<Option<StackEntry<R>>> {
        let raw = self.store.list_index(&self.stack_key(), -1).await?;
        Ok(raw.as_deref().and_then(StackEntry::parse))
    }

    /// Current route; `None` for an empty stack, the empty sentinel or an
    /// unknown entry
    pub async fn current_route(&self) -> StoreResult<Option<R>> {
        Ok(self.current().await?.and_then(StackEntry::route))
    }

    /// Element just before the tail
    pub async fn previous(&self) -> StoreResult<Option<StackEntry<R>>> {
        let raw = self.store.list_index(&self.stack_key(), -2).await?;
        Ok(raw.as_deref().and_then(StackEntry::parse))
    }

    /// `(previous, current)` read in one round trip
    pub async fn previous_and_current(
        &self,
    ) -> StoreResult<(Option<StackEntry<R>>, Option<StackEntry<R>>)> {
        let tail = self.store.list_range(&self.stack_key(), -2, -1).await?;
        Ok(match tail.as_slice() {
            [prev, curr] => (StackEntry::parse(prev), StackEntry::parse(curr)),
            [curr] => (None, StackEntry::parse(curr)),
            _ => (None, None),
        })
    }

    /// Push `route` unless it already is the tail. Returns whether it was pushed.
    pub async fn push(&self, route: R) -> StoreResult<bool> {
        self.push_entry(StackEntry::Route(route)).await
    }

    pub async fn push_empty(&self) -> StoreResult<bool> {
        self.push_entry(StackEntry::Empty).await
    }

    async fn push_entry(&self, entry: StackEntry<R>) -> StoreResult<bool> {
        let key = self.stack_key();
        let tail = self.store.list_index(&key, -1).await?;
        if tail.as_deref() == Some(entry.as_str()) {
            return Ok(false);
        }
        self.store.list_push_tail(&key, entry.as_str()).await?;
        Ok(true)
    }

    /// Remove the tail, returning its raw value
    pub async fn pop(&self) -> StoreResult<Option<String>> {
        self.store.list_pop_tail(&self.stack_key()).await
    }

    /// Pop until `target` itself has been popped or the stack runs out.
    /// Returns the number of popped entries.
    pub async fn pop_through(&self, target: R) -> StoreResult<usize> {
        let key = self.stack_key();
        let mut popped = 0;
        while let Some(raw) = self.store.list_pop_tail(&key).await? {
            popped += 1;
            if raw == target.name() {
                break;
            }
        }
        Ok(popped)
    }

    /// Drop the stack, all state data, the resend flag and the rendered cache
    pub async fn clear(&self) -> StoreResult<()> {
        for key in [
            self.stack_key(),
            self.state_data_key(),
            self.resend_key(),
            self.rendered_key(),
        ] {
            self.store.delete(&key).await?;
        }
        Ok(())
    }

    // ========================================================================
    // State data
    // ========================================================================

    /// Stored data of `route`. Missing or corrupt data reads as empty.
    pub async fn state_data(&self, route: R) -> StoreResult<StateData> {
        let raw = self.store.hash_get(&self.state_data_key(), route.name()).await?;
        let Some(raw) = raw else {
            return Ok(StateData::default());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(chat_id = %self.chat_id, route = route.name(), error = %e, "Corrupt state data, treating as empty");
            StateData::default()
        }))
    }

    pub async fn set_state_data(&self, route: R, data: &StateData) -> StoreResult<()> {
        let encoded = serde_json::to_string(data)
            .map_err(|e| crate::store::StoreError::Backend(e.to_string()))?;
        self.store
            .hash_set(&self.state_data_key(), route.name(), &encoded)
            .await
    }

    pub async fn delete_state_data(&self, route: R) -> StoreResult<bool> {
        self.store
            .hash_delete_field(&self.state_data_key(), route.name())
            .await
    }

    // ========================================================================
    // Resend flag
    // ========================================================================

    pub async fn resend_flag(&self) -> StoreResult<bool> {
        Ok(self.store.string_get(&self.resend_key()).await?.as_deref() == Some("true"))
    }

    pub async fn set_resend_flag(&self) -> StoreResult<()> {
        self.store.string_set(&self.resend_key(), "true").await
    }

    pub async fn clear_resend_flag(&self) -> StoreResult<()> {
        self.store.delete(&self.resend_key()).await.map(|_| ())
    }

    // ========================================================================
    // Rendered message cache
    // ========================================================================

    /// What the chat currently displays. Corrupt cache reads as empty.
    pub async fn rendered(&self) -> StoreResult<Vec<RenderedMessage>> {
        let Some(raw) = self.store.string_get(&self.rendered_key()).await? else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(chat_id = %self.chat_id, error = %e, "Corrupt rendered-message cache, treating as empty");
            Vec::new()
        }))
    }

    pub async fn set_rendered(&self, messages: &[RenderedMessage]) -> StoreResult<()> {
        let encoded = serde_json::to_string(messages)
            .map_err(|e| crate::store::StoreError::Backend(e.to_string()))?;
        self.store.string_set(&self.rendered_key(), &encoded).await
    }
}
