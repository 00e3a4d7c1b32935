//! Button payload wire format
//!
//! Inline buttons carry an opaque callback string of at most
//! [`CALLBACK_DATA_LIMIT`] bytes. Payloads are encoded as compact JSON with
//! one-letter keys so the bound is rarely hit, and encoding fails loudly
//! when it is.

use crate::route::Key;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Maximum callback data length accepted by the transport, in bytes
pub const CALLBACK_DATA_LIMIT: usize = 64;

/// Reserved target of the universal go-back button
pub const BACK_TARGET: &str = "$back";

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Failed to encode button payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Button payload is {len} bytes, limit is {limit}: {encoded}")]
    TooLarge {
        len: usize,
        limit: usize,
        encoded: String,
    },
}

/// Decoded callback data of an inline button
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ButtonPayload {
    /// Target route name, or [`BACK_TARGET`]
    #[serde(rename = "t", default)]
    pub target: String,
    /// Sub-action of the target route
    #[serde(rename = "a", default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// `Some(false)` clears an active search
    #[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
    pub search: Option<bool>,
    /// Caller-defined fields
    #[serde(rename = "x", default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl ButtonPayload {
    pub fn route(route: impl Key) -> Self {
        Self {
            target: route.name().to_string(),
            ..Self::default()
        }
    }

    pub fn action(route: impl Key, action: impl Key) -> Self {
        Self {
            target: route.name().to_string(),
            action: Some(action.name().to_string()),
            ..Self::default()
        }
    }

    pub fn back() -> Self {
        Self {
            target: BACK_TARGET.to_string(),
            ..Self::default()
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_search(mut self, active: bool) -> Self {
        self.search = Some(active);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn is_back(&self) -> bool {
        self.target == BACK_TARGET
    }

    /// Typed target route, if the target names one
    pub fn target_route<R: Key>(&self) -> Option<R> {
        R::parse(&self.target)
    }

    /// Typed target action, if present and known
    pub fn target_action<A: Key>(&self) -> Option<A> {
        self.action.as_deref().and_then(A::parse)
    }

    /// Encode to callback data, enforcing [`CALLBACK_DATA_LIMIT`]
    pub fn encode(&self) -> Result<String, PayloadError> {
        let encoded = serde_json::to_string(self)?;
        if encoded.len() > CALLBACK_DATA_LIMIT {
            return Err(PayloadError::TooLarge {
                len: encoded.len(),
                limit: CALLBACK_DATA_LIMIT,
                encoded,
            });
        }
        Ok(encoded)
    }

    /// Decode callback data. Missing or malformed data yields an empty payload.
    pub fn decode(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::debug!(error = %e, raw, "Undecodable callback data, using empty payload");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestAction, TestRoute};

    #[test]
    fn test_compact_encoding() {
        let payload = ButtonPayload::route(TestRoute::Catalog).with_page(3);
        assert_eq!(payload.encode().unwrap(), r#"{"t":"catalog","p":3}"#);

        let payload = ButtonPayload::action(TestRoute::Item, TestAction::Like).with_field("id", 42);
        assert_eq!(
            payload.encode().unwrap(),
            r#"{"t":"item","a":"like","x":{"id":42}}"#
        );
    }

    #[test]
    fn test_decode_typed_targets() {
        let payload = ButtonPayload::decode(Some(r#"{"t":"item","a":"like","s":false}"#));
        assert_eq!(payload.target_route::<TestRoute>(), Some(TestRoute::Item));
        assert_eq!(payload.target_action::<TestAction>(), Some(TestAction::Like));
        assert_eq!(payload.search, Some(false));
        assert!(!payload.is_back());

        assert!(ButtonPayload::decode(Some(&ButtonPayload::back().encode().unwrap())).is_back());
    }

    #[test]
    fn test_malformed_data_decodes_to_empty() {
        assert_eq!(ButtonPayload::decode(Some("not json")), ButtonPayload::default());
        assert_eq!(ButtonPayload::decode(Some("[1,2]")), ButtonPayload::default());
        assert_eq!(ButtonPayload::decode(None), ButtonPayload::default());
        assert_eq!(ButtonPayload::default().target_route::<TestRoute>(), None);
    }

    #[test]
    fn test_size_bound_is_enforced() {
        let payload = ButtonPayload::route(TestRoute::Catalog)
            .with_field("comment", "x".repeat(CALLBACK_DATA_LIMIT));
        match payload.encode() {
            Err(PayloadError::TooLarge { len, limit, .. }) => {
                assert!(len > limit);
                assert_eq!(limit, CALLBACK_DATA_LIMIT);
            }
            other => panic!("Expected TooLarge, got {other:?}"),
        }
    }
}
