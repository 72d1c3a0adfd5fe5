//! Per-request payload context.
//!
//! # Responsibilities
//! - Carry parsed backend payloads on the request via `http::Extensions`
//! - Key payloads by the mount-time `key` option so multiple relays coexist
//! - Expose a read path for downstream handlers
//!
//! # Design Decisions
//! - Extensions are type-keyed, so a single store type holds the slots of
//!   every mounted stage; the configured key selects the slot within it
//! - A payload present under a relay's key is the bypass signal: an earlier
//!   stage (typically a mock) already produced the backend response

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{Extensions, Request};
use serde_json::Value;

/// String-keyed store for structured backend payloads.
#[derive(Debug, Clone, Default)]
pub struct BackendPayloads {
    entries: HashMap<String, Arc<Value>>,
}

impl BackendPayloads {
    /// True if a payload is present under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// The payload stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).map(Arc::as_ref)
    }

    /// Store a payload under `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), Arc::new(value));
    }
}

/// True if `extensions` already carries a payload under `key`.
pub(crate) fn has_payload(extensions: &Extensions, key: &str) -> bool {
    extensions
        .get::<BackendPayloads>()
        .map(|store| store.contains(key))
        .unwrap_or(false)
}

/// Store `value` under `key`, creating the store on first use.
pub(crate) fn attach_payload(extensions: &mut Extensions, key: &str, value: Value) {
    if let Some(store) = extensions.get_mut::<BackendPayloads>() {
        store.insert(key, value);
        return;
    }
    let mut store = BackendPayloads::default();
    store.insert(key, value);
    extensions.insert(store);
}

/// Read access to relayed payloads from downstream handlers.
pub trait BackendPayloadExt {
    /// The payload stored under `key`, if an upstream relay or mock set one.
    fn backend_payload(&self, key: &str) -> Option<&Value>;
}

impl<B> BackendPayloadExt for Request<B> {
    fn backend_payload(&self, key: &str) -> Option<&Value> {
        self.extensions()
            .get::<BackendPayloads>()
            .and_then(|store| store.get(key))
    }
}
