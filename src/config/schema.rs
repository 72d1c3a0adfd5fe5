//! Relay option schema.
//!
//! This module defines the user-facing option bag for a mounted relay.
//! Fields deserialize from the host's own config files; predicates are
//! supplied in code.

use std::fmt;
use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Deserializer};

/// Options for a mounted relay instance.
///
/// `backend` is required; everything else has a default. Validation and
/// normalization happen once, in [`RelayConfig::new`](crate::config::RelayConfig::new).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayOptions {
    /// Base URL of the backend to relay requests to (http only).
    pub backend: String,

    /// Append the inbound request path to the backend path. When false the
    /// backend's own path is used verbatim, ignoring the inbound path.
    pub use_path: bool,

    /// Content type treated as structured and parsed into the request
    /// context. Matched case-insensitively, with or without a utf-8 charset
    /// suffix.
    pub required_content_type: String,

    /// Context key the parsed backend payload is stored under.
    pub key: String,

    /// Replace the outbound Host header with the backend's host, preserving
    /// the inbound value under `x-orig-host`.
    pub change_host: bool,

    /// Which backend error statuses are raised locally instead of streamed.
    pub intercept_errors: InterceptErrors,

    /// Extra backend headers copied through verbatim on pass-through
    /// responses, surviving collisions with locally-set headers.
    pub backend_headers: Option<Vec<String>>,
}

impl RelayOptions {
    /// Options for `backend` with everything else defaulted.
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            ..Self::default()
        }
    }
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            backend: String::new(),
            use_path: true,
            required_content_type: "application/json".to_string(),
            key: "backendResponse".to_string(),
            change_host: false,
            intercept_errors: InterceptErrors::Disabled,
            backend_headers: None,
        }
    }
}

/// Which backend statuses are raised as local errors instead of streamed.
///
/// The boolean-or-predicate option as a tagged variant. Deserializes from a
/// boolean; [`InterceptErrors::custom`] wraps a predicate.
#[derive(Clone, Default)]
pub enum InterceptErrors {
    /// Nothing selected explicitly. Server errors (500-599) are still
    /// intercepted; supply `custom(|_, _| false)` to stream those too.
    #[default]
    Disabled,
    /// Intercept every client and server error status (400-599).
    Enabled,
    /// The predicate decides alone, server errors included.
    Custom(Arc<dyn Fn(StatusCode, &HeaderMap) -> bool + Send + Sync>),
}

impl InterceptErrors {
    /// Wrap a predicate over the backend status and headers.
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(StatusCode, &HeaderMap) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(predicate))
    }

    /// True if the policy raises this response as an error.
    pub fn intercepts(&self, status: StatusCode, headers: &HeaderMap) -> bool {
        match self {
            InterceptErrors::Disabled => status.is_server_error(),
            InterceptErrors::Enabled => status.is_client_error() || status.is_server_error(),
            InterceptErrors::Custom(predicate) => predicate(status, headers),
        }
    }
}

impl fmt::Debug for InterceptErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterceptErrors::Disabled => write!(f, "Disabled"),
            InterceptErrors::Enabled => write!(f, "Enabled"),
            InterceptErrors::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for InterceptErrors {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let enabled = bool::deserialize(deserializer)?;
        Ok(if enabled {
            InterceptErrors::Enabled
        } else {
            InterceptErrors::Disabled
        })
    }
}
