//! Option validation and normalization.
//!
//! # Responsibilities
//! - Parse the backend URL once; malformed URLs fail construction, not requests
//! - Normalize everything compared per-request (content type lowercased, base
//!   path trailing slash stripped, header names parsed)
//!
//! # Design Decisions
//! - Validation runs in `RelayConfig::new`; the relay never sees raw options
//! - Only http backends are accepted: the outbound client speaks plain TCP,
//!   matching the transport this relay is specified against

use std::fmt;

use axum::http::{HeaderName, HeaderValue};
use url::Url;

use crate::config::schema::{InterceptErrors, RelayOptions};

/// Error type for relay construction.
#[derive(Debug)]
pub enum ConfigError {
    /// The backend option is missing or not an absolute http URL.
    InvalidBackend { backend: String, reason: String },
    /// The context key is empty.
    EmptyKey,
    /// A `backend_headers` entry is not a valid header name.
    InvalidHeaderName { name: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidBackend { backend, reason } => {
                write!(f, "invalid backend URL '{}': {}", backend, reason)
            }
            ConfigError::EmptyKey => write!(f, "context key must not be empty"),
            ConfigError::InvalidHeaderName { name } => {
                write!(f, "invalid backend header name '{}'", name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validated, normalized relay configuration. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Parsed backend base URL.
    pub backend: Url,
    /// `host[:port]` of the backend, as sent on rewritten Host headers.
    pub backend_authority: String,
    /// Pre-built header value for `backend_authority`.
    pub host_header: HeaderValue,
    /// Backend base path with any trailing slash stripped.
    pub base_path: String,
    /// Required content type, lowercased.
    pub required_content_type: String,
    pub use_path: bool,
    pub key: String,
    pub change_host: bool,
    pub intercept_errors: InterceptErrors,
    /// Allow-listed backend header names; empty means none configured.
    pub backend_headers: Vec<HeaderName>,
}

impl RelayConfig {
    /// Validate and normalize `options`.
    pub fn new(options: RelayOptions) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidBackend {
            backend: options.backend.clone(),
            reason: reason.to_string(),
        };

        let backend = Url::parse(&options.backend)
            .map_err(|e| invalid(&e.to_string()))?;
        if backend.scheme() != "http" {
            return Err(invalid("only http backends are supported"));
        }
        let host = backend
            .host_str()
            .ok_or_else(|| invalid("missing host"))?
            .to_string();

        if options.key.is_empty() {
            return Err(ConfigError::EmptyKey);
        }

        let backend_authority = match backend.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host,
        };
        let host_header = HeaderValue::from_str(&backend_authority)
            .map_err(|_| invalid("host is not a valid header value"))?;

        let base_path = backend.path().trim_end_matches('/').to_string();
        let required_content_type = options.required_content_type.to_ascii_lowercase();

        let mut backend_headers = Vec::new();
        for name in options.backend_headers.unwrap_or_default() {
            let parsed = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ConfigError::InvalidHeaderName { name: name.clone() })?;
            backend_headers.push(parsed);
        }

        Ok(Self {
            backend,
            backend_authority,
            host_header,
            base_path,
            required_content_type,
            use_path: options.use_path,
            key: options.key,
            change_host: options.change_host,
            intercept_errors: options.intercept_errors,
            backend_headers,
        })
    }
}
