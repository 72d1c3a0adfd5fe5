//! The proxy relay: forwarder, classifier and rewriter acting as one
//! inbound-to-outbound translation unit.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → bypass check (payload already under `key`? → next, no network call)
//!     → forwarder.rs (outbound request over the pooled keep-alive client)
//!     → classifier.rs (intercept | parse | stream)
//!         intercept: structured error, body dropped unread
//!         parse:     body → JSON → request context → next
//!         stream:    rewriter.rs (redirect rewrite, header copy) → client
//! ```
//!
//! # Design Decisions
//! - One relay instance per mount; the pooled client lives as long as the
//!   mount and is shared by every in-flight call
//! - Every terminal error becomes a response; nothing unwinds past the relay

pub mod classifier;
pub mod forwarder;
pub mod rewriter;

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::request::Parts;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::config::{ConfigError, RelayConfig, RelayOptions};
use crate::context;
use crate::error::RelayError;
use crate::relay::classifier::Decision;

/// A mounted relay: validated configuration plus the shared keep-alive client.
pub struct BackendRelay {
    config: RelayConfig,
    client: Client<HttpConnector, Body>,
}

impl BackendRelay {
    /// Validate `options` and construct the relay with its connection pool.
    pub fn new(options: RelayOptions) -> Result<Self, ConfigError> {
        let config = RelayConfig::new(options)?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        tracing::debug!(backend = %config.backend, key = %config.key, "Backend relay mounted");
        Ok(Self { config, client })
    }

    /// The validated configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Relay one inbound request.
    ///
    /// Skips forwarding when a payload is already present under the
    /// configured key; otherwise forwards, classifies, and either continues
    /// downstream with the parsed payload attached or answers the client
    /// directly (pass-through or error).
    pub async fn handle(&self, request: Request<Body>, next: Next) -> Response {
        let key = &self.config.key;

        // An earlier stage (e.g. a mock) already produced the backend
        // response for this request.
        if context::has_payload(request.extensions(), key) {
            return next.run(request).await;
        }

        let (mut parts, body) = request.into_parts();

        let outbound = match forwarder::build_outbound(&self.config, &parts, body) {
            Ok(outbound) => outbound,
            Err(error) => return fail(&parts, error),
        };

        tracing::debug!(
            method = %parts.method,
            path = %parts.uri.path(),
            backend = %self.config.backend,
            "Relaying request"
        );

        let backend_response = match forwarder::forward(&self.client, outbound).await {
            Ok(response) => response,
            Err(error) => return fail(&parts, error),
        };

        let status = backend_response.status();
        match classifier::classify(&self.config, status, backend_response.headers()) {
            Decision::Intercept => {
                // Body dropped unread; the transport drains the connection.
                fail(&parts, RelayError::BackendStatus { status })
            }
            Decision::Parse => match classifier::read_json(backend_response.into_body()).await {
                Ok(value) => {
                    context::attach_payload(&mut parts.extensions, key, value);
                    next.run(Request::from_parts(parts, Body::empty())).await
                }
                Err(error) => fail(&parts, error),
            },
            Decision::Stream => rewriter::passthrough_response(&self.config, backend_response),
        }
    }
}

/// Log and render a terminal relay failure.
fn fail(parts: &Parts, error: RelayError) -> Response {
    tracing::warn!(
        method = %parts.method,
        path = %parts.uri.path(),
        kind = error.kind().as_str(),
        error = %error,
        "Relay failed"
    );
    error.into_response()
}

/// Middleware entry point for `axum::middleware::from_fn_with_state`.
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{middleware, routing::get, Router};
/// use backend_relay::{relay_middleware, BackendRelay, RelayOptions};
///
/// # fn main() -> Result<(), backend_relay::ConfigError> {
/// let relay = Arc::new(BackendRelay::new(RelayOptions::new("http://backend.local:3000"))?);
/// let app: Router = Router::new()
///     .route("/", get(|| async { "rendered" }))
///     .layer(middleware::from_fn_with_state(relay, relay_middleware));
/// # Ok(())
/// # }
/// ```
pub async fn relay_middleware(
    State(relay): State<Arc<BackendRelay>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    relay.handle(request, next).await
}
