//! Backend relay middleware for axum applications.
//!
//! Transparently forwards inbound requests to a single configured backend,
//! then either parses a structured (JSON) response into the request context
//! for downstream handlers, or streams the backend's response straight
//! through to the client.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────┐
//!                      │                 BACKEND RELAY                   │
//!                      │                                                 │
//!   Inbound request    │  ┌───────────┐     ┌────────────┐              │
//!   ───────────────────┼─▶│  context  │────▶│ forwarder  │──────────────┼──▶ Backend
//!                      │  │  bypass?  │     │ (pooled    │              │
//!                      │  └─────┬─────┘     │  client)   │              │
//!                      │        │ hit       └─────┬──────┘              │
//!                      │        ▼                 ▼                     │
//!                      │   downstream      ┌────────────┐               │
//!                      │                   │ classifier │◀──────────────┼─── Backend
//!                      │                   └─────┬──────┘   response    │
//!                      │        ┌────────────────┼───────────────┐     │
//!                      │        ▼ parse          ▼ stream        ▼ err │
//!   Client response    │   downstream       ┌──────────┐    RelayError │
//!   ◀──────────────────┼──(payload attached)│ rewriter │───────────────┼──▶
//!                      │                    └──────────┘               │
//!                      └────────────────────────────────────────────────┘
//! ```
//!
//! The relay is a library component: it owns no listener, ports, or process
//! lifecycle. Mount it with `axum::middleware::from_fn_with_state`; errors
//! are rendered as minimal responses carrying a [`RelayFailure`] extension
//! for the host's own error layer.

// Core subsystems
pub mod config;
pub mod context;
pub mod error;
pub mod relay;

// Testing/dev collaborator
pub mod mock;

pub use config::{ConfigError, InterceptErrors, RelayConfig, RelayOptions};
pub use context::{BackendPayloadExt, BackendPayloads};
pub use error::{FailureKind, RelayError, RelayFailure};
pub use mock::{mock_middleware, MockOptions, MockResponses};
pub use relay::forwarder::X_ORIG_HOST;
pub use relay::{relay_middleware, BackendRelay};
