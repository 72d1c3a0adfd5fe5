//! Relay error taxonomy.
//!
//! # Responsibilities
//! - Classify terminal outcomes: transport, backend status, stream lifecycle, parse
//! - Render a minimal response while handing the host enough to render its own
//!
//! # Design Decisions
//! - Errors never cross the middleware boundary as panics or `Err` returns;
//!   every failure becomes a response carrying a `RelayFailure` extension
//! - Stream lifecycle errors are kept apart from transport errors: the
//!   connection worked, the response was cut short

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors produced while relaying a single request.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Connection-level failure talking to the backend.
    #[error("backend transport error: {source}")]
    Transport {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Backend answered with a status selected by the interception policy.
    #[error("backend responded with status {status}")]
    BackendStatus { status: StatusCode },

    /// Backend connection was aborted before the response could be read.
    #[error("stream aborted before the response could be read")]
    StreamAborted,

    /// Backend connection was closed before the response could be read.
    #[error("stream closed before the response could be read")]
    StreamClosed,

    /// Structured content type matched but the body was not valid JSON.
    #[error("failed to decode backend response: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },
}

impl RelayError {
    /// Status the relay reports for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Transport { .. } => StatusCode::BAD_GATEWAY,
            RelayError::BackendStatus { status } => *status,
            RelayError::StreamAborted | RelayError::StreamClosed => StatusCode::BAD_GATEWAY,
            RelayError::Parse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Failure class for logs and the host-facing record.
    pub fn kind(&self) -> FailureKind {
        match self {
            RelayError::Transport { .. } => FailureKind::Transport,
            RelayError::BackendStatus { .. } => FailureKind::BackendStatus,
            RelayError::StreamAborted => FailureKind::StreamAborted,
            RelayError::StreamClosed => FailureKind::StreamClosed,
            RelayError::Parse { .. } => FailureKind::Parse,
        }
    }
}

/// Failure classes surfaced to the host's error layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    BackendStatus,
    StreamAborted,
    StreamClosed,
    Parse,
}

impl FailureKind {
    /// Stable label for structured logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Transport => "transport",
            FailureKind::BackendStatus => "backend_status",
            FailureKind::StreamAborted => "stream_aborted",
            FailureKind::StreamClosed => "stream_closed",
            FailureKind::Parse => "parse",
        }
    }
}

/// Cloneable failure record attached to the response extensions.
///
/// The relay's own rendering is a bare status + message; hosts that want a
/// branded error page read this from the response in an outer layer.
#[derive(Debug, Clone)]
pub struct RelayFailure {
    pub kind: FailureKind,
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let failure = RelayFailure {
            kind: self.kind(),
            status: self.status(),
            message: self.to_string(),
        };
        let mut response = (failure.status, failure.message.clone()).into_response();
        response.extensions_mut().insert(failure);
        response
    }
}
