//! Backend response classification.
//!
//! # Responsibilities
//! - Decide exactly one outcome per response: intercept, parse, or pass through
//! - Match the structured content type case-insensitively, charset suffix included
//! - Collect body chunks in arrival order and decode once the stream completes
//!
//! # Design Decisions
//! - Interception is evaluated before content-type, so error bodies are never
//!   parsed or piped
//! - Body reading runs through an explicit state machine with a single
//!   terminal transition; a close arriving after an abort is swallowed

use axum::body::Bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use serde_json::Value;

use crate::config::RelayConfig;
use crate::error::RelayError;

/// The three-way routing decision for a backend response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    /// Raise a structured error carrying the backend status.
    Intercept,
    /// Buffer and JSON-decode the body into the request context.
    Parse,
    /// Relay status, headers and body to the client unchanged.
    Stream,
}

/// Classify a backend response. Interception wins over content-type.
pub(crate) fn classify(config: &RelayConfig, status: StatusCode, headers: &HeaderMap) -> Decision {
    if config.intercept_errors.intercepts(status, headers) {
        return Decision::Intercept;
    }
    if matches_content_type(headers, &config.required_content_type) {
        return Decision::Parse;
    }
    Decision::Stream
}

/// True when the response content type equals `required` (already
/// lowercased), with or without a utf-8 charset suffix.
pub(crate) fn matches_content_type(headers: &HeaderMap, required: &str) -> bool {
    let value = match headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        Some(value) => value.to_ascii_lowercase(),
        None => return false,
    };
    value == required || value == format!("{}; charset=utf-8", required)
}

/// Read-side state of one in-flight backend body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadState {
    Reading,
    Completed,
    Aborted,
    Errored,
}

/// Signals observed while reading a backend body.
#[derive(Debug)]
pub(crate) enum ReadSignal {
    /// A body chunk arrived.
    Chunk(Bytes),
    /// The stream signalled completion.
    End,
    /// The stream reported an I/O error mid-read.
    Io(Box<dyn std::error::Error + Send + Sync>),
    /// The connection was aborted before completion.
    Aborted,
    /// The connection was closed before completion.
    Closed,
}

/// Terminal outcome of a body read.
#[derive(Debug)]
pub(crate) enum ReadOutcome {
    /// All chunks arrived; the concatenated body in arrival order.
    Complete(Vec<u8>),
    Failed(RelayError),
}

/// Collects one backend body, enforcing first-terminal-wins semantics.
#[derive(Debug)]
pub(crate) struct ResponseReader {
    state: ReadState,
    buffer: Vec<u8>,
}

impl ResponseReader {
    pub(crate) fn new() -> Self {
        Self {
            state: ReadState::Reading,
            buffer: Vec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> ReadState {
        self.state
    }

    /// Apply one signal. The terminal outcome is produced exactly once;
    /// signals arriving after a terminal transition are ignored.
    pub(crate) fn apply(&mut self, signal: ReadSignal) -> Option<ReadOutcome> {
        if self.state != ReadState::Reading {
            return None;
        }
        match signal {
            ReadSignal::Chunk(chunk) => {
                self.buffer.extend_from_slice(&chunk);
                None
            }
            ReadSignal::End => {
                self.state = ReadState::Completed;
                Some(ReadOutcome::Complete(std::mem::take(&mut self.buffer)))
            }
            ReadSignal::Io(source) => {
                self.state = ReadState::Errored;
                Some(ReadOutcome::Failed(RelayError::Transport { source }))
            }
            ReadSignal::Aborted => {
                self.state = ReadState::Aborted;
                Some(ReadOutcome::Failed(RelayError::StreamAborted))
            }
            ReadSignal::Closed => {
                self.state = ReadState::Errored;
                Some(ReadOutcome::Failed(RelayError::StreamClosed))
            }
        }
    }
}

/// Read the full body in arrival order and decode it as UTF-8 JSON.
pub(crate) async fn read_json(body: Incoming) -> Result<Value, RelayError> {
    let bytes = collect_body(body).await?;
    serde_json::from_slice(&bytes).map_err(|source| RelayError::Parse { source })
}

async fn collect_body(mut body: Incoming) -> Result<Vec<u8>, RelayError> {
    let mut reader = ResponseReader::new();
    loop {
        let outcome = match body.frame().await {
            Some(Ok(frame)) => match frame.into_data() {
                Ok(chunk) => reader.apply(ReadSignal::Chunk(chunk)),
                // Trailer frames carry no body bytes.
                Err(_) => None,
            },
            Some(Err(error)) => reader.apply(stream_signal(error)),
            None => reader.apply(ReadSignal::End),
        };
        match outcome {
            Some(ReadOutcome::Complete(bytes)) => return Ok(bytes),
            Some(ReadOutcome::Failed(error)) => return Err(error),
            None => continue,
        }
    }
}

/// Map a body read error onto its stream signal.
///
/// hyper reports cancellation and incomplete messages directly; connection
/// aborts surface as io errors on the source chain.
fn stream_signal(error: hyper::Error) -> ReadSignal {
    if error.is_canceled() {
        return ReadSignal::Aborted;
    }
    if error.is_incomplete_message() {
        return ReadSignal::Closed;
    }
    match find_io_kind(&error) {
        Some(std::io::ErrorKind::ConnectionAborted) | Some(std::io::ErrorKind::ConnectionReset) => {
            ReadSignal::Aborted
        }
        Some(std::io::ErrorKind::UnexpectedEof) => ReadSignal::Closed,
        _ => ReadSignal::Io(Box::new(error)),
    }
}

fn find_io_kind(error: &hyper::Error) -> Option<std::io::ErrorKind> {
    let mut source = std::error::Error::source(error);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        source = err.source();
    }
    None
}
