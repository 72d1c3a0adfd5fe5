//! File-system-backed mock responses.
//!
//! # Responsibilities
//! - Substitute a canned JSON payload for the relay during testing and dev
//! - Write the same context slot the relay checks, so forwarding is skipped
//!
//! # Design Decisions
//! - GET and POST only; other methods pass through untouched
//! - A missing fixture is not an error; the chain continues to the relay
//! - Fixture lookup never escapes the configured directory

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::context;

/// Options for the mock middleware.
#[derive(Debug, Clone)]
pub struct MockOptions {
    /// Directory holding `<path>_<method>.json` fixture files.
    pub directory: PathBuf,
    /// Context key parsed fixtures are stored under.
    pub key: String,
}

impl MockOptions {
    /// Serve fixtures from `directory` under the default relay key.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            key: "backendResponse".to_string(),
        }
    }
}

/// Mock stage mimicking the relay's parse branch from fixture files.
pub struct MockResponses {
    options: MockOptions,
}

impl MockResponses {
    /// Construct the mock stage.
    pub fn new(options: MockOptions) -> Self {
        tracing::warn!(
            directory = %options.directory.display(),
            "Mock backend responses enabled; never enable this in production"
        );
        Self { options }
    }

    /// Look up a fixture for this request; on a hit, attach the parsed
    /// payload and continue downstream as the relay would after a parse.
    pub async fn handle(&self, mut request: Request<Body>, next: Next) -> Response {
        let method = request.method().clone();
        if method != Method::GET && method != Method::POST {
            return next.run(request).await;
        }

        let fixture = match self.fixture_path(request.uri().path(), &method) {
            Some(fixture) => fixture,
            None => return next.run(request).await,
        };

        let bytes = match tokio::fs::read(&fixture).await {
            Ok(bytes) => bytes,
            // No fixture for this request; let the relay handle it.
            Err(_) => return next.run(request).await,
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                tracing::debug!(fixture = %fixture.display(), "Serving mock backend response");
                context::attach_payload(request.extensions_mut(), &self.options.key, value);
                next.run(request).await
            }
            Err(error) => {
                tracing::error!(
                    fixture = %fixture.display(),
                    error = %error,
                    "Failed to de-serialise mock response"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!(
                        "Error de-serialising mock response using file {}",
                        fixture.display()
                    ),
                )
                    .into_response()
            }
        }
    }

    /// `<directory>/<path>_<lowercased method>.json`, or None for paths that
    /// would escape the fixture directory.
    fn fixture_path(&self, path: &str, method: &Method) -> Option<PathBuf> {
        let trimmed = path.trim_start_matches('/');
        if trimmed.split('/').any(|segment| segment == "..") {
            return None;
        }
        let method = method.as_str().to_ascii_lowercase();
        Some(self.options.directory.join(format!("{}_{}.json", trimmed, method)))
    }
}

/// Middleware entry point for `axum::middleware::from_fn_with_state`.
pub async fn mock_middleware(
    State(mock): State<Arc<MockResponses>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    mock.handle(request, next).await
}
