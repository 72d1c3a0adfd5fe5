//! Outbound request construction and dispatch.
//!
//! # Responsibilities
//! - Build the outbound URI: backend scheme/authority, path per `use_path`
//! - Copy inbound headers; optionally rewrite Host, preserving the original
//! - Stream the inbound body to the backend without buffering
//!
//! # Design Decisions
//! - One pooled keep-alive client per mounted relay, built at mount time
//! - Transport failures are terminal for the call; retry policy is the host's

use axum::body::Body;
use axum::http::header::HOST;
use axum::http::request::Parts;
use axum::http::{Request, Response, Uri};
use hyper::body::Incoming;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;

use crate::config::RelayConfig;
use crate::error::RelayError;

/// Header carrying the original inbound Host when `change_host` is enabled.
pub const X_ORIG_HOST: &str = "x-orig-host";

/// The outbound path-and-query for an inbound request target.
pub(crate) fn outbound_path(config: &RelayConfig, inbound: &Uri) -> String {
    if config.use_path {
        let target = inbound
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| inbound.path());
        format!("{}{}", config.base_path, target)
    } else {
        config.backend.path().to_string()
    }
}

/// Build the outbound request from the inbound parts, moving the body over
/// unread so it streams to the backend.
pub(crate) fn build_outbound(
    config: &RelayConfig,
    parts: &Parts,
    body: Body,
) -> Result<Request<Body>, RelayError> {
    let target = format!(
        "http://{}{}",
        config.backend_authority,
        outbound_path(config, &parts.uri)
    );
    let uri = Uri::try_from(target).map_err(|e| RelayError::Transport {
        source: Box::new(e),
    })?;

    let mut builder = Request::builder().method(parts.method.clone()).uri(uri);
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in parts.headers.iter() {
            headers.append(name.clone(), value.clone());
        }
        if config.change_host {
            let original = headers.get(HOST).cloned();
            headers.insert(HOST, config.host_header.clone());
            if let Some(original) = original {
                headers.insert(X_ORIG_HOST, original);
            }
        }
    }

    builder.body(body).map_err(|e| RelayError::Transport {
        source: Box::new(e),
    })
}

/// Send the outbound request over the shared keep-alive pool.
pub(crate) async fn forward(
    client: &Client<HttpConnector, Body>,
    request: Request<Body>,
) -> Result<Response<Incoming>, RelayError> {
    client.request(request).await.map_err(|e| RelayError::Transport {
        source: Box::new(e),
    })
}
