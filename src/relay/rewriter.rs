//! Pass-through response assembly.
//!
//! # Responsibilities
//! - Relay status, headers and body to the client unchanged
//! - Rewrite redirects pointing back at the backend to client-relative paths
//! - Re-set allow-listed backend headers individually after the bulk copy
//!
//! # Design Decisions
//! - The body is never read here; the client's consumption paces the backend,
//!   and a client disconnect drops the upstream stream
//! - Location host comparison is case-insensitive and port-aware
//! - Off-site redirects are forwarded untouched

use axum::body::Body;
use axum::http::header::LOCATION;
use axum::http::{HeaderMap, HeaderValue, Response};
use hyper::body::Incoming;
use url::Url;

use crate::config::RelayConfig;

/// Build the client response for the stream branch.
pub(crate) fn passthrough_response(
    config: &RelayConfig,
    backend_response: Response<Incoming>,
) -> Response<Body> {
    let (mut parts, body) = backend_response.into_parts();

    if parts.status.is_redirection() {
        rewrite_location(config, &mut parts.headers);
    }
    apply_backend_headers(config, &mut parts.headers);

    Response::from_parts(parts, Body::new(body))
}

/// Rewrite a Location that points back at the backend to a client-relative
/// reference: path + query + fragment. Off-site and relative locations are
/// left alone; so are responses with no Location at all.
pub(crate) fn rewrite_location(config: &RelayConfig, headers: &mut HeaderMap) {
    let location = match headers.get(LOCATION).and_then(|v| v.to_str().ok()) {
        Some(value) => value,
        None => return,
    };
    let target = match Url::parse(location) {
        Ok(url) => url,
        // Relative references cannot point at another host.
        Err(_) => return,
    };
    if !points_at_backend(config, &target) {
        return;
    }

    let mut relative = target.path().to_string();
    if let Some(query) = target.query() {
        relative.push('?');
        relative.push_str(query);
    }
    if let Some(fragment) = target.fragment() {
        relative.push('#');
        relative.push_str(fragment);
    }

    if let Ok(value) = HeaderValue::from_str(&relative) {
        headers.insert(LOCATION, value);
    }
}

/// Host and effective-port comparison against the configured backend.
fn points_at_backend(config: &RelayConfig, target: &Url) -> bool {
    let backend_host = match config.backend.host_str() {
        Some(host) => host,
        None => return false,
    };
    let target_host = match target.host_str() {
        Some(host) => host,
        None => return false,
    };
    target_host.eq_ignore_ascii_case(backend_host)
        && target.port_or_known_default() == config.backend.port_or_known_default()
}

/// Re-set each allow-listed backend header individually, after the bulk copy,
/// so their values win over anything set locally.
pub(crate) fn apply_backend_headers(config: &RelayConfig, headers: &mut HeaderMap) {
    for name in &config.backend_headers {
        let values: Vec<HeaderValue> = headers.get_all(name).iter().cloned().collect();
        if values.is_empty() {
            continue;
        }
        headers.remove(name);
        for value in values {
            headers.append(name, value);
        }
    }
}
