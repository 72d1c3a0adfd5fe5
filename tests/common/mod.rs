//! Shared utilities for integration testing: scriptable raw-TCP backends and
//! a host app with the relay mounted.

// Shared across test binaries; not every binary uses every helper.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use axum::{middleware, Json, Router};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use backend_relay::{relay_middleware, BackendPayloadExt, BackendRelay};

/// One scripted HTTP/1.1 exchange.
pub struct Script {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: ScriptBody,
}

impl Script {
    pub fn new(status: u16, body: ScriptBody) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn json(body: &str) -> Self {
        Self::new(200, ScriptBody::Full(body.to_string())).header("content-type", "application/json")
    }
}

pub enum ScriptBody {
    /// Content-Length body sent in one write.
    Full(String),
    /// Chunked transfer encoding, one chunk per element, flushed separately.
    Chunked(Vec<String>),
    /// Advertise a longer body, write these bytes, then drop the socket.
    Truncated(String),
}

/// Requests observed by a scripted backend: full head plus any body bytes.
pub type RequestLog = Arc<Mutex<Vec<String>>>;

/// Start a backend that answers every request from `script(call_index, addr)`,
/// where `addr` is the backend's own bound address (useful for self-referring
/// Location headers). Returns the address and the log of received requests.
pub async fn start_scripted_backend<F>(script: F) -> (SocketAddr, RequestLog)
where
    F: Fn(usize, SocketAddr) -> Script + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let log_out = log.clone();
    let script = Arc::new(script);
    let counter = Arc::new(AtomicUsize::new(0));

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let script = script.clone();
                    let log = log.clone();
                    let counter = counter.clone();
                    tokio::spawn(async move {
                        // Keep-alive: the relay's pooled client reuses one
                        // socket for several requests.
                        loop {
                            let request = match read_request(&mut socket).await {
                                Some(request) => request,
                                None => break,
                            };
                            log.lock().unwrap().push(request);
                            let index = counter.fetch_add(1, Ordering::SeqCst);
                            if !write_script(&mut socket, &script(index, addr)).await {
                                break;
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, log_out)
}

/// Read one request (head + Content-Length body) off the socket.
async fn read_request(socket: &mut TcpStream) -> Option<String> {
    let mut data = Vec::new();
    let mut buf = [0u8; 1024];

    let head_end = loop {
        if let Some(pos) = find_head_end(&data) {
            break pos;
        }
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
    };

    let head = String::from_utf8_lossy(&data[..head_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);

    let mut body = data[head_end + 4..].to_vec();
    while body.len() < content_length {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => body.extend_from_slice(&buf[..n]),
        }
    }

    Some(format!("{}\r\n\r\n{}", head, String::from_utf8_lossy(&body)))
}

fn find_head_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}

async fn write_script(socket: &mut TcpStream, script: &Script) -> bool {
    let reason = match script.status {
        200 => "OK",
        204 => "No Content",
        302 => "Found",
        404 => "Not Found",
        418 => "I'm a teapot",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "OK",
    };
    let mut head = format!("HTTP/1.1 {} {}\r\n", script.status, reason);
    for (name, value) in &script.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }

    match &script.body {
        ScriptBody::Full(body) => {
            head.push_str(&format!("Content-Length: {}\r\n\r\n{}", body.len(), body));
            socket.write_all(head.as_bytes()).await.is_ok()
        }
        ScriptBody::Chunked(chunks) => {
            head.push_str("Transfer-Encoding: chunked\r\n\r\n");
            if socket.write_all(head.as_bytes()).await.is_err() {
                return false;
            }
            for chunk in chunks {
                let piece = format!("{:x}\r\n{}\r\n", chunk.len(), chunk);
                if socket.write_all(piece.as_bytes()).await.is_err()
                    || socket.flush().await.is_err()
                {
                    return false;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            socket.write_all(b"0\r\n\r\n").await.is_ok()
        }
        ScriptBody::Truncated(partial) => {
            head.push_str(&format!("Content-Length: {}\r\n\r\n{}", partial.len() + 1000, partial));
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.flush().await;
            let _ = socket.shutdown().await;
            false
        }
    }
}

/// Start a host app with the relay mounted. The downstream handler echoes the
/// payload stored under `key` as JSON, or 204 when none was attached.
pub async fn spawn_app(relay: BackendRelay, key: &'static str) -> SocketAddr {
    spawn_app_with(relay, key, |router| router).await
}

/// Like `spawn_app`, but lets the test wrap extra layers around the router
/// (layers added in `customize` run before the relay).
pub async fn spawn_app_with<F>(relay: BackendRelay, key: &'static str, customize: F) -> SocketAddr
where
    F: FnOnce(Router) -> Router,
{
    let relay = Arc::new(relay);
    let handler = move |request: Request<Body>| async move {
        match request.backend_payload(key) {
            Some(value) => Json(value.clone()).into_response(),
            None => StatusCode::NO_CONTENT.into_response(),
        }
    };

    let router = Router::new()
        .fallback(handler)
        .layer(middleware::from_fn_with_state(relay, relay_middleware));
    let router = customize(router);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// A reqwest client with pooling and redirects off, so every assertion sees
/// exactly what the relay produced.
pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

/// First request line of the n-th logged backend request.
pub fn request_line(log: &RequestLog, index: usize) -> String {
    let log = log.lock().unwrap();
    log[index].lines().next().unwrap_or_default().to_string()
}

/// Value of `header` in the n-th logged backend request, if present.
pub fn logged_header(log: &RequestLog, index: usize, header: &str) -> Option<String> {
    let log = log.lock().unwrap();
    log[index].lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.eq_ignore_ascii_case(header)
            .then(|| value.trim().to_string())
    })
}

pub fn logged_count(log: &RequestLog) -> usize {
    log.lock().unwrap().len()
}
