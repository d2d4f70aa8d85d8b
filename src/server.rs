//! HTTP endpoint layer.
//!
//! Routes:
//!
//! - `GET /` liveness probe
//! - `POST /generate` with `{"script": "..."}` returns `image/png`
//! - `OPTIONS *` CORS preflight
//!
//! Every response allows any origin. Requests are served by a fixed pool of
//! worker threads pulling from one listener; nothing is shared between
//! requests except the renderer, which is stateless.

use crate::pipeline::generate_png;
use crate::{Error, Renderer, Result};
use log::{info, warn};
use serde::Serialize;
use std::io::Read;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tiny_http::{Header, Method, Request, Response};

pub const STATUS_MESSAGE: &str = "DM Image Generator is running";

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type";

/// Pause after a failed accept so a persistent error (e.g. EMFILE) cannot spin
const RECV_BACKOFF: Duration = Duration::from_millis(100);

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind; 0 picks a free one
    pub port: u16,
    /// Number of request-handling threads
    pub workers: usize,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
            workers: num_cpus::get(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// A reply produced by [`route`], independent of the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    /// Whether this is a CORS preflight answer
    pub preflight: bool,
}

impl Reply {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
        Self { status, content_type: "application/json", body, preflight: false }
    }

    fn error(status: u16, message: &str) -> Self {
        Self::json(status, &ErrorBody { error: message })
    }

    fn png(body: Vec<u8>) -> Self {
        Self { status: 200, content_type: "image/png", body, preflight: false }
    }

    fn preflight() -> Self {
        Self { status: 204, content_type: "text/plain", body: Vec::new(), preflight: true }
    }
}

#[derive(Serialize)]
struct StatusBody<'a> {
    status: &'a str,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// Dispatch one request. `body` is the raw request body.
pub fn route<R: Renderer + ?Sized>(method: &Method, path: &str, body: &[u8], renderer: &R) -> Reply {
    // Query strings never select a different route
    let path = path.split('?').next().unwrap_or(path);

    match (method, path) {
        (Method::Options, _) => Reply::preflight(),
        (Method::Get, "/") | (Method::Head, "/") => {
            Reply::json(200, &StatusBody { status: STATUS_MESSAGE })
        }
        (Method::Post, "/generate") => generate(body, renderer),
        (_, "/") | (_, "/generate") => Reply::error(405, "Method not allowed"),
        _ => Reply::error(404, "Not found"),
    }
}

fn generate<R: Renderer + ?Sized>(body: &[u8], renderer: &R) -> Reply {
    let payload: serde_json::Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => return Reply::error(400, "Invalid JSON body"),
    };

    let Some(script) = payload.get("script").and_then(|s| s.as_str()) else {
        return Reply::error(400, "No script provided");
    };

    match generate_png(renderer, script) {
        Ok(png) => Reply::png(png),
        Err(e) => {
            warn!("Render failed: {}", e);
            Reply::error(500, &e.to_string())
        }
    }
}

/// HTTP server bound to a socket, not yet serving
pub struct Server {
    http: Arc<tiny_http::Server>,
    stopping: Arc<AtomicBool>,
    renderer: Arc<dyn Renderer>,
    config: ServerConfig,
}

impl Server {
    /// Bind the listening socket
    pub fn bind(config: ServerConfig, renderer: Arc<dyn Renderer>) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port);
        let http = tiny_http::Server::http(&addr)
            .map_err(|e| Error::ConfigError(format!("Failed to bind {}: {}", addr, e)))?;

        Ok(Self {
            http: Arc::new(http),
            stopping: Arc::new(AtomicBool::new(false)),
            renderer,
            config,
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.http.server_addr().to_ip()
    }

    /// Serve requests until the listener is shut down. Blocks.
    pub fn run(self) -> Result<()> {
        let workers = self.start_workers()?;
        for handle in workers {
            let _ = handle.join();
        }
        Ok(())
    }

    /// Serve requests on background threads
    pub fn spawn(self) -> Result<ServerHandle> {
        let addr = self.local_addr();
        let http = self.http.clone();
        let stopping = self.stopping.clone();
        let workers = self.start_workers()?;
        Ok(ServerHandle { http, stopping, addr, workers })
    }

    fn start_workers(&self) -> Result<Vec<JoinHandle<()>>> {
        let count = self.config.workers.max(1);
        info!(
            "Listening on {} with {} worker(s)",
            self.http.server_addr(),
            count
        );

        (0..count)
            .map(|i| {
                let http = self.http.clone();
                let stopping = self.stopping.clone();
                let renderer = self.renderer.clone();
                let max_body = self.config.max_body_bytes;
                std::thread::Builder::new()
                    .name(format!("http-worker-{}", i))
                    .spawn(move || worker_loop(&http, &stopping, renderer.as_ref(), max_body))
                    .map_err(|e| Error::Other(format!("Failed to spawn http worker: {}", e)))
            })
            .collect()
    }
}

/// Handle to a server started with [`Server::spawn`]
pub struct ServerHandle {
    http: Arc<tiny_http::Server>,
    stopping: Arc<AtomicBool>,
    addr: Option<SocketAddr>,
    workers: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    /// Stop accepting requests and wait for in-flight ones to finish
    pub fn shutdown(self) {
        self.stopping.store(true, Ordering::SeqCst);
        for _ in &self.workers {
            self.http.unblock();
        }
        for handle in self.workers {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    http: &tiny_http::Server,
    stopping: &AtomicBool,
    renderer: &dyn Renderer,
    max_body: usize,
) {
    loop {
        match http.recv() {
            Ok(request) => handle_request(request, renderer, max_body),
            Err(e) if should_stop(stopping, &e) => break,
            Err(_) => {}
        }
    }
}

/// Decide what to do after `recv` failed. `unblock` surfaces as a receive
/// error, so a set `stopping` flag means shutdown; anything else is logged
/// and followed by a back-off.
fn should_stop(stopping: &AtomicBool, err: &std::io::Error) -> bool {
    if stopping.load(Ordering::SeqCst) {
        return true;
    }
    warn!("Failed to receive request: {}", err);
    std::thread::sleep(RECV_BACKOFF);
    false
}

fn handle_request(mut request: Request, renderer: &dyn Renderer, max_body: usize) {
    let started = Instant::now();
    let method = request.method().clone();
    let url = request.url().to_string();

    let reply = match read_body(&mut request, max_body) {
        Ok(Some(body)) => route(&method, &url, &body, renderer),
        Ok(None) => Reply::error(413, "Request body too large"),
        Err(e) => {
            warn!("Failed to read request body: {}", e);
            Reply::error(400, "Unreadable request body")
        }
    };

    let status = reply.status;
    if let Err(e) = request.respond(into_response(reply)) {
        warn!("Failed to send response for {} {}: {}", method, url, e);
    }
    info!("{} {} -> {} in {:?}", method, url, status, started.elapsed());
}

/// Read at most `limit` bytes; `None` if the body is larger
fn read_body(request: &mut Request, limit: usize) -> std::io::Result<Option<Vec<u8>>> {
    let mut body = Vec::new();
    request
        .as_reader()
        .take(limit as u64 + 1)
        .read_to_end(&mut body)?;
    if body.len() > limit {
        return Ok(None);
    }
    Ok(Some(body))
}

fn into_response(reply: Reply) -> Response<std::io::Cursor<Vec<u8>>> {
    let mut headers = vec![
        ("Content-Type", reply.content_type),
        ("Access-Control-Allow-Origin", "*"),
    ];
    if reply.preflight {
        headers.push(("Access-Control-Allow-Methods", ALLOWED_METHODS));
        headers.push(("Access-Control-Allow-Headers", ALLOWED_HEADERS));
    }

    let mut response = Response::from_data(reply.body).with_status_code(reply.status);
    for (name, value) in headers {
        if let Ok(h) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            response.add_header(h);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;

    struct Fake {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Fake {
        fn new(fail: bool) -> Self {
            Self { calls: AtomicUsize::new(0), fail }
        }
    }

    impl Renderer for Fake {
        fn render_to_file(&self, _html: &str, out: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::LaunchError("chrome missing".into()));
            }
            std::fs::write(out, b"\x89PNG\r\n\x1a\n")?;
            Ok(())
        }
    }

    fn json(reply: &Reply) -> serde_json::Value {
        serde_json::from_slice(&reply.body).unwrap()
    }

    #[test]
    fn liveness() {
        let fake = Fake::new(false);
        let reply = route(&Method::Get, "/", b"", &fake);
        assert_eq!(reply.status, 200);
        assert_eq!(json(&reply)["status"], STATUS_MESSAGE);
    }

    #[test]
    fn missing_script_never_renders() {
        let fake = Fake::new(false);
        let bodies: [&[u8]; 4] = [b"{}", br#"{"script": null}"#, br#"{"script": 7}"#, b"[1,2]"];
        for body in bodies {
            let reply = route(&Method::Post, "/generate", body, &fake);
            assert_eq!(reply.status, 400);
            assert_eq!(json(&reply)["error"], "No script provided");
        }
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn malformed_json_is_a_client_error() {
        let fake = Fake::new(false);
        let reply = route(&Method::Post, "/generate", b"script=R) hi", &fake);
        assert_eq!(reply.status, 400);
        assert_eq!(json(&reply)["error"], "Invalid JSON body");
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_script_renders() {
        let fake = Fake::new(false);
        let reply = route(&Method::Post, "/generate", br#"{"script": ""}"#, &fake);
        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type, "image/png");
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn render_failure_carries_message() {
        let fake = Fake::new(true);
        let reply = route(&Method::Post, "/generate", br#"{"script": "R) hi"}"#, &fake);
        assert_eq!(reply.status, 500);
        assert_eq!(json(&reply)["error"], "Browser launch failed: chrome missing");
    }

    #[test]
    fn routing_errors() {
        let fake = Fake::new(false);
        assert_eq!(route(&Method::Get, "/generate", b"", &fake).status, 405);
        assert_eq!(route(&Method::Get, "/nope", b"", &fake).status, 404);
        assert_eq!(route(&Method::Get, "/?probe=1", b"", &fake).status, 200);

        let pre = route(&Method::Options, "/generate", b"", &fake);
        assert_eq!(pre.status, 204);
        assert!(pre.preflight);
    }

    #[test]
    fn receive_errors_back_off_unless_stopping() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "Too many open files");

        let running = AtomicBool::new(false);
        let started = Instant::now();
        assert!(!should_stop(&running, &err));
        assert!(started.elapsed() >= RECV_BACKOFF);

        let stopping = AtomicBool::new(true);
        let started = Instant::now();
        assert!(should_stop(&stopping, &err));
        assert!(started.elapsed() < RECV_BACKOFF);
    }

    #[test]
    fn default_config_binds_all_interfaces() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 10000);
        assert!(cfg.workers >= 1);
    }
}
