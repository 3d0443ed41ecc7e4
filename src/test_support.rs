// src/test_support.rs
// =============================================================================
// Helpers shared by the unit tests: local probe targets and fake
// collaborators. Compiled only for `cargo test`.
// =============================================================================

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Router;
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::checker::{Probe, ProbeOutcome};
use crate::store::{
    CheckRecord, CheckStore, KeyedEvent, NewCheck, NewPageView, PageView, PageViewStore, StoreError,
};

/// Requests seen by a test target, by method
#[derive(Debug, Default)]
pub struct Hits {
    pub head: AtomicUsize,
    pub get: AtomicUsize,
}

impl Hits {
    fn record(&self, method: &Method) {
        if *method == Method::HEAD {
            self.head.fetch_add(1, Ordering::SeqCst);
        } else if *method == Method::GET {
            self.get.fetch_add(1, Ordering::SeqCst);
        }
    }
}

pub struct TestTarget {
    addr: SocketAddr,
    pub hits: Arc<Hits>,
    pub connections: Arc<AtomicUsize>,
}

impl TestTarget {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

async fn bind_loopback() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

// Well-behaved target:
//   /ok -> 200, /moved -> 307 to /ok, /missing -> 404, anything else -> 500
pub async fn spawn_target() -> TestTarget {
    let (listener, addr) = bind_loopback().await;
    let hits = Arc::new(Hits::default());

    let app = Router::new().fallback(target_handler).with_state(hits.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestTarget {
        addr,
        hits,
        connections: Arc::new(AtomicUsize::new(0)),
    }
}

async fn target_handler(State(hits): State<Arc<Hits>>, method: Method, uri: Uri) -> Response {
    hits.record(&method);
    match uri.path() {
        "/ok" => StatusCode::OK.into_response(),
        "/moved" => Redirect::temporary("/ok").into_response(),
        "/missing" => StatusCode::NOT_FOUND.into_response(),
        _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

// Target that hangs up on HEAD without answering and serves `get_status`
// to GET
pub async fn spawn_head_rejecting_target(get_status: u16) -> TestTarget {
    let (listener, addr) = bind_loopback().await;
    let hits = Arc::new(Hits::default());
    let connections = Arc::new(AtomicUsize::new(0));

    let (task_hits, task_connections) = (hits.clone(), connections.clone());
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            task_connections.fetch_add(1, Ordering::SeqCst);
            let hits = task_hits.clone();
            tokio::spawn(async move {
                let head = read_request_head(&mut socket).await;
                if head.starts_with("HEAD") {
                    hits.record(&Method::HEAD);
                    return;
                }
                if head.starts_with("GET") {
                    hits.record(&Method::GET);
                }
                let response = format!(
                    "HTTP/1.1 {} Test\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok",
                    get_status
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    TestTarget { addr, hits, connections }
}

// Target that accepts connections and never answers
pub async fn spawn_silent_target() -> TestTarget {
    let (listener, addr) = bind_loopback().await;
    let connections = Arc::new(AtomicUsize::new(0));

    let task_connections = connections.clone();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            task_connections.fetch_add(1, Ordering::SeqCst);
            held.push(socket);
        }
    });

    TestTarget {
        addr,
        hits: Arc::new(Hits::default()),
        connections,
    }
}

async fn read_request_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Probe that answers every URL with the same status code
pub struct FixedProbe {
    status_code: u16,
    urls: Mutex<Vec<String>>,
}

impl FixedProbe {
    pub fn responding(status_code: u16) -> Self {
        Self {
            status_code,
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Probe for FixedProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        self.urls.lock().unwrap().push(url.to_string());
        ProbeOutcome::responded(self.status_code, 1, false)
    }
}

/// Probe that takes a little while and records when each call ran
pub struct TimedProbe {
    status_code: u16,
    spans: Mutex<Vec<(Instant, Instant)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl TimedProbe {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            spans: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn spans(&self) -> Vec<(Instant, Instant)> {
        self.spans.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Probe for TimedProbe {
    async fn probe(&self, _url: &str) -> ProbeOutcome {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let started = Instant::now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let finished = Instant::now();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.spans.lock().unwrap().push((started, finished));
        ProbeOutcome::responded(self.status_code, 10, false)
    }
}

/// Store whose every call fails
pub struct FailingStore;

impl CheckStore for FailingStore {
    fn insert_check(&self, _check: &NewCheck) -> Result<CheckRecord, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn recent_checks(&self, _limit: usize) -> Result<Vec<CheckRecord>, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn checks_for_domain(&self, _domain: &str, _limit: usize) -> Result<Vec<CheckRecord>, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn count_checks(&self, _since: Option<DateTime<Utc>>) -> Result<u64, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn check_domains_since(&self, _since: DateTime<Utc>, _limit: usize) -> Result<Vec<KeyedEvent>, StoreError> {
        Err(StoreError::Poisoned)
    }
}

impl PageViewStore for FailingStore {
    fn insert_page_view(&self, _view: &NewPageView) -> Result<PageView, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn count_page_views(&self, _since: Option<DateTime<Utc>>) -> Result<u64, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn page_paths_since(&self, _since: DateTime<Utc>, _limit: usize) -> Result<Vec<KeyedEvent>, StoreError> {
        Err(StoreError::Poisoned)
    }
}
