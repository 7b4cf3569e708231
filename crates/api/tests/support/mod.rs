//! In-process stand-in for the cloud facade.
//!
//! Responses are scripted per `METHOD path`. Each request pops the next
//! scripted response; the last one for a route repeats forever. Every request
//! is recorded for assertions.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use cfacade_api::{FacadeClient, FacadeConfig, ReadinessProbe};
use cfacade_types::Ticket;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const TICKET: &str = "tkt";
/// `Basic base64(":tkt")`
pub const TICKET_AUTHORIZATION: &str = "Basic OnRrdA==";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Default)]
struct Script {
    routes: HashMap<String, VecDeque<(StatusCode, String)>>,
    requests: Vec<RecordedRequest>,
}

type SharedScript = Arc<Mutex<Script>>;

pub struct MockFacade {
    address: SocketAddr,
    script: SharedScript,
    server: JoinHandle<()>,
}

impl MockFacade {
    pub async fn start() -> Self {
        let script = SharedScript::default();
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock facade");
        let address = listener.local_addr().expect("mock facade address");
        let router = Router::new().fallback(handle).with_state(Arc::clone(&script));
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Self { address, script, server }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.address)
    }

    pub fn config(&self) -> FacadeConfig {
        FacadeConfig::new(self.base_url())
    }

    pub fn client(&self) -> FacadeClient {
        FacadeClient::new(self.config()).expect("client for mock facade")
    }

    pub fn probe(&self) -> ReadinessProbe {
        ReadinessProbe::new(&self.config()).expect("probe for mock facade")
    }

    /// Queue a response for `method path`.
    pub fn respond(&self, method: Method, path: &str, status: u16, body: &str) -> &Self {
        let status = StatusCode::from_u16(status).expect("valid status");
        self.script
            .lock()
            .expect("script lock")
            .routes
            .entry(route_key(&method, path))
            .or_default()
            .push_back((status, body.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script.lock().expect("script lock").requests.clone()
    }

    pub fn hits(&self, method: Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }
}

impl Drop for MockFacade {
    fn drop(&mut self) {
        self.server.abort();
    }
}

pub fn ticket() -> Ticket {
    Ticket::new(TICKET)
}

/// A URL on localhost where nothing is listening.
pub fn unreachable_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let address = listener.local_addr().expect("ephemeral address");
    drop(listener);
    format!("http://{address}")
}

fn route_key(method: &Method, path: &str) -> String {
    format!("{method} {path}")
}

async fn handle(State(script): State<SharedScript>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> (StatusCode, String) {
    let header_value = |name: header::HeaderName| headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_string);
    let mut script = script.lock().expect("script lock");
    script.requests.push(RecordedRequest {
        method: method.clone(),
        path: uri.path().to_string(),
        authorization: header_value(header::AUTHORIZATION),
        content_type: header_value(header::CONTENT_TYPE),
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    match script.routes.get_mut(&route_key(&method, uri.path())) {
        Some(queue) if queue.len() > 1 => queue.pop_front().expect("non-empty queue"),
        Some(queue) => queue
            .front()
            .cloned()
            .unwrap_or((StatusCode::NOT_FOUND, "unscripted".to_string())),
        None => (StatusCode::NOT_FOUND, "unscripted".to_string()),
    }
}
