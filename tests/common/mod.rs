//! Shared utilities for integration testing: recording mock upstreams and
//! a gateway bound to an ephemeral port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use user_gateway::config::GatewayConfig;
use user_gateway::{HttpServer, Shutdown};

/// One request as seen by a mock upstream.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

type Responses = HashMap<(Method, String), (StatusCode, String)>;

/// Upstream stand-in that records every request and answers from a table.
/// Unprogrammed routes get `404 {"error":"not found"}`.
#[derive(Clone)]
pub struct MockUpstream {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
    responses: Arc<Mutex<Responses>>,
}

impl MockUpstream {
    pub async fn start() -> Self {
        let requests: Arc<Mutex<Vec<Recorded>>> = Arc::default();
        let responses: Arc<Mutex<Responses>> = Arc::default();

        let recorder = Arc::clone(&requests);
        let table = Arc::clone(&responses);
        let app = Router::new().fallback(
            move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
                let recorder = Arc::clone(&recorder);
                let table = Arc::clone(&table);
                async move {
                    let path = uri.path().to_string();
                    let reply = table
                        .lock()
                        .unwrap()
                        .get(&(method.clone(), path.clone()))
                        .cloned()
                        .unwrap_or((StatusCode::NOT_FOUND, r#"{"error":"not found"}"#.to_string()));

                    recorder.lock().unwrap().push(Recorded {
                        method,
                        path,
                        query: uri.query().map(str::to_string),
                        headers,
                        body,
                    });

                    (reply.0, [(CONTENT_TYPE, "application/json")], reply.1)
                }
            },
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            requests,
            responses,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: impl Into<String>) {
        self.responses.lock().unwrap().insert(
            (method, path.to_string()),
            (StatusCode::from_u16(status).unwrap(), body.into()),
        );
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    /// Poll until `count` requests have arrived or `timeout` elapses.
    pub async fn wait_for_requests(&self, count: usize, timeout: Duration) -> Vec<Recorded> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let seen = self.requests();
            if seen.len() >= count || tokio::time::Instant::now() >= deadline {
                return seen;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

/// URL of a port nothing listens on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// A running gateway. Dropping it shuts the server down.
pub struct TestGateway {
    pub url: String,
    pub client: reqwest::Client,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_gateway(auth: &str, profile: &str, orchestrator: &str) -> TestGateway {
    start_gateway_with(auth, profile, orchestrator, |_| {}).await
}

/// Like [`start_gateway`], with a chance to adjust the config first.
pub async fn start_gateway_with(
    auth: &str,
    profile: &str,
    orchestrator: &str,
    customize: impl FnOnce(&mut GatewayConfig),
) -> TestGateway {
    let mut config = GatewayConfig::default();
    config.upstreams.auth_url = auth.to_string();
    config.upstreams.profile_url = profile.to_string();
    config.upstreams.orchestrator_url = orchestrator.to_string();
    config.upstreams.timeout_secs = 2;
    customize(&mut config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();

    let shutdown = Shutdown::new();
    let (_updates_tx, updates) = mpsc::unbounded_channel();
    let stop = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, updates, stop).await.unwrap();
    });

    TestGateway {
        url: format!("http://{addr}"),
        client: reqwest::Client::builder().no_proxy().build().unwrap(),
        shutdown,
    }
}
