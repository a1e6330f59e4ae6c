//! Test doubles: a scripted HTTP server and a sleeper that only records.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::response::Response;
use http::HeaderMap;
use http::HeaderValue;
use http::Method;
use http::StatusCode;
use http::Uri;
use http::header::CONTENT_TYPE;
use http::header::HeaderName;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::RepoConfig;
use crate::retry::Sleeper;

/// Records every requested delay instead of waiting.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// A response the stub hands out, in order.
#[derive(Debug, Clone)]
pub struct Canned {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: String,
}

impl Canned {
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::text(status, &body.to_string()).header(CONTENT_TYPE, "application/json")
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn header(mut self, name: HeaderName, value: &str) -> Self {
        self.headers.push((name, HeaderValue::from_str(value).unwrap()));
        self
    }
}

/// A request as the stub saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    /// Path and query, still percent-encoded.
    pub uri: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Clone, Default)]
struct StubState {
    responses: Arc<Mutex<VecDeque<Canned>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

/// Local HTTP server that answers each request with the next canned
/// response and records what it received. Answers 501 once the script runs
/// out.
pub struct StubServer {
    addr: SocketAddr,
    state: StubState,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn start(responses: impl IntoIterator<Item = Canned>) -> Self {
        let state = StubState {
            responses: Arc::new(Mutex::new(responses.into_iter().collect())),
            requests: Arc::default(),
        };
        let app = Router::new().fallback(respond).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub listener addr");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("run stub server");
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// `host:port`, for `RepoConfig::host`.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    /// A plain-http config pointing at this server.
    pub fn config(&self, owner: &str, repo: &str, branch: Option<&str>) -> RepoConfig {
        RepoConfig {
            owner: owner.into(),
            repo: repo.into(),
            protocol: "http".into(),
            host: Some(self.host()),
            username: "tester".into(),
            password: "secret".into(),
            branch: branch.map(String::from),
        }
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn respond(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.requests.lock().unwrap().push(Recorded {
        method,
        uri: uri.to_string(),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let next = state.responses.lock().unwrap().pop_front();
    let Some(canned) = next else {
        return (StatusCode::NOT_IMPLEMENTED, "no canned response left").into_response();
    };
    let mut response = (canned.status, canned.body).into_response();
    for (name, value) in canned.headers {
        response.headers_mut().insert(name, value);
    }
    response
}
