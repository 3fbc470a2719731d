// tests/common/mod.rs
//
// Local stand-in for webhook receivers and the feed host. Binds 127.0.0.1:0 and
// records every POST it sees.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    routing::{get, post},
    Router,
};
use parking_lot::Mutex;
use serde_json::Value as Json;
use tokio::net::TcpListener;

pub const VULDB_XML: &str = include_str!("../fixtures/vuldb_recent.xml");

#[derive(Debug, Clone)]
pub struct Hit {
    pub path: String,
    pub content_type: Option<String>,
    pub body: Json,
}

impl Hit {
    /// The rendered text inside the adaptive card.
    pub fn card_text(&self) -> &str {
        self.body["attachments"][0]["content"]["body"][0]["text"]
            .as_str()
            .unwrap_or_default()
    }
}

#[derive(Clone, Default)]
struct HostState {
    hits: Arc<Mutex<Vec<Hit>>>,
    feed: Arc<Mutex<Option<String>>>,
}

pub struct TestHost {
    pub base: String,
    state: HostState,
}

impl TestHost {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.state.hits.lock().clone()
    }

    pub fn hits_on(&self, path: &str) -> Vec<Hit> {
        self.hits().into_iter().filter(|h| h.path == path).collect()
    }
}

async fn hook(State(st): State<HostState>, uri: Uri, headers: HeaderMap, body: Bytes) -> StatusCode {
    let body = serde_json::from_slice(&body).unwrap_or(Json::Null);
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    st.hits.lock().push(Hit {
        path: uri.path().to_string(),
        content_type,
        body,
    });
    if uri.path() == "/fail" {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

async fn slow_hook() -> StatusCode {
    tokio::time::sleep(Duration::from_secs(3)).await;
    StatusCode::OK
}

async fn feed(State(st): State<HostState>) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    match st.feed.lock().clone() {
        Some(xml) => (StatusCode::OK, [(header::CONTENT_TYPE, "application/rss+xml")], xml),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain")],
            "feed down".to_string(),
        ),
    }
}

/// Start the host. `feed_xml = None` makes GET /feed answer 503.
pub async fn spawn_host(feed_xml: Option<&str>) -> TestHost {
    let state = HostState {
        hits: Arc::default(),
        feed: Arc::new(Mutex::new(feed_xml.map(str::to_string))),
    };
    let app = Router::new()
        .route("/feed", get(feed))
        .route("/ok", post(hook))
        .route("/ok2", post(hook))
        .route("/fail", post(hook))
        .route("/slow", post(slow_hook))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test host");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestHost {
        base: format!("http://{addr}"),
        state,
    }
}

/// A URL on a port nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}/hook")
}
