//! In-process stand-in for the Yandex.Disk resources API and a webhook.

#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TOKEN: &str = "test-token";

#[derive(Clone)]
pub struct Entry {
    /// Path without the `disk:` scheme, e.g. `/d/x.txt`
    pub path: String,
    pub kind: &'static str,
    pub created: String,
    pub content: Vec<u8>,
}

#[derive(Default)]
pub struct DiskState {
    pub entries: Vec<Entry>,
    /// Pending signed upload links: id -> destination path
    pub upload_links: Vec<Option<String>>,
    /// Pending signed download links: id -> source path
    pub download_links: Vec<Option<String>>,
    pub clock: u32,

    pub upload_link_status: Option<StatusCode>,
    pub put_status: Option<StatusCode>,
    pub listing_status: Option<StatusCode>,
    pub download_link_status: Option<StatusCode>,
    pub get_status: Option<StatusCode>,
    /// Link endpoints answer 200 with a body that has no `href`.
    pub malformed_links: bool,
    /// Upload links point at a port nothing listens on.
    pub dead_put_href: bool,
}

#[derive(Default)]
pub struct Counters {
    pub upload_link: AtomicUsize,
    pub put: AtomicUsize,
    pub listing: AtomicUsize,
    pub download_link: AtomicUsize,
    pub get: AtomicUsize,
    pub webhook: AtomicUsize,
    pub unauthorized: AtomicUsize,
    pub data_plane_auth: AtomicUsize,
}

#[derive(Clone)]
pub struct MockDisk {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<DiskState>>,
    pub counters: Arc<Counters>,
    pub webhook_bodies: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl MockDisk {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mock = MockDisk {
            addr,
            state: Arc::new(Mutex::new(DiskState::default())),
            counters: Arc::new(Counters::default()),
            webhook_bodies: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/v1/disk/resources", get(listing))
            .route("/v1/disk/resources/upload", get(upload_link))
            .route("/v1/disk/resources/download", get(download_link))
            .route("/put/{id}", put(put_data))
            .route("/get/{id}", get(get_data))
            .route("/webhook", post(webhook))
            .with_state(mock.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        mock
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/v1/disk/resources", self.addr)
    }

    pub fn webhook_url(&self) -> String {
        format!("http://{}/webhook", self.addr)
    }

    pub fn count(&self, counter: impl Fn(&Counters) -> &AtomicUsize) -> usize {
        counter(&self.counters).load(Ordering::SeqCst)
    }

    /// Add an entry directly, bypassing the upload flow.
    pub fn seed(&self, path: &str, kind: &'static str, created: &str, content: &[u8]) {
        self.state.lock().unwrap().entries.push(Entry {
            path: path.to_string(),
            kind,
            created: created.to_string(),
            content: content.to_vec(),
        });
    }

    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .entries
            .iter()
            .find(|e| e.path == path)
            .map(|e| e.content.clone())
    }

    pub fn paths(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .entries
            .iter()
            .map(|e| e.path.clone())
            .collect()
    }
}

#[derive(Deserialize)]
struct PathQuery {
    path: String,
    sort: Option<String>,
    limit: Option<usize>,
    overwrite: Option<String>,
}

fn authorized(mock: &MockDisk, headers: &HeaderMap) -> bool {
    let ok = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("OAuth {}", TOKEN));
    if !ok {
        mock.counters.unauthorized.fetch_add(1, Ordering::SeqCst);
    }
    ok
}

fn strip_scheme(path: &str) -> &str {
    path.strip_prefix("disk:").unwrap_or(path)
}

fn parent(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

async fn listing(
    State(mock): State<MockDisk>,
    headers: HeaderMap,
    Query(q): Query<PathQuery>,
) -> Response {
    mock.counters.listing.fetch_add(1, Ordering::SeqCst);
    if !authorized(&mock, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let state = mock.state.lock().unwrap();
    if let Some(status) = state.listing_status {
        return status.into_response();
    }
    if q.sort.as_deref() != Some("-created") {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let dir = strip_scheme(&q.path).trim_end_matches('/');
    let mut items: Vec<&Entry> = state.entries.iter().filter(|e| parent(&e.path) == dir).collect();
    // Stable sort keeps seed order for equal timestamps.
    items.sort_by(|a, b| b.created.cmp(&a.created));
    items.truncate(q.limit.unwrap_or(20));

    let items: Vec<_> = items
        .iter()
        .map(|e| {
            json!({
                "name": name(&e.path),
                "path": format!("disk:{}", e.path),
                "created": e.created,
                "type": e.kind,
            })
        })
        .collect();

    Json(json!({ "path": q.path, "_embedded": { "items": items, "limit": q.limit } })).into_response()
}

async fn upload_link(
    State(mock): State<MockDisk>,
    headers: HeaderMap,
    Query(q): Query<PathQuery>,
) -> Response {
    mock.counters.upload_link.fetch_add(1, Ordering::SeqCst);
    if !authorized(&mock, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if q.overwrite.as_deref() != Some("true") {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let mut state = mock.state.lock().unwrap();
    if let Some(status) = state.upload_link_status {
        return (status, Json(json!({ "error": "DiskPathDoesntExistsError" }))).into_response();
    }

    if state.malformed_links {
        return Json(json!({ "method": "PUT", "templated": false })).into_response();
    }

    let id = state.upload_links.len();
    state.upload_links.push(Some(q.path.clone()));
    let host = if state.dead_put_href {
        "127.0.0.1:9".to_string()
    } else {
        mock.addr.to_string()
    };
    Json(json!({ "href": format!("http://{}/put/{}", host, id), "method": "PUT" }))
        .into_response()
}

async fn put_data(
    State(mock): State<MockDisk>,
    Path(id): Path<usize>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    mock.counters.put.fetch_add(1, Ordering::SeqCst);
    if headers.contains_key(header::AUTHORIZATION) {
        mock.counters.data_plane_auth.fetch_add(1, Ordering::SeqCst);
    }

    let mut state = mock.state.lock().unwrap();
    if let Some(status) = state.put_status {
        return status.into_response();
    }

    // Links are single use.
    let Some(path) = state.upload_links.get_mut(id).and_then(Option::take) else {
        return StatusCode::GONE.into_response();
    };

    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared != Some(body.len()) {
        return StatusCode::LENGTH_REQUIRED.into_response();
    }

    state.clock += 1;
    let created = format!("2024-06-01T00:00:{:02}+00:00", state.clock);
    let path = strip_scheme(&path).to_string();
    state.entries.retain(|e| e.path != path);
    state.entries.push(Entry {
        path,
        kind: "file",
        created,
        content: body.to_vec(),
    });

    StatusCode::CREATED.into_response()
}

async fn download_link(
    State(mock): State<MockDisk>,
    headers: HeaderMap,
    Query(q): Query<PathQuery>,
) -> Response {
    mock.counters.download_link.fetch_add(1, Ordering::SeqCst);
    if !authorized(&mock, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let mut state = mock.state.lock().unwrap();
    if let Some(status) = state.download_link_status {
        return (status, Json(json!({ "error": "DiskNotFoundError" }))).into_response();
    }
    if state.malformed_links {
        return "<html>maintenance</html>".into_response();
    }
    let path = strip_scheme(&q.path).to_string();
    if !state.entries.iter().any(|e| e.path == path) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let id = state.download_links.len();
    state.download_links.push(Some(path));
    Json(json!({ "href": format!("http://{}/get/{}", mock.addr, id), "method": "GET" }))
        .into_response()
}

async fn get_data(State(mock): State<MockDisk>, Path(id): Path<usize>, headers: HeaderMap) -> Response {
    mock.counters.get.fetch_add(1, Ordering::SeqCst);
    if headers.contains_key(header::AUTHORIZATION) {
        mock.counters.data_plane_auth.fetch_add(1, Ordering::SeqCst);
    }

    let mut state = mock.state.lock().unwrap();
    if let Some(status) = state.get_status {
        return status.into_response();
    }
    let Some(path) = state.download_links.get_mut(id).and_then(Option::take) else {
        return StatusCode::GONE.into_response();
    };

    match state.entries.iter().find(|e| e.path == path) {
        Some(entry) => entry.content.clone().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn webhook(State(mock): State<MockDisk>, Json(body): Json<serde_json::Value>) -> StatusCode {
    mock.counters.webhook.fetch_add(1, Ordering::SeqCst);
    mock.webhook_bodies.lock().unwrap().push(body);
    StatusCode::NO_CONTENT
}
