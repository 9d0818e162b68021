use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

/// Key accepted by a fresh `MockState`.
pub const API_KEY: &str = "test-key";
pub const LOGIN: &str = "admin";
pub const PASSWORD: &str = "secret";

/// Rows served per cursor page.
pub const CURSOR_PAGE_ROWS: usize = 2;

const LOGIN_PATH: &str = "/api/v2/users/login";

/// One request as seen by the server, before authentication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordedRequest {
    pub method: String,
    pub uri: String,
    pub authorization: Option<String>,
}

#[derive(Deserialize)]
struct LoginBody {
    login: String,
    password: String,
}

#[derive(Default)]
struct Inner {
    api_key: String,
    logins: usize,
    requests: Vec<RecordedRequest>,
    records: HashMap<String, BTreeMap<String, Value>>,
    page_sizes: Option<Vec<usize>>,
    cursor_pages: Option<usize>,
}

/// Shared state of the emulated OZmap instance. Clones share storage, so a
/// test can keep one handle and inspect it after the server has run.
#[derive(Clone)]
pub struct MockState {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    pub fn new() -> Self {
        let inner = Inner {
            api_key: API_KEY.to_string(),
            ..Inner::default()
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Serve page-numbered reads: page `n` returns `sizes[n - 1]` rows and
    /// any page past the end is empty.
    pub fn with_page_sizes(self, sizes: Vec<usize>) -> Self {
        self.inner.lock().page_sizes = Some(sizes);
        self
    }

    /// Serve cursor reads: the first page links to `?cursor=1`, and so on
    /// until `pages` links have been handed out.
    pub fn with_cursor_pages(self, pages: usize) -> Self {
        self.inner.lock().cursor_pages = Some(pages);
        self
    }

    pub fn with_record(self, model: &str, record: Value) -> Self {
        self.insert(model, record);
        self
    }

    /// Store `record`, assigning an `id` when it has none. Returns the stored value.
    pub fn insert(&self, model: &str, record: Value) -> Value {
        let mut record = match record {
            Value::Object(fields) => fields,
            other => {
                let mut fields = Map::new();
                fields.insert("value".into(), other);
                fields
            }
        };
        let id = match record.get("id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };
        record.insert("id".into(), Value::String(id.clone()));
        let record = Value::Object(record);
        self.inner
            .lock()
            .records
            .entry(model.to_string())
            .or_default()
            .insert(id, record.clone());
        record
    }

    pub fn record(&self, model: &str, id: &str) -> Option<Value> {
        self.inner.lock().records.get(model)?.get(id).cloned()
    }

    pub fn api_key(&self) -> String {
        self.inner.lock().api_key.clone()
    }

    /// Invalidate the current key; only a fresh login is accepted afterwards.
    pub fn expire_key(&self) {
        self.inner.lock().api_key = format!("expired-{}", Uuid::new_v4());
    }

    pub fn logins(&self) -> usize {
        self.inner.lock().logins
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().requests.clone()
    }
}

pub fn app() -> Router {
    app_with(MockState::new())
}

pub fn app_with(state: MockState) -> Router {
    Router::new()
        .route("/api/v2/authenticated", get(authenticated))
        .route("/api/v2/users/login", post(login))
        .route("/api/v2/render/croqui/{id}/{format}", get(render_croqui))
        .route("/api/v2/render/box/{id}/{format}", post(render_box))
        .route("/api/v2/status/{code}", any(status))
        .route("/api/v2/slow", get(slow))
        .route("/api/v2/{model}", get(list_records).post(create_record))
        .route(
            "/api/v2/{model}/{id}",
            get(get_record).patch(update_record).delete(delete_record),
        )
        .layer(middleware::from_fn_with_state(state.clone(), gatekeeper))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(state)).await
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "message": message.into() }))).into_response()
}

/// Records every request and rejects anything but login without the
/// current key.
async fn gatekeeper(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        uri: request.uri().to_string(),
        authorization: authorization.clone(),
    };
    log::debug!("[MOCK] {} {}", recorded.method, recorded.uri);

    let allowed = {
        let mut inner = state.inner.lock();
        inner.requests.push(recorded);
        request.uri().path() == LOGIN_PATH || authorization.as_deref() == Some(inner.api_key.as_str())
    };
    if !allowed {
        return error(StatusCode::UNAUTHORIZED, "Invalid or expired API key");
    }
    next.run(request).await
}

async fn authenticated() -> Json<Value> {
    Json(json!({ "authenticated": true }))
}

async fn login(State(state): State<MockState>, Json(body): Json<LoginBody>) -> Response {
    if body.login != LOGIN || body.password != PASSWORD {
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    let mut inner = state.inner.lock();
    inner.logins += 1;
    inner.api_key = format!("key-{}", inner.logins);
    log::info!("[MOCK] Login #{} issued a new key", inner.logins);
    Json(json!({ "authorization": inner.api_key })).into_response()
}

async fn list_records(
    State(state): State<MockState>,
    Path(model): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let filter = match params.get("filter") {
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(filter) => filter,
            Err(err) => return error(StatusCode::BAD_REQUEST, format!("Malformed filter: {err}")),
        },
        None => serde_json::from_slice::<Value>(&body)
            .ok()
            .and_then(|body| body.get("filter").cloned())
            .unwrap_or(Value::Null),
    };

    let inner = state.inner.lock();

    if let Some(sizes) = &inner.page_sizes {
        let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
        let count = page.checked_sub(1).and_then(|i| sizes.get(i)).copied().unwrap_or(0);
        let rows: Vec<Value> = (0..count)
            .map(|i| json!({ "id": format!("{model}-{page}-{i}") }))
            .collect();
        return Json(json!({ "rows": rows, "filter": filter })).into_response();
    }

    if let Some(pages) = inner.cursor_pages {
        let cursor: usize = params.get("cursor").and_then(|c| c.parse().ok()).unwrap_or(0);
        let rows: Vec<Value> = (0..CURSOR_PAGE_ROWS)
            .map(|i| json!({ "id": format!("{model}-c{cursor}-{i}") }))
            .collect();
        let has_next_page = cursor < pages;
        let next_url = has_next_page.then(|| format!("/api/v2/{model}?cursor={}", cursor + 1));
        return Json(json!({
            "rows": rows,
            "hasNextPage": has_next_page,
            "nextUrl": next_url,
            "filter": filter,
        }))
        .into_response();
    }

    let limit = params
        .get("limit")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(usize::MAX);
    let rows: Vec<Value> = inner
        .records
        .get(&model)
        .map(|records| {
            records
                .values()
                .filter(|record| matches(record, &filter))
                .take(limit)
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    Json(json!({
        "rows": rows,
        "total": rows.len(),
        "hasNextPage": false,
        "filter": filter,
    }))
    .into_response()
}

async fn create_record(
    State(state): State<MockState>,
    Path(model): Path<String>,
    Json(data): Json<Value>,
) -> Response {
    if !data.is_object() {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "Payload must be an object");
    }
    (StatusCode::CREATED, Json(state.insert(&model, data))).into_response()
}

async fn get_record(
    State(state): State<MockState>,
    Path((model, id)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(record) = state.record(&model, &id) else {
        return error(StatusCode::NOT_FOUND, format!("{model} {id} not found"));
    };
    match params.get("select") {
        Some(select) => Json(project(&record, select)).into_response(),
        None => Json(record).into_response(),
    }
}

async fn update_record(
    State(state): State<MockState>,
    Path((model, id)): Path<(String, String)>,
    Json(changes): Json<Value>,
) -> Response {
    let Value::Object(changes) = changes else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "Payload must be an object");
    };
    let mut inner = state.inner.lock();
    let Some(Value::Object(record)) = inner.records.get_mut(&model).and_then(|r| r.get_mut(&id)) else {
        return error(StatusCode::NOT_FOUND, format!("{model} {id} not found"));
    };
    for (field, value) in changes {
        if field != "id" {
            record.insert(field, value);
        }
    }
    Json(Value::Object(record.clone())).into_response()
}

async fn delete_record(
    State(state): State<MockState>,
    Path((model, id)): Path<(String, String)>,
) -> Response {
    let removed = state
        .inner
        .lock()
        .records
        .get_mut(&model)
        .and_then(|records| records.remove(&id));
    match removed {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => error(StatusCode::NOT_FOUND, format!("{model} {id} not found")),
    }
}

/// Replies with the requested status; `?empty=true` omits the body.
async fn status(Path(code): Path<u16>, Query(params): Query<HashMap<String, String>>) -> Response {
    let Ok(status) = StatusCode::from_u16(code) else {
        return error(StatusCode::BAD_REQUEST, format!("Invalid status {code}"));
    };
    if params.get("empty").map(String::as_str) == Some("true") {
        return status.into_response();
    }
    error(status, format!("Mock status {code}"))
}

/// Sleeps `ms` milliseconds (default 2000) before answering.
async fn slow(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let ms = params.get("ms").and_then(|ms| ms.parse().ok()).unwrap_or(2000);
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(json!({ "slept": ms }))
}

async fn render_croqui(Path((id, format)): Path<(String, String)>) -> Response {
    render(&format, &format!("croqui {id}"))
}

async fn render_box(Path((id, format)): Path<(String, String)>, Json(body): Json<Value>) -> Response {
    let highlight = body.get("highlight").cloned().unwrap_or(Value::Null);
    render(&format, &format!("box {id} highlight {highlight}"))
}

fn render(format: &str, content: &str) -> Response {
    let (content_type, bytes) = match format {
        "png" => ("image/png", [&b"\x89PNG\r\n\x1a\n"[..], content.as_bytes()].concat()),
        "pdf" => ("application/pdf", format!("%PDF-1.4\n{content}").into_bytes()),
        "svg" => ("image/svg+xml", format!("<svg><text>{content}</text></svg>").into_bytes()),
        other => return error(StatusCode::UNPROCESSABLE_ENTITY, format!("Unsupported format {other}")),
    };
    ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
}

/// Keep `id` plus the comma or space separated fields in `select`.
fn project(record: &Value, select: &str) -> Value {
    let mut fields = Map::new();
    for name in select
        .split([',', ' '])
        .filter(|name| !name.is_empty())
        .chain(["id"])
    {
        if let Some(value) = record.get(name) {
            fields.insert(name.to_string(), value.clone());
        }
    }
    Value::Object(fields)
}

/// Evaluate the equality-style subset of the filter language against a
/// record. Operators the mock does not model always match.
pub fn matches(record: &Value, filter: &Value) -> bool {
    match filter {
        Value::Null => true,
        Value::Array(items) => items.iter().all(|item| matches(record, item)),
        Value::Object(clause) => {
            let (Some(property), Some(operator)) = (
                clause.get("property").and_then(Value::as_str),
                clause.get("operator").and_then(Value::as_str),
            ) else {
                return false;
            };
            let expected = clause.get("value").unwrap_or(&Value::Null);
            let actual = record.get(property).unwrap_or(&Value::Null);
            match operator {
                "=" => same(actual, expected),
                "!=" => !same(actual, expected),
                "in" => expected
                    .as_array()
                    .is_some_and(|options| options.iter().any(|option| same(actual, option))),
                _ => true,
            }
        }
        _ => false,
    }
}

/// Equal as JSON, or equal once both are rendered as text.
fn same(actual: &Value, expected: &Value) -> bool {
    actual == expected || text(actual) == text(expected)
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_clause_matches_by_text() {
        let record = json!({"id": "1", "name": "CTO 01", "level": 2});
        assert!(matches(&record, &json!([{"property": "name", "operator": "=", "value": "CTO 01"}])));
        assert!(matches(&record, &json!({"property": "level", "operator": "=", "value": "2"})));
        assert!(!matches(&record, &json!([{"property": "name", "operator": "=", "value": "CTO 02"}])));
    }

    #[test]
    fn nested_groups_require_every_clause() {
        let record = json!({"kind": "box", "level": 2});
        let filter = json!([
            {"property": "kind", "operator": "=", "value": "box"},
            [{"property": "level", "operator": "!=", "value": 3}]
        ]);
        assert!(matches(&record, &filter));
        let filter = json!([
            {"property": "kind", "operator": "=", "value": "box"},
            [{"property": "level", "operator": "in", "value": [3, 4]}]
        ]);
        assert!(!matches(&record, &filter));
    }

    #[test]
    fn missing_filter_matches_everything() {
        assert!(matches(&json!({"id": "1"}), &Value::Null));
        assert!(matches(&json!({"id": "1"}), &json!([])));
    }

    #[test]
    fn insert_assigns_missing_ids() {
        let state = MockState::new();
        let stored = state.insert("boxes", json!({"name": "CTO"}));
        let id = stored["id"].as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(state.record("boxes", id), Some(stored.clone()));

        let kept = state.insert("boxes", json!({"id": "fixed", "name": "CEO"}));
        assert_eq!(kept["id"], "fixed");
    }

    #[test]
    fn projection_keeps_id_and_selected_fields() {
        let record = json!({"id": "1", "name": "CTO", "level": 2, "color": "red"});
        assert_eq!(project(&record, "name,level"), json!({"id": "1", "name": "CTO", "level": 2}));
        assert_eq!(project(&record, "color"), json!({"id": "1", "color": "red"}));
    }
}
