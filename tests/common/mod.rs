//! Fake GOST, panel and Prometheus servers for integration tests.
//!
//! Each fake binds an ephemeral port on 127.0.0.1 and keeps its state behind a
//! shared mutex so tests can seed it and inspect what the agent did.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use url::Url;

use relay_sync::gost::GostApi;
use relay_sync::panel::PanelApi;
use relay_sync::traffic::PrometheusApi;

pub const NODE_ID: u64 = 1;
pub const TOKEN: &str = "node-token";

const GOST_KINDS: [&str; 4] = ["services", "chains", "limiters", "climiters"];

pub type Shared<T> = Arc<Mutex<T>>;
type Reply = (StatusCode, Json<Value>);

fn reply(status: StatusCode, msg: &str) -> Reply {
    (status, Json(json!({ "msg": msg })))
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub fn base_url(addr: SocketAddr) -> Url {
    Url::parse(&format!("http://{}", addr)).unwrap()
}

// --- GOST --------------------------------------------------------------------

/// In-memory GOST config API with GOST's reply conventions.
#[derive(Default)]
pub struct GostState {
    /// kind path ("services", ...) → name → object as written.
    pub objects: HashMap<String, BTreeMap<String, Value>>,
    /// `"{METHOD} {kind} {name}"`, `"GET config"` for snapshots.
    pub calls: Vec<String>,
    pub fail_config: bool,
}

impl GostState {
    pub fn seed(&mut self, kind: &str, object: Value) {
        let name = object["name"].as_str().unwrap().to_string();
        self.objects.entry(kind.to_string()).or_default().insert(name, object);
    }

    pub fn get(&self, kind: &str, name: &str) -> Option<&Value> {
        self.objects.get(kind).and_then(|m| m.get(name))
    }

    pub fn names(&self, kind: &str) -> Vec<String> {
        self.objects
            .get(kind)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn writes(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter(|c| !c.starts_with("GET"))
            .cloned()
            .collect()
    }
}

pub struct FakeGost {
    pub addr: SocketAddr,
    pub state: Shared<GostState>,
}

impl FakeGost {
    pub async fn start() -> Self {
        let state: Shared<GostState> = Arc::default();
        let app = Router::new()
            .route("/config", get(gost_snapshot))
            .route("/config/{kind}", post(gost_create))
            .route("/config/{kind}/{name}", put(gost_update).delete(gost_delete))
            .with_state(state.clone());
        Self { addr: serve(app).await, state }
    }

    pub fn api(&self) -> GostApi {
        GostApi::new(reqwest::Client::new(), base_url(self.addr))
    }
}

async fn gost_snapshot(State(state): State<Shared<GostState>>) -> Reply {
    let mut s = state.lock().unwrap();
    s.calls.push("GET config".into());
    if s.fail_config {
        return reply(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
    }

    // GOST leaves empty collections out; emulate with null.
    let mut body = serde_json::Map::new();
    for kind in GOST_KINDS {
        let items: Vec<Value> = s
            .objects
            .get(kind)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        let value = if items.is_empty() { Value::Null } else { Value::Array(items) };
        body.insert(kind.to_string(), value);
    }
    (StatusCode::OK, Json(Value::Object(body)))
}

async fn gost_create(
    State(state): State<Shared<GostState>>,
    Path(kind): Path<String>,
    Json(object): Json<Value>,
) -> Reply {
    let mut s = state.lock().unwrap();
    let name = object["name"].as_str().unwrap_or_default().to_string();
    s.calls.push(format!("POST {} {}", kind, name));

    let objects = s.objects.entry(kind).or_default();
    if objects.contains_key(&name) {
        return reply(StatusCode::BAD_REQUEST, "object duplicated");
    }
    objects.insert(name, object);
    reply(StatusCode::OK, "OK")
}

async fn gost_update(
    State(state): State<Shared<GostState>>,
    Path((kind, name)): Path<(String, String)>,
    Json(object): Json<Value>,
) -> Reply {
    let mut s = state.lock().unwrap();
    s.calls.push(format!("PUT {} {}", kind, name));

    let objects = s.objects.entry(kind).or_default();
    match objects.get_mut(&name) {
        Some(existing) => {
            *existing = object;
            reply(StatusCode::OK, "OK")
        }
        None => reply(StatusCode::NOT_FOUND, "object not found"),
    }
}

async fn gost_delete(
    State(state): State<Shared<GostState>>,
    Path((kind, name)): Path<(String, String)>,
) -> Reply {
    let mut s = state.lock().unwrap();
    s.calls.push(format!("DELETE {} {}", kind, name));

    let removed = s.objects.get_mut(&kind).and_then(|m| m.remove(&name));
    match removed {
        Some(_) => reply(StatusCode::OK, "OK"),
        None => reply(StatusCode::NOT_FOUND, "object not found"),
    }
}

// --- Panel -------------------------------------------------------------------

#[derive(Default)]
pub struct PanelState {
    /// Raw rule objects served to the agent.
    pub rules: Vec<Value>,
    /// Bodies received on `PUT /api/relay-rule-sync/`.
    pub statuses: Vec<Value>,
    /// Bodies received on `POST /api/relay-rule-traffic/`.
    pub traffic: Vec<Value>,
    pub fetches: usize,
}

pub struct FakePanel {
    pub addr: SocketAddr,
    pub state: Shared<PanelState>,
}

impl FakePanel {
    pub async fn start(rules: Vec<Value>) -> Self {
        let state: Shared<PanelState> = Arc::new(Mutex::new(PanelState {
            rules,
            ..Default::default()
        }));
        let app = Router::new()
            .route("/api/relay-rule-sync/", get(panel_rules).put(panel_status))
            .route("/api/relay-rule-traffic/", post(panel_traffic))
            .with_state(state.clone());
        Self { addr: serve(app).await, state }
    }

    pub fn api(&self) -> PanelApi {
        self.api_with_token(TOKEN)
    }

    pub fn api_with_token(&self, token: &str) -> PanelApi {
        PanelApi::new(reqwest::Client::new(), base_url(self.addr), NODE_ID, token)
    }
}

fn token_ok(token: Option<&Value>) -> bool {
    token.and_then(Value::as_str) == Some(TOKEN)
}

async fn panel_rules(
    State(state): State<Shared<PanelState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    let mut s = state.lock().unwrap();
    s.fetches += 1;
    if params.get("token").map(String::as_str) != Some(TOKEN)
        || params.get("node_id") != Some(&NODE_ID.to_string())
    {
        return reply(StatusCode::FORBIDDEN, "invalid node token");
    }
    (StatusCode::OK, Json(json!({ "msg": "ok", "data": s.rules })))
}

async fn panel_status(State(state): State<Shared<PanelState>>, Json(body): Json<Value>) -> Reply {
    if !token_ok(body.get("token")) {
        return reply(StatusCode::FORBIDDEN, "invalid node token");
    }
    state.lock().unwrap().statuses.push(body);
    reply(StatusCode::OK, "ok")
}

async fn panel_traffic(State(state): State<Shared<PanelState>>, Json(body): Json<Value>) -> Reply {
    if !token_ok(body.get("token")) {
        return reply(StatusCode::FORBIDDEN, "invalid node token");
    }
    state.lock().unwrap().traffic.push(body);
    reply(StatusCode::OK, "ok")
}

// --- Prometheus --------------------------------------------------------------

#[derive(Default)]
pub struct PromState {
    /// service → bytes for input queries.
    pub input: Vec<(String, f64)>,
    /// service → bytes for output queries.
    pub output: Vec<(String, f64)>,
    pub fail_output: bool,
    pub queries: Vec<String>,
}

pub struct FakePrometheus {
    pub addr: SocketAddr,
    pub state: Shared<PromState>,
}

impl FakePrometheus {
    pub async fn start(input: &[(&str, f64)], output: &[(&str, f64)]) -> Self {
        let state: Shared<PromState> = Arc::new(Mutex::new(PromState {
            input: owned(input),
            output: owned(output),
            ..Default::default()
        }));
        let app = Router::new()
            .route("/api/v1/query", get(prom_query))
            .with_state(state.clone());
        Self { addr: serve(app).await, state }
    }

    pub fn api(&self) -> PrometheusApi {
        PrometheusApi::new(reqwest::Client::new(), base_url(self.addr))
    }
}

async fn prom_query(
    State(state): State<Shared<PromState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    let mut s = state.lock().unwrap();
    let query = params.get("query").cloned().unwrap_or_default();
    s.queries.push(query.clone());

    let table = if query.contains("_input_") {
        &s.input
    } else if s.fail_output {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "error", "errorType": "unavailable", "error": "storage down"})),
        );
    } else {
        &s.output
    };
    let result: Vec<Value> = table
        .iter()
        .map(|(service, bytes)| {
            json!({"metric": {"service": service}, "value": [1700000000.0, bytes.to_string()]})
        })
        .collect();
    (
        StatusCode::OK,
        Json(json!({"status": "success", "data": {"resultType": "vector", "result": result}})),
    )
}

fn owned(table: &[(&str, f64)]) -> Vec<(String, f64)> {
    table.iter().map(|(s, v)| (s.to_string(), *v)).collect()
}

// --- Rules -------------------------------------------------------------------

pub fn tunnel_rule() -> Value {
    json!({
        "id": 2,
        "type": "Tunnel",
        "listen_port": 9000,
        "targets": "10.0.0.1:80",
        "tunnel": {"addr": "relay:9999", "username": "u", "password": "p"},
        "ingress_node": 1,
        "limit": "{}"
    })
}

pub fn raw_rule(id: u64, targets: &str, limit: &str) -> Value {
    json!({
        "id": id,
        "type": "Raw",
        "listen_port": 10000 + id,
        "targets": targets,
        "ingress_node": 1,
        "egress_node": null,
        "limit": limit,
        "transport_type": null
    })
}

pub fn egress_rule(id: u64) -> Value {
    json!({
        "id": id,
        "type": "Egress",
        "listen_port": 443,
        "tunnel": {"addr": "", "username": "u", "password": "p"},
        "egress_node": 1,
        "limit": "",
        "transport_type": "WebSocket"
    })
}
