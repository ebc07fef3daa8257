//! In-process fake of the lot/token backend, served over real HTTP with
//! `tiny_http` on an ephemeral port.
//!
//! Only what the client needs is implemented: bearer auth, lot filtering,
//! sorting and paging, CSV downloads and the token endpoints.

#![allow(dead_code)]

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use lotadmin::api::ApiClient;
use lotadmin::session::Session;
use serde_json::{Value, json};
use tiny_http::{Header, Method, Request, Response, Server};

pub const ACCESS_TOKEN: &str = "jwt-test-token";
pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";

/// Lot id whose delete answers `500` with an HTML body.
pub const BROKEN_LOT: i64 = 500;

#[derive(Debug, Clone)]
pub struct FakeLot {
    pub id: i64,
    pub lot_number: String,
    pub file_name: String,
    pub record_count: u64,
    /// Naive ISO timestamp, the way the backend emits it.
    pub uploaded_at: String,
    pub uploaded_by_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FakeToken {
    pub id: i64,
    pub token: String,
    pub name: String,
    pub is_active: bool,
    pub usage_count: u64,
}

#[derive(Debug, Default)]
pub struct State {
    pub lots: Vec<FakeLot>,
    pub tokens: Vec<FakeToken>,
    pub next_token_id: i64,
    /// Every request as `"METHOD /path?query"`.
    pub requests: Vec<String>,
    /// Decoded query pairs of the most recent `GET /api/lots`.
    pub last_lot_query: Vec<(String, String)>,
}

pub struct FakeBackend {
    pub base_url: String,
    pub state: Arc<Mutex<State>>,
}

impl FakeBackend {
    /// Start a backend seeded with `lot_count` lots and two tokens.
    pub fn start(lot_count: i64) -> Self {
        let state = State {
            lots: (1..=lot_count).map(seed_lot).collect(),
            tokens: vec![seed_token(1, "Merchant Existing"), seed_token(2, "Merchant B")],
            next_token_id: 3,
            ..State::default()
        };
        let state = Arc::new(Mutex::new(state));

        let server = Server::http("127.0.0.1:0").expect("bind fake backend");
        let port = server
            .server_addr()
            .to_ip()
            .expect("fake backend has an IP address")
            .port();

        let shared = Arc::clone(&state);
        thread::spawn(move || {
            for request in server.incoming_requests() {
                handle(request, &shared);
            }
        });

        Self {
            base_url: format!("http://127.0.0.1:{port}"),
            state,
        }
    }

    /// Client carrying the valid bearer token.
    pub fn client(&self) -> ApiClient {
        let session = Session::new(ACCESS_TOKEN, Some(USERNAME.to_string()), &self.base_url);
        ApiClient::new(&self.base_url, Some(session), Some(Duration::from_secs(5)))
    }

    pub fn client_with_token(&self, token: &str) -> ApiClient {
        let session = Session::new(token, None, &self.base_url);
        ApiClient::new(&self.base_url, Some(session), Some(Duration::from_secs(5)))
    }

    pub fn anonymous_client(&self) -> ApiClient {
        ApiClient::new(&self.base_url, None, Some(Duration::from_secs(5)))
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn lot_ids(&self) -> Vec<i64> {
        self.state.lock().unwrap().lots.iter().map(|l| l.id).collect()
    }

    pub fn token_ids(&self) -> Vec<i64> {
        self.state.lock().unwrap().tokens.iter().map(|t| t.id).collect()
    }
}

fn seed_lot(id: i64) -> FakeLot {
    let day = (id % 28) + 1;
    FakeLot {
        id,
        lot_number: format!("LOT-{id:03}"),
        file_name: if id % 2 == 0 {
            format!("march batch {id}.csv")
        } else {
            format!("lot_{id}.csv")
        },
        record_count: (id as u64) * 10,
        uploaded_at: format!("2025-03-{day:02}T10:15:00"),
        uploaded_by_token: (id % 3 != 0).then(|| {
            if id % 3 == 1 {
                "Merchant Existing".to_string()
            } else {
                "Merchant B".to_string()
            }
        }),
    }
}

fn seed_token(id: i64, name: &str) -> FakeToken {
    FakeToken {
        id,
        token: secret_for(id),
        name: name.to_string(),
        is_active: true,
        usage_count: id as u64 * 3,
    }
}

fn secret_for(id: i64) -> String {
    format!("lot_{id:04}_abcdefghijklmnopqrstuvwxyz0123456789")
}

// ---------------------------------------------------------------------------
// Request handling
// ---------------------------------------------------------------------------

type Reply = (u16, String, Vec<Header>);

fn handle(mut request: Request, state: &Arc<Mutex<State>>) {
    let method = request.method().clone();
    let url = request.url().to_string();
    let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));
    let path = path.to_string();
    let query = parse_query(query);

    let mut body = String::new();
    if matches!(method, Method::Post | Method::Patch | Method::Put) {
        let _ = request.as_reader().read_to_string(&mut body);
    }
    let authorization = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Authorization"))
        .map(|h| h.value.as_str().to_string());

    let (status, payload, headers) = {
        let mut state = state.lock().unwrap();
        state.requests.push(format!("{method} {url}"));
        route(&mut state, &method, &path, query, &body, authorization.as_deref())
    };

    let mut response = Response::from_string(payload).with_status_code(status);
    let has_content_type = headers.iter().any(|h| h.field.equiv("Content-Type"));
    for header in headers {
        response = response.with_header(header);
    }
    if !has_content_type {
        response = response.with_header(header("Content-Type", "application/json"));
    }
    let _ = request.respond(response);
}

fn route(
    state: &mut State,
    method: &Method,
    path: &str,
    query: Vec<(String, String)>,
    body: &str,
    authorization: Option<&str>,
) -> Reply {
    if (method, path) == (&Method::Post, "/api/auth/login") {
        return login(body);
    }

    if authorization != Some(format!("Bearer {ACCESS_TOKEN}").as_str()) {
        return json_reply(401, json!({ "detail": "Not authenticated" }));
    }

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match (method, segments.as_slice()) {
        (Method::Get, ["api", "lots"]) => list_lots(state, query),
        (Method::Get, ["api", "lots", "stats"]) => stats(state),
        (Method::Get, ["api", "lots", "download", id]) => download(state, id),
        (Method::Delete, ["api", "lots", id]) => delete_lot(state, id),
        (Method::Get, ["api", "tokens"]) => json_reply(
            200,
            Value::Array(state.tokens.iter().map(token_json).collect()),
        ),
        (Method::Post, ["api", "tokens", "generate"]) => generate_token(state, body),
        (Method::Patch, ["api", "tokens", id, "toggle"]) => toggle_token(state, id),
        (Method::Delete, ["api", "tokens", id]) => delete_token(state, id),
        _ => json_reply(404, json!({ "detail": "Not Found" })),
    }
}

fn login(body: &str) -> Reply {
    let creds: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    if creds["username"] == USERNAME && creds["password"] == PASSWORD {
        json_reply(
            200,
            json!({
                "access_token": ACCESS_TOKEN,
                "token_type": "bearer",
                "user": { "id": 1, "username": USERNAME },
            }),
        )
    } else {
        json_reply(401, json!({ "detail": "Incorrect username or password" }))
    }
}

fn list_lots(state: &mut State, query: Vec<(String, String)>) -> Reply {
    let get = |key: &str| {
        query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    };
    let contains = |haystack: &str, needle: &Option<String>| match needle {
        Some(n) => haystack.to_lowercase().contains(&n.to_lowercase()),
        None => true,
    };

    let lot_number = get("lot_number");
    let file_name = get("file_name");
    let uploaded_by = get("uploaded_by");
    let date_from = get("date_from");
    let date_to = get("date_to");

    let mut lots: Vec<&FakeLot> = state
        .lots
        .iter()
        .filter(|l| contains(&l.lot_number, &lot_number))
        .filter(|l| contains(&l.file_name, &file_name))
        .filter(|l| match &uploaded_by {
            Some(_) => contains(l.uploaded_by_token.as_deref().unwrap_or(""), &uploaded_by),
            None => true,
        })
        .filter(|l| date_from.as_deref().is_none_or(|from| &l.uploaded_at[..10] >= from))
        .filter(|l| date_to.as_deref().is_none_or(|to| &l.uploaded_at[..10] <= to))
        .collect();

    match get("sort_by").as_deref() {
        Some("lot_number") => lots.sort_by(|a, b| a.lot_number.cmp(&b.lot_number)),
        Some("file_name") => lots.sort_by(|a, b| a.file_name.cmp(&b.file_name)),
        Some("record_count") => lots.sort_by_key(|l| l.record_count),
        _ => lots.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then(a.id.cmp(&b.id))),
    }
    if get("sort_order").as_deref() != Some("asc") {
        lots.reverse();
    }

    let page: usize = get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let limit: usize = get("limit").and_then(|l| l.parse().ok()).unwrap_or(50);
    let total = lots.len();
    let page_lots: Vec<Value> = lots
        .into_iter()
        .skip((page.max(1) - 1) * limit)
        .take(limit)
        .map(lot_json)
        .collect();

    state.last_lot_query = query;
    json_reply(
        200,
        json!({ "lots": page_lots, "total": total, "page": page, "limit": limit }),
    )
}

fn stats(state: &State) -> Reply {
    json_reply(
        200,
        json!({
            "total_lots": state.lots.len(),
            "total_records": state.lots.iter().map(|l| l.record_count).sum::<u64>(),
            "total_uploads": state.lots.len(),
            "active_tokens": state.tokens.iter().filter(|t| t.is_active).count(),
        }),
    )
}

fn download(state: &State, id: &str) -> Reply {
    let Some(lot) = find_lot(state, id) else {
        return json_reply(404, json!({ "detail": "Lot not found" }));
    };
    let csv = format!("lot_number,record_count\n{},{}\n", lot.lot_number, lot.record_count);
    let mut headers = vec![header("Content-Type", "text/csv")];
    match lot.id % 3 {
        0 => {}
        1 => headers.push(header(
            "Content-Disposition",
            &format!("attachment; filename=\"{}.csv\"", lot.lot_number),
        )),
        _ => headers.push(header(
            "Content-Disposition",
            &format!(
                "attachment; filename*=UTF-8''{}",
                urlencoding::encode(&format!("{} export.csv", lot.lot_number))
            ),
        )),
    }
    (200, csv, headers)
}

fn delete_lot(state: &mut State, id: &str) -> Reply {
    if id.parse::<i64>().ok() == Some(BROKEN_LOT) {
        return (
            500,
            "<html><body>Internal Server Error</body></html>".to_string(),
            vec![header("Content-Type", "text/html")],
        );
    }
    let Some(lot) = find_lot(state, id) else {
        return json_reply(404, json!({ "detail": "Lot not found" }));
    };
    let lot_id = lot.id;
    state.lots.retain(|l| l.id != lot_id);
    json_reply(200, json!({ "message": "Lot deleted successfully" }))
}

fn generate_token(state: &mut State, body: &str) -> Reply {
    let request: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let Some(name) = request["name"].as_str() else {
        return json_reply(
            422,
            json!({ "detail": [{ "loc": ["body", "name"], "msg": "field required" }] }),
        );
    };
    if state.tokens.iter().any(|t| t.name == name) {
        return json_reply(400, json!({ "detail": "Token name already exists" }));
    }

    let id = state.next_token_id;
    state.next_token_id += 1;
    let token = seed_token(id, name);
    let token = FakeToken {
        usage_count: 0,
        ..token
    };
    let reply = token_json(&token);
    state.tokens.insert(0, token);
    json_reply(200, reply)
}

fn toggle_token(state: &mut State, id: &str) -> Reply {
    let id: i64 = id.parse().unwrap_or(-1);
    let Some(token) = state.tokens.iter_mut().find(|t| t.id == id) else {
        return json_reply(404, json!({ "detail": "Token not found" }));
    };
    token.is_active = !token.is_active;
    json_reply(
        200,
        json!({ "message": "Token status updated", "is_active": token.is_active }),
    )
}

fn delete_token(state: &mut State, id: &str) -> Reply {
    let id: i64 = id.parse().unwrap_or(-1);
    if !state.tokens.iter().any(|t| t.id == id) {
        return json_reply(404, json!({ "detail": "Token not found" }));
    }
    state.tokens.retain(|t| t.id != id);
    json_reply(200, json!({ "message": "Token deleted successfully" }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn find_lot<'a>(state: &'a State, id: &str) -> Option<&'a FakeLot> {
    let id: i64 = id.parse().ok()?;
    state.lots.iter().find(|l| l.id == id)
}

fn lot_json(lot: &FakeLot) -> Value {
    json!({
        "id": lot.id,
        "lot_number": lot.lot_number,
        "file_name": lot.file_name,
        "record_count": lot.record_count,
        "uploaded_at": lot.uploaded_at,
        "uploaded_by_token": lot.uploaded_by_token,
    })
}

fn token_json(token: &FakeToken) -> Value {
    json!({
        "id": token.id,
        "token": token.token,
        "name": token.name,
        "is_active": token.is_active,
        "created_at": "2025-03-01T09:00:00.123456",
        "last_used_at": if token.usage_count > 0 { Value::from("2025-03-02T12:30:00Z") } else { Value::Null },
        "usage_count": token.usage_count,
    })
}

fn json_reply(status: u16, value: Value) -> Reply {
    (status, value.to_string(), Vec::new())
}

fn header(name: &str, value: &str) -> Header {
    Header::from_bytes(name, value).expect("valid header")
}

/// Split and decode `a=1&b=two+words`.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(k), decode(v))
        })
        .collect()
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}
