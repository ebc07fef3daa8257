/// Synchronous HTTP client for the lot/token backend.
///
/// Wraps a `ureq` agent. Attaches the session bearer token to every
/// authenticated call and normalizes every failure into [`ApiError`]. Calls
/// are never retried. Without a configured timeout a stalled request blocks
/// until the server answers.
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::types::{
    ApiToken, GenerateTokenRequest, LoginRequest, LoginResponse, LotFile, LotsPage,
    MessageResponse, Stats, ToggleOutcome,
};
use super::{LotsApi, TokensApi};
use crate::config::LotadminConfig;
use crate::query::LotQuery;
use crate::session::Session;

/// `filename*=UTF-8''name` (RFC 5987). Wins over plain `filename`.
static EXTENDED_FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)filename\*\s*=\s*(?:[\w-]+'[\w-]*')?"?([^";]+)"?"#)
        .expect("extended filename regex must compile")
});

/// `filename="name"` or `filename=name`.
static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)filename\s*=\s*(?:"([^"]+)"|([^;\s]+))"#)
        .expect("filename regex must compile")
});

#[derive(Debug)]
pub struct ApiClient {
    base_url: String,
    session: Option<Session>,
    agent: ureq::Agent,
}

impl ApiClient {
    /// Build a client. `timeout` of `None` means requests never time out.
    pub fn new(base_url: &str, session: Option<Session>, timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            session,
            agent: builder.build(),
        }
    }

    pub fn from_config(config: &LotadminConfig, session: Option<Session>) -> Self {
        Self::new(&config.api.base_url, session, config.api.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// `POST /api/auth/login`. The only unauthenticated call.
    pub fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ApiError::validation("username and password are required"));
        }
        let request = self.agent.post(&self.url("/api/auth/login"));
        let response = request.send_json(LoginRequest { username, password })?;
        decode_json(response)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, method: &str, path: &str) -> Result<ureq::Request, ApiError> {
        let session = self.session.as_ref().ok_or_else(ApiError::no_session)?;
        Ok(self
            .agent
            .request(method, &self.url(path))
            .set("Authorization", &session.authorization())
            .set("Accept", "application/json"))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.authorized("GET", path)?.call()?;
        decode_json(response)
    }

    fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.authorized(method, path)?.send_json(body)?;
        decode_json(response)
    }

    fn call_json<T: DeserializeOwned>(&self, method: &str, path: &str) -> Result<T, ApiError> {
        let response = self.authorized(method, path)?.call()?;
        decode_json(response)
    }
}

impl LotsApi for ApiClient {
    fn list_lots(&self, query: &LotQuery) -> Result<LotsPage, ApiError> {
        let mut request = self.authorized("GET", "/api/lots")?;
        for (key, value) in query.to_pairs() {
            request = request.query(key, &value);
        }
        decode_json(request.call()?)
    }

    fn stats(&self) -> Result<Stats, ApiError> {
        self.get_json("/api/lots/stats")
    }

    fn download_lot(&self, id: i64) -> Result<LotFile, ApiError> {
        let response = self
            .authorized("GET", &format!("/api/lots/download/{id}"))?
            .set("Accept", "text/csv, application/octet-stream")
            .call()?;

        let filename = response
            .header("Content-Disposition")
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| fallback_filename(id));

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| ApiError::network(format!("download of lot {id} interrupted: {e}")))?;

        Ok(LotFile {
            lot_id: id,
            filename,
            bytes,
        })
    }

    fn delete_lot(&self, id: i64) -> Result<MessageResponse, ApiError> {
        self.call_json("DELETE", &format!("/api/lots/{id}"))
    }
}

impl TokensApi for ApiClient {
    fn list_tokens(&self) -> Result<Vec<ApiToken>, ApiError> {
        self.get_json("/api/tokens")
    }

    fn generate_token(&self, name: &str) -> Result<ApiToken, ApiError> {
        self.send_json("POST", "/api/tokens/generate", &GenerateTokenRequest { name })
    }

    fn toggle_token(&self, id: i64) -> Result<ToggleOutcome, ApiError> {
        self.call_json("PATCH", &format!("/api/tokens/{id}/toggle"))
    }

    fn delete_token(&self, id: i64) -> Result<MessageResponse, ApiError> {
        self.call_json("DELETE", &format!("/api/tokens/{id}"))
    }
}

/// Decode a 2xx JSON body. An empty body is read as `{}` so acknowledgements
/// tolerate `204 No Content`.
fn decode_json<T: DeserializeOwned>(response: ureq::Response) -> Result<T, ApiError> {
    let body = response
        .into_string()
        .map_err(|e| ApiError::network(format!("failed to read response body: {e}")))?;
    let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
    serde_json::from_str(body)
        .map_err(|e| ApiError::unknown(format!("failed to decode response: {e}")))
}

/// Extract a safe file name from a `Content-Disposition` header value.
///
/// Only the final path component is kept so a hostile header cannot write
/// outside the download directory.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let raw = match EXTENDED_FILENAME_RE.captures(header) {
        Some(caps) => caps.get(1),
        None => FILENAME_RE
            .captures(header)
            .and_then(|caps| caps.get(1).or_else(|| caps.get(2))),
    }?
    .as_str()
    .trim();
    let decoded = urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    let name = decoded.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}

/// `lot_{id}.csv`
pub fn fallback_filename(id: i64) -> String {
    format!("lot_{id}.csv")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
