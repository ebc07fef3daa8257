//! Wire types for the backend REST API.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Lots
// ---------------------------------------------------------------------------

/// One merchant CSV upload batch. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub id: i64,
    pub lot_number: String,
    pub file_name: String,
    pub record_count: u64,
    #[serde(deserialize_with = "timestamp::required")]
    pub uploaded_at: DateTime<Utc>,
    /// Name of the token that uploaded the lot, when the backend knows it.
    #[serde(default)]
    pub uploaded_by_token: Option<String>,
}

/// Response body of `GET /api/lots`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotsPage {
    pub lots: Vec<Lot>,
    pub total: u64,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Aggregate counters from `GET /api/lots/stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total_lots: u64,
    pub total_records: u64,
    pub total_uploads: u64,
    pub active_tokens: u64,
}

/// A downloaded lot file.
#[derive(Debug, Clone)]
pub struct LotFile {
    pub lot_id: i64,
    pub filename: String,
    pub bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Merchant upload credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiToken {
    pub id: i64,
    /// The secret itself. Never log this field.
    pub token: String,
    pub name: String,
    pub is_active: bool,
    #[serde(deserialize_with = "timestamp::required")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub usage_count: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateTokenRequest<'a> {
    pub name: &'a str,
}

/// Response of `PATCH /api/tokens/{id}/toggle`.
///
/// Some backend builds return the full token, others only
/// `{"message": ..., "is_active": ...}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ToggleOutcome {
    Token(ApiToken),
    Status {
        #[serde(default)]
        message: Option<String>,
        is_active: bool,
    },
}

impl ToggleOutcome {
    pub fn is_active(&self) -> bool {
        match self {
            Self::Token(token) => token.is_active,
            Self::Status { is_active, .. } => *is_active,
        }
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    pub username: String,
}

/// Response body of `POST /api/auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub user: Option<User>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Generic `{"message": ...}` acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

// ---------------------------------------------------------------------------
// Timestamp decoding
// ---------------------------------------------------------------------------

/// The backend emits naive ISO timestamps (no offset) for UTC values.
/// Accept both those and full RFC 3339.
pub mod timestamp {
    use super::*;

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn required<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub fn optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.is_empty() => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
