//! Error taxonomy for backend calls.
//!
//! Every failure coming out of [`super::ApiClient`] is normalized into one of
//! these variants so callers can branch on the kind instead of parsing
//! messages. No variant is retried automatically.

use serde::Deserialize;

/// Normalized backend error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never completed (DNS, refused connection, reset).
    #[error("network error: {message}")]
    Network { message: String },
    /// Missing local session or a `401` from the backend.
    #[error("authentication required: {message}")]
    Auth {
        message: String,
        status: Option<u16>,
    },
    /// `404` on a specific resource.
    #[error("not found: {message}")]
    NotFound {
        message: String,
        status: Option<u16>,
    },
    /// Any other `4xx` carrying a message, or a client-side input check.
    #[error("{message}")]
    Validation {
        message: String,
        status: Option<u16>,
    },
    /// Fallback for `5xx`, unexpected statuses and undecodable success bodies.
    #[error("{message}")]
    Unknown {
        message: String,
        status: Option<u16>,
    },
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Local "not logged in" error, raised before any request is sent.
    pub fn no_session() -> Self {
        Self::Auth {
            message: "no authentication token found; run `lotadmin login`".to_string(),
            status: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            status: None,
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
            status: None,
        }
    }

    /// Map an HTTP status and its raw body into the taxonomy.
    ///
    /// The message comes from the JSON `detail` (or `message`) field. A body
    /// that does not decode degrades to `API Error: <status>`.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = extract_message(body).unwrap_or_else(|| format!("API Error: {status}"));
        let status_opt = Some(status);
        match status {
            401 => Self::Auth {
                message,
                status: status_opt,
            },
            404 => Self::NotFound {
                message,
                status: status_opt,
            },
            400..=499 => Self::Validation {
                message,
                status: status_opt,
            },
            _ => Self::Unknown {
                message,
                status: status_opt,
            },
        }
    }

    /// HTTP status, when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network { .. } => None,
            Self::Auth { status, .. }
            | Self::NotFound { status, .. }
            | Self::Validation { status, .. }
            | Self::Unknown { status, .. } => *status,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Network { message }
            | Self::Auth { message, .. }
            | Self::NotFound { message, .. }
            | Self::Validation { message, .. }
            | Self::Unknown { message, .. } => message,
        }
    }

    /// Stable tag used in the activity log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::Auth { .. } => "auth",
            Self::NotFound { .. } => "not_found",
            Self::Validation { .. } => "validation",
            Self::Unknown { .. } => "unknown",
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, response) => {
                let body = response.into_string().unwrap_or_default();
                Self::from_status(code, &body)
            }
            ureq::Error::Transport(transport) => Self::network(transport.to_string()),
        }
    }
}

/// Error body shape used by the backend (`{"detail": "..."}`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
    message: Option<String>,
}

fn extract_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        // Validation failures arrive as a list of `{loc, msg, type}` objects.
        Some(serde_json::Value::Array(items)) => {
            let msgs: Vec<String> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .map(str::to_string)
                .collect();
            if msgs.is_empty() {
                parsed.message
            } else {
                Some(msgs.join("; "))
            }
        }
        _ => parsed.message.filter(|m| !m.trim().is_empty()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
