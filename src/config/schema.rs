/// Configuration schema and defaults for lotadmin.
///
/// Defines the TOML-serializable configuration structure with the sections
/// `[api]`, `[lots]`, `[tokens]` and `[logging]`. Every field has a built-in
/// default, so a config file only needs the values it wants to change.
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::query::{DEFAULT_LIMIT, SortField, SortOrder};
use crate::utils::paths::expand_tilde;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level lotadmin configuration.
///
/// Maps directly to `~/.lotadmin/config.toml` and `.lotadmin.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotadminConfig {
    pub api: ApiConfig,
    pub lots: LotsConfig,
    pub tokens: TokensConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [api]
// ---------------------------------------------------------------------------

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the backend, without the `/api` prefix.
    pub base_url: String,
    /// Per-request timeout in milliseconds. `0` disables the timeout.
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 0,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

// ---------------------------------------------------------------------------
// [lots]
// ---------------------------------------------------------------------------

/// Lot table defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotsConfig {
    pub page_size: u32,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    /// Directory downloaded CSVs are written to. `~` expands to home.
    pub download_dir: String,
    /// Pause between items of a bulk download, in milliseconds.
    pub bulk_delay_ms: u64,
}

impl Default for LotsConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_LIMIT,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            download_dir: ".".to_string(),
            bulk_delay_ms: 500,
        }
    }
}

impl LotsConfig {
    pub fn download_path(&self) -> PathBuf {
        expand_tilde(&self.download_dir)
    }

    pub fn bulk_delay(&self) -> Duration {
        Duration::from_millis(self.bulk_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// [tokens]
// ---------------------------------------------------------------------------

/// Token page behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokensConfig {
    /// Print a newly created secret in cleartext once.
    pub reveal_new: bool,
    /// Copy a newly created secret to the clipboard.
    pub copy_new: bool,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            reveal_new: true,
            copy_new: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Activity log settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether operations are recorded in the activity log.
    pub enabled: bool,
    /// Path to the JSONL activity log. `~` is expanded to the home directory.
    pub path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.lotadmin/activity.jsonl".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn log_path(&self) -> PathBuf {
        expand_tilde(&self.path)
    }
}

// ---------------------------------------------------------------------------
// Annotated default file
// ---------------------------------------------------------------------------

impl LotadminConfig {
    /// Annotated default config written by `lotadmin config init`.
    pub fn default_toml() -> String {
        r#"# lotadmin configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (LOTADMIN_*)
#   2. Project config (.lotadmin.toml in current directory)
#   3. User global config (~/.lotadmin/config.toml)
#   4. Built-in defaults

[api]
base_url = "http://localhost:8000"
timeout_ms = 0                  # 0 = wait for the server indefinitely

[lots]
page_size = 50                  # 1..=100
sort_by = "uploaded_at"         # uploaded_at | lot_number | file_name | record_count
sort_order = "desc"             # asc | desc
download_dir = "."
bulk_delay_ms = 500             # Pause between bulk downloads

[tokens]
reveal_new = true               # Show a freshly created secret once
copy_new = true                 # Copy a freshly created secret to the clipboard

[logging]
enabled = true
path = "~/.lotadmin/activity.jsonl"
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
