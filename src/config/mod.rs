/// Configuration system for lotadmin.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: [`schema::LotadminConfig::default()`]
/// 2. **User global config**: `~/.lotadmin/config.toml`
/// 3. **Project local config**: `.lotadmin.toml` in the current directory
/// 4. **Environment variables**: `LOTADMIN_*` overrides (highest precedence)
///
/// Later layers override earlier ones at the key level. A file that sets
/// only `[lots] page_size` leaves every other value untouched.
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::LotadminConfig;

use crate::utils::paths::lotadmin_home_dir;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
pub fn load() -> LotadminConfig {
    let mut config = load_layers(&[global_config_path(), project_config_path()]);
    apply_env_overrides(&mut config);
    config
}

/// Merge the given TOML files over the defaults, in order.
///
/// Missing or malformed files are skipped.
pub fn load_layers(paths: &[Option<PathBuf>]) -> LotadminConfig {
    let Ok(mut merged) = toml::Value::try_from(LotadminConfig::default()) else {
        return LotadminConfig::default();
    };

    for path in paths.iter().flatten() {
        if let Some(layer) = read_toml_value(path) {
            merge_values(&mut merged, layer);
        }
    }

    merged.try_into().unwrap_or_default()
}

fn read_toml_value(path: &Path) -> Option<toml::Value> {
    let content = fs::read_to_string(path).ok()?;
    let value: toml::Value = toml::from_str(&content).ok()?;
    // Reject files whose values do not fit the schema.
    value.clone().try_into::<LotadminConfig>().ok()?;
    Some(value)
}

/// Recursively overlay `overlay` onto `base`. Tables merge key by key;
/// everything else is replaced.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// `~/.lotadmin/config.toml`
fn global_config_path() -> Option<PathBuf> {
    lotadmin_home_dir().map(|dir| dir.join("config.toml"))
}

/// `.lotadmin.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".lotadmin.toml"))
}

pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `LOTADMIN_API_URL`: backend base URL
/// - `LOTADMIN_TIMEOUT_MS`: request timeout, `0` for none
/// - `LOTADMIN_PAGE_SIZE`: lots per page
/// - `LOTADMIN_DOWNLOAD_DIR`: where downloaded CSVs land
/// - `LOTADMIN_BULK_DELAY_MS`: pause between bulk downloads
/// - `LOTADMIN_LOGGING`: activity log on/off (`1`/`true`/`yes`/`on`)
pub fn apply_env_overrides(config: &mut LotadminConfig) {
    if let Ok(val) = std::env::var("LOTADMIN_API_URL")
        && !val.trim().is_empty()
    {
        config.api.base_url = val;
    }
    if let Ok(val) = std::env::var("LOTADMIN_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.api.timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("LOTADMIN_PAGE_SIZE")
        && let Ok(size) = val.parse::<u32>()
    {
        config.lots.page_size = size;
    }
    if let Ok(val) = std::env::var("LOTADMIN_DOWNLOAD_DIR")
        && !val.is_empty()
    {
        config.lots.download_dir = val;
    }
    if let Ok(val) = std::env::var("LOTADMIN_BULK_DELAY_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.lots.bulk_delay_ms = ms;
    }
    if let Ok(val) = std::env::var("LOTADMIN_LOGGING") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
pub fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.lotadmin/config.toml`.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;
    write_default_config(&path, force)?;
    Ok(path)
}

fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, LotadminConfig::default_toml()).context("failed to write config file")
}

/// Set a single dotted key (e.g. `lots.page_size`) in the global config file.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;
    set_config_value_at(&path, key, value)
}

fn set_config_value_at(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut root: toml::Value = if path.exists() {
        let content = fs::read_to_string(path).context("failed to read config file")?;
        toml::from_str(&content).context("failed to parse config as TOML value")?
    } else {
        toml::Value::try_from(LotadminConfig::default())
            .context("failed to serialize default config")?
    };

    set_toml_value(&mut root, key, value)?;

    // Refuse to write a file that would no longer load.
    root.clone()
        .try_into::<LotadminConfig>()
        .with_context(|| format!("invalid value for '{key}': {value}"))?;

    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, output).context("failed to write config file")?;
    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
///
/// Keys missing from the file are resolved against the default schema so
/// `set` works on a sparse config file.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
    let Some((leaf, sections)) = parts.split_last() else {
        anyhow::bail!("empty config key");
    };

    let defaults = toml::Value::try_from(LotadminConfig::default())
        .context("failed to serialize default config")?;
    let mut default_cursor = Some(&defaults);

    let mut current = root;
    for &section in sections {
        default_cursor = default_cursor.and_then(|d| d.get(section));
        if default_cursor.is_none() && current.get(section).is_none() {
            anyhow::bail!("config key not found: section '{section}' in '{key}'");
        }
        let table = current
            .as_table_mut()
            .with_context(|| format!("expected table above '{section}'"))?;
        current = table
            .entry(section.to_string())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    let table = current
        .as_table_mut()
        .with_context(|| format!("expected table at '{key}'"))?;

    let template = table
        .get(*leaf)
        .cloned()
        .or_else(|| default_cursor.and_then(|d| d.get(*leaf)).cloned())
        .with_context(|| format!("config key not found: '{key}'"))?;

    let new_value = match template {
        toml::Value::Boolean(_) => toml::Value::Boolean(is_truthy(raw_value)),
        toml::Value::Integer(_) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        toml::Value::Float(_) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        _ => toml::Value::String(raw_value.to_string()),
    };

    table.insert((*leaf).to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    toml::to_string_pretty(&load()).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
