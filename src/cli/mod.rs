//! CLI command implementations for lotadmin.
//!
//! Provides subcommand handlers for:
//! - `lotadmin login|logout|whoami`: session management
//! - `lotadmin stats`: dashboard summary cards
//! - `lotadmin lots list|download|delete`: see [`lots`]
//! - `lotadmin tokens list|create|toggle|delete|copy`: see [`tokens`]
//! - `lotadmin history`: recent entries from the activity log
//! - `lotadmin config show|init|set|reset`: configuration management

pub mod lots;
pub mod tokens;

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context as _, Result, anyhow};
use colored::Colorize;

use crate::activity::{self, ActivityEntry, ActivityLog};
use crate::api::{ApiClient, ApiError};
use crate::config::{self, LotadminConfig};
use crate::session::{Session, SessionStore};
use crate::stats;
use crate::utils::format::{format_datetime, truncate};

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

// ---------------------------------------------------------------------------
// Command context
// ---------------------------------------------------------------------------

/// Everything a command needs: resolved config, session storage and the
/// activity log.
pub struct Context {
    pub config: LotadminConfig,
    pub store: SessionStore,
    pub activity: ActivityLog,
}

impl Context {
    pub fn load() -> Result<Self> {
        let config = config::load();
        let store = SessionStore::default_location().context("could not determine home directory")?;
        let activity = ActivityLog::from_config(&config.logging);
        Ok(Self {
            config,
            store,
            activity,
        })
    }

    fn session(&self) -> Result<Session> {
        self.store
            .load()
            .ok_or_else(|| anyhow!(ApiError::no_session()))
    }

    /// Authenticated client for the configured backend.
    pub fn client(&self) -> Result<ApiClient> {
        let session = self.session()?;
        if session.base_url != self.config.api.base_url.trim().trim_end_matches('/') {
            eprintln!(
                "{} session was issued by {}, requests go to {}",
                "warning:".yellow().bold(),
                session.base_url,
                self.config.api.base_url
            );
        }
        Ok(ApiClient::from_config(&self.config, Some(session)))
    }

    /// Convert a backend error for display. A `401` means the saved token is
    /// no longer accepted, so the session file is removed.
    pub fn fail(&self, err: ApiError) -> anyhow::Error {
        if err.is_auth() && err.status() == Some(401) {
            let _ = self.store.clear();
            return anyhow!(err).context("session expired; run `lotadmin login` again");
        }
        anyhow!(err)
    }
}

// ---------------------------------------------------------------------------
// lotadmin login / logout / whoami
// ---------------------------------------------------------------------------

/// Authenticate and persist the session.
pub fn run_login(username: &str, password: Option<String>) -> Result<()> {
    let ctx = Context::load()?;
    let password = match password {
        Some(p) => p,
        None => rpassword::prompt_password("Password: ").context("failed to read password")?,
    };

    let client = ApiClient::from_config(&ctx.config, None);
    let response = ctx
        .activity
        .track("auth.login", Some(format!("user:{username}")), || {
            client.login(username, &password)
        })
        .map_err(|e| anyhow!(e))?;

    let display_name = response
        .user
        .as_ref()
        .map(|u| u.username.clone())
        .unwrap_or_else(|| username.to_string());
    let mut session = Session::new(
        response.access_token,
        Some(display_name.clone()),
        client.base_url(),
    );
    session.token_type = response.token_type;
    ctx.store.save(&session)?;

    println!(
        "{} Logged in as {} at {}",
        "✓".green().bold(),
        display_name.bold(),
        client.base_url()
    );
    Ok(())
}

/// Remove the saved session.
pub fn run_logout() -> Result<()> {
    let ctx = Context::load()?;
    let existed = ctx.store.clear()?;
    ctx.activity.note("auth.logout", None, true, "");
    if existed {
        println!("{} Logged out", "✓".green().bold());
    } else {
        println!("{}", "Not logged in.".yellow());
    }
    Ok(())
}

/// Show the saved session.
pub fn run_whoami() -> Result<()> {
    let ctx = Context::load()?;
    let Some(session) = ctx.store.load() else {
        println!(
            "{}",
            "Not logged in. Run `lotadmin login --username <name>`.".yellow()
        );
        return Ok(());
    };

    println!(
        "  {} {}",
        "User:     ".bold(),
        session.username.as_deref().unwrap_or("Unknown")
    );
    println!("  {} {}", "Backend:  ".bold(), session.base_url);
    println!(
        "  {} {}",
        "Since:    ".bold(),
        format_datetime(&session.issued_at)
    );
    println!(
        "  {} {}",
        "Session:  ".bold(),
        ctx.store.path().display().to_string().dimmed()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// lotadmin stats
// ---------------------------------------------------------------------------

/// Show the dashboard summary cards.
pub fn run_stats(format: OutputFormat) -> Result<()> {
    let ctx = Context::load()?;
    let client = ctx.client()?;
    let stats = stats::fetch_stats(&client, &ctx.activity).map_err(|e| ctx.fail(e))?;
    let cards = stats::cards(&stats);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Csv => {
            println!("label,value");
            for card in &cards {
                println!("{},{}", card.label, card.value);
            }
        }
        OutputFormat::Table => {
            println!("{}", "Lot Dashboard".bold().cyan());
            println!("{}", "=".repeat(40));
            for card in &cards {
                println!("  {} {:>20}", format!("{:<16}", card.label).bold(), card.display);
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// lotadmin history
// ---------------------------------------------------------------------------

/// Show the newest activity log entries.
pub fn run_history(limit: usize, format: OutputFormat) -> Result<()> {
    let ctx = Context::load()?;
    let entries = ctx.activity.read_recent(limit);

    if entries.is_empty() {
        println!("{}", "No activity recorded yet.".yellow());
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Csv => print_history_csv(&entries),
        OutputFormat::Table => print_history_table(&entries),
    }
    Ok(())
}

fn print_history_table(entries: &[ActivityEntry]) {
    println!("{}", "Recent Activity".bold().cyan());
    println!(
        "  {:<20} {:<16} {:<14} {:>7} Result",
        "Time", "Operation", "Target", "ms"
    );
    println!("  {}", "-".repeat(70));

    for entry in entries {
        let time = chrono::DateTime::parse_from_rfc3339(&entry.timestamp)
            .map(|dt| format_datetime(&dt.with_timezone(&chrono::Utc)))
            .unwrap_or_else(|_| entry.timestamp.clone());
        let result = if entry.success {
            "ok".green()
        } else {
            entry
                .message
                .as_deref()
                .map(|m| truncate(m, 40))
                .unwrap_or_else(|| "failed".to_string())
                .red()
        };
        println!(
            "  {:<20} {:<16} {:<14} {:>7} {}",
            time,
            truncate(&entry.operation, 16),
            truncate(entry.target.as_deref().unwrap_or("-"), 14),
            entry.duration_ms,
            result,
        );
    }

    println!();
    for summary in activity::summarize(entries) {
        println!(
            "  {} {} ok, {} failed",
            format!("{}:", summary.operation).dimmed(),
            summary.succeeded,
            summary.failed
        );
    }
}

fn print_history_csv(entries: &[ActivityEntry]) {
    println!("timestamp,operation,target,success,error_kind,duration_ms,message");
    for e in entries {
        println!(
            "{},{},{},{},{},{},{}",
            e.timestamp,
            e.operation,
            e.target.as_deref().unwrap_or(""),
            e.success,
            e.error_kind.as_deref().unwrap_or(""),
            e.duration_ms,
            csv_field(e.message.as_deref().unwrap_or("")),
        );
    }
}

// ---------------------------------------------------------------------------
// lotadmin config
// ---------------------------------------------------------------------------

/// Show the effective configuration and where it came from.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective lotadmin Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    for (label, path) in [
        ("~/.lotadmin/config.toml", config::global_config_file()),
        (".lotadmin.toml", config::project_config_file()),
    ] {
        if path.is_some_and(|p| p.exists()) {
            println!("  {} {}", "✓".green(), label.dimmed());
        } else {
            println!("  {} {}", "·".dimmed(), format!("{label} (not found)").dimmed());
        }
    }
    println!(
        "  {} {}",
        "·".dimmed(),
        "LOTADMIN_* environment variables".dimmed()
    );
    Ok(())
}

/// Initialize a default config file at `~/.lotadmin/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Prompt and formatting helpers
// ---------------------------------------------------------------------------

/// Print `prompt` and read one line from stdin, without the newline.
fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Ask a y/N question. Anything but `y`/`yes` is a no, as is a closed stdin.
pub fn confirm(question: &str) -> Result<bool> {
    if !io::stdin().is_terminal() {
        eprintln!(
            "{} refusing to prompt on a non-interactive stdin; pass --yes",
            "error:".red().bold()
        );
        return Ok(false);
    }
    let answer = prompt_line(&format!("{question} [y/N] "))?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Quote a CSV field when it contains a separator, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
