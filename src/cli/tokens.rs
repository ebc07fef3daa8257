//! `lotadmin tokens list|create|toggle|delete|copy`

use anyhow::Result;
use colored::Colorize;

use super::{Context, OutputFormat, confirm, csv_field};
use crate::api::{ApiClient, ApiToken};
use crate::tokens::{TokenManager, mask_token};
use crate::utils::clipboard::SystemClipboard;
use crate::utils::format::{format_datetime, truncate};

fn manager(ctx: &Context) -> Result<TokenManager<ApiClient>> {
    Ok(TokenManager::new(ctx.client()?).with_activity(ctx.activity.clone()))
}

/// List tokens, masked unless their ID is in `reveal`.
pub fn run_list(reveal: &[i64], format: OutputFormat) -> Result<()> {
    let ctx = Context::load()?;
    let mut manager = manager(&ctx)?;
    manager.list().map_err(|e| ctx.fail(e))?;
    for &id in reveal {
        manager.reveal(id);
    }

    match format {
        OutputFormat::Json => print_tokens_json(&manager)?,
        OutputFormat::Csv => print_tokens_csv(&manager),
        OutputFormat::Table => print_tokens_table(&manager),
    }
    Ok(())
}

fn print_tokens_table(manager: &TokenManager<ApiClient>) {
    let tokens = manager.tokens();
    if tokens.is_empty() {
        println!(
            "{}",
            "No API tokens yet. Create one with `lotadmin tokens create <name>`.".yellow()
        );
        return;
    }

    println!("{}", "API Tokens".bold().cyan());
    println!(
        "  {:>5}  {:<20} {:<40}  {:<8} {:>6}  {:<18}  Last Used",
        "ID", "Name", "Token", "Status", "Uses", "Created"
    );
    println!("  {}", "-".repeat(124));

    for token in tokens {
        let status = if token.is_active {
            format!("{:<8}", "active").green()
        } else {
            format!("{:<8}", "inactive").red()
        };
        println!(
            "  {:>5}  {:<20} {:<40}  {} {:>6}  {:<18}  {}",
            token.id,
            truncate(&token.name, 20),
            manager.display_token(token),
            status,
            token.usage_count,
            format_datetime(&token.created_at),
            last_used(token),
        );
    }
}

fn last_used(token: &ApiToken) -> String {
    token
        .last_used_at
        .as_ref()
        .map(format_datetime)
        .unwrap_or_else(|| "Never".to_string())
}

fn print_tokens_json(manager: &TokenManager<ApiClient>) -> Result<()> {
    let rows: Vec<_> = manager
        .tokens()
        .iter()
        .map(|t| {
            serde_json::json!({
                "id": t.id,
                "name": t.name,
                "token": manager.display_token(t),
                "is_active": t.is_active,
                "created_at": t.created_at,
                "last_used_at": t.last_used_at,
                "usage_count": t.usage_count,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn print_tokens_csv(manager: &TokenManager<ApiClient>) {
    println!("id,name,token,is_active,created_at,last_used_at,usage_count");
    for t in manager.tokens() {
        println!(
            "{},{},{},{},{},{},{}",
            t.id,
            csv_field(&t.name),
            manager.display_token(t),
            t.is_active,
            t.created_at.to_rfc3339(),
            t.last_used_at.map(|d| d.to_rfc3339()).unwrap_or_default(),
            t.usage_count,
        );
    }
}

/// Generate a token for a merchant.
pub fn run_create(name: &str, no_copy: bool) -> Result<()> {
    let ctx = Context::load()?;
    let mut manager = manager(&ctx)?;
    let copy = ctx.config.tokens.copy_new && !no_copy;
    let (token, copied) = if copy {
        manager.create_and_copy(name, &SystemClipboard)
    } else {
        manager.create(name).map(|t| (t.clone(), false))
    }
    .map_err(|e| ctx.fail(e))?;

    println!(
        "{} Created token {} for {}",
        "✓".green().bold(),
        token.id,
        token.name.bold()
    );
    if ctx.config.tokens.reveal_new {
        println!("  {}", manager.display_token(&token));
        println!(
            "  {}",
            "Store it now: it will only be shown masked from here on.".dimmed()
        );
    } else {
        println!("  {}", mask_token(&token.token));
    }

    if copied {
        println!("  {}", "Copied to clipboard.".dimmed());
    } else if copy {
        eprintln!(
            "{} could not copy to the clipboard; run `lotadmin tokens list --reveal {}`",
            "warning:".yellow().bold(),
            token.id
        );
    }
    Ok(())
}

/// Activate or deactivate a token.
pub fn run_toggle(id: i64) -> Result<()> {
    let ctx = Context::load()?;
    let mut manager = manager(&ctx)?;
    manager.refresh().map_err(|e| ctx.fail(e))?;
    let token = manager.toggle(id).map_err(|e| ctx.fail(e))?;
    let state = if token.is_active {
        "active".green()
    } else {
        "inactive".red()
    };
    println!(
        "{} Token {} ({}) is now {state}",
        "✓".green().bold(),
        token.id,
        token.name
    );
    Ok(())
}

/// Delete a token after a y/N confirmation.
pub fn run_delete(id: i64, yes: bool) -> Result<()> {
    let ctx = Context::load()?;
    if !yes && !confirm(&format!("Delete token {id}? Uploads using it will stop working."))? {
        println!("{}", "Cancelled.".yellow());
        return Ok(());
    }
    let mut manager = manager(&ctx)?;
    manager.delete(id).map_err(|e| ctx.fail(e))?;
    println!("{} Deleted token {id}", "✓".green().bold());
    Ok(())
}

/// Copy a token's secret to the clipboard.
pub fn run_copy(id: i64) -> Result<()> {
    let ctx = Context::load()?;
    let mut manager = manager(&ctx)?;
    manager.refresh().map_err(|e| ctx.fail(e))?;
    if manager.copy_token(id, &SystemClipboard).map_err(|e| ctx.fail(e))? {
        println!("{} Token {id} copied to clipboard", "✓".green().bold());
    } else {
        anyhow::bail!("could not copy token {id}: no clipboard mechanism available");
    }
    Ok(())
}
