//! `lotadmin lots list|download|delete`

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use colored::Colorize;

use super::{Context, OutputFormat, confirm, csv_field};
use crate::api::Lot;
use crate::lots::{BulkReport, LotTable};
use crate::query::{LotFilters, LotQuery, Pager, SortField, SortOrder};
use crate::utils::format::{format_datetime, format_indian_number, truncate};

/// Flags of `lotadmin lots list`. Unset values fall back to `[lots]` config.
#[derive(Debug, Clone, Default)]
pub struct ListArgs {
    pub page: u32,
    pub limit: Option<u32>,
    pub lot_number: Option<String>,
    pub file_name: Option<String>,
    pub uploaded_by: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub sort_by: Option<SortField>,
    pub order: Option<SortOrder>,
}

impl ListArgs {
    fn into_query(self, ctx: &Context) -> Result<LotQuery> {
        let lots = &ctx.config.lots;
        let query = LotQuery::new(self.limit.unwrap_or(lots.page_size))
            .with_sort(
                self.sort_by.unwrap_or(lots.sort_by),
                self.order.unwrap_or(lots.sort_order),
            )
            .with_filters(LotFilters {
                lot_number: self.lot_number,
                file_name: self.file_name,
                uploaded_by: self.uploaded_by,
                date_from: self.from,
                date_to: self.to,
            })?
            .with_page(self.page);
        Ok(query)
    }
}

// ---------------------------------------------------------------------------
// lotadmin lots list
// ---------------------------------------------------------------------------

/// Show one page of lots.
pub fn run_list(args: ListArgs, format: OutputFormat) -> Result<()> {
    let ctx = Context::load()?;
    let query = args.into_query(&ctx)?;
    let mut table = LotTable::new(ctx.client()?, query).with_activity(ctx.activity.clone());
    table.refresh().map_err(|e| ctx.fail(e))?;

    match format {
        OutputFormat::Json => print_lots_json(&table)?,
        OutputFormat::Csv => print_lots_csv(table.lots()),
        OutputFormat::Table => print_lots_table(table.lots(), table.total(), table.pager()),
    }
    Ok(())
}

fn print_lots_table(lots: &[Lot], total: u64, pager: Pager) {
    if lots.is_empty() {
        println!("{}", "No lots found.".yellow());
        return;
    }

    println!(
        "  {:>6}  {:<16} {:<28} {:>10}  {:<18}  Uploaded By",
        "ID", "Lot Number", "File Name", "Records", "Uploaded At"
    );
    println!("  {}", "-".repeat(98));

    for (i, lot) in lots.iter().enumerate() {
        let line = format!(
            "  {:>6}  {:<16} {:<28} {:>10}  {:<18}  {}",
            lot.id,
            truncate(&lot.lot_number, 16),
            truncate(&lot.file_name, 28),
            format_indian_number(lot.record_count),
            format_datetime(&lot.uploaded_at),
            lot.uploaded_by_token.as_deref().unwrap_or("Unknown"),
        );
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }

    println!();
    println!("  {}", pager_line(pager, total));
}

/// `Page 2 of 3 · 120 lots · ‹ Previous · Next ›`
fn pager_line(pager: Pager, total: u64) -> String {
    let previous = if pager.has_previous() {
        "‹ Previous".normal()
    } else {
        "‹ Previous".dimmed()
    };
    let next = if pager.has_next() {
        "Next ›".normal()
    } else {
        "Next ›".dimmed()
    };
    format!(
        "{} · {} lots · {previous} · {next}",
        format!("Page {} of {}", pager.current_page, pager.last_page()).bold(),
        format_indian_number(total),
    )
}

fn print_lots_json<B: crate::api::LotsApi>(table: &LotTable<B>) -> Result<()> {
    let pager = table.pager();
    let value = serde_json::json!({
        "lots": table.lots(),
        "total": table.total(),
        "page": pager.current_page,
        "total_pages": pager.total_pages,
        "limit": table.query().limit,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_lots_csv(lots: &[Lot]) {
    println!("id,lot_number,file_name,record_count,uploaded_at,uploaded_by");
    for lot in lots {
        println!(
            "{},{},{},{},{},{}",
            lot.id,
            csv_field(&lot.lot_number),
            csv_field(&lot.file_name),
            lot.record_count,
            lot.uploaded_at.to_rfc3339(),
            csv_field(lot.uploaded_by_token.as_deref().unwrap_or("Unknown")),
        );
    }
}

// ---------------------------------------------------------------------------
// lotadmin lots download
// ---------------------------------------------------------------------------

/// Download lots one after another into `dir`.
pub fn run_download(ids: &[i64], dir: Option<PathBuf>, delay_ms: Option<u64>) -> Result<()> {
    let ctx = Context::load()?;
    let dir = dir.unwrap_or_else(|| ctx.config.lots.download_path());
    let delay = delay_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| ctx.config.lots.bulk_delay());

    let table = LotTable::new(ctx.client()?, LotQuery::default())
        .with_bulk_delay(delay)
        .with_activity(ctx.activity.clone());

    if let [id] = ids {
        let path = table.download_one(*id, &dir).map_err(|e| ctx.fail(e))?;
        println!("{} Saved {}", "✓".green().bold(), path.display());
        return Ok(());
    }

    let (report, saved) = table.download_many(ids, &dir);
    for path in &saved {
        println!("{} Saved {}", "✓".green().bold(), path.display());
    }
    finish_bulk(&ctx, "download", &report)
}

// ---------------------------------------------------------------------------
// lotadmin lots delete
// ---------------------------------------------------------------------------

/// Delete lots after a y/N confirmation.
pub fn run_delete(ids: &[i64], yes: bool) -> Result<()> {
    let ctx = Context::load()?;
    let question = match ids {
        [id] => format!("Delete lot {id}? This cannot be undone."),
        _ => format!("Delete {} lots? This cannot be undone.", ids.len()),
    };
    if !yes && !confirm(&question)? {
        println!("{}", "Cancelled.".yellow());
        return Ok(());
    }

    let mut table = LotTable::new(ctx.client()?, LotQuery::default())
        .with_activity(ctx.activity.clone());

    if let [id] = ids {
        table.delete_one(*id).map_err(|e| ctx.fail(e))?;
        println!("{} Deleted lot {id}", "✓".green().bold());
        return Ok(());
    }

    let report = table.delete_many(ids);
    for id in &report.succeeded {
        println!("{} Deleted lot {id}", "✓".green().bold());
    }
    finish_bulk(&ctx, "delete", &report)
}

/// Print per-item failures and the summary line. Any failure is an error.
fn finish_bulk(ctx: &Context, action: &str, report: &BulkReport) -> Result<()> {
    for (id, err) in &report.failed {
        eprintln!("{} lot {id}: {err}", "✗".red().bold());
    }
    ctx.activity.note(
        &format!("lots.bulk_{action}"),
        None,
        report.is_complete(),
        &report.summary(),
    );

    if report.is_complete() {
        println!("{} {}", "✓".green().bold(), report.summary());
        return Ok(());
    }
    if let Some((_, err)) = report.failed.iter().find(|(_, e)| e.is_auth()) {
        return Err(ctx.fail(err.clone()));
    }
    let failed: Vec<String> = report.failed_ids().iter().map(i64::to_string).collect();
    bail!(
        "bulk {action}: {} (failed: {})",
        report.summary(),
        failed.join(", ")
    )
}
