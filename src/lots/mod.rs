//! Lot table controller.
//!
//! Owns one page of lots plus the state around it: the query, the pager and
//! the bulk-action selection. The selection is always a subset of the IDs on
//! the loaded page:
//!
//! - a refresh drops selected IDs that are no longer on the page,
//! - a delete, successful or answered with `404`, refetches the page.
//!
//! Bulk actions run one item at a time. Downloads pause for a fixed delay
//! between items so the backend is not flooded. Nothing is rolled back on
//! partial failure; the [`BulkReport`] says what happened.

pub mod download;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::activity::ActivityLog;
use crate::api::{ApiError, Lot, LotsApi};
use crate::query::{LotFilters, LotQuery, Pager};

/// Default pause between bulk downloads.
pub const DEFAULT_BULK_DELAY: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Bulk report
// ---------------------------------------------------------------------------

/// Outcome of a bulk download or delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkReport {
    pub succeeded: Vec<i64>,
    pub failed: Vec<(i64, ApiError)>,
}

impl BulkReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<i64> {
        self.failed.iter().map(|(id, _)| *id).collect()
    }

    /// `"2 succeeded, 1 failed"`
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed",
            self.succeeded.len(),
            self.failed.len()
        )
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct LotTable<B> {
    backend: B,
    query: LotQuery,
    lots: Vec<Lot>,
    total: u64,
    pager: Pager,
    /// Insertion-ordered, duplicate-free.
    selection: Vec<i64>,
    bulk_delay: Duration,
    sleep: fn(Duration),
    activity: ActivityLog,
}

impl<B: LotsApi> LotTable<B> {
    pub fn new(backend: B, query: LotQuery) -> Self {
        let pager = Pager::new(query.page, 0, query.limit);
        Self {
            backend,
            query,
            lots: Vec::new(),
            total: 0,
            pager,
            selection: Vec::new(),
            bulk_delay: DEFAULT_BULK_DELAY,
            sleep: std::thread::sleep,
            activity: ActivityLog::disabled(),
        }
    }

    pub fn with_bulk_delay(mut self, delay: Duration) -> Self {
        self.bulk_delay = delay;
        self
    }

    /// Replace the function used to wait between bulk downloads.
    pub fn with_sleeper(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn with_activity(mut self, activity: ActivityLog) -> Self {
        self.activity = activity;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn query(&self) -> &LotQuery {
        &self.query
    }

    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    /// Backend total for the current filters, across all pages.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn pager(&self) -> Pager {
        self.pager
    }

    pub fn selection(&self) -> &[i64] {
        &self.selection
    }

    pub fn is_selected(&self, id: i64) -> bool {
        self.selection.contains(&id)
    }

    fn on_page(&self, id: i64) -> bool {
        self.lots.iter().any(|lot| lot.id == id)
    }

    // -- fetching -----------------------------------------------------------

    /// Fetch the page described by the current query.
    ///
    /// If the requested page is past the end (e.g. after a filter narrowed
    /// the results) the last page is fetched instead.
    pub fn refresh(&mut self) -> Result<&[Lot], ApiError> {
        let page = self.fetch()?;
        let pager = Pager::new(self.query.page, page.total, self.query.limit);

        if pager.current_page != self.query.page && page.lots.is_empty() && page.total > 0 {
            self.query.page = pager.current_page;
            let page = self.fetch()?;
            self.apply_page(page.lots, page.total);
        } else {
            self.apply_page(page.lots, page.total);
        }
        Ok(&self.lots)
    }

    /// Refresh and return the loaded page with the backend total.
    pub fn list_page(&mut self) -> Result<(&[Lot], u64), ApiError> {
        self.refresh()?;
        Ok((&self.lots, self.total))
    }

    fn fetch(&self) -> Result<crate::api::LotsPage, ApiError> {
        let target = Some(format!("page:{}", self.query.page));
        self.activity
            .track("lots.list", target, || self.backend.list_lots(&self.query))
    }

    fn apply_page(&mut self, lots: Vec<Lot>, total: u64) {
        self.lots = lots;
        self.total = total;
        self.pager = Pager::new(self.query.page, total, self.query.limit);
        self.query.page = self.pager.current_page;
        let lots = &self.lots;
        self.selection.retain(|id| lots.iter().any(|lot| lot.id == *id));
    }

    /// Replace filters, jump back to page 1 and refetch.
    pub fn apply_filters(&mut self, filters: LotFilters) -> Result<&[Lot], ApiError> {
        self.query = self.query.clone().with_filters(filters)?;
        self.refresh()
    }

    // -- pagination ---------------------------------------------------------

    pub fn go_to_page(&mut self, page: u32) -> Result<&[Lot], ApiError> {
        self.query.page = page.clamp(1, self.pager.last_page());
        self.refresh()
    }

    pub fn next_page(&mut self) -> Result<&[Lot], ApiError> {
        let next = self.pager.next().current_page;
        self.go_to_page(next)
    }

    pub fn previous_page(&mut self) -> Result<&[Lot], ApiError> {
        let previous = self.pager.previous().current_page;
        self.go_to_page(previous)
    }

    // -- selection ----------------------------------------------------------

    /// Flip one row. IDs that are not on the current page are ignored.
    pub fn toggle_select(&mut self, id: i64) {
        if let Some(pos) = self.selection.iter().position(|s| *s == id) {
            self.selection.remove(pos);
        } else if self.on_page(id) {
            self.selection.push(id);
        }
    }

    pub fn select_all(&mut self) {
        self.selection = self.lots.iter().map(|lot| lot.id).collect();
    }

    pub fn clear_all(&mut self) {
        self.selection.clear();
    }

    /// Header checkbox: clear when everything is selected, otherwise select all.
    pub fn toggle_select_all(&mut self) {
        if !self.lots.is_empty() && self.selection.len() == self.lots.len() {
            self.clear_all();
        } else {
            self.select_all();
        }
    }

    // -- downloads ----------------------------------------------------------

    /// Download one lot into `dir`. Fails with `NotFound` if the lot is gone.
    pub fn download_one(&self, id: i64, dir: &Path) -> Result<PathBuf, ApiError> {
        self.activity.track("lots.download", Some(format!("lot:{id}")), || {
            let file = self.backend.download_lot(id)?;
            download::save_lot_file(dir, &file).map_err(|e| {
                ApiError::unknown(format!(
                    "failed to save lot {} as {}: {e}",
                    file.lot_id, file.filename
                ))
            })
        })
    }

    /// Download `ids` one after another, pausing between items.
    pub fn download_many(&self, ids: &[i64], dir: &Path) -> (BulkReport, Vec<PathBuf>) {
        let mut report = BulkReport::default();
        let mut saved = Vec::new();

        for (i, &id) in ids.iter().enumerate() {
            if i > 0 && !self.bulk_delay.is_zero() {
                (self.sleep)(self.bulk_delay);
            }
            match self.download_one(id, dir) {
                Ok(path) => {
                    report.succeeded.push(id);
                    saved.push(path);
                }
                Err(e) => report.failed.push((id, e)),
            }
        }
        (report, saved)
    }

    /// Download every selected lot. The selection is cleared only if all
    /// downloads succeeded. Lots the backend no longer has are pruned by a
    /// refetch.
    pub fn download_selected(&mut self, dir: &Path) -> (BulkReport, Vec<PathBuf>) {
        let ids = self.selection.clone();
        let outcome = self.download_many(&ids, dir);
        if outcome.0.is_complete() {
            self.clear_all();
        }
        let gone: Vec<i64> = outcome
            .0
            .failed
            .iter()
            .filter(|(_, e)| e.is_not_found())
            .map(|(id, _)| *id)
            .collect();
        self.resync(&gone);
        outcome
    }

    // -- deletes ------------------------------------------------------------

    /// Delete one lot and refetch the page.
    ///
    /// A `404` still refetches, since the lot is gone either way.
    /// Confirmation is the caller's job.
    pub fn delete_one(&mut self, id: i64) -> Result<(), ApiError> {
        let result = self.delete_request(id);
        if result.as_ref().is_ok() || result.as_ref().is_err_and(ApiError::is_not_found) {
            self.resync(&[id]);
        }
        result
    }

    /// Delete `ids` one by one, then refetch once. Not transactional:
    /// successes stay deleted.
    pub fn delete_many(&mut self, ids: &[i64]) -> BulkReport {
        let mut report = BulkReport::default();
        let mut gone = Vec::new();
        for &id in ids {
            match self.delete_request(id) {
                Ok(()) => {
                    report.succeeded.push(id);
                    gone.push(id);
                }
                Err(e) => {
                    if e.is_not_found() {
                        gone.push(id);
                    }
                    report.failed.push((id, e));
                }
            }
        }
        self.resync(&gone);
        report
    }

    /// Delete every selected lot. IDs that failed for any reason other than
    /// `404` stay selected.
    pub fn delete_selected(&mut self) -> BulkReport {
        let ids = self.selection.clone();
        self.delete_many(&ids)
    }

    fn delete_request(&self, id: i64) -> Result<(), ApiError> {
        self.activity
            .track("lots.delete", Some(format!("lot:{id}")), || {
                self.backend.delete_lot(id)
            })
            .map(|_| ())
    }

    /// Refetch after `gone` left the backend. If the refetch fails the IDs
    /// are dropped locally instead.
    fn resync(&mut self, gone: &[i64]) {
        if gone.is_empty() {
            return;
        }
        if self.refresh().is_err() {
            for &id in gone {
                self.forget(id);
            }
        }
    }

    fn forget(&mut self, id: i64) {
        let before = self.lots.len();
        self.lots.retain(|lot| lot.id != id);
        if self.lots.len() < before {
            self.total = self.total.saturating_sub(1);
            self.pager = Pager::new(self.pager.current_page, self.total, self.query.limit);
        }
        self.selection.retain(|s| *s != id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
