//! Dashboard summary cards.

use serde::Serialize;

use crate::activity::ActivityLog;
use crate::api::{ApiError, LotsApi, Stats};
use crate::utils::format::format_indian_number;

/// One labelled figure on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatCard {
    pub label: &'static str,
    pub value: u64,
    /// `value` grouped for display, e.g. `12,34,567`.
    pub display: String,
}

/// `GET /api/lots/stats`.
pub fn fetch_stats(backend: &dyn LotsApi, activity: &ActivityLog) -> Result<Stats, ApiError> {
    activity.track("stats", None, || backend.stats())
}

/// The four cards in display order.
pub fn cards(stats: &Stats) -> Vec<StatCard> {
    [
        ("Total Lots", stats.total_lots),
        ("Total Records", stats.total_records),
        ("Total Uploads", stats.total_uploads),
        ("Active Tokens", stats.active_tokens),
    ]
    .into_iter()
    .map(|(label, value)| StatCard {
        label,
        value,
        display: format_indian_number(value),
    })
    .collect()
}
