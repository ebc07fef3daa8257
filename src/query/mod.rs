//! Lot query builder: filters, sorting and pagination math.
//!
//! Pure functions only. Translates the table state into the query pairs sent
//! to `GET /api/lots` and derives page counts from the backend total.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// Page size used when nothing else is configured.
pub const DEFAULT_LIMIT: u32 = 50;

/// Largest page size the backend accepts.
pub const MAX_LIMIT: u32 = 100;

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    UploadedAt,
    LotNumber,
    FileName,
    RecordCount,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UploadedAt => "uploaded_at",
            Self::LotNumber => "lot_number",
            Self::FileName => "file_name",
            Self::RecordCount => "record_count",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "uploaded_at" | "date" => Ok(Self::UploadedAt),
            "lot_number" | "lot" => Ok(Self::LotNumber),
            "file_name" | "file" => Ok(Self::FileName),
            "record_count" | "records" => Ok(Self::RecordCount),
            other => Err(format!("unknown sort field: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Optional lot predicates. Blank strings count as "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LotFilters {
    pub lot_number: Option<String>,
    pub file_name: Option<String>,
    pub uploaded_by: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl LotFilters {
    /// Drop blank text filters and reject inverted date ranges.
    pub fn normalized(self) -> Result<Self, ApiError> {
        if let (Some(from), Some(to)) = (self.date_from, self.date_to)
            && from > to
        {
            return Err(ApiError::validation(format!(
                "date range is inverted: {from} is after {to}"
            )));
        }
        Ok(Self {
            lot_number: non_blank(self.lot_number),
            file_name: non_blank(self.file_name),
            uploaded_by: non_blank(self.uploaded_by),
            date_from: self.date_from,
            date_to: self.date_to,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.lot_number.is_none()
            && self.file_name.is_none()
            && self.uploaded_by.is_none()
            && self.date_from.is_none()
            && self.date_to.is_none()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Full request state for one page of lots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotQuery {
    pub filters: LotFilters,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

impl Default for LotQuery {
    fn default() -> Self {
        Self {
            filters: LotFilters::default(),
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl LotQuery {
    pub fn new(limit: u32) -> Self {
        Self::default().with_limit(limit)
    }

    /// Set the page size, clamped to `1..=MAX_LIMIT`.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.clamp(1, MAX_LIMIT);
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn with_sort(mut self, sort_by: SortField, sort_order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.sort_order = sort_order;
        self
    }

    /// Replace the filters. A new search always starts over at page 1.
    pub fn with_filters(mut self, filters: LotFilters) -> Result<Self, ApiError> {
        self.filters = filters.normalized()?;
        self.page = 1;
        Ok(self)
    }

    /// Ordered `(key, value)` pairs for the request. Unset filters are omitted.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.max(1).to_string()),
            ("limit", self.limit.clamp(1, MAX_LIMIT).to_string()),
        ];

        let f = &self.filters;
        if let Some(ref v) = f.lot_number {
            pairs.push(("lot_number", v.clone()));
        }
        if let Some(ref v) = f.file_name {
            pairs.push(("file_name", v.clone()));
        }
        if let Some(ref v) = f.uploaded_by {
            pairs.push(("uploaded_by", v.clone()));
        }
        if let Some(d) = f.date_from {
            pairs.push(("date_from", d.format("%Y-%m-%d").to_string()));
        }
        if let Some(d) = f.date_to {
            pairs.push(("date_to", d.format("%Y-%m-%d").to_string()));
        }

        pairs.push(("sort_by", self.sort_by.as_str().to_string()));
        pairs.push(("sort_order", self.sort_order.as_str().to_string()));
        pairs
    }

    /// Percent-encoded query string, without the leading `?`.
    pub fn to_query_string(&self) -> String {
        self.to_pairs()
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// `ceil(total / limit)`. Zero results means zero pages.
pub fn total_pages(total: u64, limit: u32) -> u32 {
    let limit = u64::from(limit.max(1));
    total.div_ceil(limit).min(u64::from(u32::MAX)) as u32
}

/// Page navigation state derived from the backend total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    pub current_page: u32,
    pub total_pages: u32,
}

impl Pager {
    pub fn new(current_page: u32, total: u64, limit: u32) -> Self {
        Self {
            current_page,
            total_pages: total_pages(total, limit),
        }
        .clamped()
    }

    /// Highest page a caller may navigate to. An empty result still shows page 1.
    pub fn last_page(&self) -> u32 {
        self.total_pages.max(1)
    }

    /// Keep `current_page` within `[1, last_page]`.
    pub fn clamped(self) -> Self {
        Self {
            current_page: self.current_page.clamp(1, self.last_page()),
            total_pages: self.total_pages,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn next(self) -> Self {
        Self {
            current_page: self.current_page.saturating_add(1),
            ..self
        }
        .clamped()
    }

    pub fn previous(self) -> Self {
        Self {
            current_page: self.current_page.saturating_sub(1),
            ..self
        }
        .clamped()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
