//! Backend REST API: wire types, error taxonomy and the HTTP client.
//!
//! The controllers in [`crate::lots`] and [`crate::tokens`] only see the
//! [`LotsApi`] and [`TokensApi`] traits. [`ApiClient`] is the real
//! implementation; tests substitute in-memory backends.

pub mod client;
pub mod error;
pub mod types;

pub use client::ApiClient;
pub use error::ApiError;
pub use types::{ApiToken, Lot, LotFile, LotsPage, MessageResponse, Stats, ToggleOutcome};

use crate::query::LotQuery;

/// Lot endpoints (`/api/lots/*`).
pub trait LotsApi {
    fn list_lots(&self, query: &LotQuery) -> Result<LotsPage, ApiError>;
    fn stats(&self) -> Result<Stats, ApiError>;
    fn download_lot(&self, id: i64) -> Result<LotFile, ApiError>;
    fn delete_lot(&self, id: i64) -> Result<MessageResponse, ApiError>;
}

/// Token endpoints (`/api/tokens/*`). Every call is session-authorized.
pub trait TokensApi {
    fn list_tokens(&self) -> Result<Vec<ApiToken>, ApiError>;
    fn generate_token(&self, name: &str) -> Result<ApiToken, ApiError>;
    fn toggle_token(&self, id: i64) -> Result<ToggleOutcome, ApiError>;
    fn delete_token(&self, id: i64) -> Result<MessageResponse, ApiError>;
}
