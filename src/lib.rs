pub mod activity;
pub mod api;
pub mod cli;
pub mod config;
pub mod lots;
pub mod query;
pub mod session;
pub mod stats;
pub mod tokens;
pub mod utils;
