//! Core domain + application logic for the India Post tracking bot.
//!
//! This crate is framework-agnostic. Telegram and SQLite live behind ports
//! (traits) implemented in adapter crates.

pub mod admin;
pub mod cache;
pub mod checkpoint;
pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod notifier;
pub mod ports;
pub mod rate_limiter;
pub mod retention;
pub mod retry;
pub mod store;
pub mod templates;
pub mod tracking;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
