//! Core types and the recurrence engine for Cadence.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::CalendarStore`]; the [`engine::Engine`]
//! drives rule expansion and reconciliation against any of them.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod config;
pub mod describe;
pub mod engine;
pub mod error;
pub mod event;
pub mod exception;
pub mod expand;
pub mod recurrence;
pub mod store;

pub use error::{Error, Result};
