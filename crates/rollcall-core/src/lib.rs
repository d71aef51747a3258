//! Core types and trait definitions for the rollcall attendance tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! It holds the access gate, the time clamp, and the reconciler that keeps
//! per-user attendance counters consistent with check-in status changes.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod clamp;
pub mod counters;
pub mod error;
pub mod event;
pub mod gate;
pub mod reconcile;
pub mod record;
pub mod status;
pub mod store;

pub use error::{Error, Result};
