//! Core types and domain logic for the Herdbook farm record-keeper.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod access;
pub mod actor;
pub mod chart;
pub mod error;
pub mod export;
pub mod group;
pub mod history;
pub mod observation;
pub mod stats;
pub mod store;
pub mod subject;

pub use error::{AsCoreError, Error, Result};
