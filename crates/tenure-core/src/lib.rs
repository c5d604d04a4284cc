//! Core types, traits and engines for Tenure, the employee designation
//! history service.
//!
//! This crate is free of HTTP and database dependencies. Storage backends
//! implement [`store::ChainStore`]; the chain engine, the reconciler and the
//! query facade run on top of any of them.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod chain;
pub mod designation;
pub mod employee;
pub mod error;
pub mod memory;
pub mod promotion;
pub mod query;
pub mod reconcile;
pub mod store;

pub use error::{Error, ErrorKind, Result};
