//! JSON REST API for Tenure.
//!
//! Exposes an axum [`Router`] backed by any [`ChainStore`]. Auth, TLS, and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tenure_api::api_router(store.clone()))
//! ```

pub mod designations;
pub mod employees;
pub mod error;
pub mod import;
pub mod promotions;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use tenure_core::store::ChainStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: ChainStore + 'static,
{
  Router::new()
    // Catalog
    .route(
      "/designations",
      get(designations::list::<S>).post(designations::create::<S>),
    )
    // Employees
    .route("/employees", get(employees::list::<S>).post(employees::create::<S>))
    .route("/employees/{id}", get(employees::get_one::<S>))
    .route("/employees/{id}/status", put(employees::set_status::<S>))
    .route("/employees/{id}/designation", get(employees::designation::<S>))
    // Promotion chains
    .route(
      "/employees/{id}/promotions",
      get(promotions::history::<S>).post(promotions::create::<S>),
    )
    .route("/employees/{id}/promotions/verify", get(promotions::verify::<S>))
    .route(
      "/promotions/{id}",
      put(promotions::update::<S>).delete(promotions::delete::<S>),
    )
    // Bulk import
    .route("/promotions/import", post(import::json::<S>))
    .route("/promotions/import/csv", post(import::csv::<S>))
    .with_state(store)
}

// ─── Router tests ────────────────────────────────────────────────────────────
