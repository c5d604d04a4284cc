//! Bulk import handlers.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/promotions/import` | Body: JSON array of [`SheetRow`] |
//! | `POST` | `/promotions/import/csv` | Body: header-driven comma-separated text |
//!
//! Both return a [`ReconcileReport`]. A batch that names unknown employees
//! is rejected with 400 before anything is written.

use std::sync::Arc;

use axum::{Json, extract::State};
use tenure_core::{
  reconcile::{ReconcileReport, Reconciler},
  store::ChainStore,
};
use tenure_sheet::{SheetRow, into_proposals, parse_delimited};

use crate::error::ApiError;

/// `POST /promotions/import`
pub async fn json<S: ChainStore>(
  State(store): State<Arc<S>>,
  Json(rows): Json<Vec<SheetRow>>,
) -> Result<Json<ReconcileReport>, ApiError> {
  reconcile(store.as_ref(), rows).await
}

/// `POST /promotions/import/csv`
pub async fn csv<S: ChainStore>(
  State(store): State<Arc<S>>,
  body: String,
) -> Result<Json<ReconcileReport>, ApiError> {
  let rows = parse_delimited(&body)?;
  reconcile(store.as_ref(), rows).await
}

async fn reconcile<S: ChainStore>(
  store: &S,
  rows: Vec<SheetRow>,
) -> Result<Json<ReconcileReport>, ApiError> {
  let proposals = into_proposals(rows)?;
  Ok(Json(Reconciler::new(store).reconcile(proposals).await?))
}
