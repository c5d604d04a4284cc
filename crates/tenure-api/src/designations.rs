//! Handlers for `/designations` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/designations` | Catalog ordered by rank |
//! | `POST` | `/designations` | Body: `{"code":"TL","title":"Team Lead","rank":2}` |

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tenure_core::{designation::DesignationEntry, store::ChainStore};

use crate::error::ApiError;

/// `GET /designations`
pub async fn list<S: ChainStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<DesignationEntry>>, ApiError> {
  Ok(Json(store.list_designations().await?))
}

/// `POST /designations`
pub async fn create<S: ChainStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<DesignationEntry>,
) -> Result<impl IntoResponse, ApiError> {
  if body.code.as_str().trim().is_empty() {
    return Err(ApiError::BadRequest("designation code is empty".into()));
  }
  let entry = store.add_designation(body).await?;
  Ok((StatusCode::CREATED, Json(entry)))
}
