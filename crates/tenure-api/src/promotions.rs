//! Handlers for promotion chain endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/employees/:id/promotions` | Ordered history |
//! | `GET`    | `/employees/:id/promotions/verify` | Chain invariant report |
//! | `POST`   | `/employees/:id/promotions` | Body: [`CreateBody`]; returns 201 |
//! | `PUT`    | `/promotions/:id` | Body: [`Promotion`] |
//! | `DELETE` | `/promotions/:id` | Returns the removed event |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tenure_core::{
  chain::ChainEngine,
  employee::EmployeeId,
  promotion::{EventId, Promotion, PromotionEvent},
  query::{ChainQuery, ChainReport, History},
  store::ChainStore,
};

use crate::error::ApiError;

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /employees/:id/promotions`
pub async fn history<S: ChainStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<EmployeeId>,
) -> Result<Json<History>, ApiError> {
  Ok(Json(ChainQuery::new(store.as_ref()).history(id).await?))
}

/// `GET /employees/:id/promotions/verify`
pub async fn verify<S: ChainStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<EmployeeId>,
) -> Result<Json<ChainReport>, ApiError> {
  Ok(Json(ChainQuery::new(store.as_ref()).verify(id).await?))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
  /// The new event must be later than every existing one.
  #[default]
  Append,
  /// The new event may land anywhere after the hire date.
  Insert,
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  #[serde(default)]
  pub mode:      Mode,
  #[serde(flatten)]
  pub promotion: Promotion,
}

/// `POST /employees/:id/promotions`
pub async fn create<S: ChainStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<EmployeeId>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let engine = ChainEngine::new(store.as_ref());
  let event = match body.mode {
    Mode::Append => engine.append(id, body.promotion).await?,
    Mode::Insert => engine.insert_at(id, body.promotion).await?,
  };
  Ok((StatusCode::CREATED, Json(event)))
}

// ─── Update / delete ─────────────────────────────────────────────────────────

/// `PUT /promotions/:id`
pub async fn update<S: ChainStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<EventId>,
  Json(body): Json<Promotion>,
) -> Result<Json<PromotionEvent>, ApiError> {
  Ok(Json(ChainEngine::new(store.as_ref()).update(id, body).await?))
}

/// `DELETE /promotions/:id`
pub async fn delete<S: ChainStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<EventId>,
) -> Result<Json<PromotionEvent>, ApiError> {
  Ok(Json(ChainEngine::new(store.as_ref()).delete(id).await?))
}
