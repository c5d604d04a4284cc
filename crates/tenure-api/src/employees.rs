//! Handlers for `/employees` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/employees` | |
//! | `POST` | `/employees` | Body: [`NewEmployee`]; returns 201 |
//! | `GET`  | `/employees/:id` | 404 if not found |
//! | `PUT`  | `/employees/:id/status` | Body: `{"status":"inactive"}` |
//! | `GET`  | `/employees/:id/designation` | Optional `?on=YYYY-MM-DD` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tenure_core::{
  Error,
  designation::Designation,
  employee::{Employee, EmployeeId, EmployeeStatus, NewEmployee},
  query::ChainQuery,
  store::ChainStore,
};

use crate::error::ApiError;

// ─── List / get ──────────────────────────────────────────────────────────────

/// `GET /employees`
pub async fn list<S: ChainStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Employee>>, ApiError> {
  Ok(Json(store.list_employees().await?))
}

/// `GET /employees/:id`
pub async fn get_one<S: ChainStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<EmployeeId>,
) -> Result<Json<Employee>, ApiError> {
  let employee = store
    .get_employee(id)
    .await?
    .ok_or(Error::EmployeeNotFound(id))?;
  Ok(Json(employee))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /employees`. The initial designation must be in the catalog.
pub async fn create<S: ChainStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewEmployee>,
) -> Result<impl IntoResponse, ApiError> {
  let catalog = store.list_designations().await?;
  if !catalog.iter().any(|d| d.code == body.initial_designation) {
    return Err(Error::UnknownDesignation(body.initial_designation).into());
  }
  let employee = store.add_employee(body).await?;
  Ok((StatusCode::CREATED, Json(employee)))
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: EmployeeStatus,
}

/// `PUT /employees/:id/status`
pub async fn set_status<S: ChainStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<EmployeeId>,
  Json(body): Json<StatusBody>,
) -> Result<Json<Employee>, ApiError> {
  Ok(Json(store.set_employee_status(id, body.status).await?))
}

// ─── Current designation ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DesignationParams {
  /// Answer for a past or future date instead of today.
  pub on: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct DesignationResponse {
  pub employee_id: EmployeeId,
  pub designation: Designation,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub on:          Option<NaiveDate>,
}

/// `GET /employees/:id/designation[?on=<date>]`
///
/// Without `on`, returns the cached current designation. With it, the
/// answer is read from the employee's history.
pub async fn designation<S: ChainStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<EmployeeId>,
  Query(params): Query<DesignationParams>,
) -> Result<Json<DesignationResponse>, ApiError> {
  let query = ChainQuery::new(store.as_ref());
  let designation = match params.on {
    None => query.current_designation(id).await?,
    Some(date) => query.history(id).await?.designation_on(date).clone(),
  };
  Ok(Json(DesignationResponse {
    employee_id: id,
    designation,
    on: params.on,
  }))
}
