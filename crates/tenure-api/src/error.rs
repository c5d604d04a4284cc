//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use tenure_core::ErrorKind;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] tenure_core::Error),

  #[error("invalid sheet: {0}")]
  Sheet(#[from] tenure_sheet::Error),

  #[error("bad request: {0}")]
  BadRequest(String),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::Core(e) => match e.kind() {
        ErrorKind::EmployeeNotFound | ErrorKind::EventNotFound => StatusCode::NOT_FOUND,
        ErrorKind::InactiveEmployee => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::DateConflict
        | ErrorKind::ConcurrentModification
        | ErrorKind::Duplicate => StatusCode::CONFLICT,
        ErrorKind::InvalidSequence
        | ErrorKind::UnknownDesignation
        | ErrorKind::UnknownEmployees => StatusCode::BAD_REQUEST,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
      },
      ApiError::Sheet(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
    }
  }

  fn kind(&self) -> &'static str {
    match self {
      ApiError::Core(e) => e.kind().into(),
      ApiError::Sheet(_) => "invalid_sheet",
      ApiError::BadRequest(_) => "bad_request",
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    let body = json!({ "error": self.to_string(), "kind": self.kind() });
    (status, Json(body)).into_response()
  }
}
