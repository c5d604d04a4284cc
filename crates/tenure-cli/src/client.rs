//! Async HTTP client wrapping the tenure JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tenure_core::{
  designation::Designation,
  employee::EmployeeId,
  promotion::{EventId, Promotion, PromotionEvent},
  query::{ChainReport, History},
  reconcile::ReconcileReport,
};
use tenure_sheet::SheetRow;

/// Connection settings for the tenure API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

/// Answer to `GET /employees/:id/designation`.
#[derive(Debug, Deserialize)]
pub struct DesignationAnswer {
  pub designation: Designation,
  pub on:          Option<NaiveDate>,
}

#[derive(Serialize)]
struct CreateBody<'a> {
  mode:      &'static str,
  #[serde(flatten)]
  promotion: &'a Promotion,
}

/// Async HTTP client for the tenure JSON REST API.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// `GET /api/employees/:id/promotions`
  pub async fn history(&self, employee_id: EmployeeId) -> Result<History> {
    let path = format!("/employees/{employee_id}/promotions");
    let resp = self
      .client
      .get(self.url(&path))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    checked(resp, &path)
      .await?
      .json()
      .await
      .context("deserialising history")
  }

  /// `GET /api/employees/:id/designation[?on=<date>]`
  pub async fn designation(
    &self,
    employee_id: EmployeeId,
    on: Option<NaiveDate>,
  ) -> Result<DesignationAnswer> {
    let path = format!("/employees/{employee_id}/designation");
    let mut req = self.client.get(self.url(&path));
    if let Some(date) = on {
      req = req.query(&[("on", date.to_string())]);
    }
    let resp = req
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    checked(resp, &path)
      .await?
      .json()
      .await
      .context("deserialising designation")
  }

  /// `GET /api/employees/:id/promotions/verify`
  pub async fn verify(&self, employee_id: EmployeeId) -> Result<ChainReport> {
    let path = format!("/employees/{employee_id}/promotions/verify");
    let resp = self
      .client
      .get(self.url(&path))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    checked(resp, &path)
      .await?
      .json()
      .await
      .context("deserialising chain report")
  }

  // ── Single-event writes ───────────────────────────────────────────────────

  /// `POST /api/employees/:id/promotions`
  pub async fn promote(
    &self,
    employee_id: EmployeeId,
    promotion: &Promotion,
    insert: bool,
  ) -> Result<PromotionEvent> {
    let path = format!("/employees/{employee_id}/promotions");
    let body = CreateBody {
      mode: if insert { "insert" } else { "append" },
      promotion,
    };
    let resp = self
      .client
      .post(self.url(&path))
      .json(&body)
      .send()
      .await
      .with_context(|| format!("POST {path} failed"))?;
    checked(resp, &path)
      .await?
      .json()
      .await
      .context("deserialising promotion")
  }

  /// `PUT /api/promotions/:id`
  pub async fn amend(&self, event_id: EventId, promotion: &Promotion) -> Result<PromotionEvent> {
    let path = format!("/promotions/{event_id}");
    let resp = self
      .client
      .put(self.url(&path))
      .json(promotion)
      .send()
      .await
      .with_context(|| format!("PUT {path} failed"))?;
    checked(resp, &path)
      .await?
      .json()
      .await
      .context("deserialising promotion")
  }

  /// `DELETE /api/promotions/:id`
  pub async fn revoke(&self, event_id: EventId) -> Result<PromotionEvent> {
    let path = format!("/promotions/{event_id}");
    let resp = self
      .client
      .delete(self.url(&path))
      .send()
      .await
      .with_context(|| format!("DELETE {path} failed"))?;
    checked(resp, &path)
      .await?
      .json()
      .await
      .context("deserialising removed promotion")
  }

  // ── Bulk import ───────────────────────────────────────────────────────────

  /// `POST /api/promotions/import`
  pub async fn import_rows(&self, rows: &[SheetRow]) -> Result<ReconcileReport> {
    let path = "/promotions/import";
    let resp = self
      .client
      .post(self.url(path))
      .json(rows)
      .send()
      .await
      .context("POST /promotions/import failed")?;
    checked(resp, path)
      .await?
      .json()
      .await
      .context("deserialising import report")
  }

  /// `POST /api/promotions/import/csv`
  pub async fn import_csv(&self, text: String) -> Result<ReconcileReport> {
    let path = "/promotions/import/csv";
    let resp = self
      .client
      .post(self.url(path))
      .header(reqwest::header::CONTENT_TYPE, "text/csv")
      .body(text)
      .send()
      .await
      .context("POST /promotions/import/csv failed")?;
    checked(resp, path)
      .await?
      .json()
      .await
      .context("deserialising import report")
  }
}

/// Body of a non-2xx API response.
#[derive(Deserialize)]
struct ErrorBody {
  error: String,
  kind:  String,
}

/// Turn a non-2xx response into an error carrying the server's message.
async fn checked(resp: Response, path: &str) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  match resp.json::<ErrorBody>().await {
    Ok(body) => Err(anyhow!("{path} → {status}: {} ({})", body.error, body.kind)),
    Err(_) => Err(anyhow!("{path} → {status}")),
  }
}
