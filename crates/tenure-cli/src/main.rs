//! `tenure` — command-line client for the Tenure designation history API.
//!
//! # Usage
//!
//! ```text
//! tenure --url http://localhost:8080 history 100
//! tenure promote 100 SPE 2023-01-01 --level 2
//! tenure promote 100 KA 2022-06-01 --level 1 --insert
//! tenure import promotions.csv
//! ```

mod client;
mod render;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use serde::Deserialize;
use tenure_core::{
  employee::EmployeeId,
  promotion::{EventId, Promotion},
};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "tenure", about = "Record and inspect employee designation history")]
struct Args {
  /// Path to a TOML config file (url).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the tenure server (default: http://localhost:8080).
  #[arg(long, env = "TENURE_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print an employee's promotion history.
  History { employee_id: i64 },

  /// Print an employee's designation, today or on a given date.
  Current {
    employee_id: i64,
    #[arg(long)]
    on:          Option<NaiveDate>,
  },

  /// Record a promotion. Appends by default.
  Promote {
    employee_id: i64,
    #[command(flatten)]
    promotion:   PromotionArgs,
    /// Place the event anywhere in the timeline instead of after the latest.
    #[arg(long)]
    insert:      bool,
  },

  /// Correct an existing promotion event.
  Amend {
    event_id:  i64,
    #[command(flatten)]
    promotion: PromotionArgs,
  },

  /// Delete a promotion event.
  Revoke { event_id: i64 },

  /// Bulk-import a sheet: `.csv` files as delimited text, anything else as
  /// JSON rows.
  Import { file: PathBuf },

  /// Check an employee's chain for broken links.
  Verify { employee_id: i64 },
}

#[derive(ClapArgs, Debug)]
struct PromotionArgs {
  /// Target designation code.
  designation: String,
  /// Effective date, `YYYY-MM-DD`.
  date:        NaiveDate,
  #[arg(long, default_value_t = 0)]
  level:       i32,
  #[arg(long)]
  remarks:     Option<String>,
}

impl PromotionArgs {
  fn into_promotion(self) -> Promotion {
    let promotion = Promotion::new(self.designation, self.date, self.level);
    match self.remarks {
      Some(r) => promotion.with_remarks(r),
      None => promotion,
    }
  }
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
  };

  let client = ApiClient::new(api_config)?;
  let output = run(&client, args.command).await?;
  print!("{output}");
  if !output.ends_with('\n') {
    println!();
  }
  Ok(())
}

async fn run(client: &ApiClient, command: Command) -> Result<String> {
  Ok(match command {
    Command::History { employee_id } => {
      render::history(&client.history(EmployeeId(employee_id)).await?)
    }
    Command::Current { employee_id, on } => {
      render::designation(&client.designation(EmployeeId(employee_id), on).await?)
    }
    Command::Promote {
      employee_id,
      promotion,
      insert,
    } => {
      let event = client
        .promote(EmployeeId(employee_id), &promotion.into_promotion(), insert)
        .await?;
      format!("recorded {}", render::event_line(&event))
    }
    Command::Amend {
      event_id,
      promotion,
    } => {
      let event = client
        .amend(EventId(event_id), &promotion.into_promotion())
        .await?;
      format!("amended {}", render::event_line(&event))
    }
    Command::Revoke { event_id } => {
      let event = client.revoke(EventId(event_id)).await?;
      format!("revoked {}", render::event_line(&event))
    }
    Command::Import { file } => render::import_report(&import(client, &file).await?),
    Command::Verify { employee_id } => {
      render::chain_report(&client.verify(EmployeeId(employee_id)).await?)
    }
  })
}

async fn import(
  client: &ApiClient,
  file: &Path,
) -> Result<tenure_core::reconcile::ReconcileReport> {
  let text = std::fs::read_to_string(file)
    .with_context(|| format!("reading sheet {}", file.display()))?;
  let is_csv = file
    .extension()
    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

  if is_csv {
    client.import_csv(text).await
  } else {
    // Parse locally so malformed JSON is reported before anything is sent.
    let rows = tenure_sheet::parse_json(&text)
      .with_context(|| format!("parsing {}", file.display()))?;
    client.import_rows(&rows).await
  }
}
