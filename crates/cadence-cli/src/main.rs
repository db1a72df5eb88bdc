//! `cadence`: command-line front end for the Cadence recurrence engine.
//!
//! Every command prints its result as JSON on stdout; logs go to stderr.
//!
//! # Usage
//!
//! ```
//! cadence create-event --title Standup --start 2025-01-06T09:00:00Z --stop 2025-01-06T10:00:00Z
//! cadence make-recurring <EVENT_ID> '{"frequency":"weekly","weekdays":["Mon","Wed","Fri"]}'
//! cadence apply <RULE_ID>
//! cadence split <RULE_ID> 2025-02-03T09:00:00Z
//! ```

mod config;

use std::path::PathBuf;

use anyhow::Context as _;
use cadence_core::{
  engine::Engine,
  event::{EventChanges, NewEvent},
  expand::Window,
  recurrence::RuleParams,
  store::CalendarStore,
};
use cadence_store_sqlite::SqliteStore;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::CliConfig;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Recurring calendar events")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "cadence.toml")]
  config: PathBuf,

  /// Override the store path from the configuration.
  #[arg(long, value_name = "FILE")]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create a standalone event.
  CreateEvent {
    #[arg(long)]
    title:       String,
    #[arg(long)]
    start:       DateTime<Utc>,
    #[arg(long)]
    stop:        DateTime<Utc>,
    /// IANA timezone the event repeats in (default UTC).
    #[arg(long)]
    timezone:    Option<String>,
    #[arg(long)]
    location:    Option<String>,
    #[arg(long)]
    description: Option<String>,
  },
  /// Turn an existing event into the base of a recurrence rule.
  MakeRecurring {
    event_id: Uuid,
    /// Rule parameters as JSON.
    params:   String,
  },
  /// Print a human-readable summary of a rule.
  Describe { rule_id: Uuid },
  /// List occurrence start times without writing anything.
  Preview {
    rule_id: Uuid,
    #[arg(long)]
    from:    Option<DateTime<Utc>>,
    #[arg(long)]
    to:      Option<DateTime<Utc>>,
    #[arg(long)]
    limit:   Option<usize>,
  },
  /// Materialise missing instances of a rule.
  Apply {
    rule_id: Uuid,
    #[arg(long)]
    limit:   Option<usize>,
  },
  /// List the exceptions recorded against a rule.
  Exceptions { rule_id: Uuid },
  /// Remove a single occurrence.
  DeleteOccurrence {
    rule_id: Uuid,
    date:    DateTime<Utc>,
  },
  /// Replace a single occurrence with an edited standalone event.
  ModifyOccurrence {
    rule_id: Uuid,
    date:    DateTime<Utc>,
    /// Changes as JSON, e.g. `{"title":"Demo"}`.
    changes: String,
  },
  /// Edit this and all future occurrences: split the rule at `date`.
  Split {
    rule_id: Uuid,
    date:    DateTime<Utc>,
  },
  /// End a rule at `until` and delete later instances.
  Stop {
    rule_id: Uuid,
    until:   DateTime<Utc>,
  },
  /// Delete a rule; its base event survives as a standalone event.
  DeleteRule { rule_id: Uuid },
  /// List events starting in a time range.
  Events {
    from: DateTime<Utc>,
    to:   DateTime<Utc>,
    /// Include hidden events.
    #[arg(long)]
    all:  bool,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let mut cfg = CliConfig::load(&cli.config)?;
  if let Some(store) = cli.store {
    cfg.store_path = store;
  }

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  let engine = Engine::new(store, cfg.engine);

  run(&engine, cli.command).await
}

async fn run(engine: &Engine<SqliteStore>, command: Command) -> anyhow::Result<()> {
  match command {
    Command::CreateEvent {
      title,
      start,
      stop,
      timezone,
      location,
      description,
    } => {
      anyhow::ensure!(stop >= start, "stop must not be before start");
      let mut input = NewEvent::new(title, start, stop);
      input.timezone = timezone;
      input.location = location;
      input.description = description;
      print_json(&engine.store().insert_event(input).await?)
    }
    Command::MakeRecurring { event_id, params } => {
      let params: RuleParams =
        serde_json::from_str(&params).context("invalid rule parameters")?;
      print_json(&engine.create_from_event(event_id, &params).await?)
    }
    Command::Describe { rule_id } => {
      println!("{}", engine.describe(rule_id).await?);
      Ok(())
    }
    Command::Preview {
      rule_id,
      from,
      to,
      limit,
    } => {
      let window = Window { start: from, end: to };
      print_json(&engine.preview(rule_id, window, limit).await?)
    }
    Command::Apply { rule_id, limit } => {
      print_json(&engine.apply_recurrence(rule_id, limit).await?)
    }
    Command::Exceptions { rule_id } => {
      print_json(&engine.exceptions(rule_id).await?)
    }
    Command::DeleteOccurrence { rule_id, date } => {
      print_json(&engine.delete_occurrence(rule_id, date).await?)
    }
    Command::ModifyOccurrence {
      rule_id,
      date,
      changes,
    } => {
      let changes: EventChanges =
        serde_json::from_str(&changes).context("invalid event changes")?;
      let (exception, replacement) =
        engine.modify_occurrence(rule_id, date, changes).await?;
      print_json(&serde_json::json!({
        "exception":   exception,
        "replacement": replacement,
      }))
    }
    Command::Split { rule_id, date } => {
      print_json(&engine.split_from(rule_id, date).await?)
    }
    Command::Stop { rule_id, until } => {
      let removed = engine.stop_at(rule_id, until).await?;
      print_json(&serde_json::json!({ "removed": removed }))
    }
    Command::DeleteRule { rule_id } => {
      let deleted = engine.delete_rule(rule_id).await?;
      print_json(&serde_json::json!({ "deleted": deleted }))
    }
    Command::Events { from, to, all } => {
      print_json(&engine.store().events_between(from, to, !all).await?)
    }
  }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
