//! [`SqliteStore`]: the SQLite implementation of [`CalendarStore`].

use std::path::Path;

use cadence_core::{
  event::{Event, NewEvent},
  exception::{NewException, RecurrenceException},
  recurrence::{EndCondition, NewRule, RecurrenceRule},
  store::CalendarStore,
};
use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    EVENT_COLUMNS, EXCEPTION_COLUMNS, RULE_COLUMNS, RawEvent, RawException,
    RawRule, encode_dt, encode_json, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Cadence calendar store backed by a single SQLite file.
///
/// Clones share one connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Column values of an event row, encoded and ready to bind.
struct EventRow {
  event_id:      String,
  title:         String,
  description:   Option<String>,
  location:      Option<String>,
  start_at:      String,
  stop_at:       String,
  all_day:       bool,
  timezone:      Option<String>,
  privacy:       String,
  show_as:       String,
  attendees:     String,
  attachments:   String,
  recurrency:    bool,
  recurrence_id: Option<String>,
  active:        bool,
  created_at:    String,
}

impl EventRow {
  fn encode(event: &Event) -> Result<Self> {
    Ok(Self {
      event_id:      encode_uuid(event.event_id),
      title:         event.title.clone(),
      description:   event.description.clone(),
      location:      event.location.clone(),
      start_at:      encode_dt(event.start),
      stop_at:       encode_dt(event.stop),
      all_day:       event.all_day,
      timezone:      event.timezone.clone(),
      privacy:       event.privacy.to_string(),
      show_as:       event.show_as.to_string(),
      attendees:     encode_json(&event.attendees)?,
      attachments:   encode_json(&event.attachments)?,
      recurrency:    event.recurrency,
      recurrence_id: event.recurrence_id.map(encode_uuid),
      active:        event.active,
      created_at:    encode_dt(event.created_at),
    })
  }

  /// Insert the row. With `skip_conflict`, a duplicate `(recurrence_id,
  /// start_at)` is ignored and `Ok(false)` is returned.
  fn insert(
    &self,
    conn: &rusqlite::Connection,
    skip_conflict: bool,
  ) -> rusqlite::Result<bool> {
    let on_conflict = if skip_conflict {
      "ON CONFLICT (recurrence_id, start_at) DO NOTHING"
    } else {
      ""
    };
    let changed = conn.execute(
      &format!(
        "INSERT INTO events ({EVENT_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
         {on_conflict}"
      ),
      rusqlite::params![
        self.event_id,
        self.title,
        self.description,
        self.location,
        self.start_at,
        self.stop_at,
        self.all_day,
        self.timezone,
        self.privacy,
        self.show_as,
        self.attendees,
        self.attachments,
        self.recurrency,
        self.recurrence_id,
        self.active,
        self.created_at,
      ],
    )?;
    Ok(changed > 0)
  }
}

/// Build the full [`Event`] a `NewEvent` becomes once stored. Timestamps are
/// truncated to the precision the table keeps.
fn build_event(input: NewEvent) -> Event {
  Event {
    event_id:      Uuid::new_v4(),
    title:         input.title,
    description:   input.description,
    location:      input.location,
    start:         input.start.trunc_subsecs(0),
    stop:          input.stop.trunc_subsecs(0),
    all_day:       input.all_day,
    timezone:      input.timezone,
    privacy:       input.privacy,
    show_as:       input.show_as,
    attendees:     input.attendees,
    attachments:   input.attachments,
    recurrency:    input.recurrency,
    recurrence_id: input.recurrence_id,
    active:        input.active,
    created_at:    Utc::now().trunc_subsecs(0),
  }
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a `SELECT` over `events` and decode every row.
  async fn query_events(
    &self,
    where_clause: &'static str,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<Event>> {
    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {EVENT_COLUMNS} FROM events {where_clause} ORDER BY start_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }
}

// ─── CalendarStore impl ──────────────────────────────────────────────────────

impl CalendarStore for SqliteStore {
  type Error = Error;

  // ── Events ────────────────────────────────────────────────────────────────

  async fn insert_event(&self, input: NewEvent) -> Result<Event> {
    let event = build_event(input);
    let row = EventRow::encode(&event)?;

    self
      .conn
      .call(move |conn| Ok(row.insert(conn, false)?))
      .await?;

    Ok(event)
  }

  async fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawEvent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ?1"),
              rusqlite::params![id_str],
              RawEvent::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEvent::into_event).transpose()
  }

  async fn set_event_recurrence(
    &self,
    id:            Uuid,
    recurrency:    bool,
    recurrence_id: Option<Uuid>,
  ) -> Result<()> {
    let id_str   = encode_uuid(id);
    let rule_str = recurrence_id.map(encode_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE events SET recurrency = ?2, recurrence_id = ?3 WHERE event_id = ?1",
          rusqlite::params![id_str, recurrency, rule_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn set_event_active(&self, id: Uuid, active: bool) -> Result<()> {
    let id_str = encode_uuid(id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE events SET active = ?2 WHERE event_id = ?1",
          rusqlite::params![id_str, active],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_event(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM events WHERE event_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }

  async fn events_between(
    &self,
    from:        DateTime<Utc>,
    to:          DateTime<Utc>,
    active_only: bool,
  ) -> Result<Vec<Event>> {
    self
      .query_events(
        "WHERE start_at >= ?1 AND start_at <= ?2 AND (?3 = 0 OR active = 1)",
        vec![
          encode_dt(from).into(),
          encode_dt(to).into(),
          i64::from(active_only).into(),
        ],
      )
      .await
  }

  // ── Materialised instances ────────────────────────────────────────────────

  async fn insert_instance(&self, input: NewEvent) -> Result<Option<Event>> {
    if input.recurrence_id.is_none() {
      return Err(Error::MissingRecurrence);
    }
    let event = build_event(input);
    let row = EventRow::encode(&event)?;

    let inserted = self
      .conn
      .call(move |conn| Ok(row.insert(conn, true)?))
      .await?;

    if !inserted {
      tracing::debug!(
        rule_id = ?event.recurrence_id,
        start = %event.start,
        "instance already exists"
      );
    }
    Ok(inserted.then_some(event))
  }

  async fn list_instances(&self, rule_id: Uuid) -> Result<Vec<Event>> {
    self
      .query_events("WHERE recurrence_id = ?1", vec![encode_uuid(rule_id).into()])
      .await
  }

  async fn instance_at(
    &self,
    rule_id: Uuid,
    start:   DateTime<Utc>,
  ) -> Result<Option<Event>> {
    let mut found = self
      .query_events(
        "WHERE recurrence_id = ?1 AND start_at = ?2",
        vec![encode_uuid(rule_id).into(), encode_dt(start).into()],
      )
      .await?;
    Ok(found.pop())
  }

  async fn delete_instances_after(
    &self,
    rule_id: Uuid,
    after:   DateTime<Utc>,
    keep:    Option<Uuid>,
  ) -> Result<u64> {
    let rule_str  = encode_uuid(rule_id);
    let after_str = encode_dt(after);
    let keep_str  = keep.map(encode_uuid);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM events
           WHERE recurrence_id = ?1 AND start_at > ?2
             AND (?3 IS NULL OR event_id <> ?3)",
          rusqlite::params![rule_str, after_str, keep_str],
        )?)
      })
      .await?;
    Ok(removed as u64)
  }

  // ── Rules ─────────────────────────────────────────────────────────────────

  async fn insert_rule(&self, input: NewRule) -> Result<RecurrenceRule> {
    let rule = RecurrenceRule {
      rule_id:       Uuid::new_v4(),
      base_event_id: input.base_event_id,
      interval:      input.definition.interval,
      pattern:       input.definition.pattern,
      end:           input.definition.end,
      start_anchor:  input.start_anchor.trunc_subsecs(0),
      timezone:      input.timezone,
      created_at:    Utc::now().trunc_subsecs(0),
    };

    let rule_id_str   = encode_uuid(rule.rule_id);
    let base_str      = rule.base_event_id.map(encode_uuid);
    let interval      = rule.interval;
    let pattern_str   = encode_json(&rule.pattern)?;
    let end_str       = encode_json(&rule.end)?;
    let anchor_str    = encode_dt(rule.start_anchor);
    let timezone_str  = rule.timezone.name().to_owned();
    let created_str   = encode_dt(rule.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO recurrence_rules ({RULE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
          ),
          rusqlite::params![
            rule_id_str,
            base_str,
            interval,
            pattern_str,
            end_str,
            anchor_str,
            timezone_str,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(rule)
  }

  async fn get_rule(&self, id: Uuid) -> Result<Option<RecurrenceRule>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRule> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {RULE_COLUMNS} FROM recurrence_rules WHERE rule_id = ?1"
              ),
              rusqlite::params![id_str],
              RawRule::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRule::into_rule).transpose()
  }

  async fn set_rule_end(&self, id: Uuid, end: EndCondition) -> Result<()> {
    let id_str  = encode_uuid(id);
    let end_str = encode_json(&end)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE recurrence_rules SET end_condition = ?2 WHERE rule_id = ?1",
          rusqlite::params![id_str, end_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_rule(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM recurrence_rules WHERE rule_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }

  // ── Exceptions ────────────────────────────────────────────────────────────

  async fn upsert_exception(
    &self,
    input: NewException,
  ) -> Result<RecurrenceException> {
    let exception_date = input.exception_date.trunc_subsecs(0);

    let new_id_str      = encode_uuid(Uuid::new_v4());
    let rule_id_str     = encode_uuid(input.rule_id);
    let date_str        = encode_dt(exception_date);
    let replacement_str = input.replacement_event_id.map(encode_uuid);
    let created_str     = encode_dt(Utc::now().trunc_subsecs(0));
    let is_deleted      = input.is_deleted;

    // On conflict the original id and creation time are kept.
    let raw: RawException = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!(
            "INSERT INTO recurrence_exceptions ({EXCEPTION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (rule_id, exception_date) DO UPDATE SET
               is_deleted           = excluded.is_deleted,
               replacement_event_id = excluded.replacement_event_id
             RETURNING {EXCEPTION_COLUMNS}"
          ),
          rusqlite::params![
            new_id_str,
            rule_id_str,
            date_str,
            is_deleted,
            replacement_str,
            created_str,
          ],
          RawException::from_row,
        )?)
      })
      .await?;

    raw.into_exception()
  }

  async fn list_exceptions(&self, rule_id: Uuid) -> Result<Vec<RecurrenceException>> {
    let rule_id_str = encode_uuid(rule_id);

    let raws: Vec<RawException> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {EXCEPTION_COLUMNS} FROM recurrence_exceptions
           WHERE rule_id = ?1
           ORDER BY exception_date"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![rule_id_str], RawException::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawException::into_exception).collect()
  }
}
