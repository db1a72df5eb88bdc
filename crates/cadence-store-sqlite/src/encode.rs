//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with whole seconds and a `Z`
//! suffix, so they are fixed-width and compare correctly as text. Structured
//! fields (patterns, end conditions, attendees, attachments) are stored as
//! compact JSON. UUIDs are stored as hyphenated lowercase strings.

use cadence_core::{
  event::{Event, Privacy, ShowAs},
  exception::RecurrenceException,
  recurrence::{RecurrenceRule, resolve_timezone},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_json<T: Serialize>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

pub fn decode_json<T: DeserializeOwned>(s: &str) -> Result<T> {
  Ok(serde_json::from_str(s)?)
}

// ─── Enums ───────────────────────────────────────────────────────────────────

fn decode_privacy(s: &str) -> Result<Privacy> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown privacy: {s:?}")))
}

fn decode_show_as(s: &str) -> Result<ShowAs> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown show_as: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawEvent::from_row`].
pub const EVENT_COLUMNS: &str = "event_id, title, description, location, \
                                 start_at, stop_at, all_day, timezone, \
                                 privacy, show_as, attendees, attachments, \
                                 recurrency, recurrence_id, active, created_at";

/// Raw values read directly from an `events` row.
pub struct RawEvent {
  pub event_id:      String,
  pub title:         String,
  pub description:   Option<String>,
  pub location:      Option<String>,
  pub start_at:      String,
  pub stop_at:       String,
  pub all_day:       bool,
  pub timezone:      Option<String>,
  pub privacy:       String,
  pub show_as:       String,
  pub attendees:     String,
  pub attachments:   String,
  pub recurrency:    bool,
  pub recurrence_id: Option<String>,
  pub active:        bool,
  pub created_at:    String,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:      row.get(0)?,
      title:         row.get(1)?,
      description:   row.get(2)?,
      location:      row.get(3)?,
      start_at:      row.get(4)?,
      stop_at:       row.get(5)?,
      all_day:       row.get(6)?,
      timezone:      row.get(7)?,
      privacy:       row.get(8)?,
      show_as:       row.get(9)?,
      attendees:     row.get(10)?,
      attachments:   row.get(11)?,
      recurrency:    row.get(12)?,
      recurrence_id: row.get(13)?,
      active:        row.get(14)?,
      created_at:    row.get(15)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    Ok(Event {
      event_id:      decode_uuid(&self.event_id)?,
      title:         self.title,
      description:   self.description,
      location:      self.location,
      start:         decode_dt(&self.start_at)?,
      stop:          decode_dt(&self.stop_at)?,
      all_day:       self.all_day,
      timezone:      self.timezone,
      privacy:       decode_privacy(&self.privacy)?,
      show_as:       decode_show_as(&self.show_as)?,
      attendees:     decode_json(&self.attendees)?,
      attachments:   decode_json(&self.attachments)?,
      recurrency:    self.recurrency,
      recurrence_id: self.recurrence_id.as_deref().map(decode_uuid).transpose()?,
      active:        self.active,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Column list matching [`RawRule::from_row`].
pub const RULE_COLUMNS: &str = "rule_id, base_event_id, repeat_interval, \
                                pattern, end_condition, start_anchor, \
                                timezone, created_at";

/// Raw values read directly from a `recurrence_rules` row.
pub struct RawRule {
  pub rule_id:       String,
  pub base_event_id: Option<String>,
  pub interval:      u16,
  pub pattern:       String,
  pub end_condition: String,
  pub start_anchor:  String,
  pub timezone:      String,
  pub created_at:    String,
}

impl RawRule {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      rule_id:       row.get(0)?,
      base_event_id: row.get(1)?,
      interval:      row.get(2)?,
      pattern:       row.get(3)?,
      end_condition: row.get(4)?,
      start_anchor:  row.get(5)?,
      timezone:      row.get(6)?,
      created_at:    row.get(7)?,
    })
  }

  pub fn into_rule(self) -> Result<RecurrenceRule> {
    Ok(RecurrenceRule {
      rule_id:       decode_uuid(&self.rule_id)?,
      base_event_id: self.base_event_id.as_deref().map(decode_uuid).transpose()?,
      interval:      self.interval,
      pattern:       decode_json(&self.pattern)?,
      end:           decode_json(&self.end_condition)?,
      start_anchor:  decode_dt(&self.start_anchor)?,
      timezone:      resolve_timezone(Some(&self.timezone))?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Column list matching [`RawException::from_row`].
pub const EXCEPTION_COLUMNS: &str = "exception_id, rule_id, exception_date, \
                                     is_deleted, replacement_event_id, \
                                     created_at";

/// Raw values read directly from a `recurrence_exceptions` row.
pub struct RawException {
  pub exception_id:         String,
  pub rule_id:              String,
  pub exception_date:       String,
  pub is_deleted:           bool,
  pub replacement_event_id: Option<String>,
  pub created_at:           String,
}

impl RawException {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      exception_id:         row.get(0)?,
      rule_id:              row.get(1)?,
      exception_date:       row.get(2)?,
      is_deleted:           row.get(3)?,
      replacement_event_id: row.get(4)?,
      created_at:           row.get(5)?,
    })
  }

  pub fn into_exception(self) -> Result<RecurrenceException> {
    Ok(RecurrenceException {
      exception_id:         decode_uuid(&self.exception_id)?,
      rule_id:              decode_uuid(&self.rule_id)?,
      exception_date:       decode_dt(&self.exception_date)?,
      is_deleted:           self.is_deleted,
      replacement_event_id: self
        .replacement_event_id
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      created_at:           decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_are_fixed_width_and_sortable() {
    let a = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
    let b = Utc.with_ymd_and_hms(2025, 11, 6, 9, 0, 0).unwrap();

    assert_eq!(encode_dt(a), "2025-01-06T09:00:00Z");
    assert!(encode_dt(a) < encode_dt(b));
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }

  #[test]
  fn unknown_enum_values_are_decode_errors() {
    assert!(matches!(decode_privacy("secret"), Err(Error::Decode(_))));
    assert_eq!(decode_show_as("free").unwrap(), ShowAs::Free);
  }
}
