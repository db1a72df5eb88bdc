//! Calendar events: standalone events, recurrence base events, and
//! materialised occurrences all share this one shape.
//!
//! A materialised occurrence is an ordinary [`Event`] row whose
//! `recurrence_id` points back at the rule that produced it. The rule never
//! owns its instances by containment; the back-reference exists for lookup.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

// ─── Attendance ──────────────────────────────────────────────────────────────

/// An attendee's response to an invitation.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AttendeeStatus {
  #[default]
  NeedsAction,
  Accepted,
  Declined,
  Tentative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
  pub email:  String,
  pub name:   Option<String>,
  #[serde(default)]
  pub status: AttendeeStatus,
}

/// A file or link attached to an event. No binary data lives in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
  pub name: String,
  pub url:  String,
}

// ─── Visibility ──────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Privacy {
  #[default]
  Public,
  Private,
  Confidential,
}

/// Whether the event blocks the owner's availability.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ShowAs {
  #[default]
  Busy,
  Free,
}

// ─── Event ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
  pub event_id:      Uuid,
  pub title:         String,
  pub description:   Option<String>,
  pub location:      Option<String>,
  pub start:         DateTime<Utc>,
  pub stop:          DateTime<Utc>,
  pub all_day:       bool,
  /// IANA timezone the event was authored in; `None` means UTC.
  pub timezone:      Option<String>,
  pub privacy:       Privacy,
  pub show_as:       ShowAs,
  pub attendees:     Vec<Attendee>,
  pub attachments:   Vec<Attachment>,
  /// Set on the base event of a recurring series.
  pub recurrency:    bool,
  /// Back-reference to the owning recurrence rule, if any.
  pub recurrence_id: Option<Uuid>,
  pub active:        bool,
  pub created_at:    DateTime<Utc>,
}

impl Event {
  pub fn duration(&self) -> TimeDelta { self.stop - self.start }

  /// Clone everything but identity and timing into a new event input that
  /// starts at `start` and keeps this event's duration.
  pub fn occurrence_at(&self, start: DateTime<Utc>) -> NewEvent {
    NewEvent {
      title:         self.title.clone(),
      description:   self.description.clone(),
      location:      self.location.clone(),
      start,
      stop:          start + self.duration(),
      all_day:       self.all_day,
      timezone:      self.timezone.clone(),
      privacy:       self.privacy,
      show_as:       self.show_as,
      attendees:     self.attendees.clone(),
      attachments:   self.attachments.clone(),
      recurrency:    false,
      recurrence_id: None,
      active:        true,
    }
  }
}

// ─── NewEvent ────────────────────────────────────────────────────────────────

/// Input to [`crate::store::CalendarStore::insert_event`] and
/// [`crate::store::CalendarStore::insert_instance`].
/// `event_id` and `created_at` are always set by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
  pub title:         String,
  #[serde(default)]
  pub description:   Option<String>,
  #[serde(default)]
  pub location:      Option<String>,
  pub start:         DateTime<Utc>,
  pub stop:          DateTime<Utc>,
  #[serde(default)]
  pub all_day:       bool,
  #[serde(default)]
  pub timezone:      Option<String>,
  #[serde(default)]
  pub privacy:       Privacy,
  #[serde(default)]
  pub show_as:       ShowAs,
  #[serde(default)]
  pub attendees:     Vec<Attendee>,
  #[serde(default)]
  pub attachments:   Vec<Attachment>,
  #[serde(default)]
  pub recurrency:    bool,
  #[serde(default)]
  pub recurrence_id: Option<Uuid>,
  #[serde(default = "default_active")]
  pub active:        bool,
}

fn default_active() -> bool { true }

impl NewEvent {
  /// Convenience constructor with all optional fields set to their defaults.
  pub fn new(
    title: impl Into<String>,
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
  ) -> Self {
    Self {
      title: title.into(),
      description: None,
      location: None,
      start,
      stop,
      all_day: false,
      timezone: None,
      privacy: Privacy::default(),
      show_as: ShowAs::default(),
      attendees: Vec::new(),
      attachments: Vec::new(),
      recurrency: false,
      recurrence_id: None,
      active: true,
    }
  }

  /// Attach this input to a recurrence rule as a materialised instance.
  pub fn for_rule(mut self, rule_id: Uuid) -> Self {
    self.recurrence_id = Some(rule_id);
    self
  }
}

// ─── EventChanges ────────────────────────────────────────────────────────────

/// A partial update used when a single occurrence is modified. Fields left as
/// `None` keep the value of the occurrence being replaced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventChanges {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub location:    Option<String>,
  pub start:       Option<DateTime<Utc>>,
  pub stop:        Option<DateTime<Utc>>,
  pub attendees:   Option<Vec<Attendee>>,
}

impl EventChanges {
  /// Apply the changes on top of `base`. When only `start` moves, the
  /// original duration is preserved.
  pub fn apply(self, mut base: NewEvent) -> NewEvent {
    let duration = base.stop - base.start;
    if let Some(title) = self.title {
      base.title = title;
    }
    if let Some(description) = self.description {
      base.description = Some(description);
    }
    if let Some(location) = self.location {
      base.location = Some(location);
    }
    if let Some(attendees) = self.attendees {
      base.attendees = attendees;
    }
    match (self.start, self.stop) {
      (Some(start), Some(stop)) => {
        base.start = start;
        base.stop = stop;
      }
      (Some(start), None) => {
        base.start = start;
        base.stop = start + duration;
      }
      (None, Some(stop)) => base.stop = stop,
      (None, None) => {}
    }
    base
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn at(h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, h, 0, 0).unwrap()
  }

  #[test]
  fn changes_keep_duration_when_only_start_moves() {
    let base = NewEvent::new("Standup", at(9), at(10));
    let changed = EventChanges {
      start: Some(at(14)),
      ..Default::default()
    }
    .apply(base);

    assert_eq!(changed.start, at(14));
    assert_eq!(changed.stop, at(15));
    assert_eq!(changed.title, "Standup");
  }

  #[test]
  fn changes_override_title_and_both_bounds() {
    let base = NewEvent::new("Standup", at(9), at(10));
    let changed = EventChanges {
      title: Some("Retro".into()),
      start: Some(at(11)),
      stop: Some(at(13)),
      ..Default::default()
    }
    .apply(base);

    assert_eq!(changed.title, "Retro");
    assert_eq!(changed.stop - changed.start, TimeDelta::hours(2));
  }
}
