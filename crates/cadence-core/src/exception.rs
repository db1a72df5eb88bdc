//! Per-occurrence overrides of a recurrence rule.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Suppresses or replaces one occurrence without altering the rule.
/// Unique per `(rule_id, exception_date)`; never deleted automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceException {
  pub exception_id:         Uuid,
  pub rule_id:              Uuid,
  /// Start of the original occurrence being overridden.
  pub exception_date:       DateTime<Utc>,
  pub is_deleted:           bool,
  /// Standalone event shown in place of the occurrence.
  pub replacement_event_id: Option<Uuid>,
  pub created_at:           DateTime<Utc>,
}

/// Input to [`crate::store::CalendarStore::upsert_exception`].
#[derive(Debug, Clone)]
pub struct NewException {
  pub rule_id:              Uuid,
  pub exception_date:       DateTime<Utc>,
  pub is_deleted:           bool,
  pub replacement_event_id: Option<Uuid>,
}

/// Exception dates of one rule, split by kind.
#[derive(Debug, Clone, Default)]
pub struct ExceptionDates {
  pub deleted:  HashSet<DateTime<Utc>>,
  pub replaced: HashSet<DateTime<Utc>>,
}

impl ExceptionDates {
  pub fn is_excepted(&self, date: &DateTime<Utc>) -> bool {
    self.deleted.contains(date) || self.replaced.contains(date)
  }
}

impl FromIterator<RecurrenceException> for ExceptionDates {
  fn from_iter<I: IntoIterator<Item = RecurrenceException>>(iter: I) -> Self {
    let mut dates = Self::default();
    for exc in iter {
      if exc.is_deleted {
        dates.deleted.insert(exc.exception_date);
      } else if exc.replacement_event_id.is_some() {
        dates.replaced.insert(exc.exception_date);
      }
    }
    dates
  }
}
