//! The `CalendarStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `cadence-store-sqlite`).
//! The [`crate::engine::Engine`] depends on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  event::{Event, NewEvent},
  exception::{NewException, RecurrenceException},
  recurrence::{EndCondition, NewRule, RecurrenceRule},
};

/// Abstraction over a calendar store backend.
///
/// Backends must enforce at most one event per `(recurrence_id, start)` when
/// `recurrence_id` is set, and at most one exception per
/// `(rule_id, exception_date)`. The engine performs no locking of its own;
/// those constraints are what keep concurrent reconciliation idempotent.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait CalendarStore: Send + Sync {
  type Error: std::error::Error + From<crate::Error> + Send + Sync + 'static;

  // ── Events ────────────────────────────────────────────────────────────

  /// Persist a new event and return it with its assigned id.
  fn insert_event(
    &self,
    input: NewEvent,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  /// Retrieve an event by UUID. Returns `None` if not found.
  fn get_event(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  /// Set the recurrence flag and back-reference of an existing event.
  fn set_event_recurrence(
    &self,
    id: Uuid,
    recurrency: bool,
    recurrence_id: Option<Uuid>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Show or hide an event without deleting it.
  fn set_event_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete an event. Returns `false` if it did not exist.
  fn delete_event(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Events starting within `[from, to]`, ordered by start.
  fn events_between(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  // ── Materialised instances ────────────────────────────────────────────

  /// Insert a materialised occurrence. `input.recurrence_id` must be set.
  ///
  /// Returns `None` when an instance for the same rule and start already
  /// exists; a uniqueness conflict is not an error.
  fn insert_instance(
    &self,
    input: NewEvent,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  /// All instances tagged with `rule_id`, ordered by start.
  fn list_instances(
    &self,
    rule_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  /// The instance of `rule_id` starting exactly at `start`, if any.
  fn instance_at(
    &self,
    rule_id: Uuid,
    start: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  /// Delete every instance of `rule_id` starting strictly after `after`,
  /// except the event `keep`. Returns the number of rows removed.
  fn delete_instances_after(
    &self,
    rule_id: Uuid,
    after: DateTime<Utc>,
    keep: Option<Uuid>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Rules ─────────────────────────────────────────────────────────────

  fn insert_rule(
    &self,
    input: NewRule,
  ) -> impl Future<Output = Result<RecurrenceRule, Self::Error>> + Send + '_;

  fn get_rule(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<RecurrenceRule>, Self::Error>> + Send + '_;

  /// Replace the end condition of a rule. Nothing else about a rule is ever
  /// mutated.
  fn set_rule_end(
    &self,
    id: Uuid,
    end: EndCondition,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete a rule together with its instances and exceptions. Returns
  /// `false` if it did not exist.
  fn delete_rule(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Exceptions ────────────────────────────────────────────────────────

  /// Insert or overwrite the exception for `(rule_id, exception_date)`.
  fn upsert_exception(
    &self,
    input: NewException,
  ) -> impl Future<Output = Result<RecurrenceException, Self::Error>> + Send + '_;

  /// All exceptions of `rule_id`, ordered by date.
  fn list_exceptions(
    &self,
    rule_id: Uuid,
  ) -> impl Future<Output = Result<Vec<RecurrenceException>, Self::Error>> + Send + '_;
}
