//! The recurrence engine: materialises rules into event instances and keeps
//! them consistent with exceptions, splits, and stops.
//!
//! Every operation re-reads the state it depends on from the store before
//! deciding what to write. The engine holds no locks; duplicate
//! materialisation under concurrent calls is prevented by the store's
//! `(rule, start)` uniqueness constraint, which surfaces here as
//! [`CalendarStore::insert_instance`] returning `None`.

use std::collections::HashSet;

use chrono::{DateTime, SubsecRound, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error,
  config::{EngineConfig, MissingBaseEvent},
  event::{Event, EventChanges},
  exception::{ExceptionDates, NewException, RecurrenceException},
  expand::{Window, occurrences},
  recurrence::{
    EndCondition, NewRule, RecurrenceRule, RuleParams, resolve_timezone,
  },
  store::CalendarStore,
};

/// Result of [`Engine::split_from`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SplitOutcome {
  /// `date_from` was not after the anchor; the rule is returned as stored.
  Unchanged(RecurrenceRule),
  Split {
    /// The original rule with its truncated end condition.
    original:  RecurrenceRule,
    /// The new rule anchored at `date_from`.
    successor: RecurrenceRule,
  },
}

impl SplitOutcome {
  /// The rule that owns occurrences from `date_from` onwards.
  pub fn current(&self) -> &RecurrenceRule {
    match self {
      Self::Unchanged(rule) => rule,
      Self::Split { successor, .. } => successor,
    }
  }
}

pub struct Engine<S> {
  store:  S,
  config: EngineConfig,
}

impl<S: CalendarStore> Engine<S> {
  pub fn new(store: S, config: EngineConfig) -> Self { Self { store, config } }

  pub fn store(&self) -> &S { &self.store }

  pub fn config(&self) -> &EngineConfig { &self.config }

  async fn load_rule(&self, rule_id: Uuid) -> Result<RecurrenceRule, S::Error> {
    Ok(
      self
        .store
        .get_rule(rule_id)
        .await?
        .ok_or(Error::RuleNotFound(rule_id))?,
    )
  }

  /// The rule's template event, or `None` under the permissive policy.
  async fn base_event(
    &self,
    rule: &RecurrenceRule,
  ) -> Result<Option<Event>, S::Error> {
    let event = match rule.base_event_id {
      Some(id) => self.store.get_event(id).await?,
      None => None,
    };
    if event.is_none() {
      match self.config.missing_base_event {
        MissingBaseEvent::Skip => {
          tracing::debug!(rule_id = %rule.rule_id, "base event missing; nothing to materialise");
        }
        MissingBaseEvent::Error => {
          return Err(Error::BaseEventNotFound(rule.rule_id).into());
        }
      }
    }
    Ok(event)
  }

  /// Remove the materialised occurrence at `date`. The base event doubles as
  /// the first occurrence and is the template for all others, so it is
  /// hidden rather than deleted.
  async fn remove_instance(
    &self,
    rule: &RecurrenceRule,
    date: DateTime<Utc>,
  ) -> Result<(), S::Error> {
    let Some(instance) = self.store.instance_at(rule.rule_id, date).await?
    else {
      return Ok(());
    };
    if Some(instance.event_id) == rule.base_event_id {
      self.store.set_event_active(instance.event_id, false).await?;
    } else {
      self.store.delete_event(instance.event_id).await?;
    }
    Ok(())
  }

  /// The base event, if it exists and is the rule's own anchor instance.
  async fn owned_base_event(
    &self,
    rule: &RecurrenceRule,
  ) -> Result<Option<Event>, S::Error> {
    let Some(base_id) = rule.base_event_id else {
      return Ok(None);
    };
    Ok(
      self
        .store
        .get_event(base_id)
        .await?
        .filter(|event| event.recurrence_id == Some(rule.rule_id)),
    )
  }

  async fn existing_exception(
    &self,
    rule_id: Uuid,
    date: DateTime<Utc>,
  ) -> Result<Option<RecurrenceException>, S::Error> {
    Ok(
      self
        .store
        .list_exceptions(rule_id)
        .await?
        .into_iter()
        .find(|exc| exc.exception_date == date),
    )
  }

  // ── Creation ──────────────────────────────────────────────────────────

  /// Make `event_id` the base event of a new recurrence rule.
  ///
  /// The rule is anchored at the event's start, in the event's timezone (UTC
  /// when it has none). The event is flagged recurring and tagged with the
  /// new rule.
  pub async fn create_from_event(
    &self,
    event_id: Uuid,
    params: &RuleParams,
  ) -> Result<RecurrenceRule, S::Error> {
    let event = self
      .store
      .get_event(event_id)
      .await?
      .ok_or(Error::EventNotFound(event_id))?;
    if event.recurrence_id.is_some() {
      return Err(Error::AlreadyRecurring(event_id).into());
    }

    let timezone = resolve_timezone(event.timezone.as_deref())?;
    let start_anchor = event.start.trunc_subsecs(0);
    let definition = params.validate(start_anchor, timezone)?;

    let rule = self
      .store
      .insert_rule(NewRule {
        base_event_id: Some(event_id),
        definition,
        start_anchor,
        timezone,
      })
      .await?;
    self
      .store
      .set_event_recurrence(event_id, true, Some(rule.rule_id))
      .await?;

    tracing::info!(rule_id = %rule.rule_id, %event_id, "created recurrence rule");
    Ok(rule)
  }

  // ── Expansion ─────────────────────────────────────────────────────────

  /// Occurrences of a stored rule within `window`; `None` limits to the
  /// configured display horizon.
  pub async fn preview(
    &self,
    rule_id: Uuid,
    window: Window,
    limit: Option<usize>,
  ) -> Result<Vec<DateTime<Tz>>, S::Error> {
    let rule = self.load_rule(rule_id).await?;
    let limit = limit.unwrap_or(self.config.display_limit);
    Ok(occurrences(&rule, window, Some(limit))?)
  }

  /// A localised summary of a stored rule, in the configured locale.
  pub async fn describe(&self, rule_id: Uuid) -> Result<String, S::Error> {
    let rule = self.load_rule(rule_id).await?;
    Ok(rule.describe(self.config.locale))
  }

  // ── Reconciliation ────────────────────────────────────────────────────

  /// Ensure one instance exists for every non-excepted occurrence within the
  /// first `limit` occurrences (default: the configured reconcile horizon).
  ///
  /// Only ever adds rows. Returns the instances created by this call.
  pub async fn apply_recurrence(
    &self,
    rule_id: Uuid,
    limit: Option<usize>,
  ) -> Result<Vec<Event>, S::Error> {
    let rule = self.load_rule(rule_id).await?;
    let Some(base) = self.base_event(&rule).await? else {
      return Ok(Vec::new());
    };

    let existing: HashSet<DateTime<Utc>> = self
      .store
      .list_instances(rule_id)
      .await?
      .into_iter()
      .map(|event| event.start)
      .collect();
    let exceptions: ExceptionDates =
      self.store.list_exceptions(rule_id).await?.into_iter().collect();

    let limit = limit.unwrap_or(self.config.reconcile_limit);
    let candidates = occurrences(&rule, Window::unbounded(), Some(limit))?;

    let mut created = Vec::new();
    for candidate in candidates {
      let start = candidate.with_timezone(&Utc);
      if existing.contains(&start) || exceptions.is_excepted(&start) {
        continue;
      }
      let input = base.occurrence_at(start).for_rule(rule_id);
      match self.store.insert_instance(input).await? {
        Some(event) => created.push(event),
        None => {
          tracing::warn!(%rule_id, %start, "instance materialised concurrently; skipping");
        }
      }
    }

    tracing::info!(%rule_id, created = created.len(), "applied recurrence");
    Ok(created)
  }

  // ── Exceptions ────────────────────────────────────────────────────────

  pub async fn exceptions(
    &self,
    rule_id: Uuid,
  ) -> Result<Vec<RecurrenceException>, S::Error> {
    self.load_rule(rule_id).await?;
    self.store.list_exceptions(rule_id).await
  }

  /// Suppress the occurrence starting at `date` and remove its instance.
  pub async fn delete_occurrence(
    &self,
    rule_id: Uuid,
    date: DateTime<Utc>,
  ) -> Result<RecurrenceException, S::Error> {
    let rule = self.load_rule(rule_id).await?;
    let date = date.trunc_subsecs(0);
    let previous = self.existing_exception(rule_id, date).await?;

    let exception = self
      .store
      .upsert_exception(NewException {
        rule_id,
        exception_date: date,
        is_deleted: true,
        replacement_event_id: None,
      })
      .await?;
    self.remove_instance(&rule, date).await?;

    if let Some(old) = previous.and_then(|exc| exc.replacement_event_id) {
      self.store.delete_event(old).await?;
    }

    tracing::info!(%rule_id, %date, "deleted occurrence");
    Ok(exception)
  }

  /// Replace the occurrence starting at `date` with a standalone event built
  /// from that occurrence plus `changes`.
  ///
  /// Returns the exception and the replacement event. The replacement is
  /// detached from the rule; later edits to the base event do not reach it.
  pub async fn modify_occurrence(
    &self,
    rule_id: Uuid,
    date: DateTime<Utc>,
    changes: EventChanges,
  ) -> Result<(RecurrenceException, Event), S::Error> {
    let rule = self.load_rule(rule_id).await?;
    let date = date.trunc_subsecs(0);
    let previous = self.existing_exception(rule_id, date).await?;

    let template = match self.store.instance_at(rule_id, date).await? {
      Some(instance) => instance.occurrence_at(instance.start),
      None => self
        .base_event(&rule)
        .await?
        .ok_or(Error::BaseEventNotFound(rule_id))?
        .occurrence_at(date),
    };
    let replacement = self.store.insert_event(changes.apply(template)).await?;

    let exception = self
      .store
      .upsert_exception(NewException {
        rule_id,
        exception_date: date,
        is_deleted: false,
        replacement_event_id: Some(replacement.event_id),
      })
      .await?;
    self.remove_instance(&rule, date).await?;

    if let Some(old) = previous.and_then(|exc| exc.replacement_event_id) {
      self.store.delete_event(old).await?;
    }

    tracing::info!(%rule_id, %date, replacement = %replacement.event_id, "modified occurrence");
    Ok((exception, replacement))
  }

  // ── Split & stop ──────────────────────────────────────────────────────

  /// "Edit this and all future events": end the rule before `date_from` and
  /// start a new rule with the same pattern at `date_from`.
  ///
  /// A no-op when `date_from` is not after the anchor. Count-based end
  /// conditions are left as they are on both rules. Neither materialises
  /// nor deletes instances; call [`Self::apply_recurrence`] on both rules
  /// afterwards, and [`Self::stop_at`] first if the original's already
  /// materialised future instances should go.
  pub async fn split_from(
    &self,
    rule_id: Uuid,
    date_from: DateTime<Utc>,
  ) -> Result<SplitOutcome, S::Error> {
    let rule = self.load_rule(rule_id).await?;
    let date_from = date_from.trunc_subsecs(0);
    if date_from <= rule.start_anchor {
      tracing::debug!(%rule_id, %date_from, "split date not after anchor; unchanged");
      return Ok(SplitOutcome::Unchanged(rule));
    }

    let truncated = rule.truncated_end(date_from);
    self.store.set_rule_end(rule_id, truncated).await?;
    let successor = self
      .store
      .insert_rule(NewRule::successor_of(&rule, date_from))
      .await?;

    tracing::info!(%rule_id, successor = %successor.rule_id, %date_from, "split recurrence rule");
    Ok(SplitOutcome::Split {
      original: RecurrenceRule {
        end: truncated,
        ..rule
      },
      successor,
    })
  }

  /// End the rule at `until` (inclusive) and delete every instance starting
  /// after it. Irreversible: deleted instances are not kept anywhere. A base
  /// event past `until` is hidden instead, like any removed anchor
  /// occurrence.
  ///
  /// Returns the number of instances deleted or hidden.
  pub async fn stop_at(
    &self,
    rule_id: Uuid,
    until: DateTime<Utc>,
  ) -> Result<u64, S::Error> {
    let rule = self.load_rule(rule_id).await?;
    let until = until.trunc_subsecs(0);

    self
      .store
      .set_rule_end(rule_id, EndCondition::Until(until))
      .await?;

    let mut removed = 0;
    if let Some(base) = self.owned_base_event(&rule).await?
      && base.start > until
      && base.active
    {
      self.store.set_event_active(base.event_id, false).await?;
      removed += 1;
    }
    removed += self
      .store
      .delete_instances_after(rule_id, until, rule.base_event_id)
      .await?;

    tracing::info!(%rule_id, %until, removed, "stopped recurrence rule");
    Ok(removed)
  }

  /// Delete a rule with its instances and exceptions. The base event
  /// survives as a standalone event.
  pub async fn delete_rule(&self, rule_id: Uuid) -> Result<bool, S::Error> {
    let Some(rule) = self.store.get_rule(rule_id).await? else {
      return Ok(false);
    };
    // After a split the successor shares the base event, which stays
    // tagged with the original rule.
    if let Some(base) = self.owned_base_event(&rule).await? {
      self
        .store
        .set_event_recurrence(base.event_id, false, None)
        .await?;
    }
    self.store.delete_rule(rule_id).await
  }
}
