//! Occurrence expansion: turn a [`RecurrenceRule`] into concrete start times.
//!
//! Iteration itself is delegated to the `rrule` crate, run in the rule's own
//! timezone so that a 09:00 meeting stays at 09:00 across DST changes. This
//! module owns the policies layered on top: the window, the horizon cap, and
//! how each [`Pattern`] maps onto RFC 5545 parts.
//!
//! Expansion is stateless. To resume, call again with a later
//! [`Window::start`].

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use rrule::{NWeekday, RRule};

use crate::{
  Error, Result,
  recurrence::{EndCondition, MonthlyPattern, Pattern, RecurrenceRule},
};

/// Horizon used when a caller asks for no limit, e.g. when listing a
/// `Forever` rule for display.
pub const DISPLAY_LIMIT: usize = 720;

/// Horizon used by reconciliation.
pub const RECONCILE_LIMIT: usize = 100;

/// Optional inclusive bounds on the occurrences returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
  pub start: Option<DateTime<Utc>>,
  pub end:   Option<DateTime<Utc>>,
}

impl Window {
  pub fn unbounded() -> Self { Self::default() }

  pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
    Self {
      start: Some(start),
      end:   Some(end),
    }
  }

  pub fn from(start: DateTime<Utc>) -> Self {
    Self {
      start: Some(start),
      end:   None,
    }
  }
}

/// Expand `rule` into ascending occurrence start times within `window`.
///
/// At most `limit` occurrences are returned; `None` means
/// [`DISPLAY_LIMIT`]. A `Count` end condition counts from the anchor, so a
/// later window start never yields more than the rule allows in total.
pub fn occurrences(
  rule: &RecurrenceRule,
  window: Window,
  limit: Option<usize>,
) -> Result<Vec<DateTime<Tz>>> {
  let limit = limit.unwrap_or(DISPLAY_LIMIT).min(usize::from(u16::MAX));
  if limit == 0 {
    return Ok(Vec::new());
  }

  let anchor = rule.anchor_local();

  // The upper bound is the tighter of the window end and an `Until` end.
  let until = match rule.end {
    EndCondition::Until(until) => Some(until),
    _ => None,
  };
  let upper = match (until, window.end) {
    (Some(a), Some(b)) => Some(a.min(b)),
    (a, b) => a.or(b),
  };
  if upper.is_some_and(|upper| upper < rule.start_anchor) {
    return Ok(Vec::new());
  }
  if let (Some(start), Some(end)) = (window.start, window.end)
    && start > end
  {
    return Ok(Vec::new());
  }

  let rrule_tz = rrule::Tz::Tz(rule.timezone);
  let mut set = to_rrule(rule)
    .build(anchor.with_timezone(&rrule_tz))
    .map_err(|e| Error::Expansion(e.to_string()))?;

  // Bounds are widened by a second and re-applied below so the result is
  // inclusive whatever the library's own boundary semantics.
  if let Some(start) = window.start {
    set = set.after((start - TimeDelta::seconds(1)).with_timezone(&rrule_tz));
  }
  if let Some(upper) = upper {
    set = set.before((upper + TimeDelta::seconds(1)).with_timezone(&rrule_tz));
  }

  // Lossless: `limit` was clamped to `u16::MAX` above.
  let result = set.all(limit as u16);
  if result.limited {
    tracing::trace!(rule_id = %rule.rule_id, limit, "expansion hit the horizon");
  }

  Ok(
    result
      .dates
      .into_iter()
      .map(|dt| dt.with_timezone(&rule.timezone))
      .filter(|dt| window.start.is_none_or(|start| *dt >= start))
      .filter(|dt| upper.is_none_or(|upper| *dt <= upper))
      .take(limit)
      .collect(),
  )
}

/// Map a rule onto an unvalidated RFC 5545 rule.
fn to_rrule(rule: &RecurrenceRule) -> RRule<rrule::Unvalidated> {
  let mut rrule = match &rule.pattern {
    Pattern::Daily => RRule::new(rrule::Frequency::Daily),
    Pattern::Weekly { weekdays } => {
      let rrule = RRule::new(rrule::Frequency::Weekly);
      // An empty set falls back to the anchor's weekday.
      if weekdays.is_empty() {
        rrule
      } else {
        rrule.by_weekday(weekdays.iter().copied().map(NWeekday::Every).collect())
      }
    }
    // A fixed day that a month lacks (the 31st in April) produces no
    // occurrence for that month rather than rolling over into the next.
    Pattern::Monthly(MonthlyPattern::ByDate { day }) => {
      RRule::new(rrule::Frequency::Monthly).by_month_day(vec![*day as i8])
    }
    Pattern::Monthly(MonthlyPattern::ByWeekday { weekday, ordinal }) => {
      RRule::new(rrule::Frequency::Monthly)
        .by_weekday(vec![NWeekday::Nth(i16::from(*ordinal), *weekday)])
    }
    Pattern::Yearly => RRule::new(rrule::Frequency::Yearly),
  };

  // Weeks start on Monday, the library default.
  rrule = rrule.interval(rule.interval);
  if let EndCondition::Count(n) = rule.end {
    rrule = rrule.count(n);
  }
  rrule
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, TimeZone, Weekday};
  use uuid::Uuid;

  use super::*;

  fn rule(pattern: Pattern, anchor: DateTime<Utc>) -> RecurrenceRule {
    RecurrenceRule {
      rule_id: Uuid::new_v4(),
      base_event_id: None,
      interval: 1,
      pattern,
      end: EndCondition::Forever,
      start_anchor: anchor,
      timezone: Tz::UTC,
      created_at: anchor,
    }
  }

  fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
  }

  fn dates(occurrences: &[DateTime<Tz>]) -> Vec<NaiveDate> {
    occurrences.iter().map(DateTime::date_naive).collect()
  }

  fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn weekly_on_selected_weekdays() {
    let r = rule(
      Pattern::Weekly {
        weekdays: vec![Weekday::Mon, Weekday::Wed, Weekday::Fri],
      },
      utc(2025, 1, 6),
    );

    let occ = occurrences(&r, Window::unbounded(), Some(6)).unwrap();
    assert_eq!(dates(&occ), vec![
      ymd(2025, 1, 6),
      ymd(2025, 1, 8),
      ymd(2025, 1, 10),
      ymd(2025, 1, 13),
      ymd(2025, 1, 15),
      ymd(2025, 1, 17),
    ]);
  }

  #[test]
  fn biweekly_skips_alternate_weeks() {
    let mut r = rule(
      Pattern::Weekly {
        weekdays: vec![Weekday::Mon, Weekday::Wed],
      },
      utc(2025, 1, 6),
    );
    r.interval = 2;

    let occ = occurrences(&r, Window::unbounded(), Some(4)).unwrap();
    assert_eq!(dates(&occ), vec![
      ymd(2025, 1, 6),
      ymd(2025, 1, 8),
      ymd(2025, 1, 20),
      ymd(2025, 1, 22),
    ]);
  }

  #[test]
  fn weekly_without_weekdays_uses_anchor_weekday() {
    let r = rule(Pattern::Weekly { weekdays: vec![] }, utc(2025, 1, 8));
    let occ = occurrences(&r, Window::unbounded(), Some(3)).unwrap();
    assert_eq!(dates(&occ), vec![
      ymd(2025, 1, 8),
      ymd(2025, 1, 15),
      ymd(2025, 1, 22),
    ]);
  }

  #[test]
  fn monthly_by_date_skips_short_months() {
    let r = rule(
      Pattern::Monthly(MonthlyPattern::ByDate { day: 31 }),
      utc(2025, 1, 31),
    );

    let occ = occurrences(&r, Window::unbounded(), Some(3)).unwrap();
    assert_eq!(dates(&occ), vec![
      ymd(2025, 1, 31),
      ymd(2025, 3, 31),
      ymd(2025, 5, 31),
    ]);
  }

  #[test]
  fn monthly_last_weekday() {
    let r = rule(
      Pattern::Monthly(MonthlyPattern::ByWeekday {
        weekday: Weekday::Fri,
        ordinal: -1,
      }),
      utc(2025, 1, 31),
    );

    let occ = occurrences(&r, Window::unbounded(), Some(3)).unwrap();
    assert_eq!(dates(&occ), vec![
      ymd(2025, 1, 31),
      ymd(2025, 2, 28),
      ymd(2025, 3, 28),
    ]);
  }

  #[test]
  fn monthly_second_tuesday() {
    let r = rule(
      Pattern::Monthly(MonthlyPattern::ByWeekday {
        weekday: Weekday::Tue,
        ordinal: 2,
      }),
      utc(2025, 1, 14),
    );

    let occ = occurrences(&r, Window::unbounded(), Some(3)).unwrap();
    assert_eq!(dates(&occ), vec![
      ymd(2025, 1, 14),
      ymd(2025, 2, 11),
      ymd(2025, 3, 11),
    ]);
  }

  #[test]
  fn count_caps_results_regardless_of_limit() {
    let mut r = rule(Pattern::Daily, utc(2025, 1, 1));
    r.end = EndCondition::Count(3);

    assert_eq!(occurrences(&r, Window::unbounded(), Some(50)).unwrap().len(), 3);
    assert_eq!(occurrences(&r, Window::unbounded(), None).unwrap().len(), 3);
  }

  #[test]
  fn count_is_measured_from_the_anchor() {
    let mut r = rule(Pattern::Daily, utc(2025, 1, 1));
    r.end = EndCondition::Count(5);

    let occ = occurrences(&r, Window::from(utc(2025, 1, 4)), None).unwrap();
    assert_eq!(dates(&occ), vec![ymd(2025, 1, 4), ymd(2025, 1, 5)]);
  }

  #[test]
  fn until_is_inclusive() {
    let mut r = rule(Pattern::Daily, utc(2025, 1, 1));
    r.end = EndCondition::Until(utc(2025, 1, 3));

    let occ = occurrences(&r, Window::unbounded(), None).unwrap();
    assert_eq!(dates(&occ), vec![
      ymd(2025, 1, 1),
      ymd(2025, 1, 2),
      ymd(2025, 1, 3),
    ]);
  }

  #[test]
  fn until_before_anchor_yields_nothing() {
    let mut r = rule(Pattern::Daily, utc(2025, 1, 10));
    r.end = EndCondition::Until(utc(2025, 1, 9));
    assert!(occurrences(&r, Window::unbounded(), None).unwrap().is_empty());
  }

  #[test]
  fn forever_rules_stop_at_the_display_horizon() {
    let r = rule(Pattern::Daily, utc(2025, 1, 1));
    let occ = occurrences(&r, Window::unbounded(), None).unwrap();
    assert_eq!(occ.len(), DISPLAY_LIMIT);
  }

  #[test]
  fn window_bounds_are_inclusive() {
    let r = rule(Pattern::Daily, utc(2025, 1, 1));
    let occ =
      occurrences(&r, Window::between(utc(2025, 1, 5), utc(2025, 1, 7)), None)
        .unwrap();
    assert_eq!(dates(&occ), vec![
      ymd(2025, 1, 5),
      ymd(2025, 1, 6),
      ymd(2025, 1, 7),
    ]);
  }

  #[test]
  fn wall_clock_time_survives_dst() {
    let paris = chrono_tz::Europe::Paris;
    let anchor = paris
      .with_ymd_and_hms(2025, 3, 28, 9, 0, 0)
      .unwrap()
      .with_timezone(&Utc);
    let mut r = rule(Pattern::Daily, anchor);
    r.timezone = paris;

    let occ = occurrences(&r, Window::unbounded(), Some(4)).unwrap();
    // Clocks go forward on 2025-03-30; the local hour stays at 09:00.
    assert!(occ.iter().all(|dt| dt.format("%H:%M").to_string() == "09:00"));
    let gaps: Vec<TimeDelta> = occ
      .windows(2)
      .map(|pair| pair[1].with_timezone(&Utc) - pair[0].with_timezone(&Utc))
      .collect();
    assert_eq!(gaps, vec![
      TimeDelta::hours(24),
      TimeDelta::hours(23),
      TimeDelta::hours(24),
    ]);
  }

  #[test]
  fn yearly_on_leap_day_skips_common_years() {
    let r = rule(Pattern::Yearly, utc(2024, 2, 29));
    let occ = occurrences(&r, Window::unbounded(), Some(2)).unwrap();
    assert_eq!(dates(&occ), vec![ymd(2024, 2, 29), ymd(2028, 2, 29)]);
  }
}
