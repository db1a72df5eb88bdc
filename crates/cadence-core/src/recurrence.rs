//! Recurrence rules: the declarative description of how an event repeats.
//!
//! Callers submit a loose [`RuleParams`] (the shape a form or JSON body
//! arrives in). [`RuleParams::validate`] turns it into a [`RuleDefinition`]
//! whose types make the field combinations from the form unrepresentable
//! unless they are meaningful: weekday sets exist only on weekly rules, the
//! monthly mode only on monthly rules, and so on.

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Input enums ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
  Daily,
  Weekly,
  Monthly,
  Yearly,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MonthlyMode {
  /// A fixed day of the month, e.g. "the 15th".
  #[default]
  ByDate,
  /// The nth weekday of the month, e.g. "the second Tuesday".
  ByWeekdayOrdinal,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EndType {
  #[default]
  Forever,
  Count,
  Until,
}

// ─── RuleParams ──────────────────────────────────────────────────────────────

/// Unvalidated recurrence parameters, as submitted by a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleParams {
  pub frequency:    Frequency,
  #[serde(default = "default_interval")]
  pub interval:     u16,
  /// Weekly only. Empty means "the anchor's weekday".
  #[serde(default)]
  pub weekdays:     Vec<Weekday>,
  #[serde(default)]
  pub monthly_mode: MonthlyMode,
  pub day_of_month: Option<u8>,
  pub weekday:      Option<Weekday>,
  /// `-1` for the last such weekday, otherwise `1..=5`.
  pub ordinal:      Option<i8>,
  #[serde(default)]
  pub end_type:     EndType,
  pub count:        Option<u32>,
  /// Last date (inclusive, in the rule timezone) an occurrence may fall on.
  pub until:        Option<NaiveDate>,
}

fn default_interval() -> u16 { 1 }

impl RuleParams {
  /// Parameters for a rule that repeats forever every period of `frequency`.
  pub fn new(frequency: Frequency) -> Self {
    Self {
      frequency,
      interval: 1,
      weekdays: Vec::new(),
      monthly_mode: MonthlyMode::default(),
      day_of_month: None,
      weekday: None,
      ordinal: None,
      end_type: EndType::default(),
      count: None,
      until: None,
    }
  }

  /// Check the field invariants and build the typed definition of a rule
  /// anchored at `anchor` in `tz`.
  pub fn validate(
    &self,
    anchor: DateTime<Utc>,
    tz: Tz,
  ) -> Result<RuleDefinition> {
    if self.interval == 0 {
      return Err(Error::Validation("interval must be at least 1".into()));
    }

    let pattern = match self.frequency {
      Frequency::Daily => Pattern::Daily,
      Frequency::Weekly => Pattern::Weekly {
        weekdays: normalize_weekdays(&self.weekdays),
      },
      Frequency::Monthly => Pattern::Monthly(self.monthly_pattern()?),
      Frequency::Yearly => Pattern::Yearly,
    };

    let end = match self.end_type {
      EndType::Forever => EndCondition::Forever,
      EndType::Count => match self.count {
        None => {
          return Err(Error::Validation(
            "count is required when the rule ends after a count".into(),
          ));
        }
        Some(0) => {
          return Err(Error::Validation("count must be at least 1".into()));
        }
        Some(n) => EndCondition::Count(n),
      },
      EndType::Until => {
        let Some(until) = self.until else {
          return Err(Error::Validation(
            "until is required when the rule ends on a date".into(),
          ));
        };
        let anchor_date = anchor.with_timezone(&tz).date_naive();
        if until < anchor_date {
          return Err(Error::Validation(format!(
            "until {until} is before the first occurrence on {anchor_date}"
          )));
        }
        EndCondition::Until(end_of_day(until, tz)?)
      }
    };

    Ok(RuleDefinition {
      interval: self.interval,
      pattern,
      end,
    })
  }

  fn monthly_pattern(&self) -> Result<MonthlyPattern> {
    match self.monthly_mode {
      MonthlyMode::ByDate => {
        let Some(day) = self.day_of_month else {
          return Err(Error::Validation(
            "day_of_month is required for monthly rules by date".into(),
          ));
        };
        if !(1..=31).contains(&day) {
          return Err(Error::Validation(format!(
            "day_of_month {day} is outside 1..=31"
          )));
        }
        Ok(MonthlyPattern::ByDate { day })
      }
      MonthlyMode::ByWeekdayOrdinal => {
        let (Some(weekday), Some(ordinal)) = (self.weekday, self.ordinal)
        else {
          return Err(Error::Validation(
            "weekday and ordinal are required for monthly rules by weekday"
              .into(),
          ));
        };
        if ordinal != -1 && !(1..=5).contains(&ordinal) {
          return Err(Error::Validation(format!(
            "ordinal {ordinal} must be -1 or within 1..=5"
          )));
        }
        Ok(MonthlyPattern::ByWeekday { weekday, ordinal })
      }
    }
  }
}

/// Sort Mon→Sun and drop duplicates.
fn normalize_weekdays(days: &[Weekday]) -> Vec<Weekday> {
  let mut days = days.to_vec();
  days.sort_by_key(Weekday::num_days_from_monday);
  days.dedup();
  days
}

/// The last second of `date` in `tz`, as a UTC instant.
fn end_of_day(date: NaiveDate, tz: Tz) -> Result<DateTime<Utc>> {
  let naive = date
    .and_hms_opt(23, 59, 59)
    .ok_or_else(|| Error::Validation(format!("invalid until date {date}")))?;
  Ok(
    tz.from_local_datetime(&naive)
      .latest()
      .map(|dt| dt.with_timezone(&Utc))
      .unwrap_or_else(|| Utc.from_utc_datetime(&naive)),
  )
}

/// Resolve an IANA timezone name; `None` or an empty name means UTC.
pub fn resolve_timezone(name: Option<&str>) -> Result<Tz> {
  match name.map(str::trim) {
    None | Some("") => Ok(Tz::UTC),
    Some(name) => name
      .parse::<Tz>()
      .map_err(|_| Error::UnknownTimezone(name.to_owned())),
  }
}

// ─── Validated definition ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MonthlyPattern {
  ByDate { day: u8 },
  ByWeekday { weekday: Weekday, ordinal: i8 },
}

/// What repeats within each period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frequency", content = "by", rename_all = "lowercase")]
pub enum Pattern {
  Daily,
  Weekly { weekdays: Vec<Weekday> },
  Monthly(MonthlyPattern),
  Yearly,
}

impl Pattern {
  pub fn frequency(&self) -> Frequency {
    match self {
      Self::Daily => Frequency::Daily,
      Self::Weekly { .. } => Frequency::Weekly,
      Self::Monthly(_) => Frequency::Monthly,
      Self::Yearly => Frequency::Yearly,
    }
  }
}

/// When a rule stops producing occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EndCondition {
  Forever,
  /// Total number of occurrences, counted from the anchor.
  Count(u32),
  /// Inclusive: an occurrence starting exactly here is still emitted.
  Until(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDefinition {
  pub interval: u16,
  pub pattern:  Pattern,
  pub end:      EndCondition,
}

// ─── RecurrenceRule ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceRule {
  pub rule_id:       Uuid,
  /// The template event cloned into every occurrence.
  pub base_event_id: Option<Uuid>,
  pub interval:      u16,
  pub pattern:       Pattern,
  pub end:           EndCondition,
  /// First occurrence and reference point of the rule. Whole seconds.
  pub start_anchor:  DateTime<Utc>,
  pub timezone:      Tz,
  pub created_at:    DateTime<Utc>,
}

impl RecurrenceRule {
  pub fn frequency(&self) -> Frequency { self.pattern.frequency() }

  pub fn anchor_local(&self) -> DateTime<Tz> {
    self.start_anchor.with_timezone(&self.timezone)
  }

  /// The end condition this rule would have if it were cut short so that no
  /// occurrence starts on or after `date_from`. Count-based ends are left
  /// untouched: truncating a count by date is ambiguous.
  pub fn truncated_end(&self, date_from: DateTime<Utc>) -> EndCondition {
    let cutoff = date_from - TimeDelta::days(1);
    match self.end {
      EndCondition::Forever => EndCondition::Until(cutoff),
      EndCondition::Until(until) => EndCondition::Until(until.min(cutoff)),
      EndCondition::Count(n) => EndCondition::Count(n),
    }
  }
}

/// Input to [`crate::store::CalendarStore::insert_rule`].
#[derive(Debug, Clone)]
pub struct NewRule {
  pub base_event_id: Option<Uuid>,
  pub definition:    RuleDefinition,
  pub start_anchor:  DateTime<Utc>,
  pub timezone:      Tz,
}

impl NewRule {
  /// A rule with the same pattern, interval, timezone, and template as
  /// `rule`, anchored at `start_anchor`.
  pub fn successor_of(rule: &RecurrenceRule, start_anchor: DateTime<Utc>) -> Self {
    Self {
      base_event_id: rule.base_event_id,
      definition: RuleDefinition {
        interval: rule.interval,
        pattern:  rule.pattern.clone(),
        end:      rule.end,
      },
      start_anchor,
      timezone: rule.timezone,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap()
  }

  #[test]
  fn weekly_weekdays_are_sorted_and_deduplicated() {
    let mut params = RuleParams::new(Frequency::Weekly);
    params.weekdays = vec![Weekday::Fri, Weekday::Mon, Weekday::Fri];

    let def = params.validate(anchor(), Tz::UTC).unwrap();
    assert_eq!(def.pattern, Pattern::Weekly {
      weekdays: vec![Weekday::Mon, Weekday::Fri],
    });
  }

  #[test]
  fn zero_interval_is_rejected() {
    let mut params = RuleParams::new(Frequency::Daily);
    params.interval = 0;
    assert!(matches!(
      params.validate(anchor(), Tz::UTC),
      Err(Error::Validation(_))
    ));
  }

  #[test]
  fn monthly_by_date_requires_day_of_month() {
    let params = RuleParams::new(Frequency::Monthly);
    assert!(matches!(
      params.validate(anchor(), Tz::UTC),
      Err(Error::Validation(_))
    ));
  }

  #[test]
  fn monthly_by_weekday_rejects_ordinal_zero() {
    let mut params = RuleParams::new(Frequency::Monthly);
    params.monthly_mode = MonthlyMode::ByWeekdayOrdinal;
    params.weekday = Some(Weekday::Tue);
    params.ordinal = Some(0);
    assert!(matches!(
      params.validate(anchor(), Tz::UTC),
      Err(Error::Validation(_))
    ));

    params.ordinal = Some(-1);
    assert_eq!(
      params.validate(anchor(), Tz::UTC).unwrap().pattern,
      Pattern::Monthly(MonthlyPattern::ByWeekday {
        weekday: Weekday::Tue,
        ordinal: -1,
      })
    );
  }

  #[test]
  fn count_end_requires_positive_count() {
    let mut params = RuleParams::new(Frequency::Daily);
    params.end_type = EndType::Count;
    assert!(params.validate(anchor(), Tz::UTC).is_err());

    params.count = Some(0);
    assert!(params.validate(anchor(), Tz::UTC).is_err());

    params.count = Some(3);
    assert_eq!(
      params.validate(anchor(), Tz::UTC).unwrap().end,
      EndCondition::Count(3)
    );
  }

  #[test]
  fn until_before_anchor_is_rejected() {
    let mut params = RuleParams::new(Frequency::Daily);
    params.end_type = EndType::Until;
    params.until = NaiveDate::from_ymd_opt(2025, 1, 5);
    assert!(params.validate(anchor(), Tz::UTC).is_err());
  }

  #[test]
  fn until_is_the_end_of_the_local_day() {
    let mut params = RuleParams::new(Frequency::Daily);
    params.end_type = EndType::Until;
    params.until = NaiveDate::from_ymd_opt(2025, 12, 31);

    let def = params
      .validate(anchor(), chrono_tz::Europe::Paris)
      .unwrap();
    // 23:59:59 in Paris (UTC+1 in winter).
    assert_eq!(
      def.end,
      EndCondition::Until(Utc.with_ymd_and_hms(2025, 12, 31, 22, 59, 59).unwrap())
    );
  }

  #[test]
  fn timezone_resolution() {
    assert_eq!(resolve_timezone(None).unwrap(), Tz::UTC);
    assert_eq!(
      resolve_timezone(Some("Europe/Brussels")).unwrap(),
      chrono_tz::Europe::Brussels
    );
    assert!(matches!(
      resolve_timezone(Some("Mars/Olympus")),
      Err(Error::UnknownTimezone(_))
    ));
  }

  #[test]
  fn params_deserialize_with_defaults() {
    let params: RuleParams = serde_json::from_str(
      r#"{"frequency":"weekly","weekdays":["Mon","Wed"],"end_type":"count","count":4}"#,
    )
    .unwrap();
    assert_eq!(params.frequency, Frequency::Weekly);
    assert_eq!(params.interval, 1);
    assert_eq!(params.weekdays, vec![Weekday::Mon, Weekday::Wed]);
    assert_eq!(params.end_type, EndType::Count);
  }
}
