//! Human-readable summaries of recurrence rules.
//!
//! The output is meant to be read back by a person and reconstruct the
//! frequency, interval, and end condition without ambiguity, e.g.
//! `Every 2 weeks on Mon, Wed until 2025-12-31`.

use chrono::{Datelike, Weekday};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::recurrence::{EndCondition, MonthlyPattern, Pattern, RecurrenceRule};

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
pub enum Locale {
  #[default]
  En,
  Fr,
}

impl RecurrenceRule {
  /// A localised summary of this rule. Pure; dates are printed in the rule's
  /// timezone.
  pub fn describe(&self, locale: Locale) -> String {
    match locale {
      Locale::En => describe_en(self),
      Locale::Fr => describe_fr(self),
    }
  }
}

// ─── English ─────────────────────────────────────────────────────────────────

fn describe_en(rule: &RecurrenceRule) -> String {
  let unit = match rule.pattern {
    Pattern::Daily => "day",
    Pattern::Weekly { .. } => "week",
    Pattern::Monthly(_) => "month",
    Pattern::Yearly => "year",
  };
  let mut out = if rule.interval == 1 {
    format!("Every {unit}")
  } else {
    format!("Every {} {unit}s", rule.interval)
  };

  let anchor = rule.anchor_local();
  match &rule.pattern {
    Pattern::Daily => {}
    Pattern::Weekly { weekdays } => {
      out.push_str(" on ");
      out.push_str(&weekday_list(weekdays, anchor.weekday(), |d| d.to_string()));
    }
    Pattern::Monthly(MonthlyPattern::ByDate { day }) => {
      out.push_str(&format!(" on day {day}"));
    }
    Pattern::Monthly(MonthlyPattern::ByWeekday { weekday, ordinal }) => {
      out.push_str(&format!(
        " on the {} {}",
        ordinal_en(*ordinal),
        weekday_name_en(*weekday)
      ));
    }
    Pattern::Yearly => {
      out.push_str(&format!(" on {}", anchor.format("%b %-d")));
    }
  }

  match rule.end {
    EndCondition::Forever => {}
    EndCondition::Count(1) => out.push_str(", once"),
    EndCondition::Count(n) => out.push_str(&format!(", {n} times")),
    EndCondition::Until(until) => {
      let date = until.with_timezone(&rule.timezone).date_naive();
      out.push_str(&format!(" until {date}"));
    }
  }
  out
}

fn ordinal_en(ordinal: i8) -> &'static str {
  match ordinal {
    -1 => "last",
    1 => "first",
    2 => "second",
    3 => "third",
    4 => "fourth",
    _ => "fifth",
  }
}

fn weekday_name_en(day: Weekday) -> &'static str {
  match day {
    Weekday::Mon => "Monday",
    Weekday::Tue => "Tuesday",
    Weekday::Wed => "Wednesday",
    Weekday::Thu => "Thursday",
    Weekday::Fri => "Friday",
    Weekday::Sat => "Saturday",
    Weekday::Sun => "Sunday",
  }
}

// ─── French ──────────────────────────────────────────────────────────────────

fn describe_fr(rule: &RecurrenceRule) -> String {
  let n = rule.interval;
  let mut out = match (&rule.pattern, n) {
    (Pattern::Daily, 1) => "Tous les jours".to_owned(),
    (Pattern::Daily, n) => format!("Tous les {n} jours"),
    (Pattern::Weekly { .. }, 1) => "Toutes les semaines".to_owned(),
    (Pattern::Weekly { .. }, n) => format!("Toutes les {n} semaines"),
    (Pattern::Monthly(_), 1) => "Tous les mois".to_owned(),
    (Pattern::Monthly(_), n) => format!("Tous les {n} mois"),
    (Pattern::Yearly, 1) => "Tous les ans".to_owned(),
    (Pattern::Yearly, n) => format!("Tous les {n} ans"),
  };

  let anchor = rule.anchor_local();
  match &rule.pattern {
    Pattern::Daily => {}
    Pattern::Weekly { weekdays } => {
      out.push_str(" le ");
      out.push_str(&weekday_list(weekdays, anchor.weekday(), |d| {
        weekday_name_fr(d).to_owned()
      }));
    }
    Pattern::Monthly(MonthlyPattern::ByDate { day }) => {
      out.push_str(&format!(" le {day}"));
    }
    Pattern::Monthly(MonthlyPattern::ByWeekday { weekday, ordinal }) => {
      out.push_str(&format!(
        " le {} {}",
        ordinal_fr(*ordinal),
        weekday_name_fr(*weekday)
      ));
    }
    Pattern::Yearly => {
      out.push_str(&format!(
        " le {} {}",
        anchor.day(),
        month_name_fr(anchor.month())
      ));
    }
  }

  match rule.end {
    EndCondition::Forever => {}
    EndCondition::Count(1) => out.push_str(", une fois"),
    EndCondition::Count(n) => out.push_str(&format!(", {n} fois")),
    EndCondition::Until(until) => {
      let date = until.with_timezone(&rule.timezone).date_naive();
      out.push_str(&format!(" jusqu'au {date}"));
    }
  }
  out
}

fn ordinal_fr(ordinal: i8) -> &'static str {
  match ordinal {
    -1 => "dernier",
    1 => "premier",
    2 => "deuxième",
    3 => "troisième",
    4 => "quatrième",
    _ => "cinquième",
  }
}

fn weekday_name_fr(day: Weekday) -> &'static str {
  match day {
    Weekday::Mon => "lundi",
    Weekday::Tue => "mardi",
    Weekday::Wed => "mercredi",
    Weekday::Thu => "jeudi",
    Weekday::Fri => "vendredi",
    Weekday::Sat => "samedi",
    Weekday::Sun => "dimanche",
  }
}

fn month_name_fr(month: u32) -> &'static str {
  match month {
    1 => "janvier",
    2 => "février",
    3 => "mars",
    4 => "avril",
    5 => "mai",
    6 => "juin",
    7 => "juillet",
    8 => "août",
    9 => "septembre",
    10 => "octobre",
    11 => "novembre",
    _ => "décembre",
  }
}

// ─── Shared ──────────────────────────────────────────────────────────────────

/// Join the selected weekdays; an empty selection names the anchor's day.
fn weekday_list(
  weekdays: &[Weekday],
  anchor_day: Weekday,
  name: impl Fn(Weekday) -> String,
) -> String {
  if weekdays.is_empty() {
    return name(anchor_day);
  }
  weekdays
    .iter()
    .map(|d| name(*d))
    .collect::<Vec<_>>()
    .join(", ")
}

#[cfg(test)]
mod tests {
  use chrono::{DateTime, TimeZone, Utc};
  use chrono_tz::Tz;
  use uuid::Uuid;

  use super::*;

  fn rule(
    pattern: Pattern,
    interval: u16,
    end: EndCondition,
    anchor: DateTime<Utc>,
  ) -> RecurrenceRule {
    RecurrenceRule {
      rule_id: Uuid::new_v4(),
      base_event_id: None,
      interval,
      pattern,
      end,
      start_anchor: anchor,
      timezone: Tz::UTC,
      created_at: anchor,
    }
  }

  fn jan_6() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap()
  }

  #[test]
  fn biweekly_until_in_english() {
    let r = rule(
      Pattern::Weekly {
        weekdays: vec![Weekday::Mon, Weekday::Wed],
      },
      2,
      EndCondition::Until(Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap()),
      jan_6(),
    );
    assert_eq!(
      r.describe(Locale::En),
      "Every 2 weeks on Mon, Wed until 2025-12-31"
    );
    assert_eq!(
      r.describe(Locale::Fr),
      "Toutes les 2 semaines le lundi, mercredi jusqu'au 2025-12-31"
    );
  }

  #[test]
  fn daily_forever() {
    let r = rule(Pattern::Daily, 1, EndCondition::Forever, jan_6());
    assert_eq!(r.describe(Locale::En), "Every day");
    assert_eq!(r.describe(Locale::Fr), "Tous les jours");
  }

  #[test]
  fn every_three_days_with_count() {
    let r = rule(Pattern::Daily, 3, EndCondition::Count(5), jan_6());
    assert_eq!(r.describe(Locale::En), "Every 3 days, 5 times");
    assert_eq!(r.describe(Locale::Fr), "Tous les 3 jours, 5 fois");
  }

  #[test]
  fn weekly_without_weekdays_names_the_anchor_day() {
    let r = rule(
      Pattern::Weekly { weekdays: vec![] },
      1,
      EndCondition::Count(1),
      jan_6(),
    );
    assert_eq!(r.describe(Locale::En), "Every week on Mon, once");
  }

  #[test]
  fn monthly_forms() {
    let by_date = rule(
      Pattern::Monthly(MonthlyPattern::ByDate { day: 15 }),
      1,
      EndCondition::Forever,
      jan_6(),
    );
    assert_eq!(by_date.describe(Locale::En), "Every month on day 15");
    assert_eq!(by_date.describe(Locale::Fr), "Tous les mois le 15");

    let last_friday = rule(
      Pattern::Monthly(MonthlyPattern::ByWeekday {
        weekday: Weekday::Fri,
        ordinal: -1,
      }),
      1,
      EndCondition::Forever,
      jan_6(),
    );
    assert_eq!(
      last_friday.describe(Locale::En),
      "Every month on the last Friday"
    );
    assert_eq!(
      last_friday.describe(Locale::Fr),
      "Tous les mois le dernier vendredi"
    );

    let second_tuesday = rule(
      Pattern::Monthly(MonthlyPattern::ByWeekday {
        weekday: Weekday::Tue,
        ordinal: 2,
      }),
      3,
      EndCondition::Forever,
      jan_6(),
    );
    assert_eq!(
      second_tuesday.describe(Locale::En),
      "Every 3 months on the second Tuesday"
    );
  }

  #[test]
  fn yearly_names_the_anchor_date() {
    let r = rule(Pattern::Yearly, 1, EndCondition::Forever, jan_6());
    assert_eq!(r.describe(Locale::En), "Every year on Jan 6");
    assert_eq!(r.describe(Locale::Fr), "Tous les ans le 6 janvier");
  }

  #[test]
  fn locale_parses_from_config_strings() {
    assert_eq!("fr".parse::<Locale>().unwrap(), Locale::Fr);
    assert_eq!(Locale::En.to_string(), "en");
  }
}
