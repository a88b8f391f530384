//! # Recurrence Compiler
//!
//! Turns a user-declared `(ScheduleType, ScheduleConfig)` pair into a
//! [`RecurrenceSpec`] - the compiled, engine-agnostic description of "when
//! to fire". The trigger engine in till-scheduler walks occurrences off the
//! spec; it never sees the raw config.
//!
//! ## Compilation Outcomes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  daily    + time            ──► RecurrenceSpec::Daily                   │
//! │  weekly   + day_of_week     ──► RecurrenceSpec::Weekly                  │
//! │  monthly  + day_of_month    ──► RecurrenceSpec::Monthly                 │
//! │  custom   + cron_expression ──► RecurrenceSpec::Cron                    │
//! │                                                                         │
//! │  malformed time / day / missing or unparseable cron                     │
//! │           ──► CoreError::Unschedulable (report stays persisted, inert)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Month-Length Clamping
//! A monthly schedule configured for day 31 fires on Feb 28 (29 in leap
//! years): days past the end of a month clamp to the month's last day, so
//! every period produces exactly one firing and the occurrence sequence
//! stays strictly increasing.

use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::error::{CoreError, CoreResult};
use crate::types::{ScheduleConfig, ScheduleType};
use crate::validation::parse_time;

// =============================================================================
// Recurrence Spec
// =============================================================================

/// The compiled description of when a schedule fires.
///
/// Decoupled from any timer implementation: consumers only need
/// [`RecurrenceSpec::next_occurrence`], which makes both this compiler and
/// the trigger engine testable without a real clock.
#[derive(Debug, Clone)]
pub enum RecurrenceSpec {
    /// Fires once per day at `time`.
    Daily { time: NaiveTime },

    /// Fires once per week on `day_of_week` (0 = Sunday .. 6 = Saturday)
    /// at `time`.
    Weekly { day_of_week: u8, time: NaiveTime },

    /// Fires once per month on `day_of_month` (clamped to the month's last
    /// day) at `time`.
    Monthly { day_of_month: u8, time: NaiveTime },

    /// Fires per the caller-supplied cron expression, verbatim.
    Cron {
        schedule: cron::Schedule,
        expression: String,
    },
}

impl RecurrenceSpec {
    /// Returns the first occurrence strictly after `after`, or None if the
    /// spec can produce no further occurrence (possible for exhausted cron
    /// expressions with fixed year fields).
    pub fn next_occurrence(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            RecurrenceSpec::Daily { time } => {
                let today = after.date().and_time(*time);
                if today > after {
                    Some(today)
                } else {
                    Some(after.date().succ_opt()?.and_time(*time))
                }
            }

            RecurrenceSpec::Weekly { day_of_week, time } => {
                let today_idx = after.date().weekday().num_days_from_sunday() as u8;
                let days_ahead = (u64::from(*day_of_week) + 7 - u64::from(today_idx)) % 7;
                let candidate = after
                    .date()
                    .checked_add_days(chrono::Days::new(days_ahead))?
                    .and_time(*time);
                if candidate > after {
                    Some(candidate)
                } else {
                    Some(
                        candidate
                            .date()
                            .checked_add_days(chrono::Days::new(7))?
                            .and_time(*time),
                    )
                }
            }

            RecurrenceSpec::Monthly { day_of_month, time } => {
                let candidate =
                    clamped_date(after.year(), after.month(), *day_of_month)?.and_time(*time);
                if candidate > after {
                    Some(candidate)
                } else {
                    let (year, month) = next_month(after.year(), after.month());
                    Some(clamped_date(year, month, *day_of_month)?.and_time(*time))
                }
            }

            RecurrenceSpec::Cron { schedule, .. } => {
                let anchor = Utc.from_utc_datetime(&after);
                schedule.after(&anchor).next().map(|dt| dt.naive_utc())
            }
        }
    }

    /// Human-readable description for log lines.
    pub fn describe(&self) -> String {
        match self {
            RecurrenceSpec::Daily { time } => format!("daily at {}", time.format("%H:%M")),
            RecurrenceSpec::Weekly { day_of_week, time } => format!(
                "weekly on {} at {}",
                weekday_name(*day_of_week),
                time.format("%H:%M")
            ),
            RecurrenceSpec::Monthly { day_of_month, time } => {
                format!("monthly on day {} at {}", day_of_month, time.format("%H:%M"))
            }
            RecurrenceSpec::Cron { expression, .. } => format!("cron: {}", expression),
        }
    }
}

// =============================================================================
// Compilation
// =============================================================================

/// Compiles a schedule config into a recurrence spec.
///
/// Never panics on malformed input: every defect becomes
/// `CoreError::Unschedulable`, so callers can log and leave the report
/// inert without disturbing other schedules.
pub fn compile(schedule_type: ScheduleType, config: &ScheduleConfig) -> CoreResult<RecurrenceSpec> {
    let time = parse_time(&config.time)
        .ok_or_else(|| CoreError::unschedulable(format!("invalid time '{}'", config.time)))?;

    match schedule_type {
        ScheduleType::Daily => Ok(RecurrenceSpec::Daily { time }),

        ScheduleType::Weekly => {
            if config.day_of_week > 6 {
                return Err(CoreError::unschedulable(format!(
                    "day_of_week {} is outside 0-6",
                    config.day_of_week
                )));
            }
            Ok(RecurrenceSpec::Weekly {
                day_of_week: config.day_of_week,
                time,
            })
        }

        ScheduleType::Monthly => {
            if !(1..=31).contains(&config.day_of_month) {
                return Err(CoreError::unschedulable(format!(
                    "day_of_month {} is outside 1-31",
                    config.day_of_month
                )));
            }
            Ok(RecurrenceSpec::Monthly {
                day_of_month: config.day_of_month,
                time,
            })
        }

        ScheduleType::Custom => {
            let raw = config
                .cron_expression
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    CoreError::unschedulable("custom schedule has no cron expression")
                })?;

            let expression = promote_cron_expression(raw);
            let schedule = cron::Schedule::from_str(&expression).map_err(|e| {
                CoreError::unschedulable(format!("invalid cron expression '{}': {}", raw, e))
            })?;

            Ok(RecurrenceSpec::Cron {
                schedule,
                expression,
            })
        }
    }
}

/// Promotes a 5-field (minute-granularity) cron expression to the 6-field
/// form the `cron` crate expects, by prefixing a seconds column.
pub fn promote_cron_expression(raw: &str) -> String {
    if raw.split_whitespace().count() == 5 {
        format!("0 {}", raw)
    } else {
        raw.to_string()
    }
}

// =============================================================================
// Calendar Helpers
// =============================================================================

/// Number of days in the given month.
pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = next_month(year, month);
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// The month after the given one, rolling the year.
pub(crate) fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// A date in `year`/`month` with the day clamped to the month's length.
pub(crate) fn clamped_date(year: i32, month: u32, day: u8) -> Option<NaiveDate> {
    let day = u32::from(day).min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

/// English weekday name for a 0 = Sunday .. 6 = Saturday index.
pub(crate) fn weekday_name(day_of_week: u8) -> &'static str {
    match day_of_week {
        0 => "Sunday",
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        6 => "Saturday",
        _ => "unknown",
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn config(time: &str) -> ScheduleConfig {
        ScheduleConfig {
            time: time.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_daily_fires_later_today_then_tomorrow() {
        let spec = compile(ScheduleType::Daily, &config("09:00")).unwrap();

        // 08:00 -> today 09:00
        let next = spec.next_occurrence(at(2024, 3, 15, 8, 0)).unwrap();
        assert_eq!(next, at(2024, 3, 15, 9, 0));

        // Exactly 09:00 -> tomorrow (strictly after)
        let next = spec.next_occurrence(at(2024, 3, 15, 9, 0)).unwrap();
        assert_eq!(next, at(2024, 3, 16, 9, 0));
    }

    #[test]
    fn test_weekly_targets_configured_weekday() {
        let spec = compile(
            ScheduleType::Weekly,
            &ScheduleConfig {
                day_of_week: 1, // Monday
                ..config("09:00")
            },
        )
        .unwrap();

        // 2024-03-15 is a Friday -> next Monday is the 18th
        let next = spec.next_occurrence(at(2024, 3, 15, 12, 0)).unwrap();
        assert_eq!(next, at(2024, 3, 18, 9, 0));

        // Monday 08:00 -> same day 09:00 (trigger-time semantics)
        let next = spec.next_occurrence(at(2024, 3, 18, 8, 0)).unwrap();
        assert_eq!(next, at(2024, 3, 18, 9, 0));

        // Monday 10:00 -> the following Monday
        let next = spec.next_occurrence(at(2024, 3, 18, 10, 0)).unwrap();
        assert_eq!(next, at(2024, 3, 25, 9, 0));
    }

    #[test]
    fn test_monthly_clamps_to_month_length() {
        let spec = compile(
            ScheduleType::Monthly,
            &ScheduleConfig {
                day_of_month: 31,
                ..config("09:00")
            },
        )
        .unwrap();

        // After Jan 31 firing, February clamps to the 29th (2024 is leap)
        let next = spec.next_occurrence(at(2024, 1, 31, 10, 0)).unwrap();
        assert_eq!(next, at(2024, 2, 29, 9, 0));

        // Non-leap year clamps to the 28th
        let next = spec.next_occurrence(at(2023, 1, 31, 10, 0)).unwrap();
        assert_eq!(next, at(2023, 2, 28, 9, 0));
    }

    #[test]
    fn test_custom_five_field_expression_is_promoted() {
        let spec = compile(
            ScheduleType::Custom,
            &ScheduleConfig {
                cron_expression: Some("30 8 * * 1".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        // Friday 2024-03-15 -> Monday the 18th, 08:30
        let next = spec.next_occurrence(at(2024, 3, 15, 12, 0)).unwrap();
        assert_eq!(next, at(2024, 3, 18, 8, 30));
    }

    #[test]
    fn test_custom_missing_or_invalid_expression_is_unschedulable() {
        let err = compile(ScheduleType::Custom, &ScheduleConfig::default()).unwrap_err();
        assert!(matches!(err, CoreError::Unschedulable { .. }));

        let err = compile(
            ScheduleType::Custom,
            &ScheduleConfig {
                cron_expression: Some("not a cron".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Unschedulable { .. }));
    }

    #[test]
    fn test_invalid_time_is_unschedulable() {
        let err = compile(ScheduleType::Daily, &config("25:99")).unwrap_err();
        assert!(matches!(err, CoreError::Unschedulable { .. }));
    }

    #[test]
    fn test_occurrences_strictly_increase() {
        // Iterating each spec with its own output never repeats or stalls.
        let specs = [
            compile(ScheduleType::Daily, &config("09:00")).unwrap(),
            compile(
                ScheduleType::Weekly,
                &ScheduleConfig {
                    day_of_week: 3,
                    ..config("17:30")
                },
            )
            .unwrap(),
            compile(
                ScheduleType::Monthly,
                &ScheduleConfig {
                    day_of_month: 31,
                    ..config("06:15")
                },
            )
            .unwrap(),
        ];

        for spec in specs {
            let mut cursor = at(2024, 1, 31, 12, 0);
            for _ in 0..24 {
                let next = spec.next_occurrence(cursor).unwrap();
                assert!(next > cursor, "{} did not advance", spec.describe());
                cursor = next;
            }
        }
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
    }
}
