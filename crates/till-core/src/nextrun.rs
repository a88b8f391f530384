//! # Next-Run Calculator
//!
//! Projects the next instant a report should fire, for the persisted
//! `next_run_at` column. This is the value users see in the schedule list
//! ("next run: Monday 09:00"), recomputed on every config change and after
//! every completed run.
//!
//! ## Projection vs Trigger Time
//! The projection is deliberately conservative: it always advances at
//! least one full period from "now" (daily -> tomorrow, weekly -> next
//! week's target day even if today is that day). The live trigger walks
//! [`crate::recurrence::RecurrenceSpec`] occurrences instead, which may
//! still fire later *today*; after that firing the pipeline recomputes the
//! projection, so the column converges on the trigger's real cadence.
//!
//! Custom schedules project through their compiled cron expression so the
//! column agrees exactly with the trigger; an unschedulable config falls
//! back to now + 1 day so the field is never stale indefinitely.

use chrono::{Datelike, NaiveDateTime};

use crate::recurrence::{self, clamped_date, next_month};
use crate::types::{ScheduleConfig, ScheduleType};
use crate::validation::parse_time_or_default;

/// Computes the next projected run strictly after `now`.
///
/// For all valid configs the result is strictly greater than `now`, and
/// feeding the output back in as the new "now" yields a strictly
/// increasing sequence matching the declared period.
pub fn next_run(
    schedule_type: ScheduleType,
    config: &ScheduleConfig,
    now: NaiveDateTime,
) -> NaiveDateTime {
    let time = parse_time_or_default(&config.time);

    match schedule_type {
        // Tomorrow at the configured time.
        ScheduleType::Daily => match now.date().succ_opt() {
            Some(tomorrow) => tomorrow.and_time(time),
            None => fallback_one_day(now),
        },

        // The next occurrence of the target weekday strictly after today;
        // if today IS the target day, skip to next week.
        ScheduleType::Weekly => {
            let target = u32::from(config.day_of_week.min(6));
            let today_idx = now.date().weekday().num_days_from_sunday();
            let mut days_ahead = (u64::from(target) + 7 - u64::from(today_idx)) % 7;
            if days_ahead == 0 {
                days_ahead = 7;
            }
            now.date()
                .checked_add_days(chrono::Days::new(days_ahead))
                .map(|d| d.and_time(time))
                .unwrap_or_else(|| fallback_one_day(now))
        }

        // Same day next month, clamped to the month's length.
        ScheduleType::Monthly => {
            let (year, month) = next_month(now.year(), now.month());
            clamped_date(year, month, config.day_of_month.clamp(1, 31))
                .map(|d| d.and_time(time))
                .unwrap_or_else(|| fallback_one_day(now))
        }

        // Project through the compiled cron expression; unschedulable
        // configs advance one day so the projection never goes stale.
        ScheduleType::Custom => recurrence::compile(ScheduleType::Custom, config)
            .ok()
            .and_then(|spec| spec.next_occurrence(now))
            .unwrap_or_else(|| fallback_one_day(now)),
    }
}

fn fallback_one_day(now: NaiveDateTime) -> NaiveDateTime {
    now + chrono::Duration::days(1)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

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
    fn test_daily_projects_tomorrow() {
        // Even before today's fire time, the projection is tomorrow
        let next = next_run(ScheduleType::Daily, &config("09:00"), at(2024, 3, 15, 7, 0));
        assert_eq!(next, at(2024, 3, 16, 9, 0));
    }

    #[test]
    fn test_weekly_on_target_day_skips_to_next_week() {
        // Spec example: Monday 10:00 with a Monday schedule -> next Monday
        let monday = at(2024, 3, 18, 10, 0);
        assert_eq!(monday.date().weekday(), chrono::Weekday::Mon);

        let next = next_run(
            ScheduleType::Weekly,
            &ScheduleConfig {
                day_of_week: 1,
                ..config("09:00")
            },
            monday,
        );
        assert_eq!(next, at(2024, 3, 25, 9, 0));

        // Same holds before the fire time: always advances at least a day
        let next = next_run(
            ScheduleType::Weekly,
            &ScheduleConfig {
                day_of_week: 1,
                ..config("09:00")
            },
            at(2024, 3, 18, 8, 0),
        );
        assert_eq!(next, at(2024, 3, 25, 9, 0));
    }

    #[test]
    fn test_weekly_mid_week_targets_coming_day() {
        // Friday the 15th, target Monday (1) -> the 18th
        let next = next_run(
            ScheduleType::Weekly,
            &ScheduleConfig {
                day_of_week: 1,
                ..config("09:00")
            },
            at(2024, 3, 15, 12, 0),
        );
        assert_eq!(next, at(2024, 3, 18, 9, 0));
    }

    #[test]
    fn test_monthly_advances_one_month_with_clamp() {
        let next = next_run(
            ScheduleType::Monthly,
            &ScheduleConfig {
                day_of_month: 31,
                ..config("09:00")
            },
            at(2024, 1, 15, 12, 0),
        );
        // February 2024 clamps day 31 to the 29th
        assert_eq!(next, at(2024, 2, 29, 9, 0));

        // December rolls into January of the next year
        let next = next_run(
            ScheduleType::Monthly,
            &ScheduleConfig {
                day_of_month: 15,
                ..config("09:00")
            },
            at(2024, 12, 20, 12, 0),
        );
        assert_eq!(next, at(2025, 1, 15, 9, 0));
    }

    #[test]
    fn test_custom_projects_through_cron() {
        let next = next_run(
            ScheduleType::Custom,
            &ScheduleConfig {
                cron_expression: Some("0 12 * * *".to_string()),
                ..Default::default()
            },
            at(2024, 3, 15, 9, 0),
        );
        assert_eq!(next, at(2024, 3, 15, 12, 0));
    }

    #[test]
    fn test_unschedulable_custom_falls_back_one_day() {
        let now = at(2024, 3, 15, 9, 30);
        let next = next_run(ScheduleType::Custom, &ScheduleConfig::default(), now);
        assert_eq!(next, now + chrono::Duration::days(1));
    }

    #[test]
    fn test_output_always_strictly_after_now() {
        let configs = [
            (ScheduleType::Daily, config("00:00")),
            (
                ScheduleType::Weekly,
                ScheduleConfig {
                    day_of_week: 0,
                    ..config("23:59")
                },
            ),
            (
                ScheduleType::Monthly,
                ScheduleConfig {
                    day_of_month: 1,
                    ..config("09:00")
                },
            ),
            (ScheduleType::Custom, ScheduleConfig::default()),
        ];

        for (schedule_type, cfg) in &configs {
            let mut cursor = at(2024, 1, 31, 23, 59);
            for _ in 0..12 {
                let next = next_run(*schedule_type, cfg, cursor);
                assert!(next > cursor, "{} projection did not advance", schedule_type);
                cursor = next;
            }
        }
    }
}
