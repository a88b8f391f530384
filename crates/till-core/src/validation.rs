//! # Config Validation
//!
//! Per-variant validation of schedule and date-range configs, applied at
//! the repository boundary - a JSON blob is deserialized into the typed
//! structs and then checked here before it can reach the registry or the
//! pipeline.
//!
//! ## Validation Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  all types      time matches HH:mm (24h)                                │
//! │  weekly         day_of_week in 0..=6                                    │
//! │  monthly        day_of_month in 1..=31                                  │
//! │  custom         cron_expression present and parseable                   │
//! │  fixed range    start_date and end_date present, end >= start           │
//! │  relative range no extra requirements (absent type -> last30days)       │
//! │  report         name non-empty and within the length cap                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveTime;

use crate::error::ValidationError;
use crate::recurrence;
use crate::types::{
    DateRangeConfig, DateRangeType, ScheduleConfig, ScheduleType, ScheduledReport,
};
use crate::{DEFAULT_RUN_TIME, MAX_REPORT_NAME_LEN};

// =============================================================================
// Time Parsing
// =============================================================================

/// Parses a strict `HH:mm` time-of-day string.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

/// Parses `HH:mm`, falling back to the crate default (09:00) when
/// malformed. Used by the next-run projection, which must always produce
/// a value; strict callers use [`parse_time`].
pub fn parse_time_or_default(s: &str) -> NaiveTime {
    parse_time(s)
        .or_else(|| parse_time(DEFAULT_RUN_TIME))
        .unwrap_or_default()
}

// =============================================================================
// Schedule Config
// =============================================================================

/// Validates a schedule config against its schedule type.
pub fn validate_schedule_config(
    schedule_type: ScheduleType,
    config: &ScheduleConfig,
) -> Result<(), ValidationError> {
    if parse_time(&config.time).is_none() {
        return Err(ValidationError::InvalidFormat {
            field: "time".to_string(),
            reason: format!("'{}' is not HH:mm", config.time),
        });
    }

    match schedule_type {
        ScheduleType::Daily => Ok(()),

        ScheduleType::Weekly => {
            if config.day_of_week > 6 {
                return Err(ValidationError::OutOfRange {
                    field: "day_of_week".to_string(),
                    min: 0,
                    max: 6,
                });
            }
            Ok(())
        }

        ScheduleType::Monthly => {
            if !(1..=31).contains(&config.day_of_month) {
                return Err(ValidationError::OutOfRange {
                    field: "day_of_month".to_string(),
                    min: 1,
                    max: 31,
                });
            }
            Ok(())
        }

        ScheduleType::Custom => {
            let raw = config
                .cron_expression
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ValidationError::Required {
                    field: "cron_expression".to_string(),
                })?;

            let promoted = recurrence::promote_cron_expression(raw);
            promoted
                .parse::<cron::Schedule>()
                .map_err(|e| ValidationError::InvalidFormat {
                    field: "cron_expression".to_string(),
                    reason: e.to_string(),
                })?;
            Ok(())
        }
    }
}

// =============================================================================
// Date Range Config
// =============================================================================

/// Validates a date range config against its range type.
pub fn validate_date_range_config(
    range_type: DateRangeType,
    config: &DateRangeConfig,
) -> Result<(), ValidationError> {
    match range_type {
        DateRangeType::Fixed => {
            let start = config.start_date.ok_or_else(|| ValidationError::Required {
                field: "start_date".to_string(),
            })?;
            let end = config.end_date.ok_or_else(|| ValidationError::Required {
                field: "end_date".to_string(),
            })?;

            if end < start {
                return Err(ValidationError::EndBeforeStart {
                    start: start.to_string(),
                    end: end.to_string(),
                });
            }
            Ok(())
        }

        // Absent relative_type resolves to last30days; nothing to check.
        DateRangeType::Relative => Ok(()),
    }
}

// =============================================================================
// Report
// =============================================================================

/// Validates a complete scheduled report before persistence.
pub fn validate_report(report: &ScheduledReport) -> Result<(), ValidationError> {
    if report.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    if report.name.len() > MAX_REPORT_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_REPORT_NAME_LEN,
        });
    }

    validate_schedule_config(report.schedule_type, &report.schedule_config)?;
    validate_date_range_config(report.date_range_type, &report.date_range_config)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_time() {
        assert_eq!(
            parse_time("09:00"),
            NaiveTime::from_hms_opt(9, 0, 0)
        );
        assert_eq!(
            parse_time(" 23:59 "),
            NaiveTime::from_hms_opt(23, 59, 0)
        );
        assert!(parse_time("24:00").is_none());
        assert!(parse_time("9am").is_none());
        assert_eq!(
            parse_time_or_default("garbage"),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_weekly_day_of_week_range() {
        let config = ScheduleConfig {
            day_of_week: 7,
            ..Default::default()
        };
        let err = validate_schedule_config(ScheduleType::Weekly, &config).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));

        let config = ScheduleConfig {
            day_of_week: 6,
            ..Default::default()
        };
        assert!(validate_schedule_config(ScheduleType::Weekly, &config).is_ok());
    }

    #[test]
    fn test_monthly_day_of_month_range() {
        let config = ScheduleConfig {
            day_of_month: 0,
            ..Default::default()
        };
        let err = validate_schedule_config(ScheduleType::Monthly, &config).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
    }

    #[test]
    fn test_custom_requires_parseable_cron() {
        let err =
            validate_schedule_config(ScheduleType::Custom, &ScheduleConfig::default()).unwrap_err();
        assert!(matches!(err, ValidationError::Required { .. }));

        let config = ScheduleConfig {
            cron_expression: Some("*/5 * * * *".to_string()),
            ..Default::default()
        };
        assert!(validate_schedule_config(ScheduleType::Custom, &config).is_ok());
    }

    #[test]
    fn test_fixed_range_requires_ordered_bounds() {
        let config = DateRangeConfig {
            start_date: NaiveDate::from_ymd_opt(2024, 3, 15),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            relative_type: None,
        };
        let err = validate_date_range_config(DateRangeType::Fixed, &config).unwrap_err();
        assert!(matches!(err, ValidationError::EndBeforeStart { .. }));

        let config = DateRangeConfig {
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            end_date: None,
            relative_type: None,
        };
        let err = validate_date_range_config(DateRangeType::Fixed, &config).unwrap_err();
        assert!(matches!(err, ValidationError::Required { .. }));
    }

    #[test]
    fn test_relative_range_needs_nothing() {
        assert!(
            validate_date_range_config(DateRangeType::Relative, &DateRangeConfig::default())
                .is_ok()
        );
    }
}
