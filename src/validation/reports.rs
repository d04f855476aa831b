use chrono::{Datelike, Duration, NaiveDate};

use crate::error::{AppError, Result};

/// Days covered by a report when no start date is given.
pub const DEFAULT_RANGE_DAYS: i64 = 30;

/// Accepted statistics bucket sizes.
pub const INTERPOLATIONS: [&str; 3] = ["day", "week", "month"];

/// Resolves an optional date range against `today`.
///
/// A missing end is today; a missing start is 30 days before today.
///
/// # Returns
///
/// The inclusive `(from, to)` pair, or a validation error when `from` is after `to`.
pub fn resolve_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    let to = to.unwrap_or(today);
    let from = from.unwrap_or_else(|| today - Duration::days(DEFAULT_RANGE_DAYS));

    if from > to {
        return Err(AppError::Validation(
            "Start date must not be after end date".to_string(),
        ));
    }

    Ok((from, to))
}

/// Resolves an optional month/year pair against `today`.
pub fn resolve_month(
    month: Option<u32>,
    year: Option<i32>,
    today: NaiveDate,
) -> Result<(u32, i32)> {
    let month = month.unwrap_or_else(|| today.month());
    let year = year.unwrap_or_else(|| today.year());

    if !(1..=12).contains(&month) {
        return Err(AppError::Validation(
            "Month must be between 1 and 12".to_string(),
        ));
    }

    if !(2000..=2100).contains(&year) {
        return Err(AppError::Validation(
            "Year must be between 2000 and 2100".to_string(),
        ));
    }

    Ok((month, year))
}

/// Validates a statistics bucket size.
pub fn validate_interpolation(interpolate: &str) -> Result<()> {
    if !INTERPOLATIONS.contains(&interpolate) {
        return Err(AppError::Validation(
            "Interpolation must be one of day, week, month".to_string(),
        ));
    }

    Ok(())
}

/// Validates the comma-separated metric list of a statistics query.
pub fn validate_metrics(select: &str) -> Result<()> {
    let valid = select
        .split(',')
        .all(|metric| !metric.is_empty() && metric.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));

    if !valid {
        return Err(AppError::Validation(
            "Metrics must be a comma-separated list of names".to_string(),
        ));
    }

    Ok(())
}
