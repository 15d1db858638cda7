//! Schedule parsing and next occurrence calculation.
//!
//! Supports standard 5-field crontab expressions and the named shortcuts
//! (`@daily`, `@hourly`, ...). Field semantics follow crontab(5): day-of-week
//! `0` and `7` are both Sunday, and when day-of-month and day-of-week are both
//! restricted a time matches if either field matches.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;
use std::str::FromStr;
use thiserror::Error;

/// Number of upcoming runs computed for each job when nothing else is asked for.
pub const DEFAULT_NEXT_RUNS: usize = 3;

/// Errors that can occur when parsing or using schedules.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Invalid cron expression.
    #[error("invalid cron expression: {0}")]
    InvalidCron(String),

    /// Invalid timezone.
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    /// The expression is valid but has no fixed cadence (e.g. `@reboot`).
    #[error("schedule has no fixed cadence: {0}")]
    NonDeterministic(String),

    /// Fewer occurrences exist than were requested.
    #[error("no more occurrences")]
    NoMoreOccurrences,
}

impl ScheduleError {
    /// Whether this error deserves a diagnostic when seen on a real job.
    ///
    /// `@reboot` style schedules are legitimate, they just never have a
    /// next run.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, ScheduleError::NonDeterministic(_))
    }
}

/// A parsed crontab schedule.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// The original expression string.
    expression: String,
    /// The timezone occurrences are computed in.
    timezone: Tz,
    /// One cron schedule, or two when day-of-month and day-of-week are
    /// both restricted and must be OR-ed together.
    alternatives: Vec<CronSchedule>,
}

impl Schedule {
    /// Create a new schedule from a cron expression, evaluated in UTC.
    ///
    /// Supports:
    /// - Standard 5-field cron: `minute hour day month weekday`
    /// - Shortcuts: `@yearly`, `@annually`, `@monthly`, `@weekly`, `@daily`,
    ///   `@midnight`, `@hourly`
    ///
    /// `@reboot` is rejected with [`ScheduleError::NonDeterministic`].
    pub fn new(expression: impl Into<String>) -> Result<Self, ScheduleError> {
        Self::with_timezone(expression, "UTC")
    }

    /// Create a new schedule evaluated in a specific IANA timezone.
    pub fn with_timezone(
        expression: impl Into<String>,
        timezone: impl AsRef<str>,
    ) -> Result<Self, ScheduleError> {
        let expression = expression.into();
        let timezone = timezone.as_ref();

        let timezone: Tz = timezone
            .parse()
            .map_err(|_| ScheduleError::InvalidTimezone(timezone.to_string()))?;

        let alternatives = Self::parse_expression(&expression)?;

        Ok(Self {
            expression,
            timezone,
            alternatives,
        })
    }

    fn parse_expression(expression: &str) -> Result<Vec<CronSchedule>, ScheduleError> {
        let trimmed = expression.trim();

        if trimmed.starts_with('@') {
            return Self::parse_shortcut(trimmed);
        }

        Self::parse_cron(trimmed)
    }

    /// Parse a shortcut expression (@daily, @reboot, etc.).
    fn parse_shortcut(expression: &str) -> Result<Vec<CronSchedule>, ScheduleError> {
        match expression.to_lowercase().as_str() {
            "@yearly" | "@annually" => Self::parse_cron("0 0 1 1 *"),
            "@monthly" => Self::parse_cron("0 0 1 * *"),
            "@weekly" => Self::parse_cron("0 0 * * 0"),
            "@daily" | "@midnight" => Self::parse_cron("0 0 * * *"),
            "@hourly" => Self::parse_cron("0 * * * *"),
            "@reboot" => Err(ScheduleError::NonDeterministic(expression.to_string())),
            _ => Err(ScheduleError::InvalidCron(format!(
                "unknown shortcut: {}",
                expression
            ))),
        }
    }

    /// Parse a 5-field crontab expression.
    fn parse_cron(expression: &str) -> Result<Vec<CronSchedule>, ScheduleError> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        let [minute, hour, dom, month, dow] = fields[..] else {
            return Err(ScheduleError::InvalidCron(format!(
                "expected 5 fields, got {}",
                fields.len()
            )));
        };

        // crontab(5): if both day fields are restricted, either may match.
        let either_day = !dom.starts_with('*') && !dow.starts_with('*');
        let dow = normalize_weekdays(dow)?;

        let day_pairs = if either_day {
            vec![(dom, "*"), ("*", dow.as_str())]
        } else {
            vec![(dom, dow.as_str())]
        };

        day_pairs
            .into_iter()
            .map(|(dom, dow)| {
                // The cron crate wants a leading seconds field.
                let cron_expr = format!("0 {} {} {} {} {}", minute, hour, dom, month, dow);
                CronSchedule::from_str(&cron_expr)
                    .map_err(|e| ScheduleError::InvalidCron(format!("{}: {}", expression, e)))
            })
            .collect()
    }

    /// Get the next N occurrences strictly after the given time.
    ///
    /// Fails with [`ScheduleError::NoMoreOccurrences`] if the expression
    /// cannot produce `n` occurrences (e.g. February 30th).
    pub fn next_n_after(
        &self,
        after: DateTime<Utc>,
        n: usize,
    ) -> Result<Vec<DateTime<Utc>>, ScheduleError> {
        let local_time = after.with_timezone(&self.timezone);

        let mut occurrences: Vec<DateTime<Utc>> = self
            .alternatives
            .iter()
            .flat_map(|schedule| {
                schedule
                    .after(&local_time)
                    .take(n)
                    .map(|dt| dt.with_timezone(&Utc))
            })
            .collect();

        if self.alternatives.len() > 1 {
            occurrences.sort();
            occurrences.dedup();
            occurrences.truncate(n);
        }

        if occurrences.len() < n {
            return Err(ScheduleError::NoMoreOccurrences);
        }

        Ok(occurrences)
    }

    /// Get the next occurrence after the given time.
    pub fn next_after(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
        self.next_n_after(after, 1)?
            .into_iter()
            .next()
            .ok_or(ScheduleError::NoMoreOccurrences)
    }

    /// Get the original expression string.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Get the timezone name.
    pub fn timezone(&self) -> &str {
        self.timezone.name()
    }
}

/// Compute the next `count` fire times of `expression` after `start`, in UTC.
///
/// Never fails: invalid expressions, `@reboot`, and expressions that cannot
/// produce `count` occurrences all yield an empty list.
pub fn compute_next_runs(expression: &str, start: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
    compute_next_runs_in(expression, "UTC", start, count)
}

/// Like [`compute_next_runs`], evaluating the expression in `timezone`.
pub fn compute_next_runs_in(
    expression: &str,
    timezone: &str,
    start: DateTime<Utc>,
    count: usize,
) -> Vec<DateTime<Utc>> {
    Schedule::with_timezone(expression, timezone)
        .and_then(|schedule| schedule.next_n_after(start, count))
        .unwrap_or_default()
}

/// Rewrite a crontab(5) day-of-week field into the cron crate's numbering.
///
/// crontab counts Sunday as 0 (or 7) while the cron crate counts it as 1, so
/// the field is expanded into an explicit list of crate ordinals.
fn normalize_weekdays(field: &str) -> Result<String, ScheduleError> {
    if field == "*" {
        return Ok(field.to_string());
    }

    let invalid = || ScheduleError::InvalidCron(format!("invalid day-of-week field: {}", field));

    let mut days = [false; 7];
    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step.parse().map_err(|_| invalid())?;
                if step == 0 {
                    return Err(invalid());
                }
                (range, Some(step))
            }
            None => (part, None),
        };

        let (start, end) = if range == "*" {
            (0, 6)
        } else if let Some((lo, hi)) = range.split_once('-') {
            (weekday_value(lo).ok_or_else(invalid)?, weekday_value(hi).ok_or_else(invalid)?)
        } else {
            let value = weekday_value(range).ok_or_else(invalid)?;
            // "N/step" runs from N to the end of the week.
            (value, if step.is_some() { 7 } else { value })
        };

        if start > end {
            return Err(invalid());
        }

        for day in (start..=end).step_by(step.unwrap_or(1) as usize) {
            days[(day % 7) as usize] = true;
        }
    }

    let ordinals: Vec<String> = days
        .iter()
        .enumerate()
        .filter(|(_, set)| **set)
        .map(|(day, _)| (day + 1).to_string())
        .collect();

    if ordinals.is_empty() {
        return Err(invalid());
    }

    Ok(ordinals.join(","))
}

/// Parse a single day-of-week value: `0`-`7` or a three-letter name.
fn weekday_value(token: &str) -> Option<u32> {
    if let Ok(value) = token.parse::<u32>() {
        return (value <= 7).then_some(value);
    }

    const NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];
    let upper = token.to_ascii_uppercase();
    NAMES.iter().position(|name| *name == upper).map(|i| i as u32)
}
