//! Cron job sources.
//!
//! Each source turns one origin (a file, a directory, a `crontab -l` query)
//! into [`JobRecord`]s. Sources are failure boundaries: a missing file is
//! simply "no jobs", anything unexpected is logged and also becomes "no jobs".
//! Nothing here returns an error.

mod account;
mod convention;
mod crontab_file;
mod dropin;
mod examples;
mod infer;
pub mod raw;

pub use account::{
    CurrentUserCrontabSource, QueryResult, RootCrontabSource, WarnOnce, classify_query,
};
pub use convention::ConventionSource;
pub use crontab_file::SystemCrontabSource;
pub use dropin::DropInSource;
pub use examples::ExampleSource;
pub use infer::{DEFAULT_ORIGIN, InferredSchedule, ScheduleInference, ScheduleOrigin, infer_schedule};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::Settings;
use crate::core::job::{JobRecord, LOCAL_SYSTEM};
use crate::core::parser::{Dialect, LineOutcome};
use crate::core::schedule::{DEFAULT_NEXT_RUNS, Schedule};

/// A provider of job records.
#[async_trait]
pub trait CronSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Read all records this source currently describes. Never fails.
    async fn read(&self, ctx: &SourceContext) -> Vec<JobRecord>;
}

/// Per-aggregation values every source needs to build records.
#[derive(Debug, Clone)]
pub struct SourceContext {
    now: DateTime<Utc>,
    system: String,
    next_runs: usize,
    timezone: String,
}

impl SourceContext {
    /// A context with default settings anchored at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            system: LOCAL_SYSTEM.to_string(),
            next_runs: DEFAULT_NEXT_RUNS,
            timezone: "UTC".to_string(),
        }
    }

    /// A context built from settings, anchored at `now`.
    pub fn from_settings(settings: &Settings, now: DateTime<Utc>) -> Self {
        Self {
            now,
            system: settings.system.clone(),
            next_runs: settings.next_runs,
            timezone: settings.timezone.clone(),
        }
    }

    /// The instant upcoming runs are computed from.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// The host marker.
    pub fn system(&self) -> &str {
        &self.system
    }

    /// Start building a record with the given id and source tag.
    pub fn record(&self, id: impl Into<String>, source: impl Into<String>) -> RecordBuilder<'_> {
        RecordBuilder {
            ctx: self,
            id: id.into(),
            source: source.into(),
            user: String::new(),
            schedule: String::new(),
            command: String::new(),
            description: None,
        }
    }

    /// Upcoming runs for `schedule`, logging unusable expressions.
    fn next_runs(&self, id: &str, schedule: &str) -> Vec<DateTime<Utc>> {
        let result = Schedule::with_timezone(schedule, &self.timezone)
            .and_then(|parsed| parsed.next_n_after(self.now, self.next_runs));

        match result {
            Ok(runs) => runs,
            Err(e) => {
                if e.is_reportable() {
                    tracing::warn!(job_id = %id, schedule = %schedule, error = %e, "Cannot compute next runs");
                }
                Vec::new()
            }
        }
    }
}

/// Builder for [`JobRecord`]s; computes `next_runs` on build.
#[derive(Debug)]
pub struct RecordBuilder<'a> {
    ctx: &'a SourceContext,
    id: String,
    source: String,
    user: String,
    schedule: String,
    command: String,
    description: Option<String>,
}

impl RecordBuilder<'_> {
    /// Set the account.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the schedule expression.
    pub fn schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = schedule.into();
        self
    }

    /// Set the command line.
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Set the provenance note.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Build the record.
    pub fn build(self) -> JobRecord {
        let next_runs = self.ctx.next_runs(&self.id, &self.schedule);
        JobRecord {
            id: self.id,
            system: self.ctx.system.clone(),
            user: self.user,
            schedule: self.schedule,
            command: self.command,
            next_runs,
            source: self.source,
            description: self.description,
        }
    }
}

/// How records parsed from a block of crontab lines are labelled.
struct LineOrigin<'a> {
    /// Source tag; also the id prefix.
    source: &'a str,
    dialect: Dialect,
    /// Owner for user-dialect lines.
    account: &'a str,
    description: &'a str,
}

/// Turn numbered crontab lines into records, reporting malformed ones.
fn records_from_lines<'a>(
    ctx: &SourceContext,
    lines: impl IntoIterator<Item = (usize, &'a str)>,
    origin: &LineOrigin<'_>,
) -> Vec<JobRecord> {
    let mut records = Vec::new();

    for (line_no, line) in lines {
        let parsed = match origin.dialect.classify(line) {
            LineOutcome::Parsed(parsed) => parsed,
            LineOutcome::Ignorable => continue,
            LineOutcome::Malformed => {
                tracing::warn!(
                    source = %origin.source,
                    line = line_no,
                    text = %line.trim(),
                    "Skipping malformed crontab line"
                );
                continue;
            }
        };

        let user = match origin.dialect {
            Dialect::System => parsed.user,
            Dialect::User => origin.account.to_string(),
        };

        records.push(
            ctx.record(format!("{}:{}", origin.source, line_no), origin.source)
                .user(user)
                .schedule(parsed.schedule)
                .command(parsed.command)
                .description(origin.description)
                .build(),
        );
    }

    records
}

/// Number lines starting at 1.
fn numbered<S: AsRef<str>>(lines: &[S]) -> impl Iterator<Item = (usize, &str)> {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| (i + 1, line.as_ref()))
}
