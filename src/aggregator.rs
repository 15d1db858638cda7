//! The merged, filtered and sorted job inventory.
//!
//! [`Aggregator::get_jobs`] reads every source in a fixed order, drops
//! `run-parts` lines already covered by per-entry records, and sorts the
//! result so repeated calls against an unchanged host are identical.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::{ConventionDirConfig, ROOT_ACCOUNT, Settings};
use crate::core::dispatch::dispatches_directory;
use crate::core::job::JobRecord;
use crate::execution::{ProcessRunner, SystemRunner};
use crate::sources::{
    ConventionSource, CronSource, CurrentUserCrontabSource, DropInSource, ExampleSource,
    RootCrontabSource, SourceContext, SystemCrontabSource, WarnOnce,
};

/// Account name used when neither settings nor environment name one.
pub const UNKNOWN_ACCOUNT: &str = "unknown";

/// Collects jobs from every configured source.
pub struct Aggregator {
    settings: Settings,
    runner: Arc<dyn ProcessRunner>,
    warn_latch: WarnOnce,
}

impl Aggregator {
    /// Create an aggregator with an explicit process runner and warning latch.
    pub fn new(settings: Settings, runner: Arc<dyn ProcessRunner>, warn_latch: WarnOnce) -> Self {
        Self {
            settings,
            runner,
            warn_latch,
        }
    }

    /// Create an aggregator that runs real commands and owns a fresh latch.
    pub fn from_settings(settings: Settings) -> Self {
        Self::new(settings, Arc::new(SystemRunner), WarnOnce::fresh())
    }

    /// The settings this aggregator reads with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The latch guarding the root crontab warning.
    pub fn warn_latch(&self) -> &WarnOnce {
        &self.warn_latch
    }

    /// Sources in invocation order.
    fn sources(&self) -> Vec<Box<dyn CronSource>> {
        let settings = &self.settings;
        let timeout = settings.query_timeout();
        let account = settings
            .resolved_user()
            .unwrap_or_else(|| UNKNOWN_ACCOUNT.to_string());
        // Running as root, `crontab -l` already is root's crontab.
        let read_root = settings.include_root_crontab && account != ROOT_ACCOUNT;

        let mut sources: Vec<Box<dyn CronSource>> = vec![
            Box::new(ExampleSource),
            Box::new(CurrentUserCrontabSource::new(
                self.runner.clone(),
                account,
                timeout,
            )),
        ];

        if read_root {
            sources.push(Box::new(RootCrontabSource::new(
                self.runner.clone(),
                timeout,
                self.warn_latch.clone(),
            )));
        }

        sources.push(Box::new(ConventionSource::new(
            settings.paths.convention_dirs.clone(),
            &settings.paths.crontab,
            &settings.paths.cron_d,
        )));
        sources.push(Box::new(SystemCrontabSource::new(&settings.paths.crontab)));
        sources.push(Box::new(DropInSource::new(&settings.paths.cron_d)));

        sources
    }

    /// All jobs, upcoming runs computed from the current time.
    pub async fn get_jobs(&self) -> Vec<JobRecord> {
        self.get_jobs_at(Utc::now()).await
    }

    /// All jobs, upcoming runs computed from `now`.
    pub async fn get_jobs_at(&self, now: DateTime<Utc>) -> Vec<JobRecord> {
        let ctx = SourceContext::from_settings(&self.settings, now);
        let mut records = Vec::new();

        for source in self.sources() {
            let found = source.read(&ctx).await;
            tracing::debug!(source = %source.name(), count = found.len(), "Read cron source");
            records.extend(found);
        }

        if !self.settings.include_runparts_entries {
            let before = records.len();
            records = suppress_dispatcher_entries(records, &self.settings.paths.convention_dirs);
            tracing::debug!(suppressed = before - records.len(), "Dropped dispatcher lines");
        }

        sort_records(&mut records);
        records
    }

    /// A single job by id.
    pub async fn get_job(&self, id: &str) -> Option<JobRecord> {
        self.get_jobs().await.into_iter().find(|job| job.id == id)
    }
}

/// Drop records whose command runs one of `convention_dirs` through `run-parts`.
pub fn suppress_dispatcher_entries(
    records: Vec<JobRecord>,
    convention_dirs: &[ConventionDirConfig],
) -> Vec<JobRecord> {
    let dirs: Vec<String> = convention_dirs
        .iter()
        .map(|dir| dir.path.to_string_lossy().into_owned())
        .collect();

    records
        .into_iter()
        .filter(|record| !dirs.iter().any(|dir| dispatches_directory(&record.command, dir)))
        .collect()
}

/// Sort by system, source, user, schedule, command, then id.
pub fn sort_records(records: &mut [JobRecord]) {
    records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}
