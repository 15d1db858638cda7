//! Aggregation integration tests.
//!
//! Each test lays out a small cron tree in a temporary directory and runs a
//! full aggregation over it with scripted crontab queries.

use cronfleet::execution::ProcessOutcome;
use cronfleet::testing::ScriptedRunner;
use cronfleet::{Aggregator, JobRecord, Settings, WarnOnce};
use std::sync::Arc;

use crate::common::{HostFixture, fixed_now};

fn aggregator(settings: Settings, runner: ScriptedRunner) -> Aggregator {
    Aggregator::new(settings, Arc::new(runner), WarnOnce::fresh())
}

fn no_crontab() -> ScriptedRunner {
    ScriptedRunner::new().on(
        "crontab -l",
        ProcessOutcome::completed(1, "", "no crontab for alice\n"),
    )
}

fn from_source<'a>(jobs: &'a [JobRecord], source: &str) -> Vec<&'a JobRecord> {
    jobs.iter().filter(|j| j.source == source).collect()
}

/// Test: A malformed drop-in line is skipped and the rest of the file is read.
#[tokio::test]
async fn test_malformed_drop_in_line_does_not_abort() {
    let host = HostFixture::new();
    host.write_drop_in(
        "monitoring",
        "*/5 * * * * nagios /usr/lib/nagios/check_disk\n\
         not a cron line\n",
    );

    let jobs = aggregator(host.settings(), no_crontab())
        .get_jobs_at(fixed_now())
        .await;

    let monitoring = from_source(&jobs, "cron.d:monitoring");
    assert_eq!(monitoring.len(), 1);
    assert_eq!(monitoring[0].id, "cron.d:monitoring:1");
    assert_eq!(monitoring[0].user, "nagios");
    // The examples are still there; aggregation finished.
    assert_eq!(from_source(&jobs, "example").len(), 2);
}

/// Test: Dispatcher line is replaced by per-entry records with its schedule.
#[tokio::test]
async fn test_dispatcher_replaced_by_entries() {
    let host = HostFixture::new();
    let dropin = host.write_drop_in(
        "0hourly",
        &format!(
            "SHELL=/bin/bash\nMAILTO=root\n01 * * * * root run-parts {}\n",
            host.hourly().display()
        ),
    );
    host.add_script(&host.hourly(), "0anacron");
    host.add_script(&host.hourly(), "mlocate");

    let jobs = aggregator(host.settings(), no_crontab())
        .get_jobs_at(fixed_now())
        .await;

    assert!(from_source(&jobs, "cron.d:0hourly").is_empty());

    let entries = from_source(&jobs, "cron.hourly");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, "cron.hourly:0anacron");
    assert_eq!(entries[1].id, "cron.hourly:mlocate");

    let provenance = format!("{}:3", dropin.display());
    for entry in entries {
        assert_eq!(entry.schedule, "01 * * * *");
        assert_eq!(entry.user, "root");
        assert!(
            entry.description.as_deref().unwrap().contains(&provenance),
            "description should name {}: {:?}",
            provenance,
            entry.description
        );
        assert_eq!(entry.next_runs.len(), 3);
        assert_eq!(entry.next_runs[0].to_rfc3339(), "2024-01-15T12:01:00+00:00");
    }
}

/// Test: The include toggle restores the dispatcher record.
#[tokio::test]
async fn test_include_toggle_restores_dispatcher_record() {
    let host = HostFixture::new();
    host.write_crontab(&format!(
        "25 6 * * * root test -x /usr/sbin/anacron || ( cd / && run-parts --report {} )\n",
        host.daily().display()
    ));
    host.add_script(&host.daily(), "logrotate");

    let default_jobs = aggregator(host.settings(), no_crontab())
        .get_jobs_at(fixed_now())
        .await;
    assert!(from_source(&default_jobs, "etc-crontab").is_empty());

    let settings = host
        .settings()
        .with_overrides(|name| (name == "CRONFLEET_INCLUDE_RUNPARTS").then(|| "true".to_string()))
        .unwrap();
    let jobs = aggregator(settings, no_crontab())
        .get_jobs_at(fixed_now())
        .await;

    let restored = from_source(&jobs, "etc-crontab");
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].id, "etc-crontab:1");
    assert_eq!(restored[0].schedule, "25 6 * * *");
    // The per-entry record is still present alongside it.
    let entries = from_source(&jobs, "cron.daily");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].schedule, "25 6 * * *");
}

/// Test: Entries without any dispatcher line get the directory's fallback.
#[tokio::test]
async fn test_entries_without_dispatcher_use_fallback() {
    let host = HostFixture::new();
    host.add_script(&host.hourly(), "sync-clock");

    let jobs = aggregator(host.settings(), no_crontab())
        .get_jobs_at(fixed_now())
        .await;

    let entries = from_source(&jobs, "cron.hourly");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].schedule, "0 * * * *");
    assert!(entries[0].description.as_deref().unwrap().contains("default"));
}

/// Test: Two aggregations of an unchanged tree serialize identically.
#[tokio::test]
async fn test_repeated_aggregation_is_identical() {
    let host = HostFixture::new();
    host.write_crontab("0 4 * * * root /usr/local/bin/db-vacuum\n@reboot root /usr/local/bin/warm\n");
    host.write_drop_in("b-file", "0 1 * * * root /b\n0 1 * * * root /a\n");
    host.write_drop_in("a-file", "0 1 * * * www-data /srv/app/cleanup\n");
    host.add_script(&host.daily(), "zz-report");
    host.add_script(&host.daily(), "aa-report");

    let runner = || {
        ScriptedRunner::new().on(
            "crontab -l",
            ProcessOutcome::completed(0, "*/15 * * * * /home/alice/bin/poll\n", ""),
        )
    };

    let first = aggregator(host.settings(), runner()).get_jobs_at(fixed_now()).await;
    let second = aggregator(host.settings(), runner()).get_jobs_at(fixed_now()).await;

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );

    let keys: Vec<_> = first.iter().map(|j| j.sort_key()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    let ids: std::collections::HashSet<&str> = first.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids.len(), first.len(), "ids must be unique");
}

/// Test: A missing crontab is silent and contributes nothing.
#[tokio::test]
async fn test_no_crontab_contributes_nothing() {
    let host = HostFixture::new();
    let runner = Arc::new(no_crontab());
    let aggregator = Aggregator::new(host.settings(), runner.clone(), WarnOnce::fresh());

    let jobs = aggregator.get_jobs_at(fixed_now()).await;

    assert!(jobs.iter().all(|j| !j.source.starts_with("user-crontab")));
    assert_eq!(runner.calls(), vec!["crontab -l".to_string()]);
}

/// Test: The current account's crontab lines are attributed to that account.
#[tokio::test]
async fn test_current_user_crontab_is_included() {
    let host = HostFixture::new();
    let runner = ScriptedRunner::new().on(
        "crontab -l",
        ProcessOutcome::completed(
            0,
            "# edit with crontab -e\nPATH=/usr/bin:/bin\n30 2 * * 1-5 /home/alice/backup.sh\n",
            "",
        ),
    );

    let jobs = aggregator(host.settings(), runner).get_jobs_at(fixed_now()).await;

    let mine = from_source(&jobs, "user-crontab:alice");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, "user-crontab:alice:3");
    assert_eq!(mine[0].user, "alice");
    assert_eq!(mine[0].next_runs[0].to_rfc3339(), "2024-01-16T02:30:00+00:00");
}

/// Test: Root crontab failures warn once across aggregations sharing a latch.
#[tokio::test]
async fn test_root_failures_share_latch() {
    let host = HostFixture::new();
    let settings = Settings {
        include_root_crontab: true,
        ..host.settings()
    };
    let latch = WarnOnce::fresh();
    let runner = Arc::new(no_crontab().on(
        "sudo -n crontab -l -u root",
        ProcessOutcome::completed(1, "", "sudo: a password is required\n"),
    ));

    let first = Aggregator::new(settings.clone(), runner.clone(), latch.clone());
    let second = Aggregator::new(settings, runner.clone(), latch.clone());

    first.get_jobs_at(fixed_now()).await;
    assert!(latch.is_set());
    second.get_jobs_at(fixed_now()).await;

    assert_eq!(runner.call_count(), 4);
    latch.reset();
    assert!(!latch.is_set());
}
