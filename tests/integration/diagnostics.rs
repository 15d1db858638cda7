//! Diagnostics integration tests.
//!
//! Benign absences stay silent; malformed input and unexpected failures are
//! logged once each; the root crontab warning fires once per latch.

use cronfleet::execution::ProcessOutcome;
use cronfleet::testing::ScriptedRunner;
use cronfleet::{Aggregator, Settings, WarnOnce};
use std::sync::Arc;

use crate::common::{HostFixture, LogCapture, fixed_now};

fn no_crontab() -> ScriptedRunner {
    ScriptedRunner::new().on(
        "crontab -l",
        ProcessOutcome::completed(1, "", "no crontab for alice\n"),
    )
}

/// Test: A host with nothing to report logs no warnings.
#[tokio::test]
async fn test_benign_absence_is_silent() {
    let logs = LogCapture::new();
    let _guard = logs.install();

    let host = HostFixture::new();
    let aggregator = Aggregator::new(host.settings(), Arc::new(no_crontab()), WarnOnce::fresh());
    aggregator.get_jobs_at(fixed_now()).await;

    assert_eq!(logs.lines_at("WARN"), Vec::<String>::new());
}

/// Test: A missing `crontab` program is as silent as an empty crontab.
#[tokio::test]
async fn test_missing_crontab_program_is_silent() {
    let logs = LogCapture::new();
    let _guard = logs.install();

    let host = HostFixture::new();
    let aggregator = Aggregator::new(
        host.settings(),
        Arc::new(ScriptedRunner::new()),
        WarnOnce::fresh(),
    );
    aggregator.get_jobs_at(fixed_now()).await;

    assert!(logs.lines_at("WARN").is_empty());
}

/// Test: A malformed line is reported with its source and line number.
#[tokio::test]
async fn test_malformed_line_is_reported() {
    let logs = LogCapture::new();
    let _guard = logs.install();

    let host = HostFixture::new();
    host.write_drop_in(
        "monitoring",
        "# checks\n*/5 * * * * nagios /usr/lib/nagios/check_disk\nnot a cron line\n",
    );
    let aggregator = Aggregator::new(host.settings(), Arc::new(no_crontab()), WarnOnce::fresh());
    aggregator.get_jobs_at(fixed_now()).await;

    let warnings = logs.lines_at("WARN");
    assert_eq!(warnings.len(), 1, "warnings: {:?}", warnings);
    assert!(warnings[0].contains("Skipping malformed crontab line"));
    assert!(warnings[0].contains("cron.d:monitoring"));
    assert!(warnings[0].contains("line=3"));
    assert!(warnings[0].contains("not a cron line"));
}

/// Test: Invalid schedules warn, `@reboot` does not.
#[tokio::test]
async fn test_invalid_schedule_warns_but_reboot_does_not() {
    let logs = LogCapture::new();
    let _guard = logs.install();

    let host = HostFixture::new();
    host.write_crontab("@reboot root /usr/local/bin/warm\n99 99 99 99 99 root /bin/true\n");
    let aggregator = Aggregator::new(host.settings(), Arc::new(no_crontab()), WarnOnce::fresh());
    let jobs = aggregator.get_jobs_at(fixed_now()).await;

    // Both records are kept.
    assert_eq!(jobs.iter().filter(|j| j.source == "etc-crontab").count(), 2);

    let warnings = logs.lines_at("WARN");
    assert_eq!(warnings.len(), 1, "warnings: {:?}", warnings);
    assert!(warnings[0].contains("Cannot compute next runs"));
    assert!(warnings[0].contains("etc-crontab:2"));
}

/// Test: A failing user crontab query is reported.
#[tokio::test]
async fn test_failed_user_query_is_reported() {
    let logs = LogCapture::new();
    let _guard = logs.install();

    let host = HostFixture::new();
    let runner = ScriptedRunner::new().on(
        "crontab -l",
        ProcessOutcome::completed(1, "", "crontab: cannot open spool\n"),
    );
    let aggregator = Aggregator::new(host.settings(), Arc::new(runner), WarnOnce::fresh());
    aggregator.get_jobs_at(fixed_now()).await;

    let warnings = logs.lines_at("WARN");
    assert_eq!(warnings.len(), 1, "warnings: {:?}", warnings);
    assert!(warnings[0].contains("Failed to read user crontab"));
}

/// Test: Root crontab failures warn once, then only at debug level.
#[tokio::test]
async fn test_root_failure_warns_once() {
    let logs = LogCapture::new();
    let _guard = logs.install();

    let host = HostFixture::new();
    let settings = Settings {
        include_root_crontab: true,
        ..host.settings()
    };
    let runner = Arc::new(no_crontab().on(
        "sudo -n crontab -l -u root",
        ProcessOutcome::completed(1, "", "sudo: a password is required\n"),
    ));
    let aggregator = Aggregator::new(settings, runner, WarnOnce::fresh());

    for _ in 0..3 {
        aggregator.get_jobs_at(fixed_now()).await;
    }

    let warnings = logs.lines_at("WARN");
    assert_eq!(warnings.len(), 1, "warnings: {:?}", warnings);
    assert!(warnings[0].contains("Failed to read root crontab"));

    let repeats = logs
        .lines_at("DEBUG")
        .into_iter()
        .filter(|line| line.contains("Root crontab still unavailable"))
        .count();
    assert_eq!(repeats, 2);
}
