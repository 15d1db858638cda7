//! Per-account crontabs, read through `crontab -l`.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::{CronSource, LineOrigin, SourceContext, numbered, records_from_lines};
use crate::core::job::JobRecord;
use crate::core::parser::Dialect;
use crate::execution::{Invocation, ProcessOutcome, ProcessRunner};

/// Prefix of account source tags; the full tag is `user-crontab:<account>`.
pub const USER_CRONTAB_SOURCE: &str = "user-crontab";

/// Account read by the privileged source.
const ROOT: &str = "root";

/// A shared "already warned" flag.
///
/// Clones share the flag. Hand the same latch to several aggregators to warn
/// once across all of them, or a fresh one to each to keep them independent.
#[derive(Debug, Clone, Default)]
pub struct WarnOnce(Arc<AtomicBool>);

impl WarnOnce {
    /// A latch that has not fired yet.
    pub fn fresh() -> Self {
        Self::default()
    }

    /// Returns `true` exactly once, on the first call across all clones.
    pub fn first(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    /// Whether the latch has fired.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Re-arm the latch.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// What a crontab query amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    /// The crontab text.
    Lines(String),
    /// Nothing to report: no crontab installed, or no `crontab` program.
    Empty,
    /// Anything else, with a message for the log.
    Failed(String),
}

/// Classify the outcome of a `crontab -l` style query.
pub fn classify_query(outcome: ProcessOutcome) -> QueryResult {
    match outcome {
        ProcessOutcome::Completed { stderr, .. } if stderr.contains("no crontab for") => {
            QueryResult::Empty
        }
        ProcessOutcome::Completed { code: Some(127), .. } => QueryResult::Empty,
        ProcessOutcome::Completed { stderr, .. } if stderr.contains("command not found") => {
            QueryResult::Empty
        }
        ProcessOutcome::Completed {
            code: Some(0),
            stdout,
            ..
        } => QueryResult::Lines(stdout),
        ProcessOutcome::Completed {
            code: Some(code),
            stderr,
            ..
        } => QueryResult::Failed(format!("exit status {}: {}", code, stderr.trim())),
        ProcessOutcome::Completed { code: None, .. } => {
            QueryResult::Failed("terminated by signal".to_string())
        }
        ProcessOutcome::NotFound => QueryResult::Empty,
        ProcessOutcome::TimedOut(limit) => {
            QueryResult::Failed(format!("timed out after {}s", limit.as_secs_f64()))
        }
        ProcessOutcome::Failed(message) => QueryResult::Failed(message),
    }
}

/// Run a query and classify it.
async fn query(runner: &dyn ProcessRunner, invocation: &Invocation) -> QueryResult {
    classify_query(runner.run(invocation).await)
}

fn account_records(ctx: &SourceContext, account: &str, output: &str, query: &Invocation) -> Vec<JobRecord> {
    let source = format!("{}:{}", USER_CRONTAB_SOURCE, account);
    let description = format!("Source: {}", query);
    let lines: Vec<&str> = output.lines().collect();
    let origin = LineOrigin {
        source: &source,
        dialect: Dialect::User,
        account,
        description: &description,
    };

    records_from_lines(ctx, numbered(&lines), &origin)
}

/// The crontab of the account the process runs as.
pub struct CurrentUserCrontabSource {
    runner: Arc<dyn ProcessRunner>,
    account: String,
    invocation: Invocation,
}

impl CurrentUserCrontabSource {
    /// Query `crontab -l` and attribute the lines to `account`.
    pub fn new(runner: Arc<dyn ProcessRunner>, account: impl Into<String>, timeout: Duration) -> Self {
        Self {
            runner,
            account: account.into(),
            invocation: Invocation::builder("crontab").arg("-l").timeout(timeout).build(),
        }
    }
}

#[async_trait]
impl CronSource for CurrentUserCrontabSource {
    fn name(&self) -> &str {
        USER_CRONTAB_SOURCE
    }

    async fn read(&self, ctx: &SourceContext) -> Vec<JobRecord> {
        match query(self.runner.as_ref(), &self.invocation).await {
            QueryResult::Lines(output) => account_records(ctx, &self.account, &output, &self.invocation),
            QueryResult::Empty => Vec::new(),
            QueryResult::Failed(reason) => {
                tracing::warn!(
                    account = %self.account,
                    command = %self.invocation,
                    reason = %reason,
                    "Failed to read user crontab"
                );
                Vec::new()
            }
        }
    }
}

/// Root's crontab through a sudo that never prompts.
///
/// Failures are reported once per latch; later ones go to `debug`.
pub struct RootCrontabSource {
    runner: Arc<dyn ProcessRunner>,
    invocation: Invocation,
    latch: WarnOnce,
}

impl RootCrontabSource {
    /// Query `sudo -n crontab -l -u root`; failures trip `latch`.
    pub fn new(runner: Arc<dyn ProcessRunner>, timeout: Duration, latch: WarnOnce) -> Self {
        Self {
            runner,
            invocation: Invocation::builder("sudo")
                .args(["-n", "crontab", "-l", "-u", ROOT])
                .timeout(timeout)
                .build(),
            latch,
        }
    }
}

#[async_trait]
impl CronSource for RootCrontabSource {
    fn name(&self) -> &str {
        "user-crontab:root"
    }

    async fn read(&self, ctx: &SourceContext) -> Vec<JobRecord> {
        match query(self.runner.as_ref(), &self.invocation).await {
            QueryResult::Lines(output) => account_records(ctx, ROOT, &output, &self.invocation),
            QueryResult::Empty => Vec::new(),
            QueryResult::Failed(reason) => {
                if self.latch.first() {
                    tracing::warn!(
                        command = %self.invocation,
                        reason = %reason,
                        "Failed to read root crontab; further failures are not reported"
                    );
                } else {
                    tracing::debug!(reason = %reason, "Root crontab still unavailable");
                }
                Vec::new()
            }
        }
    }
}
