//! Fixed illustrative records.
//!
//! These are not discovered from the host. They keep the response shape
//! visible on machines where nothing else is readable.

use async_trait::async_trait;

use super::{CronSource, SourceContext};
use crate::core::job::JobRecord;

/// Source tag for the illustrative records.
pub const EXAMPLE_SOURCE: &str = "example";

/// Emits a small fixed set of example jobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExampleSource;

#[async_trait]
impl CronSource for ExampleSource {
    fn name(&self) -> &str {
        EXAMPLE_SOURCE
    }

    async fn read(&self, ctx: &SourceContext) -> Vec<JobRecord> {
        vec![
            ctx.record("example:system-update", EXAMPLE_SOURCE)
                .user("root")
                .schedule("0 3 * * *")
                .command("/usr/bin/apt-get update -q")
                .description("Example: nightly package index refresh (not read from this host).")
                .build(),
            ctx.record("example:home-backup", EXAMPLE_SOURCE)
                .user("backup")
                .schedule("30 2 * * 1-5")
                .command("/usr/local/bin/backup-home.sh")
                .description("Example: weekday home directory backup (not read from this host).")
                .build(),
        ]
    }
}
