//! The normalized job record.
//!
//! Every source, whatever its on-disk format, produces [`JobRecord`]s. Records
//! are built fresh for every aggregation and never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Host marker for jobs discovered on this machine.
pub const LOCAL_SYSTEM: &str = "localhost";

/// One scheduled job as seen by the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique within one aggregation; derived from source and position.
    pub id: String,
    /// Host the job runs on.
    pub system: String,
    /// Account the job runs as. May be empty.
    pub user: String,
    /// 5-field cron expression or `@` shortcut.
    pub schedule: String,
    /// Raw command line.
    pub command: String,
    /// Upcoming fire times, ascending. Empty for `@reboot` or invalid schedules.
    pub next_runs: Vec<DateTime<Utc>>,
    /// Machine-readable provenance tag.
    pub source: String,
    /// Human-readable provenance note.
    pub description: Option<String>,
}

impl JobRecord {
    /// The tuple records are ordered by.
    pub fn sort_key(&self) -> (&str, &str, &str, &str, &str, &str) {
        (
            &self.system,
            &self.source,
            &self.user,
            &self.schedule,
            &self.command,
            &self.id,
        )
    }
}
