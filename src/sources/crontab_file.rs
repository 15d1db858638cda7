//! The system crontab file (`/etc/crontab`).

use async_trait::async_trait;
use std::path::PathBuf;

use super::raw::load_crontab_file;
use super::{CronSource, LineOrigin, SourceContext, records_from_lines};
use crate::core::job::JobRecord;
use crate::core::parser::Dialect;

/// Source tag for system crontab records.
pub const ETC_CRONTAB_SOURCE: &str = "etc-crontab";

/// Reads one system-dialect crontab file.
#[derive(Debug, Clone)]
pub struct SystemCrontabSource {
    path: PathBuf,
}

impl SystemCrontabSource {
    /// Read the crontab at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CronSource for SystemCrontabSource {
    fn name(&self) -> &str {
        ETC_CRONTAB_SOURCE
    }

    async fn read(&self, ctx: &SourceContext) -> Vec<JobRecord> {
        let Some(file) = load_crontab_file(&self.path) else {
            return Vec::new();
        };

        let description = format!("Source: {}", self.path.display());
        let origin = LineOrigin {
            source: ETC_CRONTAB_SOURCE,
            dialect: Dialect::System,
            account: "",
            description: &description,
        };

        records_from_lines(ctx, file.numbered_lines(), &origin)
    }
}
