//! The drop-in directory (`/etc/cron.d`).

use async_trait::async_trait;
use std::path::PathBuf;

use super::raw::load_cron_d;
use super::{CronSource, LineOrigin, SourceContext, records_from_lines};
use crate::core::job::JobRecord;
use crate::core::parser::Dialect;

/// Prefix of drop-in source tags; the full tag is `cron.d:<file>`.
pub const CRON_D_SOURCE: &str = "cron.d";

/// Reads every file of a drop-in directory in the system dialect.
#[derive(Debug, Clone)]
pub struct DropInSource {
    dir: PathBuf,
}

impl DropInSource {
    /// Read the drop-in directory at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl CronSource for DropInSource {
    fn name(&self) -> &str {
        CRON_D_SOURCE
    }

    async fn read(&self, ctx: &SourceContext) -> Vec<JobRecord> {
        let mut records = Vec::new();

        for file in load_cron_d(&self.dir) {
            let source = format!("{}:{}", CRON_D_SOURCE, file.file_name());
            let description = format!("Source: {}", file.path.display());
            let origin = LineOrigin {
                source: &source,
                dialect: Dialect::System,
                account: "",
                description: &description,
            };

            records.extend(records_from_lines(ctx, file.numbered_lines(), &origin));
        }

        records
    }
}
