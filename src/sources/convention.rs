//! Directory-convention jobs (`/etc/cron.hourly`, `/etc/cron.daily`, ...).

use async_trait::async_trait;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use super::infer::{InferredSchedule, ScheduleInference, ScheduleOrigin};
use super::{CronSource, SourceContext};
use crate::config::ConventionDirConfig;
use crate::core::dispatch::DISPATCHER;
use crate::core::job::JobRecord;

/// One record per executable entry of each configured directory.
#[derive(Debug, Clone)]
pub struct ConventionSource {
    dirs: Vec<ConventionDirConfig>,
    crontab: PathBuf,
    cron_d: PathBuf,
}

impl ConventionSource {
    /// Read `dirs`, inferring schedules from `crontab` and `cron_d`.
    pub fn new(
        dirs: Vec<ConventionDirConfig>,
        crontab: impl Into<PathBuf>,
        cron_d: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dirs,
            crontab: crontab.into(),
            cron_d: cron_d.into(),
        }
    }
}

#[async_trait]
impl CronSource for ConventionSource {
    fn name(&self) -> &str {
        "convention"
    }

    async fn read(&self, ctx: &SourceContext) -> Vec<JobRecord> {
        let listed: Vec<(&ConventionDirConfig, Vec<PathBuf>)> = self
            .dirs
            .iter()
            .map(|dir| (dir, executable_entries(&dir.path)))
            .filter(|(_, entries)| !entries.is_empty())
            .collect();

        if listed.is_empty() {
            return Vec::new();
        }

        let inference = ScheduleInference::load(&self.crontab, &self.cron_d);
        let mut records = Vec::new();

        for (dir, entries) in listed {
            let label = dir.label();
            let inferred = inference.infer(&dir.path, &dir.fallback);
            let description = describe(&dir.path, &inferred);

            for entry in entries {
                let name = entry
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();

                records.push(
                    ctx.record(format!("{label}:{name}"), label.as_str())
                        .user("root")
                        .schedule(inferred.schedule.as_str())
                        .command(entry.to_string_lossy())
                        .description(description.as_str())
                        .build(),
                );
            }
        }

        records
    }
}

fn describe(dir: &Path, inferred: &InferredSchedule) -> String {
    match &inferred.origin {
        ScheduleOrigin::Dispatcher { .. } => format!(
            "Run by {} {}; schedule from {}",
            DISPATCHER,
            dir.display(),
            inferred.provenance()
        ),
        ScheduleOrigin::Default => format!(
            "Run by {} {}; no dispatcher line found, schedule assumed ({})",
            DISPATCHER,
            dir.display(),
            inferred.provenance()
        ),
    }
}

/// Regular files directly inside `dir` with any execute bit set, by name.
fn executable_entries(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "Failed to list cron directory");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_executable_file(path))
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files
}

fn is_executable_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
