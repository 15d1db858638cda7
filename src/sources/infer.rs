//! Schedule inference for directory-convention jobs.
//!
//! Scripts in `/etc/cron.hourly` and friends carry no schedule. The schedule
//! belongs to whichever `run-parts` line runs the directory, so it is looked
//! up in the raw lines of `/etc/cron.d/*` first and `/etc/crontab` second.

use std::fmt;
use std::path::{Path, PathBuf};

use super::raw::{RawCronFile, load_cron_d, load_crontab_file};
use crate::config::HOURLY_FALLBACK;
use crate::core::dispatch::dispatches_directory;
use crate::core::parser::parse_system_line;

/// Provenance label used when no dispatcher line was found.
pub const DEFAULT_ORIGIN: &str = "default";

/// Where an inferred schedule came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOrigin {
    /// A dispatcher line at `path:line`.
    Dispatcher { path: PathBuf, line: usize },
    /// Nothing matched; the fallback was used.
    Default,
}

impl ScheduleOrigin {
    /// Whether the schedule was found rather than assumed.
    pub fn is_dispatcher(&self) -> bool {
        matches!(self, ScheduleOrigin::Dispatcher { .. })
    }
}

impl fmt::Display for ScheduleOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleOrigin::Dispatcher { path, line } => write!(f, "{}:{}", path.display(), line),
            ScheduleOrigin::Default => f.write_str(DEFAULT_ORIGIN),
        }
    }
}

/// A schedule together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredSchedule {
    pub schedule: String,
    pub origin: ScheduleOrigin,
}

impl InferredSchedule {
    /// `path:line` of the matching dispatcher line, or `default`.
    pub fn provenance(&self) -> String {
        self.origin.to_string()
    }
}

/// Raw dispatcher candidates, loaded once and queried per directory.
#[derive(Debug, Clone, Default)]
pub struct ScheduleInference {
    /// Drop-in files in name order, then the system crontab.
    files: Vec<RawCronFile>,
}

impl ScheduleInference {
    /// Load the drop-in directory and the system crontab.
    pub fn load(crontab: &Path, cron_d: &Path) -> Self {
        let mut files = load_cron_d(cron_d);
        files.extend(load_crontab_file(crontab));
        Self { files }
    }

    /// Use already-loaded files, searched in the given order.
    pub fn from_files(files: Vec<RawCronFile>) -> Self {
        Self { files }
    }

    /// Find the schedule of the first line that runs `target_dir`.
    pub fn infer(&self, target_dir: &Path, fallback: &str) -> InferredSchedule {
        let target = target_dir.to_string_lossy();

        for file in &self.files {
            for (line_no, line) in file.numbered_lines() {
                let Some(parsed) = parse_system_line(line) else {
                    continue;
                };

                if dispatches_directory(&parsed.command, &target) {
                    return InferredSchedule {
                        schedule: parsed.schedule,
                        origin: ScheduleOrigin::Dispatcher {
                            path: file.path.clone(),
                            line: line_no,
                        },
                    };
                }
            }
        }

        InferredSchedule {
            schedule: fallback.to_string(),
            origin: ScheduleOrigin::Default,
        }
    }
}

/// One-shot inference with the hourly fallback.
pub fn infer_schedule(target_dir: &Path, crontab: &Path, cron_d: &Path) -> InferredSchedule {
    ScheduleInference::load(crontab, cron_d).infer(target_dir, HOURLY_FALLBACK)
}
