//! Common test utilities shared across integration tests.

use chrono::{DateTime, TimeZone, Utc};
use cronfleet::config::{ConventionDirConfig, PathsConfig, Settings};
use std::fs::Permissions;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

/// A throwaway cron layout: `crontab`, `cron.d/`, and the four
/// `cron.<period>/` directories under one temporary root.
pub struct HostFixture {
    dir: TempDir,
}

impl HostFixture {
    /// Create an empty layout. `cron.d` and the period directories exist but
    /// are empty; `crontab` does not exist.
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        for name in ["cron.d", "cron.hourly", "cron.daily", "cron.weekly", "cron.monthly"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn crontab(&self) -> PathBuf {
        self.root().join("crontab")
    }

    pub fn cron_d(&self) -> PathBuf {
        self.root().join("cron.d")
    }

    pub fn hourly(&self) -> PathBuf {
        self.root().join("cron.hourly")
    }

    pub fn daily(&self) -> PathBuf {
        self.root().join("cron.daily")
    }

    /// Write the system crontab.
    pub fn write_crontab(&self, contents: &str) {
        std::fs::write(self.crontab(), contents).unwrap();
    }

    /// Write a drop-in file and return its path.
    pub fn write_drop_in(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.cron_d().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Write an executable script into `dir`.
    pub fn add_script(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Settings pointing at this layout, reading as `alice`.
    pub fn settings(&self) -> Settings {
        let root = self.root();
        Settings {
            current_user: Some("alice".to_string()),
            paths: PathsConfig {
                crontab: self.crontab(),
                cron_d: self.cron_d(),
                convention_dirs: vec![
                    ConventionDirConfig::new(root.join("cron.hourly"), "0 * * * *"),
                    ConventionDirConfig::new(root.join("cron.daily"), "@daily"),
                    ConventionDirConfig::new(root.join("cron.weekly"), "@weekly"),
                    ConventionDirConfig::new(root.join("cron.monthly"), "@monthly"),
                ],
            },
            ..Settings::default()
        }
    }
}

/// A fixed reference instant: Monday 2024-01-15 12:00 UTC.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}

/// Collects formatted log output for assertions.
///
/// Install it for the current thread with [`LogCapture::install`]; tokio's
/// default test runtime runs the whole test on that thread.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture everything at `DEBUG` and above until the guard drops.
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Captured lines at `level` (`"WARN"`, `"DEBUG"`, ...).
    pub fn lines_at(&self, level: &str) -> Vec<String> {
        let buffer = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buffer)
            .lines()
            .filter(|line| line.split_whitespace().next() == Some(level))
            .map(str::to_string)
            .collect()
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter(Arc::clone(&self.buffer))
    }
}

pub struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
