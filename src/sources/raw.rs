//! Raw line access to system-style crontab files.
//!
//! Both the file readers and schedule inference work from these lines, so
//! `/etc/crontab` and `/etc/cron.d/*` are read the same way everywhere.

use std::io;
use std::path::{Path, PathBuf};

/// The lines of one crontab-style file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCronFile {
    /// Where the lines were read from.
    pub path: PathBuf,
    /// File contents split into lines, without terminators.
    pub lines: Vec<String>,
}

impl RawCronFile {
    /// The final path component.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Lines paired with 1-based line numbers.
    pub fn numbered_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, line)| (i + 1, line.as_str()))
    }
}

/// Read a file as lines. Invalid UTF-8 is replaced, not rejected.
pub fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_string)
        .collect())
}

/// Load a single crontab file.
///
/// `None` if the file does not exist; other I/O failures are logged and
/// also give `None`.
pub fn load_crontab_file(path: &Path) -> Option<RawCronFile> {
    if !path.is_file() {
        return None;
    }

    match read_lines(path) {
        Ok(lines) => Some(RawCronFile {
            path: path.to_path_buf(),
            lines,
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read crontab file");
            None
        }
    }
}

/// Regular files directly inside `dir`, sorted by file name.
pub fn cron_d_files(dir: &Path) -> Vec<PathBuf> {
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
        .filter(|path| path.is_file())
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files
}

/// Load every file of a drop-in directory, in file name order.
pub fn load_cron_d(dir: &Path) -> Vec<RawCronFile> {
    cron_d_files(dir)
        .iter()
        .filter_map(|path| load_crontab_file(path))
        .collect()
}
