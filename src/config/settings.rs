//! Inventory settings.
//!
//! Settings come from an optional YAML file, then a handful of environment
//! variables override individual values:
//!
//! ```yaml
//! system: web-01
//! next_runs: 5
//! timezone: Europe/Berlin
//! include_runparts_entries: false
//! include_root_crontab: true
//! paths:
//!   crontab: /etc/crontab
//!   cron_d: /etc/cron.d
//!   convention_dirs:
//!     - path: /etc/cron.hourly
//!       fallback: "0 * * * *"
//! api:
//!   host: 0.0.0.0
//!   port: 8565
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::ApiConfig;
use crate::core::job::LOCAL_SYSTEM;
use crate::core::schedule::{DEFAULT_NEXT_RUNS, Schedule};
use crate::execution::DEFAULT_TIMEOUT;

use super::error::ConfigError;

/// Keep `run-parts` lines for the convention directories in the output.
pub const ENV_INCLUDE_RUNPARTS: &str = "CRONFLEET_INCLUDE_RUNPARTS";
/// Also read root's crontab through `sudo -n`.
pub const ENV_INCLUDE_ROOT_CRONTAB: &str = "CRONFLEET_INCLUDE_ROOT_CRONTAB";
/// Override the API bind host.
pub const ENV_HOST: &str = "CRONFLEET_HOST";
/// Override the API bind port.
pub const ENV_PORT: &str = "CRONFLEET_PORT";

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Host marker written into every record.
    pub system: String,
    /// How many upcoming runs to compute per job.
    pub next_runs: usize,
    /// Timezone cron expressions are evaluated in.
    pub timezone: String,
    /// Keep dispatcher lines that are already covered per entry.
    pub include_runparts_entries: bool,
    /// Read root's crontab through a non-interactive sudo.
    pub include_root_crontab: bool,
    /// Upper bound for each crontab query, in seconds.
    pub query_timeout_secs: u64,
    /// Account whose crontab `crontab -l` returns. Defaults to `$USER`.
    pub current_user: Option<String>,
    /// Well-known cron locations.
    pub paths: PathsConfig,
    /// HTTP server settings.
    pub api: ApiConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            system: LOCAL_SYSTEM.to_string(),
            next_runs: DEFAULT_NEXT_RUNS,
            timezone: "UTC".to_string(),
            include_runparts_entries: false,
            include_root_crontab: false,
            query_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            current_user: None,
            paths: PathsConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

/// Filesystem locations the inventory reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// System crontab file.
    pub crontab: PathBuf,
    /// Drop-in directory of system-style crontab files.
    pub cron_d: PathBuf,
    /// Directories whose executables are run by `run-parts`.
    pub convention_dirs: Vec<ConventionDirConfig>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            crontab: PathBuf::from("/etc/crontab"),
            cron_d: PathBuf::from("/etc/cron.d"),
            convention_dirs: vec![
                ConventionDirConfig::new("/etc/cron.hourly", HOURLY_FALLBACK),
                ConventionDirConfig::new("/etc/cron.daily", "@daily"),
                ConventionDirConfig::new("/etc/cron.weekly", "@weekly"),
                ConventionDirConfig::new("/etc/cron.monthly", "@monthly"),
            ],
        }
    }
}

/// Schedule assumed when no dispatcher line names a directory.
pub const HOURLY_FALLBACK: &str = "0 * * * *";

/// A `run-parts` directory and the schedule to assume if none is found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConventionDirConfig {
    /// Directory path.
    pub path: PathBuf,
    /// Fallback schedule.
    #[serde(default = "default_fallback")]
    pub fallback: String,
}

fn default_fallback() -> String {
    HOURLY_FALLBACK.to_string()
}

impl ConventionDirConfig {
    /// Create a directory entry.
    pub fn new(path: impl Into<PathBuf>, fallback: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            fallback: fallback.into(),
        }
    }

    /// The directory's final path component, e.g. `cron.hourly`.
    ///
    /// Used as the source tag and id prefix of the directory's records, so
    /// it must be unique among configured directories.
    pub fn label(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

impl Settings {
    /// Time budget for each crontab query.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// The account `crontab -l` reports on, if it can be determined.
    ///
    /// Tries `current_user`, then `$USER`, then `$LOGNAME`, skipping empty
    /// values. Services started without either variable still resolve to
    /// `root` when running with effective uid 0.
    pub fn resolved_user(&self) -> Option<String> {
        self.resolved_user_with(|name| std::env::var(name).ok(), effective_uid())
    }

    /// [`Settings::resolved_user`] with an injectable environment and uid.
    pub fn resolved_user_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
        euid: u32,
    ) -> Option<String> {
        let non_empty = |user: &String| !user.trim().is_empty();

        self.current_user
            .clone()
            .filter(non_empty)
            .or_else(|| lookup("USER").filter(non_empty))
            .or_else(|| lookup("LOGNAME").filter(non_empty))
            .or_else(|| (euid == 0).then(|| ROOT_ACCOUNT.to_string()))
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_INCLUDE_RUNPARTS) {
            self.include_runparts_entries = parse_bool(ENV_INCLUDE_RUNPARTS, &value)?;
        }
        if let Some(value) = lookup(ENV_INCLUDE_ROOT_CRONTAB) {
            self.include_root_crontab = parse_bool(ENV_INCLUDE_ROOT_CRONTAB, &value)?;
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.api.host = host;
        }
        if let Some(value) = lookup(ENV_PORT) {
            self.api.port = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_PORT.to_string(),
                value: value.clone(),
            })?;
        }

        SettingsLoader::validate(&self)?;
        Ok(self)
    }
}

/// Parse a boolean toggle the way shell users write them.
fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Account name of uid 0.
pub const ROOT_ACCOUNT: &str = "root";

fn effective_uid() -> u32 {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() }
}

/// YAML settings loader.
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse settings from a YAML string.
    pub fn parse(yaml: &str) -> Result<Settings, ConfigError> {
        // An empty document means "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Settings::default());
        }
        let settings: Settings = serde_yaml::from_str(yaml)?;
        Self::validate(&settings)?;
        Ok(settings)
    }

    /// Validate settings.
    pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
        if settings.system.trim().is_empty() {
            return Err(ConfigError::InvalidConfig("system cannot be empty".into()));
        }

        if settings.next_runs == 0 {
            return Err(ConfigError::InvalidConfig("next_runs cannot be zero".into()));
        }

        if settings.query_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "query_timeout_secs cannot be zero".into(),
            ));
        }

        if settings.api.port == 0 {
            return Err(ConfigError::InvalidConfig("api.port cannot be zero".into()));
        }

        if settings.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(ConfigError::InvalidConfig(format!(
                "unknown timezone: {}",
                settings.timezone
            )));
        }

        let mut labels = HashSet::new();
        for dir in &settings.paths.convention_dirs {
            if dir.path.file_name().is_none() {
                return Err(ConfigError::InvalidConfig(format!(
                    "convention directory has no name: {}",
                    dir.path.display()
                )));
            }
            if !labels.insert(dir.label()) {
                return Err(ConfigError::InvalidConfig(format!(
                    "convention directory name {} is used more than once",
                    dir.label()
                )));
            }
            // Fallbacks are used verbatim, so catch typos up front.
            if let Err(e) = Schedule::new(&dir.fallback) {
                return Err(ConfigError::InvalidConfig(format!(
                    "fallback schedule for {}: {}",
                    dir.path.display(),
                    e
                )));
            }
        }

        Ok(())
    }
}
