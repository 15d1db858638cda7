//! Configuration loading and parsing.
//!
//! This module provides YAML-based settings with environment overrides.

mod error;
mod settings;

pub use error::ConfigError;
pub use settings::{
    ConventionDirConfig, ENV_HOST, ENV_INCLUDE_ROOT_CRONTAB, ENV_INCLUDE_RUNPARTS, ENV_PORT,
    HOURLY_FALLBACK, PathsConfig, ROOT_ACCOUNT, Settings, SettingsLoader,
};
