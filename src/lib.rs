pub mod aggregator;
pub mod api;
pub mod config;
pub mod core;
pub mod execution;
pub mod sources;
pub mod testing;

pub use aggregator::{Aggregator, sort_records, suppress_dispatcher_entries};
pub use api::{ApiConfig, ApiError, ApiState, build_router, create_api_state, start_server};
pub use config::{ConfigError, ConventionDirConfig, PathsConfig, Settings, SettingsLoader};
pub use crate::core::job::JobRecord;
pub use crate::core::parser::{LineOutcome, ParsedLine, parse_system_line, parse_user_line};
pub use crate::core::schedule::{Schedule, ScheduleError, compute_next_runs};
pub use execution::{Invocation, ProcessOutcome, ProcessRunner, SystemRunner};
pub use sources::{CronSource, SourceContext, WarnOnce, infer_schedule};
