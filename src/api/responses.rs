//! API response types.

use serde::{Deserialize, Serialize};

use crate::core::job::JobRecord;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Response for the job list.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobRecord>,
    pub count: usize,
}

impl From<Vec<JobRecord>> for JobListResponse {
    fn from(jobs: Vec<JobRecord>) -> Self {
        let count = jobs.len();
        Self { jobs, count }
    }
}
