//! API request handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::core::job::JobRecord;

use super::errors::ApiError;
use super::responses::{HealthResponse, JobListResponse};

/// Shared application state for API handlers.
///
/// Each request runs its own aggregation; the aggregator holds only
/// settings, the process runner and the warning latch.
#[derive(Clone)]
pub struct ApiState {
    pub aggregator: Arc<Aggregator>,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// List all jobs on this host.
pub async fn list_jobs(State(state): State<ApiState>) -> Json<JobListResponse> {
    let jobs = state.aggregator.get_jobs().await;
    Json(JobListResponse::from(jobs))
}

/// Get a specific job.
pub async fn get_job(
    State(state): State<ApiState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    let job = state
        .aggregator
        .get_job(&job_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("job not found: {}", job_id)))?;
    Ok(Json(job))
}
