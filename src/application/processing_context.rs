// Execution contexts the dispatcher can offload filter/aggregate work to
use crate::domain::point::{AggregationPeriod, FilterSpec, Point, Series};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    Filter,
    Aggregate,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRequest {
    pub mode: ProcessingMode,
    pub series: Series,
    #[serde(default)]
    pub filter_spec: Option<FilterSpec>,
    #[serde(default)]
    pub aggregation_period: Option<AggregationPeriod>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResponse {
    pub series: Series,
    pub processing_time_ms: f64,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("{0} context is not available")]
    Unavailable(&'static str),
    #[error("worker reported an error: {0}")]
    Worker(String),
    #[error("remote aggregation failed: {0:#}")]
    Remote(anyhow::Error),
}

/// Background context that runs filter/aggregate off the caller's path.
#[async_trait]
pub trait WorkerContext: Send + Sync {
    fn is_available(&self) -> bool;

    async fn process(&self, request: WorkerRequest) -> Result<WorkerResponse, ProcessingError>;
}

/// Remote aggregation service. Its result is authoritative.
#[async_trait]
pub trait RemoteAggregator: Send + Sync {
    async fn aggregate(&self, series: &[Point], bucket_size_ms: i64) -> anyhow::Result<Series>;
}
