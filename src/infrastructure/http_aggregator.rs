// HTTP client for the remote aggregation service
use crate::application::processing_context::RemoteAggregator;
use crate::domain::point::{AggregationPeriod, Point, Series};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const AGGREGATE_PATH: &str = "/api/data/aggregate";

#[derive(Debug, Serialize)]
struct AggregateRequest<'a> {
    data: &'a [Point],
    period: AggregationPeriod,
}

/// Body returned by `POST /api/data/aggregate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResponse {
    pub data: Series,
    pub original_count: usize,
    pub aggregated_count: usize,
}

#[derive(Debug, Clone)]
pub struct HttpAggregator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAggregator {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), AGGREGATE_PATH),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteAggregator for HttpAggregator {
    async fn aggregate(&self, series: &[Point], bucket_size_ms: i64) -> Result<Series> {
        let body = AggregateRequest {
            data: series,
            period: AggregationPeriod::custom(bucket_size_ms),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to aggregation service")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Aggregation service failed with status {}: {}", status, body);
        }

        let result = response
            .json::<AggregateResponse>()
            .await
            .context("Failed to parse aggregation response")?;

        tracing::debug!(
            "Remote aggregation: {} -> {} points",
            result.original_count,
            result.aggregated_count
        );
        Ok(result.data)
    }
}
