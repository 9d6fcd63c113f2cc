// Background worker - Channel-fed task that runs filter/aggregate on the blocking pool
use crate::application::filter_aggregator::{aggregate, filter};
use crate::application::processing_context::{
    ProcessingError, ProcessingMode, WorkerContext, WorkerRequest, WorkerResponse,
};
use async_trait::async_trait;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

const QUEUE_DEPTH: usize = 16;

struct Job {
    request: WorkerRequest,
    reply: oneshot::Sender<WorkerResponse>,
}

/// Handle to a worker task. Requests are processed one at a time, in arrival order.
pub struct BackgroundWorker {
    jobs: mpsc::Sender<Job>,
}

impl BackgroundWorker {
    /// Spawns the worker task; it exits when `shutdown` is cancelled.
    pub fn spawn(shutdown: CancellationToken) -> Self {
        let (jobs, mut rx) = mpsc::channel::<Job>(QUEUE_DEPTH);

        tokio::spawn(async move {
            loop {
                let job = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    job = rx.recv() => match job {
                        Some(job) => job,
                        None => break,
                    },
                };

                let series_len = job.request.series.len();
                let response = match tokio::task::spawn_blocking(move || handle(job.request)).await {
                    Ok(response) => response,
                    Err(e) => WorkerResponse {
                        series: Vec::new(),
                        processing_time_ms: 0.0,
                        error: Some(format!("worker task failed: {}", e)),
                    },
                };
                tracing::debug!(
                    "Worker processed {} points in {:.2}ms",
                    series_len,
                    response.processing_time_ms
                );
                // The requester may have given up; nothing to do then.
                let _ = job.reply.send(response);
            }
            tracing::info!("Background worker stopped");
        });

        Self { jobs }
    }
}

/// Runs one request. A mode whose parameter is missing passes the input through.
pub fn handle(request: WorkerRequest) -> WorkerResponse {
    let started = Instant::now();
    let WorkerRequest {
        mode,
        series,
        filter_spec,
        aggregation_period,
    } = request;

    let filtered = match (mode, &filter_spec) {
        (ProcessingMode::Filter | ProcessingMode::Both, Some(spec)) => filter(&series, spec),
        _ => series,
    };
    let result = match (mode, &aggregation_period) {
        (ProcessingMode::Aggregate | ProcessingMode::Both, Some(period)) => aggregate(&filtered, period),
        _ => filtered,
    };

    WorkerResponse {
        series: result,
        processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        error: None,
    }
}

#[async_trait]
impl WorkerContext for BackgroundWorker {
    fn is_available(&self) -> bool {
        !self.jobs.is_closed()
    }

    async fn process(&self, request: WorkerRequest) -> Result<WorkerResponse, ProcessingError> {
        let (reply, response) = oneshot::channel();
        self.jobs
            .send(Job { request, reply })
            .await
            .map_err(|_| ProcessingError::Unavailable("worker"))?;

        response
            .await
            .map_err(|_| ProcessingError::Worker("worker stopped before replying".to_string()))
    }
}
