// Processing dispatcher - Picks where filter+aggregate runs and owns the fallback chain
use crate::application::filter_aggregator::{filter, process};
use crate::application::processing_context::{
    ProcessingError, ProcessingMode, RemoteAggregator, WorkerContext, WorkerRequest,
};
use crate::domain::point::{AggregationPeriod, FilterSpec, Series};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_LARGE_PAYLOAD_THRESHOLD: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionContext {
    InProcess,
    Worker,
    Remote,
}

impl ExecutionContext {
    fn name(self) -> &'static str {
        match self {
            ExecutionContext::InProcess => "in-process",
            ExecutionContext::Worker => "worker",
            ExecutionContext::Remote => "remote",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingRequest {
    pub filter: FilterSpec,
    pub aggregation: Option<AggregationPeriod>,
}

impl ProcessingRequest {
    fn mode(&self) -> ProcessingMode {
        match (&self.aggregation, self.filter.is_unconstrained()) {
            (None, _) => ProcessingMode::Filter,
            (Some(_), true) => ProcessingMode::Aggregate,
            (Some(_), false) => ProcessingMode::Both,
        }
    }
}

/// A finished dispatch, tagged with the context that actually produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedSeries {
    pub series: Series,
    pub elapsed_ms: f64,
    pub context: ExecutionContext,
}

#[derive(Clone)]
pub struct ProcessingDispatcher {
    worker: Option<Arc<dyn WorkerContext>>,
    remote: Option<Arc<dyn RemoteAggregator>>,
    large_payload_threshold: usize,
}

impl ProcessingDispatcher {
    pub fn new(large_payload_threshold: usize) -> Self {
        Self {
            worker: None,
            remote: None,
            large_payload_threshold,
        }
    }

    pub fn with_worker(mut self, worker: Arc<dyn WorkerContext>) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteAggregator>) -> Self {
        self.remote = Some(remote);
        self
    }

    fn worker_available(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| w.is_available())
    }

    pub fn select_context(&self, input_len: usize, request: &ProcessingRequest) -> ExecutionContext {
        if request.aggregation.is_none() {
            return ExecutionContext::InProcess;
        }
        if input_len > self.large_payload_threshold && self.remote.is_some() {
            return ExecutionContext::Remote;
        }
        if self.worker_available() {
            return ExecutionContext::Worker;
        }
        ExecutionContext::InProcess
    }

    /// Runs the request and hands the result to `on_complete`, unless `token`
    /// is cancelled by then.
    ///
    /// In-process work completes before this returns (`None`); offloaded work
    /// runs on a spawned task whose handle is returned. Cancelling the token
    /// never aborts that task, it only suppresses the callback.
    pub fn dispatch<F>(
        &self,
        input: Series,
        request: ProcessingRequest,
        token: CancellationToken,
        on_complete: F,
    ) -> Option<JoinHandle<()>>
    where
        F: FnOnce(ProcessedSeries) + Send + 'static,
    {
        let context = self.select_context(input.len(), &request);
        tracing::debug!("Dispatching {} points to {} context", input.len(), context.name());

        if context == ExecutionContext::InProcess {
            let result = Self::run_in_process(&input, &request);
            deliver(&token, result, on_complete);
            return None;
        }

        let dispatcher = self.clone();
        Some(tokio::spawn(async move {
            let result = dispatcher.run(context, input, request).await;
            deliver(&token, result, on_complete);
        }))
    }

    /// Tries `context`, retries once on the next cheaper context, and finally
    /// settles for the filtered but unaggregated input.
    pub async fn run(
        &self,
        context: ExecutionContext,
        input: Series,
        request: ProcessingRequest,
    ) -> ProcessedSeries {
        let started = Instant::now();

        let error = match self.attempt(context, &input, &request).await {
            Ok(result) => return result,
            Err(e) => e,
        };

        let Some(fallback) = self.fallback_for(context) else {
            return Self::partial(&input, &request, started);
        };
        tracing::warn!(
            "{} processing failed, falling back to {}: {}",
            context.name(),
            fallback.name(),
            error
        );

        match self.attempt(fallback, &input, &request).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    "{} fallback failed, surfacing filtered data only: {}",
                    fallback.name(),
                    e
                );
                Self::partial(&input, &request, started)
            }
        }
    }

    fn fallback_for(&self, context: ExecutionContext) -> Option<ExecutionContext> {
        match context {
            ExecutionContext::Remote if self.worker_available() => Some(ExecutionContext::Worker),
            ExecutionContext::Remote | ExecutionContext::Worker => Some(ExecutionContext::InProcess),
            ExecutionContext::InProcess => None,
        }
    }

    async fn attempt(
        &self,
        context: ExecutionContext,
        input: &Series,
        request: &ProcessingRequest,
    ) -> Result<ProcessedSeries, ProcessingError> {
        match context {
            ExecutionContext::InProcess => Ok(Self::run_in_process(input, request)),
            ExecutionContext::Worker => {
                let worker = self
                    .worker
                    .as_ref()
                    .filter(|w| w.is_available())
                    .ok_or(ProcessingError::Unavailable("worker"))?;

                let response = worker
                    .process(WorkerRequest {
                        mode: request.mode(),
                        series: input.clone(),
                        filter_spec: Some(request.filter.clone()),
                        aggregation_period: request.aggregation.clone(),
                    })
                    .await?;

                if let Some(error) = response.error {
                    return Err(ProcessingError::Worker(error));
                }
                Ok(ProcessedSeries {
                    series: response.series,
                    elapsed_ms: response.processing_time_ms,
                    context,
                })
            }
            ExecutionContext::Remote => {
                let remote = self
                    .remote
                    .as_ref()
                    .ok_or(ProcessingError::Unavailable("remote"))?;
                let started = Instant::now();

                let filtered = filter(input, &request.filter);
                let series = match &request.aggregation {
                    Some(period) => remote
                        .aggregate(&filtered, period.bucket_size_ms)
                        .await
                        .map_err(ProcessingError::Remote)?,
                    None => filtered,
                };

                Ok(ProcessedSeries {
                    series,
                    elapsed_ms: elapsed_ms(started),
                    context,
                })
            }
        }
    }

    pub fn run_in_process(input: &Series, request: &ProcessingRequest) -> ProcessedSeries {
        let started = Instant::now();
        let series = process(input, &request.filter, request.aggregation.as_ref());
        ProcessedSeries {
            series,
            elapsed_ms: elapsed_ms(started),
            context: ExecutionContext::InProcess,
        }
    }

    fn partial(input: &Series, request: &ProcessingRequest, started: Instant) -> ProcessedSeries {
        ProcessedSeries {
            series: filter(input, &request.filter),
            elapsed_ms: elapsed_ms(started),
            context: ExecutionContext::InProcess,
        }
    }
}

fn deliver<F>(token: &CancellationToken, result: ProcessedSeries, on_complete: F)
where
    F: FnOnce(ProcessedSeries),
{
    if token.is_cancelled() {
        tracing::debug!(
            "Dropping {} result of {} points after teardown",
            result.context.name(),
            result.series.len()
        );
        return;
    }
    on_complete(result);
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::processing_context::WorkerResponse;
    use crate::domain::point::Point;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct StubWorker {
        available: bool,
        error: Option<String>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl StubWorker {
        fn ok() -> Self {
            Self {
                available: true,
                error: None,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl WorkerContext for StubWorker {
        fn is_available(&self) -> bool {
            self.available
        }

        async fn process(&self, request: WorkerRequest) -> Result<WorkerResponse, ProcessingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(WorkerResponse {
                series: vec![Point::new(-1, request.series.len() as f64)],
                processing_time_ms: 1.5,
                error: self.error.clone(),
            })
        }
    }

    struct FailingRemote {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteAggregator for FailingRemote {
        async fn aggregate(&self, _series: &[Point], _bucket_size_ms: i64) -> anyhow::Result<Series> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("connection refused")
        }
    }

    struct EchoRemote;

    #[async_trait]
    impl RemoteAggregator for EchoRemote {
        async fn aggregate(&self, series: &[Point], bucket_size_ms: i64) -> anyhow::Result<Series> {
            Ok(crate::application::filter_aggregator::aggregate(
                series,
                &AggregationPeriod::custom(bucket_size_ms),
            ))
        }
    }

    fn points(count: usize) -> Series {
        (0..count).map(|i| Point::new(i as i64 * 100, 1.0)).collect()
    }

    fn aggregating() -> ProcessingRequest {
        ProcessingRequest {
            filter: FilterSpec::default(),
            aggregation: Some(AggregationPeriod::custom(1000)),
        }
    }

    #[test]
    fn test_context_selection() {
        let bare = ProcessingDispatcher::new(10);
        assert_eq!(bare.select_context(100, &aggregating()), ExecutionContext::InProcess);

        let full = ProcessingDispatcher::new(10)
            .with_worker(Arc::new(StubWorker::ok()))
            .with_remote(Arc::new(EchoRemote));
        assert_eq!(full.select_context(100, &ProcessingRequest::default()), ExecutionContext::InProcess);
        assert_eq!(full.select_context(10, &aggregating()), ExecutionContext::Worker);
        assert_eq!(full.select_context(11, &aggregating()), ExecutionContext::Remote);

        let unavailable = ProcessingDispatcher::new(10).with_worker(Arc::new(StubWorker {
            available: false,
            ..StubWorker::ok()
        }));
        assert_eq!(unavailable.select_context(5, &aggregating()), ExecutionContext::InProcess);
    }

    #[test]
    fn test_in_process_dispatch_completes_synchronously() {
        let dispatcher = ProcessingDispatcher::new(10);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = dispatcher.dispatch(points(20), aggregating(), CancellationToken::new(), move |r| {
            tx.send(r).unwrap();
        });
        assert!(handle.is_none());
        let result = rx.try_recv().unwrap();
        assert_eq!(result.context, ExecutionContext::InProcess);
        assert_eq!(result.series.len(), 2);
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back_to_worker_once() {
        let worker = Arc::new(StubWorker::ok());
        let remote = Arc::new(FailingRemote {
            calls: AtomicUsize::new(0),
        });
        let dispatcher = ProcessingDispatcher::new(10)
            .with_worker(worker.clone())
            .with_remote(remote.clone());

        let invocations = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let counter = invocations.clone();
        let handle = dispatcher
            .dispatch(points(50), aggregating(), CancellationToken::new(), move |r| {
                counter.fetch_add(1, Ordering::SeqCst);
                tx.send(r).unwrap();
            })
            .unwrap();
        handle.await.unwrap();

        let result = rx.recv().await.unwrap();
        assert_eq!(result.context, ExecutionContext::Worker);
        assert_eq!(result.series, vec![Point::new(-1, 50.0)]);
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
        assert_eq!(worker.calls.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_worker_error_falls_back_to_in_process() {
        let dispatcher = ProcessingDispatcher::new(100).with_worker(Arc::new(StubWorker {
            error: Some("boom".to_string()),
            ..StubWorker::ok()
        }));
        let result = dispatcher.run(ExecutionContext::Worker, points(20), aggregating()).await;
        assert_eq!(result.context, ExecutionContext::InProcess);
        assert_eq!(result.series.len(), 2);
    }

    #[tokio::test]
    async fn test_double_failure_surfaces_filtered_input() {
        let dispatcher = ProcessingDispatcher::new(10)
            .with_worker(Arc::new(StubWorker {
                error: Some("boom".to_string()),
                ..StubWorker::ok()
            }))
            .with_remote(Arc::new(FailingRemote {
                calls: AtomicUsize::new(0),
            }));
        let request = ProcessingRequest {
            filter: FilterSpec {
                max_value: Some(0.5),
                ..Default::default()
            },
            aggregation: Some(AggregationPeriod::custom(1000)),
        };
        let mut input = points(30);
        input.push(Point::new(10_000, 0.25));

        let result = dispatcher.run(ExecutionContext::Remote, input, request).await;
        assert_eq!(result.series, vec![Point::new(10_000, 0.25)]);
    }

    #[tokio::test]
    async fn test_remote_result_is_used_for_large_payloads() {
        let dispatcher = ProcessingDispatcher::new(10)
            .with_worker(Arc::new(StubWorker::ok()))
            .with_remote(Arc::new(EchoRemote));
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatcher
            .dispatch(points(40), aggregating(), CancellationToken::new(), move |r| {
                tx.send(r).unwrap();
            })
            .unwrap()
            .await
            .unwrap();

        let result = rx.recv().await.unwrap();
        assert_eq!(result.context, ExecutionContext::Remote);
        assert_eq!(result.series.len(), 4);
    }

    #[tokio::test]
    async fn test_cancelled_dispatch_suppresses_callback() {
        let worker = Arc::new(StubWorker {
            delay: Duration::from_millis(30),
            ..StubWorker::ok()
        });
        let dispatcher = ProcessingDispatcher::new(100).with_worker(worker.clone());
        let token = CancellationToken::new();
        let invoked = Arc::new(AtomicUsize::new(0));
        let counter = invoked.clone();

        let handle = dispatcher
            .dispatch(points(10), aggregating(), token.clone(), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        token.cancel();
        handle.await.unwrap();

        assert_eq!(worker.calls.load(Ordering::SeqCst), 1);
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_worker_mode_reflects_request() {
        assert_eq!(ProcessingRequest::default().mode(), ProcessingMode::Filter);
        assert_eq!(aggregating().mode(), ProcessingMode::Aggregate);
        let both = ProcessingRequest {
            filter: FilterSpec {
                min_value: Some(1.0),
                ..Default::default()
            },
            ..aggregating()
        };
        assert_eq!(both.mode(), ProcessingMode::Both);
    }
}
