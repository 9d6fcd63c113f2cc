// Dashboard session - Explicitly wired view state: live buffer, filters, dispatch and reconciliation
use crate::application::dispatcher::{ProcessedSeries, ProcessingDispatcher, ProcessingRequest};
use crate::application::reconciler::ResultSlot;
use crate::application::stream_buffer::StreamBuffer;
use crate::application::stream_driver::StreamDriver;
use crate::domain::point::{AggregationPeriod, FilterSpec, TimeRange};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Everything a session needs, supplied up front.
pub struct SessionDeps {
    pub buffer: Arc<StreamBuffer>,
    pub driver: StreamDriver,
    pub dispatcher: ProcessingDispatcher,
    pub filters: FilterSpec,
    pub aggregation: Option<AggregationPeriod>,
    /// Shared with the driver; cancelled on teardown.
    pub lifecycle: CancellationToken,
}

pub struct DashboardSession {
    buffer: Arc<StreamBuffer>,
    driver: StreamDriver,
    dispatcher: ProcessingDispatcher,
    filters: RwLock<FilterSpec>,
    aggregation: RwLock<Option<AggregationPeriod>>,
    results: Arc<ResultSlot>,
    // Buffer version seen by the last refresh; 0 forces the first one.
    refreshed_at: AtomicU64,
    lifecycle: CancellationToken,
}

impl DashboardSession {
    pub fn new(deps: SessionDeps) -> Self {
        Self {
            buffer: deps.buffer,
            driver: deps.driver,
            dispatcher: deps.dispatcher,
            filters: RwLock::new(deps.filters),
            aggregation: RwLock::new(deps.aggregation),
            results: Arc::new(ResultSlot::new()),
            refreshed_at: AtomicU64::new(0),
            lifecycle: deps.lifecycle,
        }
    }

    pub fn buffer(&self) -> &Arc<StreamBuffer> {
        &self.buffer
    }

    pub fn filters(&self) -> FilterSpec {
        self.filters.read().clone()
    }

    pub fn set_filters(&self, filters: FilterSpec) {
        *self.filters.write() = filters;
        self.refresh();
    }

    pub fn set_time_range(&self, time_range: Option<TimeRange>) {
        self.filters.write().time_range = time_range;
        self.refresh();
    }

    pub fn aggregation(&self) -> Option<AggregationPeriod> {
        self.aggregation.read().clone()
    }

    pub fn set_aggregation(&self, aggregation: Option<AggregationPeriod>) {
        *self.aggregation.write() = aggregation;
        self.refresh();
    }

    pub fn request(&self) -> ProcessingRequest {
        ProcessingRequest {
            filter: self.filters(),
            aggregation: self.aggregation(),
        }
    }

    /// Processes the current snapshot in whichever context the dispatcher picks.
    /// The completion lands in the result slot unless a newer one already has.
    pub fn refresh(&self) -> Option<JoinHandle<()>> {
        if self.lifecycle.is_cancelled() {
            return None;
        }
        self.refreshed_at.store(self.buffer.version(), Ordering::Release);

        let ticket = self.results.issue();
        let results = self.results.clone();
        self.dispatcher.dispatch(
            self.buffer.snapshot(),
            self.request(),
            self.lifecycle.clone(),
            move |processed| {
                results.complete(ticket, processed);
            },
        )
    }

    /// Refreshes only when points were appended since the last refresh.
    pub fn refresh_if_changed(&self) -> Option<JoinHandle<()>> {
        if self.buffer.version() == self.refreshed_at.load(Ordering::Acquire) {
            return None;
        }
        self.refresh()
    }

    /// Last applied result. Before any completion, the current snapshot is
    /// processed in place once and kept until a dispatched result lands.
    pub fn processed(&self) -> Arc<ProcessedSeries> {
        self.results.latest_or_fill(|| {
            ProcessingDispatcher::run_in_process(&self.buffer.snapshot(), &self.request())
        })
    }

    pub fn start_stream(&self) -> bool {
        self.driver.start()
    }

    pub fn stop_stream(&self) -> bool {
        self.driver.stop()
    }

    pub fn is_streaming(&self) -> bool {
        self.driver.is_streaming()
    }

    pub fn lifecycle(&self) -> &CancellationToken {
        &self.lifecycle
    }

    /// Stops streaming and suppresses every pending completion.
    pub fn teardown(&self) {
        if self.lifecycle.is_cancelled() {
            return;
        }
        self.lifecycle.cancel();
        self.driver.stop();
        tracing::info!("Dashboard session torn down");
    }
}

impl Drop for DashboardSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
