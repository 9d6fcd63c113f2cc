// Stream driver - Periodic timer that feeds the stream buffer
use crate::application::series_generator::SeriesGenerator;
use crate::application::stream_buffer::StreamBuffer;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub struct StreamDriver {
    buffer: Arc<StreamBuffer>,
    generator: Arc<Mutex<SeriesGenerator>>,
    interval: Duration,
    next_index: Arc<AtomicU64>,
    running: Mutex<Option<CancellationToken>>,
    lifecycle: CancellationToken,
}

impl StreamDriver {
    /// `first_index` continues the sequence of any points the buffer was seeded with.
    pub fn new(
        buffer: Arc<StreamBuffer>,
        generator: SeriesGenerator,
        interval: Duration,
        first_index: u64,
        lifecycle: CancellationToken,
    ) -> Self {
        Self {
            buffer,
            generator: Arc::new(Mutex::new(generator)),
            interval: interval.max(Duration::from_millis(1)),
            next_index: Arc::new(AtomicU64::new(first_index)),
            running: Mutex::new(None),
            lifecycle,
        }
    }

    /// Starts appending one point per tick. Returns false if already running or torn down.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock();
        if running.is_some() || self.lifecycle.is_cancelled() {
            return false;
        }

        let token = self.lifecycle.child_token();
        *running = Some(token.clone());

        let buffer = self.buffer.clone();
        let generator = self.generator.clone();
        let next_index = self.next_index.clone();
        let period = self.interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; streaming begins one period later.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let index = next_index.fetch_add(1, Ordering::Relaxed);
                        let now = chrono::Utc::now().timestamp_millis();
                        let point = generator.lock().point(now, index);
                        buffer.append(point);
                    }
                }
            }
            tracing::debug!("Stream driver stopped");
        });

        tracing::info!("Streaming started ({}ms interval)", period.as_millis());
        true
    }

    /// Stops the timer. Returns false if it was not running.
    pub fn stop(&self) -> bool {
        match self.running.lock().take() {
            Some(token) => {
                token.cancel();
                tracing::info!("Streaming stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }
}

impl Drop for StreamDriver {
    fn drop(&mut self) {
        if let Some(token) = self.running.get_mut().take() {
            token.cancel();
        }
    }
}
