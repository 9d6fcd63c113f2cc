// Render loop - Per-frame driver painting the latest processed series
use crate::application::dashboard_session::DashboardSession;
use crate::application::frame_monitor::FrameMonitor;
use crate::domain::metrics::PerformanceMetrics;
use crate::domain::point::Point;
use crate::rendering::chart_renderer::{ChartConfig, ChartKind, ChartRenderer, RenderStats};
use crate::rendering::surface::{Framebuffer, RenderError};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// One chart: its renderer, the surface it paints into, and frame instrumentation.
pub struct ChartView {
    pub renderer: RwLock<ChartRenderer>,
    surface: Mutex<Framebuffer>,
    monitor: Mutex<FrameMonitor>,
    last_stats: Mutex<RenderStats>,
}

impl ChartView {
    pub fn new(config: ChartConfig, kind: ChartKind) -> Self {
        let surface = Framebuffer::new(config.width, config.height);
        Self {
            renderer: RwLock::new(ChartRenderer::new(config, kind)),
            surface: Mutex::new(surface),
            monitor: Mutex::new(FrameMonitor::new()),
            last_stats: Mutex::new(RenderStats::default()),
        }
    }

    /// Paints one frame and samples its duration. A failed frame leaves the
    /// previous pixels in place and records no sample.
    pub fn paint(&self, points: &[Point]) -> Result<RenderStats, RenderError> {
        let renderer = self.renderer.read();
        let mut surface = self.surface.lock();
        let mut monitor = self.monitor.lock();

        monitor.update_fps();
        let start = monitor.start_measure();
        let stats = renderer.render(&mut *surface, points)?;
        monitor.end_measure(start);

        *self.last_stats.lock() = stats;
        Ok(stats)
    }

    pub fn png(&self) -> Result<Vec<u8>, RenderError> {
        self.surface.lock().encode_png()
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        let points = self.last_stats.lock().input_points;
        self.monitor.lock().get_metrics(points)
    }

    pub fn reset_metrics(&self) {
        self.monitor.lock().reset();
    }
}

pub struct RenderLoop {
    session: Arc<DashboardSession>,
    view: Arc<ChartView>,
    frame_interval: Duration,
}

impl RenderLoop {
    pub fn new(session: Arc<DashboardSession>, view: Arc<ChartView>, frame_interval: Duration) -> Self {
        Self {
            session,
            view,
            frame_interval: frame_interval.max(Duration::from_millis(1)),
        }
    }

    /// Kicks off processing of new points, then paints whatever result was
    /// applied last. Never waits on in-flight processing.
    pub fn frame(&self) -> Result<RenderStats, RenderError> {
        self.session.refresh_if_changed();
        let processed = self.session.processed();
        self.view.paint(&processed.series)
    }

    /// Runs until the session is torn down.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let lifecycle = self.session.lifecycle().clone();
            let mut ticker = tokio::time::interval(self.frame_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!("Render loop started ({}ms frames)", self.frame_interval.as_millis());

            loop {
                tokio::select! {
                    _ = lifecycle.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.frame() {
                            tracing::warn!("Skipping frame: {}", e);
                        }
                    }
                }
            }
            tracing::info!("Render loop stopped");
        })
    }
}
