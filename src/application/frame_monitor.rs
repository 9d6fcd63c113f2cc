// Frame monitor - FPS and render-duration sampling over a sliding window
use crate::domain::metrics::PerformanceMetrics;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const MAX_SAMPLES: usize = 60;
const FPS_WINDOW: Duration = Duration::from_millis(1000);
const INITIAL_FPS: u32 = 60;

pub struct FrameMonitor {
    frame_count: u32,
    last_reset: Instant,
    fps: u32,
    render_times: VecDeque<f64>,
}

impl FrameMonitor {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(now: Instant) -> Self {
        Self {
            frame_count: 0,
            last_reset: now,
            fps: INITIAL_FPS,
            render_times: VecDeque::with_capacity(MAX_SAMPLES),
        }
    }

    pub fn update_fps(&mut self) {
        self.update_fps_at(Instant::now());
    }

    fn update_fps_at(&mut self, now: Instant) {
        self.frame_count += 1;
        let elapsed = now.saturating_duration_since(self.last_reset);

        if elapsed >= FPS_WINDOW {
            let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
            self.fps = (self.frame_count as f64 * 1000.0 / elapsed_ms).round() as u32;
            self.frame_count = 0;
            self.last_reset = now;
        }
    }

    pub fn start_measure(&self) -> Instant {
        Instant::now()
    }

    /// Records the time since `start` and returns it in milliseconds.
    pub fn end_measure(&mut self, start: Instant) -> f64 {
        let ms = start.elapsed().as_secs_f64() * 1000.0;
        self.record(ms);
        ms
    }

    fn record(&mut self, ms: f64) {
        if self.render_times.len() == MAX_SAMPLES {
            self.render_times.pop_front();
        }
        self.render_times.push_back(ms);
    }

    pub fn average_render_ms(&self) -> f64 {
        if self.render_times.is_empty() {
            return 0.0;
        }
        let mean = self.render_times.iter().sum::<f64>() / self.render_times.len() as f64;
        (mean * 100.0).round() / 100.0
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn get_metrics(&self, point_count: usize) -> PerformanceMetrics {
        PerformanceMetrics {
            fps: self.fps,
            render_time_ms: self.average_render_ms(),
            point_count,
            memory_mb: resident_memory_mb(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for FrameMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Resident set size, when the platform exposes it.
#[cfg(target_os = "linux")]
fn resident_memory_mb() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some((kb as f64 / 1024.0).round() as u64)
}

#[cfg(not(target_os = "linux"))]
fn resident_memory_mb() -> Option<u64> {
    None
}
