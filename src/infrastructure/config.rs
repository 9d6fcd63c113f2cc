use crate::application::series_generator::GeneratorConfig;
use crate::application::virtual_window::VirtualWindow;
use crate::rendering::chart_renderer::{ChartColors, ChartConfig, ChartKind};
use crate::rendering::viewport::Padding;
use serde::Deserialize;
use std::time::Duration;

const CONFIG_FILE: &str = "config/dashboard";
const ENV_PREFIX: &str = "DASHBOARD";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub generator: GeneratorConfig,
    pub stream: StreamSettings,
    pub dispatcher: DispatcherSettings,
    pub chart: ChartSettings,
    pub table: TableSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StreamSettings {
    pub interval_ms: u64,
    pub capacity: usize,
    pub initial_points: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            capacity: 10_000,
            initial_points: 1000,
        }
    }
}

impl StreamSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DispatcherSettings {
    pub large_payload_threshold: usize,
    pub worker_enabled: bool,
    pub remote_enabled: bool,
    /// Base URL of the remote aggregation service. `None` targets this server.
    pub remote_url: Option<String>,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            large_payload_threshold: 5000,
            worker_enabled: true,
            remote_enabled: true,
            remote_url: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChartSettings {
    pub width: u32,
    pub height: u32,
    pub padding: Padding,
    pub max_render_points: usize,
    pub frame_interval_ms: u64,
    pub kind: ChartKind,
    pub colors: ChartColors,
}

impl Default for ChartSettings {
    fn default() -> Self {
        let chart = ChartConfig::default();
        Self {
            width: chart.width,
            height: chart.height,
            padding: chart.padding,
            max_render_points: chart.max_render_points,
            frame_interval_ms: 16,
            kind: ChartKind::default(),
            colors: chart.colors,
        }
    }
}

impl ChartSettings {
    pub fn chart_config(&self) -> ChartConfig {
        ChartConfig {
            width: self.width,
            height: self.height,
            padding: self.padding,
            colors: self.colors,
            max_render_points: self.max_render_points,
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TableSettings {
    pub item_height: f64,
    pub container_height: f64,
    pub overscan: usize,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            item_height: 40.0,
            container_height: 400.0,
            overscan: 5,
        }
    }
}

impl TableSettings {
    pub fn virtual_window(&self) -> VirtualWindow {
        VirtualWindow::new(self.item_height, self.container_height, self.overscan)
    }
}

/// Optional `config/dashboard.toml`, overridden by `DASHBOARD__SECTION__KEY` variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(CONFIG_FILE).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
