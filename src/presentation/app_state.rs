// Application state for HTTP handlers
use crate::application::dashboard_session::DashboardSession;
use crate::application::series_generator::GeneratorConfig;
use crate::application::virtual_window::VirtualWindow;
use crate::rendering::render_loop::ChartView;
use std::sync::Arc;

pub struct AppState {
    pub session: Arc<DashboardSession>,
    pub chart: Arc<ChartView>,
    pub table: VirtualWindow,
    /// Used by the on-demand data routes when the request carries no config.
    pub generator: GeneratorConfig,
}
