// Rendering layer - Viewport math, chart strategies and the raster surface
pub mod chart_renderer;
pub mod color;
pub mod render_loop;
pub mod surface;
pub mod viewport;
