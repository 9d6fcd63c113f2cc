// Chart renderer - Grid, axis labels and one of four series strategies on a raster surface
use crate::domain::point::Point;
use crate::rendering::color::Rgba;
use crate::rendering::surface::{RenderError, Surface};
use crate::rendering::viewport::{ChartLayout, DataDomain, Padding, ViewportTransform, ZoomState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

pub const DEFAULT_MAX_RENDER_POINTS: usize = 2000;

const VERTICAL_DIVISIONS: usize = 10;
const HORIZONTAL_DIVISIONS: usize = 8;
const LINE_WIDTH: f32 = 2.0;
const SCATTER_RADIUS: f32 = 3.0;
const BAR_FILL: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
    Scatter,
    Heatmap,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChartColors {
    pub primary: Rgba,
    pub background: Rgba,
    pub grid: Rgba,
    pub text: Rgba,
    pub heat_low: Rgba,
    pub heat_high: Rgba,
}

impl Default for ChartColors {
    fn default() -> Self {
        Self {
            primary: Rgba::rgb(0x3b, 0x82, 0xf6),
            background: Rgba::WHITE,
            grid: Rgba::rgb(0xe5, 0xe7, 0xeb),
            text: Rgba::rgb(0x37, 0x41, 0x51),
            heat_low: Rgba::rgb(0, 255, 128),
            heat_high: Rgba::rgb(255, 0, 128),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    pub padding: Padding,
    pub colors: ChartColors,
    pub max_render_points: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
            padding: Padding::default(),
            colors: ChartColors::default(),
            max_render_points: DEFAULT_MAX_RENDER_POINTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderStats {
    pub input_points: usize,
    pub drawn_points: usize,
}

/// Fixed-stride pick of every `ceil(n / max)`-th point, first point included.
pub fn downsample(points: &[Point], max_points: usize) -> Cow<'_, [Point]> {
    if max_points == 0 || points.len() <= max_points {
        return Cow::Borrowed(points);
    }
    let step = points.len().div_ceil(max_points);
    Cow::Owned(points.iter().step_by(step).cloned().collect())
}

pub fn format_value_label(value: f64) -> String {
    format!("{value:.1}")
}

pub fn format_time_label(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|t| t.format("%-H:%M").to_string())
        .unwrap_or_default()
}

/// Renders one chart. Owns the chart's zoom state.
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    config: ChartConfig,
    kind: ChartKind,
    zoom: ZoomState,
}

impl ChartRenderer {
    pub fn new(config: ChartConfig, kind: ChartKind) -> Self {
        Self {
            config,
            kind,
            zoom: ZoomState::identity(),
        }
    }

    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: ChartKind) {
        self.kind = kind;
    }

    pub fn zoom(&self) -> ZoomState {
        self.zoom
    }

    pub fn zoom_at(&mut self, steps: f64, cursor_x: f64, cursor_y: f64) {
        self.zoom.zoom_at(steps, cursor_x, cursor_y);
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.zoom.pan(dx, dy);
    }

    pub fn reset_zoom(&mut self) {
        self.zoom.reset();
    }

    pub fn render<S>(&self, surface: &mut S, points: &[Point]) -> Result<RenderStats, RenderError>
    where
        S: Surface + ?Sized,
    {
        let layout = ChartLayout::new(surface.width(), surface.height(), self.config.padding);
        if !layout.has_drawing_area() {
            return Err(RenderError::SurfaceTooSmall {
                width: surface.width(),
                height: surface.height(),
            });
        }

        surface.clear(self.config.colors.background);

        let drawn = downsample(points, self.config.max_render_points);
        let Some(domain) = DataDomain::from_points(&drawn) else {
            return Ok(RenderStats::default());
        };
        let view = ViewportTransform::new(layout, domain, self.zoom);

        self.draw_grid(surface, &layout);
        self.draw_axis_labels(surface, &layout, &domain);

        match self.kind {
            ChartKind::Line => self.draw_line(surface, &view, &drawn),
            ChartKind::Bar => self.draw_bars(surface, &view, &drawn),
            ChartKind::Scatter => self.draw_scatter(surface, &view, &drawn),
            ChartKind::Heatmap => self.draw_heatmap(surface, &view, &drawn),
        }

        Ok(RenderStats {
            input_points: points.len(),
            drawn_points: drawn.len(),
        })
    }

    fn draw_grid<S: Surface + ?Sized>(&self, surface: &mut S, layout: &ChartLayout) {
        let color = self.config.colors.grid;
        let p = layout.padding;
        let (right, bottom) = (layout.width - p.right, layout.height - p.bottom);

        for i in 0..=VERTICAL_DIVISIONS {
            let x = p.left + layout.drawing_width() * i as f64 / VERTICAL_DIVISIONS as f64;
            surface.stroke_path(&[(x as f32, p.top as f32), (x as f32, bottom as f32)], 1.0, color);
        }
        for i in 0..=HORIZONTAL_DIVISIONS {
            let y = p.top + layout.drawing_height() * i as f64 / HORIZONTAL_DIVISIONS as f64;
            surface.stroke_path(&[(p.left as f32, y as f32), (right as f32, y as f32)], 1.0, color);
        }
    }

    fn draw_axis_labels<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        layout: &ChartLayout,
        domain: &DataDomain,
    ) {
        let color = self.config.colors.text;
        let p = layout.padding;

        for i in 0..=HORIZONTAL_DIVISIONS {
            let fraction = (HORIZONTAL_DIVISIONS - i) as f64 / HORIZONTAL_DIVISIONS as f64;
            let value = domain.min_value + domain.value_span() * fraction;
            let y = p.top + layout.drawing_height() * i as f64 / HORIZONTAL_DIVISIONS as f64;
            surface.fill_text(&format_value_label(value), (p.left / 2.0) as f32, y as f32, color);
        }

        let label_y = layout.height - p.bottom / 2.0;
        for i in 0..=VERTICAL_DIVISIONS {
            let fraction = i as f64 / VERTICAL_DIVISIONS as f64;
            let time = domain.min_time + (domain.time_span() as f64 * fraction) as i64;
            let x = p.left + layout.drawing_width() * fraction;
            surface.fill_text(&format_time_label(time), x as f32, label_y as f32, color);
        }
    }

    fn draw_line<S: Surface + ?Sized>(&self, surface: &mut S, view: &ViewportTransform, points: &[Point]) {
        let path: Vec<(f32, f32)> = points
            .iter()
            .map(|point| {
                let (x, y) = view.transform(point);
                (x as f32, y as f32)
            })
            .collect();
        surface.stroke_path(&path, LINE_WIDTH, self.config.colors.primary);
    }

    fn draw_bars<S: Surface + ?Sized>(&self, surface: &mut S, view: &ViewportTransform, points: &[Point]) {
        let slot = view.layout.drawing_width() / points.len() as f64;
        let width = slot * BAR_FILL * view.zoom.scale;
        let baseline = view.baseline_y();

        for point in points {
            let (x, y) = view.transform(point);
            surface.fill_rect(
                (x - width / 2.0) as f32,
                y as f32,
                width as f32,
                (baseline - y) as f32,
                self.config.colors.primary,
            );
        }
    }

    fn draw_scatter<S: Surface + ?Sized>(&self, surface: &mut S, view: &ViewportTransform, points: &[Point]) {
        for point in points {
            let (x, y) = view.transform(point);
            surface.fill_disk(x as f32, y as f32, SCATTER_RADIUS, self.config.colors.primary);
        }
    }

    /// Cells fill a square grid in series order, not by position in time.
    fn draw_heatmap<S: Surface + ?Sized>(&self, surface: &mut S, view: &ViewportTransform, points: &[Point]) {
        let side = (points.len() as f64).sqrt().ceil() as usize;
        let cell_w = view.layout.drawing_width() / side as f64;
        let cell_h = view.layout.drawing_height() / side as f64;
        let colors = &self.config.colors;

        for (index, point) in points.iter().enumerate() {
            let (row, col) = (index / side, index % side);
            let origin = (
                view.layout.padding.left + col as f64 * cell_w,
                view.layout.padding.top + row as f64 * cell_h,
            );
            let (x, y) = view.zoom.apply(origin);
            let fill = colors
                .heat_low
                .lerp(colors.heat_high, view.domain.normalize_value(point.value));
            surface.fill_rect(
                x as f32,
                y as f32,
                (cell_w * view.zoom.scale) as f32,
                (cell_h * view.zoom.scale) as f32,
                fill,
            );
        }
    }
}
