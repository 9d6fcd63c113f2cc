// Viewport - Data domain to pixel mapping under the chart's pan/zoom state
use crate::domain::point::Point;
use serde::{Deserialize, Serialize};

pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 3.0;
pub const ZOOM_STEP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 20.0,
            bottom: 40.0,
            left: 60.0,
        }
    }
}

/// Surface size and the padded drawing rectangle inside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    pub padding: Padding,
}

impl ChartLayout {
    pub fn new(width: u32, height: u32, padding: Padding) -> Self {
        Self {
            width: f64::from(width),
            height: f64::from(height),
            padding,
        }
    }

    pub fn drawing_width(&self) -> f64 {
        self.width - self.padding.left - self.padding.right
    }

    pub fn drawing_height(&self) -> f64 {
        self.height - self.padding.top - self.padding.bottom
    }

    pub fn has_drawing_area(&self) -> bool {
        self.drawing_width() > 0.0 && self.drawing_height() > 0.0
    }
}

/// Value and time bounds of the series being drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataDomain {
    pub min_value: f64,
    pub max_value: f64,
    pub min_time: i64,
    pub max_time: i64,
}

impl DataDomain {
    /// `None` for an empty series.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let seed = Self {
            min_value: first.value,
            max_value: first.value,
            min_time: first.timestamp,
            max_time: first.timestamp,
        };
        Some(points.iter().skip(1).fold(seed, |d, p| Self {
            min_value: d.min_value.min(p.value),
            max_value: d.max_value.max(p.value),
            min_time: d.min_time.min(p.timestamp),
            max_time: d.max_time.max(p.timestamp),
        }))
    }

    pub fn value_span(&self) -> f64 {
        self.max_value - self.min_value
    }

    pub fn time_span(&self) -> i64 {
        self.max_time - self.min_time
    }

    /// Position of `value` in [0, 1]; 0.5 when the range is degenerate.
    pub fn normalize_value(&self, value: f64) -> f64 {
        let span = self.value_span();
        if span == 0.0 {
            0.5
        } else {
            (value - self.min_value) / span
        }
    }

    pub fn normalize_time(&self, timestamp: i64) -> f64 {
        let span = self.time_span();
        if span == 0 {
            0.5
        } else {
            (timestamp - self.min_time) as f64 / span as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomState {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for ZoomState {
    fn default() -> Self {
        Self::identity()
    }
}

impl ZoomState {
    pub const fn identity() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Wheel zoom by `steps` notches (positive zooms in), keeping the content
    /// under `(cursor_x, cursor_y)` fixed.
    pub fn zoom_at(&mut self, steps: f64, cursor_x: f64, cursor_y: f64) {
        let scale = (self.scale + steps * ZOOM_STEP).clamp(MIN_SCALE, MAX_SCALE);
        // screen = (p - offset) * scale, solved for the offset that maps p to the cursor
        self.offset_x += cursor_x / self.scale - cursor_x / scale;
        self.offset_y += cursor_y / self.scale - cursor_y / scale;
        self.scale = scale;
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    pub fn reset(&mut self) {
        *self = Self::identity();
    }

    pub fn apply(&self, (x, y): (f64, f64)) -> (f64, f64) {
        ((x - self.offset_x) * self.scale, (y - self.offset_y) * self.scale)
    }
}

/// Maps points to pixels for one frame.
#[derive(Debug, Clone, Copy)]
pub struct ViewportTransform {
    pub layout: ChartLayout,
    pub domain: DataDomain,
    pub zoom: ZoomState,
}

impl ViewportTransform {
    pub fn new(layout: ChartLayout, domain: DataDomain, zoom: ZoomState) -> Self {
        Self {
            layout,
            domain,
            zoom,
        }
    }

    pub fn transform(&self, point: &Point) -> (f64, f64) {
        let x = self.layout.padding.left
            + self.domain.normalize_time(point.timestamp) * self.layout.drawing_width();
        let y = self.value_to_y(point.value);
        self.zoom.apply((x, y))
    }

    /// Unzoomed y for a value; larger values sit higher.
    pub fn value_to_y(&self, value: f64) -> f64 {
        let height = self.layout.drawing_height();
        self.layout.padding.top + height - self.domain.normalize_value(value) * height
    }

    /// Zoomed y of the zero baseline, clamped to the bottom of the drawing area.
    pub fn baseline_y(&self) -> f64 {
        let bottom = self.layout.padding.top + self.layout.drawing_height();
        let y = self.value_to_y(0.0).min(bottom);
        self.zoom.apply((0.0, y)).1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn layout() -> ChartLayout {
        ChartLayout::new(800, 400, Padding::default())
    }

    fn domain() -> DataDomain {
        DataDomain {
            min_value: 0.0,
            max_value: 100.0,
            min_time: 0,
            max_time: 1000,
        }
    }

    #[test]
    fn test_layout_drawing_area() {
        let layout = layout();
        assert_eq!(layout.drawing_width(), 720.0);
        assert_eq!(layout.drawing_height(), 340.0);
        assert!(!ChartLayout::new(50, 50, Padding::default()).has_drawing_area());
    }

    #[test]
    fn test_domain_from_points() {
        let points = vec![Point::new(500, 3.0), Point::new(100, 9.0), Point::new(900, 1.0)];
        let domain = DataDomain::from_points(&points).unwrap();
        assert_eq!(domain.min_value, 1.0);
        assert_eq!(domain.max_value, 9.0);
        assert_eq!(domain.min_time, 100);
        assert_eq!(domain.max_time, 900);
        assert!(DataDomain::from_points(&[]).is_none());
    }

    #[test]
    fn test_transform_corners_and_y_inversion() {
        let view = ViewportTransform::new(layout(), domain(), ZoomState::identity());
        assert_eq!(view.transform(&Point::new(0, 0.0)), (60.0, 360.0));
        assert_eq!(view.transform(&Point::new(1000, 100.0)), (780.0, 20.0));

        let (_, low) = view.transform(&Point::new(500, 10.0));
        let (_, high) = view.transform(&Point::new(500, 90.0));
        assert!(high < low);
    }

    #[test]
    fn test_degenerate_domain_maps_to_midpoint() {
        let flat = DataDomain {
            min_value: 7.0,
            max_value: 7.0,
            min_time: 42,
            max_time: 42,
        };
        let view = ViewportTransform::new(layout(), flat, ZoomState::identity());
        let (x, y) = view.transform(&Point::new(42, 7.0));
        assert_eq!(x, 60.0 + 360.0);
        assert_eq!(y, 20.0 + 170.0);
        assert!(x.is_finite() && y.is_finite());
    }

    #[test]
    fn test_zoom_applied_after_mapping() {
        let zoom = ZoomState {
            scale: 2.0,
            offset_x: 10.0,
            offset_y: 20.0,
        };
        let view = ViewportTransform::new(layout(), domain(), zoom);
        assert_eq!(view.transform(&Point::new(0, 0.0)), ((60.0 - 10.0) * 2.0, (360.0 - 20.0) * 2.0));
    }

    #[test]
    fn test_zoom_keeps_cursor_point_fixed() {
        let mut zoom = ZoomState::identity();
        let under_cursor = (400.0, 200.0);
        zoom.zoom_at(3.0, under_cursor.0, under_cursor.1);

        assert_relative_eq!(zoom.scale, 1.3, epsilon = 1e-9);
        let (x, y) = zoom.apply(under_cursor);
        assert_relative_eq!(x, 400.0, epsilon = 1e-9);
        assert_relative_eq!(y, 200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zoom_in_then_out_restores_scale() {
        let mut zoom = ZoomState::identity();
        zoom.pan(15.0, -5.0);
        let before = zoom;

        zoom.zoom_at(1.0, 320.0, 180.0);
        zoom.zoom_at(-1.0, 320.0, 180.0);

        assert_relative_eq!(zoom.scale, before.scale, epsilon = 1e-9);
        assert_relative_eq!(zoom.offset_x, before.offset_x, epsilon = 1e-9);
        assert_relative_eq!(zoom.offset_y, before.offset_y, epsilon = 1e-9);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut zoom = ZoomState::identity();
        zoom.zoom_at(100.0, 10.0, 10.0);
        assert_eq!(zoom.scale, MAX_SCALE);
        zoom.zoom_at(-100.0, 10.0, 10.0);
        assert_eq!(zoom.scale, MIN_SCALE);
    }

    #[test]
    fn test_reset_restores_identity() {
        let mut zoom = ZoomState::identity();
        zoom.zoom_at(4.0, 100.0, 50.0);
        zoom.pan(-30.0, 12.5);
        zoom.reset();
        assert_eq!(zoom, ZoomState::identity());
    }

    #[test]
    fn test_baseline_clamped_to_drawing_bottom() {
        let positive = DataDomain {
            min_value: 50.0,
            ..domain()
        };
        let view = ViewportTransform::new(layout(), positive, ZoomState::identity());
        assert_eq!(view.baseline_y(), 360.0);

        let view = ViewportTransform::new(layout(), domain(), ZoomState::identity());
        assert_eq!(view.baseline_y(), 360.0);
    }
}
