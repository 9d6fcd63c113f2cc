// Raster surface - Drawing primitives the chart renderer needs, plus an in-memory RGBA target
use crate::rendering::color::Rgba;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Surface {width}x{height} leaves no drawing area inside the padding")]
    SurfaceTooSmall { width: u32, height: u32 },
    #[error("PNG encoding error: {0}")]
    Encoding(#[from] png::EncodingError),
}

/// 2D raster target supplied by the host.
pub trait Surface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba);
    fn stroke_path(&mut self, path: &[(f32, f32)], line_width: f32, color: Rgba);
    fn fill_disk(&mut self, cx: f32, cy: f32, radius: f32, color: Rgba);
    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Rgba);

    fn clear(&mut self, color: Rgba) {
        let (w, h) = (self.width() as f32, self.height() as f32);
        self.fill_rect(0.0, 0.0, w, h, color);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// Row-major RGBA pixel buffer. Text is recorded as labels rather than rasterized.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    labels: Vec<TextLabel>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
            labels: Vec::new(),
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let p = &self.pixels[i..i + 4];
        Some(Rgba::new(p[0], p[1], p[2], p[3]))
    }

    pub fn labels(&self) -> &[TextLabel] {
        &self.labels
    }

    pub fn count_color(&self, color: Rgba) -> usize {
        let target = color.to_array();
        self.pixels.chunks_exact(4).filter(|p| *p == target).count()
    }

    fn set_pixel(&mut self, x: i64, y: i64, color: Rgba) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[i..i + 4].copy_from_slice(&color.to_array());
    }

    fn span(&mut self, x0: i64, x1: i64, y: i64, color: Rgba) {
        if y < 0 || y >= self.height as i64 {
            return;
        }
        for x in x0.max(0)..=x1.min(self.width as i64 - 1) {
            self.set_pixel(x, y, color);
        }
    }

    /// Bresenham between two in-bounds-ish integer points, stamping a square brush.
    fn line(&mut self, (x0, y0): (i64, i64), (x1, y1): (i64, i64), brush: i64, color: Rgba) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);
        let half = brush / 2;

        loop {
            for by in 0..brush {
                self.span(x - half, x - half + brush - 1, y - half + by, color);
            }
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Liang-Barsky clip of a segment against the buffer, with a small margin.
    fn clip(&self, a: (f32, f32), b: (f32, f32)) -> Option<((i64, i64), (i64, i64))> {
        let (x0, y0) = (f64::from(a.0), f64::from(a.1));
        let (x1, y1) = (f64::from(b.0), f64::from(b.1));
        let (min_x, min_y) = (-2.0f64, -2.0f64);
        let (max_x, max_y) = (f64::from(self.width) + 2.0, f64::from(self.height) + 2.0);
        let (dx, dy) = (x1 - x0, y1 - y0);
        let (mut t0, mut t1) = (0.0f64, 1.0f64);

        for (p, q) in [
            (-dx, x0 - min_x),
            (dx, max_x - x0),
            (-dy, y0 - min_y),
            (dy, max_y - y0),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }

        let at = |t: f64| ((x0 + t * dx).round() as i64, (y0 + t * dy).round() as i64);
        Some((at(t0), at(t1)))
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, RenderError> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.pixels)?;
        }
        Ok(out)
    }
}

impl Surface for Framebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        if !(x.is_finite() && y.is_finite() && w.is_finite() && h.is_finite()) {
            return;
        }
        let (left, right) = if w < 0.0 { (x + w, x) } else { (x, x + w) };
        let (top, bottom) = if h < 0.0 { (y + h, y) } else { (y, y + h) };

        let x0 = left.round().max(0.0) as i64;
        let x1 = (right.round() as i64).min(self.width as i64);
        let y0 = top.round().max(0.0) as i64;
        let y1 = (bottom.round() as i64).min(self.height as i64);

        for row in y0..y1 {
            self.span(x0, x1 - 1, row, color);
        }
    }

    fn stroke_path(&mut self, path: &[(f32, f32)], line_width: f32, color: Rgba) {
        let brush = line_width.round().max(1.0) as i64;
        for segment in path.windows(2) {
            let (a, b) = (segment[0], segment[1]);
            if !(a.0.is_finite() && a.1.is_finite() && b.0.is_finite() && b.1.is_finite()) {
                continue;
            }
            if let Some((a, b)) = self.clip(a, b) {
                self.line(a, b, brush, color);
            }
        }
    }

    fn fill_disk(&mut self, cx: f32, cy: f32, radius: f32, color: Rgba) {
        if !(cx.is_finite() && cy.is_finite()) || radius < 0.0 {
            return;
        }
        let r = radius.ceil() as i64;
        let (cx_i, cy_i) = (cx.round() as i64, cy.round() as i64);
        if cx_i + r < 0 || cy_i + r < 0 || cx_i - r >= self.width as i64 || cy_i - r >= self.height as i64 {
            return;
        }
        let r2 = f64::from(radius) * f64::from(radius);
        for dy in -r..=r {
            let reach = (r2 - (dy * dy) as f64).max(0.0).sqrt().floor() as i64;
            if (dy * dy) as f64 <= r2 {
                self.span(cx_i - reach, cx_i + reach, cy_i + dy, color);
            }
        }
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, _color: Rgba) {
        self.labels.push(TextLabel {
            text: text.to_string(),
            x,
            y,
        });
    }

    fn clear(&mut self, color: Rgba) {
        let pattern = color.to_array();
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&pattern);
        }
        self.labels.clear();
    }
}
