// src/waveform/canvas.rs

/// Straight-alpha RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Software RGBA canvas with a device-pixel multiplier.
///
/// Callers draw in logical coordinates; the backing store is scaled by
/// `dpi` for crisp output on high-density targets. There is no damage
/// tracking: a draw pass clears and repaints the whole surface.
pub struct Canvas {
    width_px: usize,
    height_px: usize,
    dpi: u32,
    pixels: Vec<Rgba>,
}

impl Canvas {
    pub fn new(logical_width: f32, logical_height: f32, dpi: u32) -> Self {
        let dpi = dpi.max(1);
        let width_px = (logical_width.max(0.0) * dpi as f32).round() as usize;
        let height_px = (logical_height.max(0.0) * dpi as f32).round() as usize;
        Self {
            width_px,
            height_px,
            dpi,
            pixels: vec![Rgba::TRANSPARENT; width_px * height_px],
        }
    }

    /// Resize the backing store (logical size), clearing its content.
    pub fn resize(&mut self, logical_width: f32, logical_height: f32) {
        self.width_px = (logical_width.max(0.0) * self.dpi as f32).round() as usize;
        self.height_px = (logical_height.max(0.0) * self.dpi as f32).round() as usize;
        self.pixels.clear();
        self.pixels
            .resize(self.width_px * self.height_px, Rgba::TRANSPARENT);
    }

    pub fn clear(&mut self) {
        self.pixels.fill(Rgba::TRANSPARENT);
    }

    pub fn width_px(&self) -> usize {
        self.width_px
    }

    pub fn height_px(&self) -> usize {
        self.height_px
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgba> {
        if x < self.width_px && y < self.height_px {
            Some(self.pixels[y * self.width_px + x])
        } else {
            None
        }
    }

    fn blend_pixel(&mut self, x: i64, y: i64, color: Rgba) {
        if x < 0 || y < 0 || x as usize >= self.width_px || y as usize >= self.height_px {
            return;
        }
        let idx = y as usize * self.width_px + x as usize;
        let dst = self.pixels[idx];
        let sa = color.a as u32;
        let da = 255 - sa;
        self.pixels[idx] = Rgba::new(
            ((color.r as u32 * sa + dst.r as u32 * da) / 255) as u8,
            ((color.g as u32 * sa + dst.g as u32 * da) / 255) as u8,
            ((color.b as u32 * sa + dst.b as u32 * da) / 255) as u8,
            (sa + dst.a as u32 * da / 255).min(255) as u8,
        );
    }

    /// Fill a closed polygon given in logical coordinates, even-odd rule,
    /// scanline at device resolution.
    pub fn fill_polygon(&mut self, points: &[(f32, f32)], color: Rgba) {
        if points.len() < 3 {
            return;
        }
        let scale = self.dpi as f32;
        let pts: Vec<(f32, f32)> = points.iter().map(|&(x, y)| (x * scale, y * scale)).collect();

        let min_y = pts.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
        let max_y = pts.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
        let y0 = min_y.floor().max(0.0) as i64;
        let y1 = max_y.ceil().min(self.height_px as f32) as i64;

        let mut crossings: Vec<f32> = Vec::new();
        for y in y0..y1 {
            let scan = y as f32 + 0.5;
            crossings.clear();
            for i in 0..pts.len() {
                let (x_a, y_a) = pts[i];
                let (x_b, y_b) = pts[(i + 1) % pts.len()];
                if (y_a <= scan && y_b > scan) || (y_b <= scan && y_a > scan) {
                    let t = (scan - y_a) / (y_b - y_a);
                    crossings.push(x_a + t * (x_b - x_a));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));
            for pair in crossings.chunks(2) {
                if pair.len() < 2 {
                    continue;
                }
                let x_start = pair[0].round().max(0.0) as i64;
                let x_end = pair[1].round().min(self.width_px as f32) as i64;
                for x in x_start..x_end {
                    self.blend_pixel(x, y, color);
                }
            }
        }
    }

    /// Stroke an open polyline, one device pixel wide.
    pub fn stroke_polyline(&mut self, points: &[(f32, f32)], color: Rgba) {
        let scale = self.dpi as f32;
        for pair in points.windows(2) {
            let (x0, y0) = (pair[0].0 * scale, pair[0].1 * scale);
            let (x1, y1) = (pair[1].0 * scale, pair[1].1 * scale);
            self.line(x0, y0, x1, y1, color);
        }
    }

    fn line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgba) {
        let dx = x1 - x0;
        let dy = y1 - y0;
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as i64;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let x = (x0 + t * dx).round() as i64;
            let y = (y0 + t * dy).round() as i64;
            self.blend_pixel(x, y, color);
        }
    }

    /// True if no pixel has been touched since the last clear.
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&p| p == Rgba::TRANSPARENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba = Rgba::new(255, 0, 0, 255);

    #[test]
    fn test_backing_store_scaled_by_dpi() {
        let c = Canvas::new(100.0, 50.0, 2);
        assert_eq!(c.width_px(), 200);
        assert_eq!(c.height_px(), 100);
    }

    #[test]
    fn test_clear_resets_all_pixels() {
        let mut c = Canvas::new(10.0, 10.0, 1);
        c.fill_polygon(&[(1.0, 1.0), (9.0, 1.0), (9.0, 9.0), (1.0, 9.0)], RED);
        assert!(!c.is_blank());
        c.clear();
        assert!(c.is_blank());
    }

    #[test]
    fn test_fill_covers_interior() {
        let mut c = Canvas::new(10.0, 10.0, 1);
        c.fill_polygon(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)], RED);
        assert_eq!(c.pixel(5, 5), Some(RED));
        assert_eq!(c.pixel(1, 8), Some(RED));
    }

    #[test]
    fn test_degenerate_polygon_ignored() {
        let mut c = Canvas::new(10.0, 10.0, 1);
        c.fill_polygon(&[(1.0, 1.0), (2.0, 2.0)], RED);
        assert!(c.is_blank());
    }

    #[test]
    fn test_stroke_marks_endpoints() {
        let mut c = Canvas::new(10.0, 10.0, 1);
        c.stroke_polyline(&[(0.0, 0.0), (9.0, 0.0)], RED);
        assert_eq!(c.pixel(0, 0), Some(RED));
        assert_eq!(c.pixel(9, 0), Some(RED));
    }

    #[test]
    fn test_out_of_bounds_draw_is_safe() {
        let mut c = Canvas::new(4.0, 4.0, 1);
        c.stroke_polyline(&[(-10.0, -10.0), (20.0, 20.0)], RED);
        c.fill_polygon(&[(-5.0, -5.0), (50.0, -5.0), (50.0, 50.0)], RED);
        // No panic, and in-bounds pixels along the diagonal are set.
        assert_eq!(c.pixel(2, 2), Some(RED));
    }
}
