// src/waveform/painter.rs

use crate::capture::window::SampleWindow;
use crate::waveform::canvas::{Canvas, Rgba};
use crate::waveform::{ViewGeometry, WAVEFORM_HEIGHT};

/// Fixed gap kept above and below the waveform, in logical px.
pub const AMPLITUDE_MARGIN: f32 = 10.0;

pub const FILL_COLOR: Rgba = Rgba::new(255, 107, 53, 77);
pub const STROKE_COLOR: Rgba = Rgba::new(255, 107, 53, 255);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Mirrored point clouds for the waveform body: the top edge in arrival
/// order and the bottom edge in the same order (reversed by the caller
/// when closing the polygon).
pub struct WaveformPoints {
    pub top: Vec<Point>,
    pub bottom: Vec<Point>,
}

/// Walk every sample's amplitude data and project it onto the track.
///
/// Each sample occupies one `sample_width_px` column. Within a column the
/// raw data is strided down to roughly one point per pixel; the stride is
/// clamped to at least 1, which under-samples very narrow columns rather
/// than plotting every value.
pub fn collect_points(window: &SampleWindow, geo: &ViewGeometry) -> WaveformPoints {
    let sample_width = geo.sample_width_px();
    let center_y = (WAVEFORM_HEIGHT / 2.0).round();
    let max_amplitude = WAVEFORM_HEIGHT / 2.0 - AMPLITUDE_MARGIN;

    let mut top = Vec::new();
    let mut bottom = Vec::new();
    let mut current_x = 0.0f32;

    for sample in window.iter() {
        let data = &sample.data;
        if !data.is_empty() {
            let points_per_pixel = data.len() as f32 / sample_width;
            let step = (points_per_pixel.floor() as usize).max(1);

            let mut j = 0usize;
            while j < data.len() {
                let amplitude = data[j] * max_amplitude;
                let x = current_x + (j as f32 / data.len() as f32) * sample_width;
                top.push(Point {
                    x,
                    y: center_y - amplitude,
                });
                bottom.push(Point {
                    x,
                    y: center_y + amplitude,
                });
                j += step;
            }
        }
        current_x += sample_width;
    }

    WaveformPoints { top, bottom }
}

/// Repaint the waveform from scratch: clear, fill the closed body
/// polygon (top path forward, bottom path reversed), then stroke the two
/// edges. An empty window leaves the canvas blank; the center line and
/// playhead are fixed overlays owned by the frontend, not by this pass.
pub fn draw(window: &SampleWindow, geo: &ViewGeometry, canvas: &mut Canvas) {
    canvas.clear();
    if window.is_empty() {
        return;
    }

    let points = collect_points(window, geo);
    if points.top.is_empty() {
        return;
    }

    let mut polygon: Vec<(f32, f32)> = Vec::with_capacity(points.top.len() * 2);
    polygon.extend(points.top.iter().map(|p| (p.x, p.y)));
    polygon.extend(points.bottom.iter().rev().map(|p| (p.x, p.y)));
    canvas.fill_polygon(&polygon, FILL_COLOR);

    let top_path: Vec<(f32, f32)> = points.top.iter().map(|p| (p.x, p.y)).collect();
    let bottom_path: Vec<(f32, f32)> = points.bottom.iter().map(|p| (p.x, p.y)).collect();
    canvas.stroke_polyline(&top_path, STROKE_COLOR);
    canvas.stroke_polyline(&bottom_path, STROKE_COLOR);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::CANVAS_DPI;

    fn window_with(samples: usize, data: Vec<f32>) -> SampleWindow {
        let mut w = SampleWindow::new();
        for i in 0..samples {
            w.push(data.clone(), i as u64 * 100);
        }
        w
    }

    #[test]
    fn test_empty_window_draws_nothing() {
        let geo = ViewGeometry::new(600.0);
        let w = SampleWindow::new();
        let mut canvas = Canvas::new(geo.canvas_width(0), WAVEFORM_HEIGHT, CANVAS_DPI);
        draw(&w, &geo, &mut canvas);
        assert!(canvas.is_blank());
    }

    #[test]
    fn test_points_are_mirrored_around_center() {
        let geo = ViewGeometry::new(600.0);
        let w = window_with(3, vec![0.5, -0.25, 1.0, 0.0]);
        let points = collect_points(&w, &geo);
        let center_y = (WAVEFORM_HEIGHT / 2.0).round();
        assert_eq!(points.top.len(), points.bottom.len());
        for (t, b) in points.top.iter().zip(points.bottom.iter()) {
            assert_eq!(t.x, b.x);
            assert!(((center_y - t.y) - (b.y - center_y)).abs() < 1e-4);
        }
    }

    #[test]
    fn test_amplitude_respects_margins() {
        let geo = ViewGeometry::new(600.0);
        // Full-scale input must stay inside the fixed top/bottom margins.
        let w = window_with(2, vec![1.0, -1.0]);
        let points = collect_points(&w, &geo);
        for p in points.top.iter().chain(points.bottom.iter()) {
            assert!(p.y >= AMPLITUDE_MARGIN - 1.0);
            assert!(p.y <= WAVEFORM_HEIGHT - AMPLITUDE_MARGIN + 1.0);
        }
    }

    #[test]
    fn test_stride_clamped_to_one() {
        // Wide columns: fewer data points than pixels, stride stays 1 and
        // every point is plotted.
        let geo = ViewGeometry::new(6000.0); // sample_width = 10 px
        let w = window_with(1, vec![0.1, 0.2, 0.3]);
        let points = collect_points(&w, &geo);
        assert_eq!(points.top.len(), 3);
    }

    #[test]
    fn test_stride_subsamples_narrow_columns() {
        // 2048 points into a 1 px column: stride 2048, one point kept.
        let geo = ViewGeometry::new(600.0);
        let w = window_with(1, vec![0.5; 2048]);
        let points = collect_points(&w, &geo);
        assert_eq!(points.top.len(), 1);
    }

    #[test]
    fn test_draw_touches_canvas() {
        let geo = ViewGeometry::new(600.0);
        let w = window_with(60, vec![0.6; 32]);
        let mut canvas = Canvas::new(geo.canvas_width(w.len()), WAVEFORM_HEIGHT, CANVAS_DPI);
        draw(&w, &geo, &mut canvas);
        assert!(!canvas.is_blank());
    }

    #[test]
    fn test_columns_advance_with_arrival_order() {
        let geo = ViewGeometry::new(600.0);
        let w = window_with(4, vec![0.2; 8]);
        let points = collect_points(&w, &geo);
        let xs: Vec<f32> = points.top.iter().map(|p| p.x).collect();
        let mut sorted = xs.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(xs, sorted, "points must march left to right");
    }
}
