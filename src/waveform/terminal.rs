// src/waveform/terminal.rs

use crate::capture::window::SampleWindow;

/// Per-column min/max envelope of the newest `columns` snapshots.
pub fn window_columns(window: &SampleWindow, columns: usize) -> (Vec<f32>, Vec<f32>) {
    let skip = window.len().saturating_sub(columns);
    let mut mins = Vec::with_capacity(window.len().min(columns));
    let mut maxs = Vec::with_capacity(window.len().min(columns));
    for sample in window.iter().skip(skip) {
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for &v in &sample.data {
            if v < lo {
                lo = v;
            }
            if v > hi {
                hi = v;
            }
        }
        if lo.is_finite() && hi.is_finite() {
            mins.push(lo);
            maxs.push(hi);
        } else {
            mins.push(0.0);
            maxs.push(0.0);
        }
    }
    (mins, maxs)
}

/// Rasterize a min/max envelope into text rows for the CLI frontend.
/// The center row doubles as the zero line when a column is silent.
pub fn render_envelope(mins: &[f32], maxs: &[f32], height: usize) -> Vec<String> {
    let h = height.max(4);
    let mut rows = vec![vec![' '; mins.len()]; h];
    let to_row = |v: f32| -> usize {
        let clamped = v.clamp(-1.0, 1.0);
        let y = (0.5 - 0.5 * clamped) * (h as f32 - 1.0);
        y.round() as usize
    };
    for x in 0..mins.len() {
        let lo_row = to_row(mins[x]);
        let hi_row = to_row(maxs[x]);
        let (a, b) = if hi_row <= lo_row {
            (hi_row, lo_row)
        } else {
            (lo_row, hi_row)
        };
        for (y, row) in rows.iter_mut().enumerate() {
            if y >= a && y <= b {
                row[x] = '█';
            } else if y == h / 2 {
                row[x] = '─';
            }
        }
    }
    rows.into_iter().map(|r| r.into_iter().collect()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_take_newest_samples() {
        let mut w = SampleWindow::new();
        for i in 0..10u64 {
            let v = i as f32 / 10.0;
            w.push(vec![-v, v], i * 100);
        }
        let (mins, maxs) = window_columns(&w, 4);
        assert_eq!(mins.len(), 4);
        assert_eq!(maxs, vec![0.6, 0.7, 0.8, 0.9]);
        assert_eq!(mins, vec![-0.6, -0.7, -0.8, -0.9]);
    }

    #[test]
    fn test_render_full_scale_column() {
        let rows = render_envelope(&[-1.0], &[1.0], 8);
        assert_eq!(rows.len(), 8);
        for row in &rows {
            assert_eq!(row.as_str(), "█");
        }
    }

    #[test]
    fn test_render_silent_column_shows_zero_line() {
        let rows = render_envelope(&[0.0], &[0.0], 9);
        let filled: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.contains('█'))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(filled, vec![4], "silence collapses to the center row");
    }
}
