// src/playback/peaks.rs

use anyhow::Result;
use std::path::Path;

use crate::playback::engine::decode_mono;

/// Peak-normalized min/max envelope of a finished take, one bin per
/// display column. This is the static picture behind the transport; the
/// live visualizer never uses it.
pub struct Peaks {
    pub mins: Vec<f32>,
    pub maxs: Vec<f32>,
}

impl Peaks {
    /// Bin mono frames into `columns` min/max pairs and normalize so the
    /// loudest moment spans the full height.
    pub fn from_frames(frames: &[f32], columns: usize) -> Self {
        let columns = columns.max(1);
        if frames.is_empty() {
            return Self {
                mins: Vec::new(),
                maxs: Vec::new(),
            };
        }

        let bin = (frames.len() / columns).max(1);
        let mut mins = Vec::with_capacity(columns);
        let mut maxs = Vec::with_capacity(columns);
        let mut peak = 0.0f32;

        for chunk in frames.chunks(bin) {
            let mut lo = f32::INFINITY;
            let mut hi = f32::NEG_INFINITY;
            for &s in chunk {
                if s < lo {
                    lo = s;
                }
                if s > hi {
                    hi = s;
                }
                if s.abs() > peak {
                    peak = s.abs();
                }
            }
            mins.push(lo);
            maxs.push(hi);
            if mins.len() == columns {
                break;
            }
        }

        if peak > 0.0 {
            let scale = 1.0 / peak;
            for v in mins.iter_mut().chain(maxs.iter_mut()) {
                *v *= scale;
            }
        }

        Self { mins, maxs }
    }

    /// Decode a take from disk and bin it.
    pub fn from_file(path: &Path, columns: usize) -> Result<Self> {
        let (frames, _rate) = decode_mono(&path.to_string_lossy())?;
        Ok(Self::from_frames(&frames, columns))
    }

    pub fn len(&self) -> usize {
        self.mins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mins.is_empty()
    }
}

/// Map a clicked display column to a progress fraction in [0, 1].
pub fn column_to_fraction(column: usize, columns: usize) -> f64 {
    if columns == 0 {
        return 0.0;
    }
    (column.min(columns - 1) as f64) / columns as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let p = Peaks::from_frames(&[], 100);
        assert!(p.is_empty());
    }

    #[test]
    fn test_bins_capture_extremes() {
        // Two bins: first all positive, second all negative.
        let mut frames = vec![0.5f32; 100];
        frames.extend(vec![-0.5f32; 100]);
        let p = Peaks::from_frames(&frames, 2);
        assert_eq!(p.len(), 2);
        assert_eq!(p.maxs[0], 1.0, "normalized to the global peak");
        assert_eq!(p.mins[1], -1.0);
    }

    #[test]
    fn test_normalization_scales_to_peak() {
        let frames = vec![0.25f32, -0.125, 0.25, 0.125];
        let p = Peaks::from_frames(&frames, 1);
        assert_eq!(p.maxs[0], 1.0);
        assert_eq!(p.mins[0], -0.5);
    }

    #[test]
    fn test_column_count_bounded() {
        let frames = vec![0.1f32; 1000];
        let p = Peaks::from_frames(&frames, 64);
        assert!(p.len() <= 64);
    }

    #[test]
    fn test_column_to_fraction() {
        assert_eq!(column_to_fraction(0, 100), 0.0);
        assert_eq!(column_to_fraction(50, 100), 0.5);
        assert_eq!(column_to_fraction(200, 100), 0.99);
        assert_eq!(column_to_fraction(5, 0), 0.0);
    }
}
