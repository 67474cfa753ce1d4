// src/capture/analyser.rs

/// Length of one time-domain snapshot, in mono samples.
pub const ANALYSER_WINDOW: usize = 2048;

/// Fraction of the previous snapshot blended into the next one.
pub const ANALYSER_SMOOTHING: f32 = 0.3;

/// Rolling time-domain analysis window over the live input.
///
/// Holds the most recent [`ANALYSER_WINDOW`] mono samples and exposes them
/// as unsigned bytes centered at 128, which is the form the sampling loop
/// normalizes back to [-1, 1]. Successive snapshots are smoothed with a
/// fixed constant so single-frame spikes do not flicker in the view.
pub struct Analyser {
    window: Vec<f32>,
    smoothed: Vec<f32>,
    primed: bool,
    smoothing: f32,
}

impl Analyser {
    pub fn new() -> Self {
        Self::with_smoothing(ANALYSER_SMOOTHING)
    }

    pub fn with_smoothing(smoothing: f32) -> Self {
        Self {
            window: vec![0.0; ANALYSER_WINDOW],
            smoothed: vec![0.0; ANALYSER_WINDOW],
            primed: false,
            smoothing: smoothing.clamp(0.0, 1.0),
        }
    }

    /// Feed freshly captured mono samples, keeping only the newest
    /// [`ANALYSER_WINDOW`] of them.
    pub fn feed(&mut self, samples: &[f32]) {
        let n = samples.len();
        if n == 0 {
            return;
        }
        if n >= ANALYSER_WINDOW {
            self.window.copy_from_slice(&samples[n - ANALYSER_WINDOW..]);
        } else {
            self.window.copy_within(n.., 0);
            let tail = ANALYSER_WINDOW - n;
            self.window[tail..].copy_from_slice(samples);
        }
    }

    /// Snapshot the current window as unsigned bytes (zero line at 128).
    ///
    /// `out` must be exactly [`ANALYSER_WINDOW`] long.
    pub fn byte_time_domain(&mut self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), ANALYSER_WINDOW);
        if !self.primed {
            self.smoothed.copy_from_slice(&self.window);
            self.primed = true;
        } else {
            let s = self.smoothing;
            for (acc, &cur) in self.smoothed.iter_mut().zip(self.window.iter()) {
                *acc = (1.0 - s) * cur + s * *acc;
            }
        }
        for (dst, &v) in out.iter_mut().zip(self.smoothed.iter()) {
            let byte = (v.clamp(-1.0, 1.0) * 128.0 + 128.0).floor();
            *dst = byte.clamp(0.0, 255.0) as u8;
        }
    }
}

impl Default for Analyser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_maps_to_center_byte() {
        let mut a = Analyser::new();
        let mut out = [0u8; ANALYSER_WINDOW];
        a.byte_time_domain(&mut out);
        assert!(out.iter().all(|&b| b == 128));
    }

    #[test]
    fn test_full_scale_maps_to_extremes() {
        let mut a = Analyser::with_smoothing(0.0);
        let mut buf = vec![1.0f32; ANALYSER_WINDOW];
        buf[0] = -1.0;
        a.feed(&buf);
        let mut out = [0u8; ANALYSER_WINDOW];
        a.byte_time_domain(&mut out);
        assert_eq!(out[0], 0);
        assert_eq!(out[1], 255);
    }

    #[test]
    fn test_feed_keeps_newest_samples() {
        let mut a = Analyser::with_smoothing(0.0);
        a.feed(&vec![0.25f32; ANALYSER_WINDOW]);
        a.feed(&[0.5f32; 8]);
        let mut out = [0u8; ANALYSER_WINDOW];
        a.byte_time_domain(&mut out);
        // Last 8 slots carry the newer value, everything before the older.
        assert_eq!(out[ANALYSER_WINDOW - 1], (0.5f32 * 128.0 + 128.0) as u8);
        assert_eq!(out[0], (0.25f32 * 128.0 + 128.0) as u8);
    }

    #[test]
    fn test_smoothing_blends_previous_snapshot() {
        let mut a = Analyser::new();
        a.feed(&vec![0.0f32; ANALYSER_WINDOW]);
        let mut out = [0u8; ANALYSER_WINDOW];
        a.byte_time_domain(&mut out);

        a.feed(&vec![1.0f32; ANALYSER_WINDOW]);
        a.byte_time_domain(&mut out);
        // 0.7 * 1.0 + 0.3 * 0.0 = 0.7 -> 128 + 89.6 -> 217
        let expected = (0.7f32 * 128.0 + 128.0).floor() as u8;
        assert_eq!(out[0], expected);
    }
}
