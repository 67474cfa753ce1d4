// src/capture/window.rs

use std::collections::VecDeque;

/// Target visual sampling rate (snapshots per second of wall time).
pub const SAMPLES_PER_SECOND: u64 = 60;

/// Span of the sliding history window, in seconds.
pub const VIEW_WINDOW_SECONDS: u64 = 10;

/// Hard cap on stored snapshots. Oldest entries are evicted first.
pub const MAX_SAMPLES: usize = (VIEW_WINDOW_SECONDS * SAMPLES_PER_SECOND) as usize;

/// Minimum wall-time gap between two accepted snapshots, in ms.
/// The tick driver runs at display refresh rate; this decouples the
/// stored sample density from however fast frames actually arrive.
pub const MIN_SAMPLE_INTERVAL_MS: u64 = 1000 / SAMPLES_PER_SECOND;

/// Map one unsigned analyser byte to a signed float in [-1, 1].
/// 128 is the zero line: 0 -> -1.0, 128 -> 0.0, 255 -> 127/128.
#[inline]
pub fn normalize_byte(b: u8) -> f32 {
    (b as f32 - 128.0) / 128.0
}

/// Normalize a whole analyser snapshot.
pub fn normalize_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes.iter().map(|&b| normalize_byte(b)).collect()
}

/// One snapshot of the live input. Immutable once pushed into the window.
#[derive(Debug, Clone)]
pub struct WaveformSample {
    pub data: Vec<f32>,
    pub timestamp_ms: u64,
}

/// Insertion-ordered sliding window of snapshots, capped at [`MAX_SAMPLES`].
///
/// The window also owns the acceptance clock: a push is only accepted when
/// at least [`MIN_SAMPLE_INTERVAL_MS`] has passed since the last accepted
/// push. Rejected pushes leave both the window and the clock untouched.
pub struct SampleWindow {
    samples: VecDeque<WaveformSample>,
    last_accepted_ms: Option<u64>,
}

impl SampleWindow {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(MAX_SAMPLES),
            last_accepted_ms: None,
        }
    }

    /// Would a tick at `now_ms` pass the throttle?
    pub fn accepts(&self, now_ms: u64) -> bool {
        match self.last_accepted_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= MIN_SAMPLE_INTERVAL_MS,
        }
    }

    /// Append a snapshot if the throttle allows it, evicting the oldest
    /// entry when the cap would be exceeded. Returns whether the push
    /// was accepted.
    pub fn push(&mut self, data: Vec<f32>, now_ms: u64) -> bool {
        if !self.accepts(now_ms) {
            return false;
        }
        self.last_accepted_ms = Some(now_ms);
        self.samples.push_back(WaveformSample {
            data,
            timestamp_ms: now_ms,
        });
        while self.samples.len() > MAX_SAMPLES {
            self.samples.pop_front();
        }
        true
    }

    /// Empty the window and reset the acceptance clock. Called whenever a
    /// new recording session starts.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.last_accepted_ms = None;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WaveformSample> {
        self.samples.iter()
    }

    pub fn oldest(&self) -> Option<&WaveformSample> {
        self.samples.front()
    }

    pub fn latest(&self) -> Option<&WaveformSample> {
        self.samples.back()
    }
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new()
    }
}
