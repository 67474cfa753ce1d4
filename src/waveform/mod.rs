// src/waveform/mod.rs

pub mod canvas;
pub mod painter;
pub mod terminal;

use crate::capture::window::SAMPLES_PER_SECOND;

/// Ruler span on each side of the fixed center playhead, in seconds.
pub const SECONDS_PER_SIDE: u64 = 5;

/// Logical canvas height in pixels.
pub const WAVEFORM_HEIGHT: f32 = 160.0;

/// Device-pixel multiplier for the canvas backing store.
pub const CANVAS_DPI: u32 = 2;

/// Off-screen markers within this margin of the viewport edges are still
/// kept; anything farther out is culled from the render list.
pub const EDGE_CULL_MARGIN: f32 = 100.0;

/// One ruler label, positioned on the moving track.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeMarker {
    /// Horizontal position on the track, in logical px.
    pub position: f32,
    pub label: String,
    /// Offset from the playhead, in whole seconds.
    pub time: i64,
}

/// Pure view geometry for the live visualizer. Everything here is a
/// function of the container width and the current sample count; nothing
/// is cached between draws.
#[derive(Debug, Clone, Copy)]
pub struct ViewGeometry {
    pub container_width: f32,
}

impl ViewGeometry {
    pub fn new(container_width: f32) -> Self {
        Self { container_width }
    }

    /// Fixed playhead coordinate: the horizontal center of the container.
    pub fn center(&self) -> f32 {
        self.container_width / 2.0
    }

    pub fn pixels_per_second(&self) -> f32 {
        (self.container_width / 2.0) / SECONDS_PER_SIDE as f32
    }

    /// Width of one visual sample column on the track.
    pub fn sample_width_px(&self) -> f32 {
        self.pixels_per_second() / SAMPLES_PER_SECOND as f32
    }

    /// Right edge of the newest sample on the (untranslated) track.
    pub fn last_sample_position(&self, sample_count: usize) -> f32 {
        sample_count as f32 * self.sample_width_px()
    }

    /// Leftward track translation that pins the newest sample under the
    /// playhead. With no data (or not recording) the track stays centered.
    pub fn translate_x(&self, recording: bool, sample_count: usize) -> f32 {
        if recording && sample_count > 0 {
            self.center() - self.last_sample_position(sample_count)
        } else {
            self.center()
        }
    }

    /// Logical canvas width: enough room for the history plus the empty
    /// right half, never less than the container plus both margins.
    pub fn canvas_width(&self, sample_count: usize) -> f32 {
        let track = self.last_sample_position(sample_count)
            + SECONDS_PER_SIDE as f32 * self.pixels_per_second()
            + 100.0;
        track.max(self.container_width + 200.0)
    }

    /// Ruler labels for every whole second around the playhead, with
    /// off-screen entries culled.
    pub fn time_markers(&self, recording: bool, sample_count: usize) -> Vec<TimeMarker> {
        let anchor = self.last_sample_position(sample_count);
        let translate = self.translate_x(recording, sample_count);
        let pps = self.pixels_per_second();

        let mut markers = Vec::new();
        for time in -(SECONDS_PER_SIDE as i64)..=(SECONDS_PER_SIDE as i64) {
            let on_track = anchor + time as f32 * pps;
            let on_screen = on_track + translate;
            if on_screen < -EDGE_CULL_MARGIN || on_screen > self.container_width + EDGE_CULL_MARGIN
            {
                continue;
            }
            markers.push(TimeMarker {
                position: on_track,
                label: marker_label(time),
                time,
            });
        }
        markers
    }
}

/// Ruler label: `0:00` at the playhead, signed `MM:SS` elsewhere.
fn marker_label(time: i64) -> String {
    if time == 0 {
        return "0:00".to_string();
    }
    let abs = time.unsigned_abs();
    let minutes = abs / 60;
    let seconds = abs % 60;
    if time < 0 {
        format!("-{:02}:{:02}", minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Elapsed-time readout shown while recording: `mm:ss.d` with deciseconds.
pub fn format_timer(total_seconds: f64) -> String {
    let total_seconds = total_seconds.max(0.0);
    let minutes = (total_seconds / 60.0).floor() as u64;
    let seconds = (total_seconds % 60.0).floor() as u64;
    let deciseconds = ((total_seconds % 1.0) * 10.0).floor() as u64;
    format!("{:02}:{:02}.{}", minutes, seconds, deciseconds)
}
