// src/controller.rs

use std::cell::Cell;
use std::fmt::Write as FmtWrite;
use std::io::{stdout, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use crossterm::event::KeyCode;
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{BeginSynchronizedUpdate, Clear, ClearType, EndSynchronizedUpdate},
};

use crate::capture::CaptureSession;
use crate::playback::engine::WavEngine;
use crate::playback::peaks::{column_to_fraction, Peaks};
use crate::playback::{EngineFactory, PlaybackWaveform, TransportEngine};
use crate::take::RecordedTake;
use crate::waveform::terminal::{render_envelope, window_columns};
use crate::waveform::{format_timer, ViewGeometry};

/// Visible track width in terminal columns.
const VIEW_COLUMNS: usize = 100;
const VIEW_ROWS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenState {
    Idle,
    Recording,
    Recorded,
}

/// The parent recording screen: owns the high-level state machine, the
/// `is_playing` flag and the elapsed duration, and composes the live
/// capture visualizer with the playback waveform.
pub struct StudioController {
    state: ScreenState,
    capture: Option<CaptureSession>,
    take: Option<RecordedTake>,
    peaks: Option<Peaks>,
    playback: PlaybackWaveform,

    // Parent-owned transport state, toggled by the wrapper's callbacks
    // and mirrored back in every frame.
    is_playing: Rc<Cell<bool>>,
    mirrored_playing: bool,
    last_seek_secs: Rc<Cell<f64>>,
    duration_secs: f64,

    take_dir: PathBuf,
    take_seq: u32,
    seek_col: usize,

    // Draw caches, so an unchanged frame writes nothing to the terminal.
    cached_status: String,
    cached_window_len: usize,
    force_redraw: bool,
    draw_buffer: String,
    grid: Vec<String>,
}

impl StudioController {
    pub fn new(take_dir: PathBuf) -> Self {
        let is_playing = Rc::new(Cell::new(false));
        let last_seek_secs = Rc::new(Cell::new(0.0f64));

        let factory: EngineFactory = Box::new(|url| {
            let engine = WavEngine::load(url)?;
            Ok(Box::new(engine) as Box<dyn TransportEngine>)
        });

        let toggle = is_playing.clone();
        let seek_out = last_seek_secs.clone();
        let playback = PlaybackWaveform::new(
            factory,
            Box::new(move || toggle.set(!toggle.get())),
        )
        .with_on_seek(Box::new(move |secs| seek_out.set(secs)));

        Self {
            state: ScreenState::Idle,
            capture: None,
            take: None,
            peaks: None,
            playback,
            is_playing,
            mirrored_playing: false,
            last_seek_secs,
            duration_secs: 0.0,
            take_dir,
            take_seq: 0,
            seek_col: 0,
            cached_status: String::new(),
            cached_window_len: usize::MAX,
            force_redraw: true,
            draw_buffer: String::with_capacity(8192),
            grid: vec![String::with_capacity(VIEW_COLUMNS); VIEW_ROWS],
        }
    }

    pub fn should_quit(&self, key: KeyCode) -> bool {
        matches!(key, KeyCode::Char('q') | KeyCode::Char('Q'))
    }

    pub fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('r') | KeyCode::Char('R') => match self.state {
                ScreenState::Recording => self.stop_recording(),
                _ => self.start_recording(),
            },
            KeyCode::Char(' ') => {
                if self.state == ScreenState::Recorded && self.playback.is_ready() {
                    self.is_playing.set(!self.is_playing.get());
                    self.force_redraw = true;
                }
            }
            KeyCode::Left | KeyCode::Right => {
                if self.state == ScreenState::Recorded && self.playback.is_ready() {
                    let cols = self.peaks.as_ref().map(|p| p.len()).unwrap_or(0);
                    if cols > 0 {
                        self.seek_col = match key {
                            KeyCode::Left => self.seek_col.saturating_sub(cols / 10),
                            _ => (self.seek_col + cols / 10).min(cols - 1),
                        };
                        self.playback
                            .seek_fraction(column_to_fraction(self.seek_col, cols));
                        self.force_redraw = true;
                    }
                }
            }
            _ => {}
        }
    }

    fn start_recording(&mut self) {
        // A new session replaces any previous take; the playback engine
        // bound to it dies before the take file does.
        self.is_playing.set(false);
        self.mirrored_playing = false;
        if let Err(e) = self.playback.set_source(None) {
            eprintln!("Failed to clear playback source: {e}");
        }
        self.peaks = None;
        self.take = None;

        self.take_seq += 1;
        let path = self.take_dir.join(format!("take_{:03}.wav", self.take_seq));
        match CaptureSession::open(&path) {
            Ok(session) => {
                self.capture = Some(session);
                self.duration_secs = 0.0;
                self.state = ScreenState::Recording;
                self.force_redraw = true;
                println!("\n🔴 Recording started: {}", path.display());
            }
            Err(e) => {
                // Microphone acquisition failure is the parent's to
                // surface; the screen stays idle and usable.
                eprintln!("\n🎤 Could not start recording: {e}");
                self.state = ScreenState::Idle;
            }
        }
    }

    fn stop_recording(&mut self) {
        let Some(mut session) = self.capture.take() else {
            return;
        };
        session.close();
        let duration = session.record_time().as_secs_f64();
        let path = session.take_path().to_path_buf();
        let sample_rate = session.sample_rate();
        let channels = session.channels();
        drop(session);

        match RecordedTake::new(path, duration, sample_rate, channels) {
            Ok(take) => {
                self.duration_secs = take.duration_secs();
                match Peaks::from_file(take.path(), VIEW_COLUMNS) {
                    Ok(p) => self.peaks = Some(p),
                    Err(e) => {
                        eprintln!("Could not render take waveform: {e}");
                        self.peaks = None;
                    }
                }
                if let Err(e) = self.playback.set_source(Some(&take.url())) {
                    eprintln!("Could not open take for playback: {e}");
                }
                self.take = Some(take);
                self.seek_col = 0;
                self.state = ScreenState::Recorded;
            }
            Err(e) => {
                eprintln!("Could not register take: {e}");
                self.state = ScreenState::Idle;
            }
        }
        self.force_redraw = true;
        println!("\n⏹️ Recording stopped ({:.1}s)", self.duration_secs);
    }

    /// One UI frame: drive the sampling loop, pump transport events,
    /// mirror `is_playing` into the engine, then redraw if anything
    /// visible changed.
    pub fn run_tick(&mut self, now_ms: u64, now: Instant) -> Result<(), anyhow::Error> {
        if let Some(session) = self.capture.as_mut() {
            session.tick(now_ms);
            self.duration_secs = session.record_time().as_secs_f64();
        }

        self.playback.pump_events(now);
        let playing = self.is_playing.get();
        if playing != self.mirrored_playing {
            self.playback.set_playing(playing, now);
            self.mirrored_playing = playing;
            self.force_redraw = true;
        }

        self.draw()
    }

    fn draw(&mut self) -> Result<(), anyhow::Error> {
        let window_len = self
            .capture
            .as_ref()
            .map(|s| s.window().len())
            .unwrap_or(0);
        let status = self.status_line();

        let dirty = self.force_redraw
            || status != self.cached_status
            || window_len != self.cached_window_len;
        if !dirty {
            return Ok(());
        }
        self.force_redraw = false;
        self.cached_status = status.clone();
        self.cached_window_len = window_len;

        self.update_grid();

        self.draw_buffer.clear();
        let _ = write!(self.draw_buffer, "{}", MoveTo(0, 0));
        let _ = write!(self.draw_buffer, "{}\x1b[K\n", self.ruler_line());
        for line in &self.grid {
            let _ = write!(self.draw_buffer, "{}\x1b[K\n", line);
        }
        let _ = write!(self.draw_buffer, "{}", MoveTo(0, (VIEW_ROWS + 1) as u16));
        let _ = write!(self.draw_buffer, "{}", Clear(ClearType::UntilNewLine));
        let _ = write!(self.draw_buffer, "{status}");

        let mut stdout = stdout();
        execute!(stdout, BeginSynchronizedUpdate)?;
        stdout.write_all(self.draw_buffer.as_bytes())?;
        execute!(stdout, EndSynchronizedUpdate)?;
        stdout.flush()?;
        Ok(())
    }

    /// Ruler: second labels placed by the same geometry the canvas uses,
    /// one terminal column per logical pixel, playhead at the center.
    fn ruler_line(&self) -> String {
        let geo = ViewGeometry::new(VIEW_COLUMNS as f32);
        let recording = self.state == ScreenState::Recording;
        let count = self
            .capture
            .as_ref()
            .map(|s| s.window().len())
            .unwrap_or(0);
        let translate = geo.translate_x(recording, count);

        let mut line = vec![' '; VIEW_COLUMNS];
        for marker in geo.time_markers(recording, count) {
            let col = (marker.position + translate).round() as i64;
            if col < 0 || col as usize >= VIEW_COLUMNS {
                continue;
            }
            let start = col as usize;
            for (i, ch) in marker.label.chars().enumerate() {
                if start + i < VIEW_COLUMNS {
                    line[start + i] = ch;
                }
            }
        }
        // Fixed playhead overlay, independent of sample data.
        line[VIEW_COLUMNS / 2] = '┼';
        line.into_iter().collect()
    }

    fn update_grid(&mut self) {
        let rows = match self.state {
            ScreenState::Recording => {
                let session = self.capture.as_ref();
                let (mins, maxs) = session
                    .map(|s| window_columns(s.window(), VIEW_COLUMNS / 2))
                    .unwrap_or_default();
                render_envelope(&mins, &maxs, VIEW_ROWS)
            }
            ScreenState::Recorded => match self.peaks.as_ref() {
                Some(p) => render_envelope(&p.mins, &p.maxs, VIEW_ROWS),
                None => vec![String::new(); VIEW_ROWS],
            },
            ScreenState::Idle => vec![String::new(); VIEW_ROWS],
        };
        for (dst, src) in self.grid.iter_mut().zip(rows.into_iter()) {
            *dst = src;
        }
    }

    fn status_line(&self) -> String {
        match self.state {
            ScreenState::Idle => {
                "⚪ Idle | [R] record | [Q] quit".to_string()
            }
            ScreenState::Recording => {
                format!("🔴 REC {}  | [R] stop", format_timer(self.duration_secs))
            }
            ScreenState::Recorded => {
                let icon = if self.is_playing.get() { "▶️" } else { "⏸️" };
                format!(
                    "{} {} / {}  seek {:.1}s | [Space] play/pause | [←/→] seek | [R] re-record",
                    icon,
                    format_timer(self.last_seek_secs.get()),
                    format_timer(self.duration_secs),
                    self.last_seek_secs.get(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_starts_idle() {
        let c = StudioController::new(std::env::temp_dir());
        assert_eq!(c.state, ScreenState::Idle);
        assert!(!c.is_playing.get());
    }

    #[test]
    fn test_space_ignored_outside_recorded_state() {
        let mut c = StudioController::new(std::env::temp_dir());
        c.handle_key(KeyCode::Char(' '));
        assert!(!c.is_playing.get(), "no take, nothing to play");
    }

    #[test]
    fn test_status_lines_by_state() {
        let mut c = StudioController::new(std::env::temp_dir());
        assert!(c.status_line().contains("Idle"));
        c.state = ScreenState::Recording;
        c.duration_secs = 61.5;
        assert!(c.status_line().contains("01:01.5"));
        // Key hints are pipe-separated in every state.
        for state in [ScreenState::Idle, ScreenState::Recording, ScreenState::Recorded] {
            c.state = state;
            let line = c.status_line();
            assert!(line.contains(" | ["), "missing key hints: {line}");
            assert!(!line.contains('—'), "unexpected separator: {line}");
        }
    }
}
