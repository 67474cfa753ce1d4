// src/capture/mod.rs

pub mod analyser;
pub mod input;
pub mod window;
pub mod writer;

use anyhow::{Context, Result};
use ringbuf::traits::{Consumer, Observer, Split};
use ringbuf::HeapRb;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use crate::capture::analyser::{Analyser, ANALYSER_WINDOW};
use crate::capture::input::MicInput;
use crate::capture::window::{normalize_bytes, SampleWindow};
use crate::capture::writer::TakeWriter;

/// Type-erased pull side of the analyser ring buffer, so the session
/// does not carry the concrete ringbuf consumer type around.
trait SampleSource: Send {
    fn pop_chunk(&mut self, out: &mut [f32]) -> usize;
    fn available(&self) -> usize;
}

impl<C: Consumer<Item = f32> + Send> SampleSource for C {
    fn pop_chunk(&mut self, out: &mut [f32]) -> usize {
        self.pop_slice(out)
    }
    fn available(&self) -> usize {
        self.occupied_len()
    }
}

/// One live recording session: microphone stream, analyser, sliding
/// sample window and the WAV writer thread for the take.
///
/// `open` builds the whole graph exactly once; `close` tears it down
/// synchronously and is safe to call any number of times. After `close`,
/// `tick` is a no-op, so no late frame can touch a released graph.
pub struct CaptureSession {
    input: Option<MicInput>,
    vis_source: Option<Box<dyn SampleSource>>,
    analyser: Analyser,
    window: SampleWindow,
    writer_handle: Option<thread::JoinHandle<()>>,
    frames_written: Arc<AtomicU64>,
    snapshot: Vec<u8>,
    scratch: Vec<f32>,
    take_path: PathBuf,
    sample_rate: u32,
    channels: usize,
}

impl CaptureSession {
    /// Acquire the microphone and start capturing into `take_path`.
    ///
    /// Acquisition failure (no device, device busy) surfaces here as an
    /// error for the caller to report; nothing about the visualizer
    /// itself can fail after a successful open.
    pub fn open(take_path: &Path) -> Result<Self> {
        // Interleaved signal for the writer thread.
        let rb_rec = HeapRb::<f32>::new(192_000);
        let (prod_rec, cons_rec) = rb_rec.split();

        // Mono channel-0 copy for the analyser.
        let rb_vis = HeapRb::<f32>::new(48_000);
        let (prod_vis, cons_vis) = rb_vis.split();

        let input = MicInput::open(prod_rec, prod_vis).context("acquiring microphone")?;
        let sample_rate = input.sample_rate;
        let channels = input.channels;

        let frames_written = Arc::new(AtomicU64::new(0));
        let frames_clone = frames_written.clone();

        let writer = TakeWriter::new(take_path, sample_rate, channels)
            .with_context(|| format!("creating take file {}", take_path.display()))?;
        let writer_handle = thread::spawn(move || {
            if let Err(e) = writer.run(cons_rec, frames_clone) {
                eprintln!("Take writer error: {e}");
            }
        });

        Ok(Self {
            input: Some(input),
            vis_source: Some(Box::new(cons_vis)),
            analyser: Analyser::new(),
            window: SampleWindow::new(),
            writer_handle: Some(writer_handle),
            frames_written,
            snapshot: vec![0u8; ANALYSER_WINDOW],
            scratch: vec![0.0f32; 8192],
            take_path: take_path.to_path_buf(),
            sample_rate,
            channels,
        })
    }

    /// One sampling tick, driven once per UI frame while recording.
    ///
    /// Reads the analyser buffer, normalizes it and appends to the window
    /// if the throttle accepts the tick. The whole read-normalize-append
    /// sequence runs on the caller's thread, so ticks never interleave.
    pub fn tick(&mut self, now_ms: u64) {
        let Some(source) = self.vis_source.as_mut() else {
            return;
        };

        while source.available() > 0 {
            let n = source.pop_chunk(&mut self.scratch);
            if n == 0 {
                break;
            }
            self.analyser.feed(&self.scratch[..n]);
        }

        if !self.window.accepts(now_ms) {
            return;
        }
        self.analyser.byte_time_domain(&mut self.snapshot);
        let data = normalize_bytes(&self.snapshot);
        self.window.push(data, now_ms);
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    /// Elapsed recording time, derived from frames the writer has
    /// committed to disk.
    pub fn record_time(&self) -> Duration {
        let frames = self.frames_written.load(Ordering::Relaxed) as f64;
        Duration::from_secs_f64(frames / self.sample_rate as f64)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn take_path(&self) -> &Path {
        &self.take_path
    }

    /// Stop capturing and finalize the take file. Idempotent: the second
    /// and later calls do nothing. The session is the sole owner of the
    /// microphone stream, so this is the only place it is stopped.
    pub fn close(&mut self) {
        // Dropping the input stops the cpal stream; the writer then sees
        // the buffer drain and finalizes the WAV header.
        self.vis_source = None;
        if self.input.take().is_some() {
            if let Some(handle) = self.writer_handle.take() {
                let _ = handle.join();
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.input.is_some()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.close();
    }
}
