// src/capture/writer.rs

use anyhow::Result;
use hound::{SampleFormat, WavSpec, WavWriter};
use ringbuf::traits::Consumer;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Writes the recorded take to disk as 16-bit WAV while the capture
/// session runs. Samples arrive interleaved over a ring buffer fed by
/// the input callback.
pub struct TakeWriter {
    writer: WavWriter<BufWriter<File>>,
    channels: u16,
}

impl TakeWriter {
    pub fn new(path: &Path, sample_rate: u32, channels: usize) -> Result<Self> {
        let spec = WavSpec {
            channels: channels as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let file = File::create(path)?;
        let writer = WavWriter::new(BufWriter::new(file), spec)?;
        Ok(Self {
            writer,
            channels: channels as u16,
        })
    }

    /// Drain the ring buffer into the WAV file until the producer goes
    /// away. `frames_written` counts whole frames so the controller can
    /// derive the elapsed recording time.
    ///
    /// The loop only exits once it has written at least one sample and
    /// then seen the buffer stay empty for a grace period, so a slow
    /// first input callback does not end the take early.
    pub fn run<C>(mut self, mut consumer: C, frames_written: Arc<AtomicU64>) -> Result<()>
    where
        C: Consumer<Item = f32>,
    {
        const GRACEFUL_IDLE_MS: u128 = 500;

        let mut tmp = vec![0.0f32; 4096];
        let mut wrote_any = false;
        let mut idle_start: Option<Instant> = None;
        let mut pending_in_frame = 0u16;

        loop {
            let popped = consumer.pop_slice(tmp.as_mut_slice());

            if popped == 0 {
                thread::sleep(Duration::from_millis(5));
                if wrote_any {
                    let start = *idle_start.get_or_insert_with(Instant::now);
                    if start.elapsed().as_millis() >= GRACEFUL_IDLE_MS {
                        break;
                    }
                }
                continue;
            }

            idle_start = None;
            wrote_any = true;

            for &s in &tmp[..popped] {
                let samp = if s.is_finite() {
                    (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
                } else {
                    0i16
                };
                self.writer.write_sample(samp)?;
                pending_in_frame += 1;
                if pending_in_frame == self.channels {
                    pending_in_frame = 0;
                    frames_written.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        self.writer.finalize()?;
        Ok(())
    }
}
