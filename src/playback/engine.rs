// src/playback/engine.rs

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, Stream};
use rubato::{
    calculate_cutoff, Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};
use std::fs::File;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::default::{get_codecs, get_probe};

use crate::audio::default_output_device;

/// Transport notifications the engine raises, whether a transition was
/// commanded programmatically or originated inside the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    Ready,
    Play,
    Pause,
    Finish,
    /// Progress fraction in [0, 1] after a surface interaction.
    Seek(f64),
}

/// The transport surface over one finished audio asset.
///
/// `destroy` must be idempotent, and a destroyed engine must stay inert:
/// no events, no playback, no panics on further calls.
pub trait TransportEngine {
    /// Start playback. Failures (device refuses to start) are the
    /// caller's to swallow.
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    /// Jump to a progress fraction in [0, 1].
    fn seek_to(&mut self, fraction: f64);
    fn duration_secs(&self) -> f64;
    /// Drain pending transport events since the last poll.
    fn poll_events(&mut self) -> Vec<EngineEvent>;
    fn destroy(&mut self);
}

/// Decoded audio held in memory: mono-summed frames at the device rate.
struct LoadedTrack {
    frames: Arc<Vec<f32>>,
    sample_rate: u32,
}

/// Concrete engine for recorded takes: decodes the file up front, plays
/// it through a cpal output stream, and reports finish when the read
/// position passes the end of the buffer.
pub struct WavEngine {
    track: LoadedTrack,
    _stream: Option<Stream>,
    playing: Arc<AtomicBool>,
    position: Arc<AtomicUsize>,
    finished: Arc<AtomicBool>,
    pending: Vec<EngineEvent>,
    destroyed: bool,
}

impl WavEngine {
    /// Decode `path`, open the output device and prime the stream.
    /// The `Ready` event is queued for the first poll.
    pub fn load(path: &str) -> Result<Self> {
        let output = default_output_device()?;
        let device_rate = output.config.sample_rate.0;
        let device_channels = output.config.channels as usize;

        let (frames, source_rate) = decode_mono(path)?;
        let frames = if source_rate == device_rate {
            frames
        } else {
            resample_mono(&frames, source_rate, device_rate)?
        };
        let track = LoadedTrack {
            frames: Arc::new(frames),
            sample_rate: device_rate,
        };

        let playing = Arc::new(AtomicBool::new(false));
        let position = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let cb_frames = track.frames.clone();
        let cb_playing = playing.clone();
        let cb_position = position.clone();
        let cb_finished = finished.clone();
        let err_fn = |err| eprintln!("Playback stream error: {err}");

        if output.sample_format != SampleFormat::F32 {
            anyhow::bail!(
                "Unsupported output sample format: {:?}",
                output.sample_format
            );
        }

        let stream = output
            .device
            .build_output_stream(
                &output.config,
                move |data: &mut [f32], _| {
                    for frame in data.chunks_mut(device_channels.max(1)) {
                        let s = if cb_playing.load(Ordering::Relaxed) {
                            let pos = cb_position.fetch_add(1, Ordering::Relaxed);
                            match cb_frames.get(pos) {
                                Some(&v) => v,
                                None => {
                                    // Past the end: flag finish, stop
                                    // advancing and go silent.
                                    cb_position.store(cb_frames.len(), Ordering::Relaxed);
                                    cb_playing.store(false, Ordering::Relaxed);
                                    cb_finished.store(true, Ordering::Relaxed);
                                    0.0
                                }
                            }
                        } else {
                            0.0
                        };
                        for out in frame.iter_mut() {
                            *out = s;
                        }
                    }
                },
                err_fn,
                None,
            )
            .context("building playback stream")?;
        stream.play()?;

        Ok(Self {
            track,
            _stream: Some(stream),
            playing,
            position,
            finished,
            pending: vec![EngineEvent::Ready],
            destroyed: false,
        })
    }
}

impl TransportEngine for WavEngine {
    fn play(&mut self) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }
        self.playing.store(true, Ordering::Relaxed);
        self.pending.push(EngineEvent::Play);
        Ok(())
    }

    fn pause(&mut self) {
        if self.destroyed {
            return;
        }
        self.playing.store(false, Ordering::Relaxed);
        self.pending.push(EngineEvent::Pause);
    }

    fn seek_to(&mut self, fraction: f64) {
        if self.destroyed {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        let frame = (fraction * self.track.frames.len() as f64) as usize;
        self.position
            .store(frame.min(self.track.frames.len()), Ordering::Relaxed);
        self.pending.push(EngineEvent::Seek(fraction));
    }

    fn duration_secs(&self) -> f64 {
        self.track.frames.len() as f64 / self.track.sample_rate as f64
    }

    fn poll_events(&mut self) -> Vec<EngineEvent> {
        if self.destroyed {
            return Vec::new();
        }
        if self.finished.swap(false, Ordering::Relaxed) {
            self.pending.push(EngineEvent::Finish);
        }
        std::mem::take(&mut self.pending)
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.playing.store(false, Ordering::Relaxed);
        self._stream = None;
        self.pending.clear();
    }
}

impl Drop for WavEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Decode any supported file into mono f32 frames at its native rate.
/// Multi-channel sources are averaged down.
pub fn decode_mono(path: &str) -> Result<(Vec<f32>, u32)> {
    let file = File::open(path).with_context(|| format!("opening {path}"))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let probed = get_probe().format(
        &Default::default(),
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;
    let track = format.default_track().context("no audio track")?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params.sample_rate.context("missing sample rate")?;
    let channels = codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1)
        .max(1);

    let mut decoder = get_codecs().make(&codec_params, &DecoderOptions::default())?;
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut frames = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(_) => break,
        };
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(_) => continue,
        };
        let spec = *decoded.spec();
        if sample_buf
            .as_ref()
            .map(|b| b.capacity() < decoded.capacity())
            .unwrap_or(true)
        {
            sample_buf = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);
        for frame in buf.samples().chunks(channels) {
            let sum: f32 = frame.iter().sum();
            frames.push(sum / channels as f32);
        }
    }

    Ok((frames, sample_rate))
}

/// Offline mono resample of the whole decoded take to the device rate.
fn resample_mono(frames: &[f32], src_rate: u32, dst_rate: u32) -> Result<Vec<f32>> {
    let ratio = dst_rate as f64 / src_rate as f64;
    let sinc_len = 256usize;
    let window = WindowFunction::BlackmanHarris2;
    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff: calculate_cutoff(sinc_len, window),
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window,
    };
    let chunk_size = 1024usize;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1)?;

    let mut out = Vec::with_capacity((frames.len() as f64 * ratio) as usize + chunk_size);
    let mut offset = 0usize;
    while offset + chunk_size <= frames.len() {
        let block = vec![frames[offset..offset + chunk_size].to_vec()];
        let produced = resampler.process(&block, None)?;
        out.extend_from_slice(&produced[0]);
        offset += chunk_size;
    }
    if offset < frames.len() {
        let block = vec![frames[offset..].to_vec()];
        let produced = resampler.process_partial(Some(&block), None)?;
        out.extend_from_slice(&produced[0]);
    }
    Ok(out)
}
