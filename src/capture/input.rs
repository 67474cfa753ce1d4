// src/capture/input.rs

use anyhow::Result;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::Producer;

use crate::audio::default_input_device;

/// Owns the live cpal input stream. Dropping it stops capture; the session
/// is the single owner of the microphone, nothing else stops the stream.
pub struct MicInput {
    _stream: Stream,
    pub channels: usize,
    pub sample_rate: u32,
}

impl MicInput {
    /// Open the default microphone and start feeding two ring buffers:
    /// the full interleaved signal for the take writer, and a mono
    /// (channel 0) copy for the analyser.
    pub fn open<PRec, PVis>(producer_rec: PRec, producer_vis: PVis) -> Result<Self>
    where
        PRec: Producer<Item = f32> + Send + 'static,
        PVis: Producer<Item = f32> + Send + 'static,
    {
        let input = default_input_device()?;
        let channels = input.config.channels as usize;
        let sample_rate = input.config.sample_rate.0;

        let stream = match input.sample_format {
            SampleFormat::F32 => {
                build_input::<f32, _, _>(&input.device, &input.config, producer_rec, producer_vis)
            }
            SampleFormat::I16 => {
                build_input::<i16, _, _>(&input.device, &input.config, producer_rec, producer_vis)
            }
            SampleFormat::U16 => {
                build_input::<u16, _, _>(&input.device, &input.config, producer_rec, producer_vis)
            }
            other => anyhow::bail!("Unsupported input sample format: {:?}", other),
        }?;

        stream.play()?;

        Ok(Self {
            _stream: stream,
            channels,
            sample_rate,
        })
    }
}

/// Build the input stream for any sample type cpal may hand us,
/// converting to f32 before pushing.
fn build_input<T, PRec, PVis>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer_rec: PRec,
    mut producer_vis: PVis,
) -> Result<Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
    PRec: Producer<Item = f32> + Send + 'static,
    PVis: Producer<Item = f32> + Send + 'static,
{
    let channels = config.channels as usize;
    let err_fn = |err| eprintln!("Input stream error: {:?}", err);

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _| {
            let conv: Vec<f32> = data.iter().map(|&s| s.to_sample::<f32>()).collect();

            // Full interleaved signal for the writer. If the buffer is
            // full the remainder is dropped rather than blocking the
            // audio callback.
            let mut pushed = 0usize;
            while pushed < conv.len() {
                let n = producer_rec.push_slice(&conv[pushed..]);
                if n == 0 {
                    break;
                }
                pushed += n;
            }

            // Channel 0 only for the analyser; best effort.
            for frame in conv.chunks(channels.max(1)) {
                if producer_vis.try_push(frame[0]).is_err() {
                    break;
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
