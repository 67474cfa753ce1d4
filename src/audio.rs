// src/audio.rs

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, SampleFormat, StreamConfig};

/// Default-device handle plus the config we will run it with.
pub struct DeviceSetup {
    pub device: Device,
    pub config: StreamConfig,
    pub sample_format: SampleFormat,
}

/// Find the default microphone and its native config.
pub fn default_input_device() -> Result<DeviceSetup> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("no input device available")?;
    let supported = device.default_input_config()?;
    let sample_format = supported.sample_format();
    Ok(DeviceSetup {
        device,
        config: supported.into(),
        sample_format,
    })
}

/// Find the default playback device and its native config.
pub fn default_output_device() -> Result<DeviceSetup> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no output device available")?;
    let supported = device.default_output_config()?;
    let sample_format = supported.sample_format();
    Ok(DeviceSetup {
        device,
        config: supported.into(),
        sample_format,
    })
}
