// src/lib.rs

pub mod audio;
pub mod capture;
pub mod controller;
pub mod playback;
pub mod take;
pub mod waveform;

pub use capture::CaptureSession;
pub use capture::window::{SampleWindow, WaveformSample};
pub use playback::PlaybackWaveform;
pub use take::RecordedTake;
pub use waveform::ViewGeometry;
