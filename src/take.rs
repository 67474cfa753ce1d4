// src/take.rs

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Metadata written beside each finished take.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TakeManifest {
    pub version: u32,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: usize,
}

impl TakeManifest {
    pub fn save_to_disk(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load_from_disk(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let manifest = serde_json::from_reader(BufReader::new(file))?;
        Ok(manifest)
    }
}

/// A finished recording on disk, playing the role a blob URL plays in a
/// browser frontend: whoever created it releases it, exactly once, when
/// it is replaced or goes out of scope. Consumers borrow the path and
/// never take ownership of the file.
pub struct RecordedTake {
    wav_path: PathBuf,
    manifest_path: PathBuf,
    manifest: TakeManifest,
    released: bool,
}

impl RecordedTake {
    /// Register a freshly written WAV and persist its manifest.
    pub fn new(
        wav_path: PathBuf,
        duration_secs: f64,
        sample_rate: u32,
        channels: usize,
    ) -> Result<Self> {
        let manifest = TakeManifest {
            version: 1,
            duration_secs,
            sample_rate,
            channels,
        };
        let manifest_path = wav_path.with_extension("json");
        manifest.save_to_disk(&manifest_path)?;
        Ok(Self {
            wav_path,
            manifest_path,
            manifest,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.wav_path
    }

    /// The source string handed to the playback wrapper.
    pub fn url(&self) -> String {
        self.wav_path.to_string_lossy().into_owned()
    }

    pub fn duration_secs(&self) -> f64 {
        self.manifest.duration_secs
    }

    pub fn manifest(&self) -> &TakeManifest {
        &self.manifest
    }

    /// Delete the take and its manifest. The second and later calls do
    /// nothing, so replace-then-drop cannot double-delete.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = std::fs::remove_file(&self.wav_path) {
            eprintln!("Failed to remove take {}: {e}", self.wav_path.display());
        }
        let _ = std::fs::remove_file(&self.manifest_path);
    }
}

impl Drop for RecordedTake {
    fn drop(&mut self) {
        self.release();
    }
}
