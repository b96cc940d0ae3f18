// src/recorder/artifact.rs

use crate::graph::GRAPH_CHANNELS;
use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use log::{info, warn};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ARTIFACT_FILE_NAME: &str = "enhanced_music.mp3";
pub const DECLARED_MIME: &str = "audio/mpeg";

/// How the payload bytes are actually encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Wav,
}

impl Container {
    pub fn mime(self) -> &'static str {
        match self {
            Container::Wav => "audio/wav",
        }
    }
}

/// One finished recording, ready to be saved under its fixed name.
///
/// The declared type is `audio/mpeg` while the payload is PCM WAV; both are
/// exposed so callers can tell.
#[derive(Debug, Clone)]
pub struct RecordingArtifact {
    file_name: &'static str,
    declared_mime: &'static str,
    container: Container,
    sample_rate: u32,
    chunks: Vec<Vec<f32>>,
    dropped_samples: u64,
    data: Vec<u8>,
}

impl RecordingArtifact {
    pub fn assemble(chunks: Vec<Vec<f32>>, sample_rate: u32, dropped_samples: u64) -> Result<Self> {
        let data = encode_wav(&chunks, sample_rate)?;
        let artifact = Self {
            file_name: ARTIFACT_FILE_NAME,
            declared_mime: DECLARED_MIME,
            container: Container::Wav,
            sample_rate,
            chunks,
            dropped_samples,
            data,
        };

        if artifact.has_type_mismatch() {
            warn!(
                "{} is declared {} but encoded as {}",
                artifact.file_name,
                artifact.declared_mime,
                artifact.container.mime()
            );
        }
        Ok(artifact)
    }

    pub fn file_name(&self) -> &str {
        self.file_name
    }

    pub fn declared_mime(&self) -> &str {
        self.declared_mime
    }

    pub fn container(&self) -> Container {
        self.container
    }

    pub fn has_type_mismatch(&self) -> bool {
        self.declared_mime != self.container.mime()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn chunks(&self) -> &[Vec<f32>] {
        &self.chunks
    }

    /// All captured samples in order, interleaved stereo.
    pub fn samples(&self) -> impl Iterator<Item = f32> + '_ {
        self.chunks.iter().flatten().copied()
    }

    pub fn frames(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum::<usize>() / GRAPH_CHANNELS
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Write the payload as `dir/enhanced_music.mp3`.
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(self.file_name);
        fs::write(&path, &self.data).with_context(|| format!("writing {}", path.display()))?;
        info!("saved {} ({:.1}s) to {}", self.file_name, self.duration().as_secs_f64(), path.display());
        Ok(path)
    }
}

fn encode_wav(chunks: &[Vec<f32>], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: GRAPH_CHANNELS as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &s in chunks.iter().flatten() {
            let sample = if s.is_finite() {
                (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
            } else {
                0
            };
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}
