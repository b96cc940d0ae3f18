// src/config.rs

use crate::error::EnhancerError;
use crate::graph::PanningModel;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tunables for a session. Every field has a default, so a config file only
/// needs to list what it overrides.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EnhancerConfig {
    pub bass_boost_db: f32,
    pub bass_cutoff_hz: f32,
    pub orbit_radius: f32,
    pub orbit_step: f32,  // radians per tick
    pub frame_rate: f32,  // orbit ticks per second
    pub panning_model: PanningModel,
    pub ring_capacity: usize,   // decoder -> engine, in samples
    pub record_capacity: usize, // engine -> recorder, in samples
    pub chunk_frames: usize,
    pub output_dir: PathBuf,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            bass_boost_db: 15.0,
            bass_cutoff_hz: 200.0,
            orbit_radius: 3.0,
            orbit_step: 0.02,
            frame_rate: 60.0,
            panning_model: PanningModel::Hrtf,
            ring_capacity: 131_072,
            record_capacity: 192_000,
            chunk_frames: 4096,
            output_dir: PathBuf::from("."),
        }
    }
}

impl EnhancerConfig {
    pub fn load_from_disk<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("opening config {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_disk<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), EnhancerError> {
        // bass_boost_db may be zero or negative (a cut), it only has to be finite
        if !self.bass_boost_db.is_finite() {
            return Err(EnhancerError::InvalidConfig {
                field: "bass_boost_db",
                value: self.bass_boost_db as f64,
            });
        }

        let positive = [
            ("bass_cutoff_hz", self.bass_cutoff_hz),
            ("orbit_radius", self.orbit_radius),
            ("orbit_step", self.orbit_step),
            ("frame_rate", self.frame_rate),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(EnhancerError::InvalidConfig { field, value: value as f64 });
            }
        }

        let sizes = [
            ("ring_capacity", self.ring_capacity),
            ("record_capacity", self.record_capacity),
            ("chunk_frames", self.chunk_frames),
        ];
        for (field, value) in sizes {
            if value == 0 {
                return Err(EnhancerError::InvalidConfig { field, value: 0.0 });
            }
        }

        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate as f64)
    }

    /// Samples per orbit tick at `sample_rate`, used by offline rendering.
    pub fn frames_per_tick(&self, sample_rate: u32) -> usize {
        ((sample_rate as f64 / self.frame_rate as f64).round() as usize).max(1)
    }
}
