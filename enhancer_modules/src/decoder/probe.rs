// src/decoder/probe.rs

use crate::error::EnhancerError;
use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use std::time::Duration;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::default::get_probe;

/// What we need to know about a file before streaming it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub sample_rate: u32,
    pub channels: usize,
    pub duration: Duration,
}

pub fn probe_file(path: &Path) -> Result<TrackInfo> {
    let display = path.display().to_string();
    let file = File::open(path).with_context(|| format!("opening audio file {display}"))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let probed = get_probe()
        .format(
            &Default::default(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("probing {display}"))?;

    let track = probed
        .format
        .default_track()
        .ok_or_else(|| EnhancerError::NoAudioTrack { path: display.clone() })?;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| EnhancerError::MissingSampleRate { path: display.clone() })?;
    let channels = track
        .codec_params
        .channels
        .ok_or_else(|| EnhancerError::MissingChannels { path: display.clone() })?
        .count();

    // Unknown frame counts (some mp3 streams) report zero length
    let n_frames = track.codec_params.n_frames.unwrap_or(0);
    let duration = Duration::from_secs_f64(n_frames as f64 / sample_rate as f64);

    Ok(TrackInfo { sample_rate, channels, duration })
}
