// src/decoder/offline.rs

use crate::decoder::dsp;
use crate::error::EnhancerError;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs::File;
use std::path::Path;
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::default::{get_codecs, get_probe};

/// A whole file decoded into interleaved stereo at its native rate.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub source_channels: usize,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

pub fn decode_to_stereo(path: &Path) -> Result<DecodedAudio> {
    let display = path.display().to_string();
    let file = File::open(path).with_context(|| format!("opening audio file {display}"))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let probed = get_probe()
        .format(&Default::default(), mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("probing {display}"))?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| EnhancerError::NoAudioTrack { path: display.clone() })?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = get_codecs().make(&codec_params, &DecoderOptions::default())?;
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut samples = Vec::<f32>::new();

    // Locked on the first packet that carries audio
    let mut sample_rate = codec_params.sample_rate;
    let mut source_channels = codec_params.channels.map(|c| c.count());

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => {
                warn!("{display}: stopped reading at {e}");
                break;
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                debug!("{display}: skipping bad packet: {e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if decoded.frames() == 0 {
            continue;
        }

        let spec = *decoded.spec();
        let packet_channels = spec.channels.count();
        sample_rate.get_or_insert(spec.rate);
        source_channels.get_or_insert(packet_channels);

        if sample_buf.as_ref().is_none_or(|b| b.capacity() < decoded.capacity()) {
            sample_buf = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);

        samples.extend(dsp::updown_mix_interleaved(buf.samples(), packet_channels, 2));
    }

    let sample_rate = sample_rate.ok_or_else(|| EnhancerError::MissingSampleRate { path: display.clone() })?;
    let source_channels = source_channels.ok_or_else(|| EnhancerError::MissingChannels { path: display.clone() })?;

    debug!("decoded {display}: {} frames at {sample_rate} Hz", samples.len() / 2);

    Ok(DecodedAudio { samples, sample_rate, source_channels })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};

    fn write_mono_wav(path: &Path, frames: usize) {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut w = WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            w.write_sample(((i % 100) as i16 - 50) * 100).unwrap();
        }
        w.finalize().unwrap();
    }

    #[test]
    fn mono_file_comes_back_as_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_mono_wav(&path, 2205);

        let audio = decode_to_stereo(&path).unwrap();
        assert_eq!(audio.sample_rate, 22_050);
        assert_eq!(audio.source_channels, 1);
        assert_eq!(audio.frames(), 2205);
        assert!(audio.samples.chunks_exact(2).all(|f| f[0] == f[1]));
        assert!((audio.duration().as_secs_f64() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(decode_to_stereo(&dir.path().join("nope.wav")).is_err());
    }
}
