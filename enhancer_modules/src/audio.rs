// src/audio.rs

use crate::engine::Engine;
use crate::error::EnhancerError;
use crate::graph::GRAPH_CHANNELS;
use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use log::{error, info};
use std::sync::{Arc, Mutex};

/// Helper struct to hold output device info
pub struct OutputConfig {
    pub device: Device,
    pub config: StreamConfig,
    pub sample_format: SampleFormat,
    pub output_channels: usize,
    pub output_sample_rate: u32,
}

/// Finds the default audio output device and its config.
pub fn setup_output_device() -> Result<OutputConfig> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(EnhancerError::NoOutputDevice)?;
    let supported_config = device.default_output_config()?;
    let sample_format = supported_config.sample_format();
    let config = supported_config.config();
    let output_channels = config.channels as usize;
    let output_sample_rate = config.sample_rate.0;

    info!("output device: {output_channels} ch @ {output_sample_rate} Hz ({sample_format:?})");

    Ok(OutputConfig {
        device,
        config,
        sample_format,
        output_channels,
        output_sample_rate,
    })
}

/// Start a stream that pulls stereo blocks from the engine and spreads
/// them over the device's channels. Extra channels get silence; a mono
/// device gets the average of left and right.
pub fn start_output_stream(output: OutputConfig, engine: Arc<Mutex<Engine>>) -> Result<Stream> {
    let OutputConfig {
        device,
        config,
        sample_format,
        ..
    } = output;

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, engine)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, engine)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, engine)?,
        other => return Err(EnhancerError::UnsupportedSampleFormat(format!("{other:?}")).into()),
    };

    stream.play()?;
    Ok(stream)
}

fn build_stream<T>(device: &Device, config: &StreamConfig, engine: Arc<Mutex<Engine>>) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let device_channels = config.channels as usize;
    let mut scratch: Vec<f32> = Vec::with_capacity(4096);
    let err_fn = |err| error!("output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let frames = data.len() / device_channels;
            scratch.resize(frames * GRAPH_CHANNELS, 0.0);

            match engine.lock() {
                Ok(mut eng) => eng.render(&mut scratch),
                Err(_) => scratch.fill(0.0),
            }

            for (frame, stereo) in data
                .chunks_mut(device_channels)
                .zip(scratch.chunks_exact(GRAPH_CHANNELS))
            {
                map_stereo_frame(frame, stereo[0], stereo[1]);
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

fn map_stereo_frame<T: Sample + FromSample<f32>>(frame: &mut [T], l: f32, r: f32) {
    match frame.len() {
        0 => {}
        1 => frame[0] = T::from_sample(0.5 * (l + r)),
        _ => {
            frame[0] = T::from_sample(l);
            frame[1] = T::from_sample(r);
            for sample in frame.iter_mut().skip(2) {
                *sample = T::from_sample(0.0f32);
            }
        }
    }
}
