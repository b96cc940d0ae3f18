// src/decoder/resample.rs

use crate::decoder::dsp;
use anyhow::Result;
use rubato::{
    calculate_cutoff, Resampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};

const CHUNK_FRAMES: usize = 1024;

/// `None` when no conversion is needed.
pub fn build_resampler(
    src_rate: u32,
    dst_rate: u32,
    channels: usize,
) -> Result<Option<SincFixedIn<f32>>> {
    if src_rate == dst_rate {
        return Ok(None);
    }
    let sinc_len = 256usize;
    let window = WindowFunction::BlackmanHarris2;
    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff: calculate_cutoff(sinc_len, window),
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window,
    };
    let ratio = dst_rate as f64 / src_rate as f64;
    let r = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_FRAMES, channels)?;
    Ok(Some(r))
}

/// Resample one full input chunk if enough frames are staged.
pub fn try_process_exact(
    resampler: &mut SincFixedIn<f32>,
    stage_planar: &mut [Vec<f32>],
) -> Option<Vec<Vec<f32>>> {
    let need = resampler.input_frames_next();
    if dsp::planar_len(stage_planar) < need {
        return None;
    }
    let in_block = dsp::take_from_planar(stage_planar, need);
    resampler.process(&in_block, None).ok()
}

pub fn drain_remaining_planar(stage_planar: &mut [Vec<f32>]) -> Option<Vec<Vec<f32>>> {
    let have = dsp::planar_len(stage_planar);
    (have > 0).then(|| dsp::take_from_planar(stage_planar, have))
}

/// Resample a short final block, or flush the filter tail with `None`.
pub fn process_partial(
    resampler: &mut SincFixedIn<f32>,
    in_block: Option<&[Vec<f32>]>,
) -> Result<Vec<Vec<f32>>> {
    Ok(resampler.process_partial(in_block, None)?)
}

