// src/decoder/dsp.rs

/// Append interleaved frames to per-channel vectors. `planar.len()` is the
/// channel count.
pub fn append_interleaved_to_planar(interleaved: &[f32], planar: &mut [Vec<f32>]) {
    let channels = planar.len();
    if channels == 0 {
        return;
    }
    for frame in interleaved.chunks_exact(channels) {
        for (ch, &s) in planar.iter_mut().zip(frame) {
            ch.push(s);
        }
    }
}

pub fn planar_len(planar: &[Vec<f32>]) -> usize {
    planar.iter().map(Vec::len).min().unwrap_or(0)
}

/// Split the first `frames` frames off every channel.
pub fn take_from_planar(planar: &mut [Vec<f32>], frames: usize) -> Vec<Vec<f32>> {
    planar
        .iter_mut()
        .map(|ch| {
            let n = frames.min(ch.len());
            let tail = ch.split_off(n);
            std::mem::replace(ch, tail)
        })
        .collect()
}

pub fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let channels = planar.len();
    let frames = planar_len(planar);
    let mut out = Vec::with_capacity(frames * channels);
    for f in 0..frames {
        out.extend(planar.iter().map(|ch| ch[f]));
    }
    out
}

/// Remix interleaved audio from `in_ch` to `out_ch` channels.
/// Mono is duplicated, stereo folds to mono by averaging, wider layouts
/// are averaged into groups or wrapped around.
pub fn updown_mix_interleaved(input: &[f32], in_ch: usize, out_ch: usize) -> Vec<f32> {
    if in_ch == out_ch || in_ch == 0 || out_ch == 0 {
        return input.to_vec();
    }

    let frames = input.len() / in_ch;
    let mut out = Vec::with_capacity(frames * out_ch);

    for frame in input.chunks_exact(in_ch) {
        if out_ch < in_ch {
            let factor = in_ch as f32 / out_ch as f32;
            for oc in 0..out_ch {
                let start = (oc as f32 * factor).floor() as usize;
                let end = (((oc + 1) as f32 * factor).ceil() as usize).min(in_ch);
                let group = &frame[start..end];
                out.push(group.iter().sum::<f32>() / group.len().max(1) as f32);
            }
        } else {
            out.extend((0..out_ch).map(|oc| frame[oc % in_ch]));
        }
    }

    out
}

#[inline]
pub fn fade_samples_ms(sample_rate: u32, ms: u32) -> usize {
    ((sample_rate as u64 * ms as u64) / 1000) as usize
}
