// src/graph/bass.rs

use biquad::*;
use log::warn;

/// Low-shelf bass stage, one filter per channel.
pub struct BassFilter {
    coeffs: Coefficients<f32>,
    filters: Vec<DirectForm2Transposed<f32>>,
    gain_db: f32,
    cutoff_hz: f32,
    sr: u32,
}

impl BassFilter {
    pub fn new(sr: u32, channels: usize, cutoff_hz: f32) -> Self {
        // Flat shelf: unity coefficients until the first successful update
        let coeffs = Coefficients {
            a1: 0.0,
            a2: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
        };

        let filters = (0..channels)
            .map(|_| DirectForm2Transposed::<f32>::new(coeffs))
            .collect();

        let mut filter = Self {
            coeffs,
            filters,
            gain_db: 0.0,
            cutoff_hz,
            sr,
        };
        filter.update_coefficients();
        filter
    }

    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn set_gain_db(&mut self, gain_db: f32) {
        if !gain_db.is_finite() || gain_db == self.gain_db {
            return;
        }
        self.gain_db = gain_db;
        self.update_coefficients();
    }

    fn update_coefficients(&mut self) {
        // Cutoff must stay below Nyquist
        let safe_freq = self.cutoff_hz.clamp(20.0, (self.sr as f32 / 2.0) - 1.0);

        match Coefficients::<f32>::from_params(
            Type::LowShelf(self.gain_db),
            self.sr.hz(),
            safe_freq.hz(),
            Q_BUTTERWORTH_F32,
        ) {
            Ok(new_coeffs) => {
                self.coeffs = new_coeffs;
                // State is kept so a toggle mid-song does not click
                for filter in &mut self.filters {
                    filter.update_coefficients(self.coeffs);
                }
            }
            Err(e) => warn!("low-shelf coefficients failed at {safe_freq} Hz: {e:?}"),
        }
    }

    /// In-place processing of interleaved audio.
    pub fn process(&mut self, buffer: &mut [f32], channels: usize) {
        if self.gain_db == 0.0 {
            return;
        }
        for frame in buffer.chunks_mut(channels) {
            for (ch, sample) in frame.iter_mut().enumerate() {
                if let Some(filter) = self.filters.get_mut(ch) {
                    let out = filter.run(*sample);
                    // Denormal protection
                    *sample = if out.abs() < 1e-20 { 0.0 } else { out };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn stereo_sine(freq: f32, sr: u32, frames: usize) -> Vec<f32> {
        let mut out = Vec::with_capacity(frames * 2);
        for n in 0..frames {
            let s = 0.25 * (TAU * freq * n as f32 / sr as f32).sin();
            out.push(s);
            out.push(s);
        }
        out
    }

    fn peak_after_settle(buf: &[f32], settle_frames: usize) -> f32 {
        buf[settle_frames * 2..].iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    fn db(ratio: f32) -> f32 {
        20.0 * ratio.log10()
    }

    #[test]
    fn neutral_shelf_is_transparent() {
        let mut bass = BassFilter::new(48_000, 2, 200.0);
        let input = stereo_sine(60.0, 48_000, 4800);
        let mut buf = input.clone();
        bass.process(&mut buf, 2);
        assert_eq!(buf, input);
    }

    #[test]
    fn boost_lifts_lows_and_spares_highs() {
        let sr = 48_000;
        let mut bass = BassFilter::new(sr, 2, 200.0);
        bass.set_gain_db(15.0);

        let mut low = stereo_sine(40.0, sr, sr as usize);
        bass.process(&mut low, 2);
        let low_gain = db(peak_after_settle(&low, 24_000) / 0.25);
        assert!((low_gain - 15.0).abs() < 1.0, "low gain was {low_gain} dB");

        let mut bass = BassFilter::new(sr, 2, 200.0);
        bass.set_gain_db(15.0);
        let mut high = stereo_sine(5_000.0, sr, sr as usize / 4);
        bass.process(&mut high, 2);
        let high_gain = db(peak_after_settle(&high, 4800) / 0.25);
        assert!(high_gain.abs() < 0.5, "high gain was {high_gain} dB");
    }

    #[test]
    fn gain_reads_back() {
        let mut bass = BassFilter::new(44_100, 2, 200.0);
        bass.set_gain_db(15.0);
        assert_eq!(bass.gain_db(), 15.0);
        bass.set_gain_db(f32::INFINITY);
        assert_eq!(bass.gain_db(), 15.0);
        bass.set_gain_db(0.0);
        assert_eq!(bass.gain_db(), 0.0);
    }
}
