// src/graph/gain.rs

pub const MAX_GAIN: f32 = 2.0;

/// Volume stage. Plain linear multiplier.
pub struct GainStage {
    gain: f32,
}

impl GainStage {
    pub fn new() -> Self {
        Self { gain: 1.0 }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        if gain.is_finite() {
            self.gain = gain.clamp(0.0, MAX_GAIN);
        }
    }

    pub fn process(&self, buffer: &mut [f32]) {
        if (self.gain - 1.0).abs() <= f32::EPSILON {
            return;
        }
        for sample in buffer.iter_mut() {
            *sample *= self.gain;
        }
    }
}

impl Default for GainStage {
    fn default() -> Self {
        Self::new()
    }
}
