// src/graph/mod.rs

pub mod bass;
pub mod gain;
pub mod panner;
pub mod position;

pub use bass::BassFilter;
pub use gain::GainStage;
pub use panner::{PanningModel, SpatialPanner};
pub use position::{Position, SpatialPreset};

/// The graph always runs in interleaved stereo.
pub const GRAPH_CHANNELS: usize = 2;

/// Snapshot of every user-facing parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphParams {
    pub volume: f32,
    pub position: Position,
    pub bass_gain_db: f32,
}

/// source -> gain -> panner -> bass shelf -> destination.
///
/// Built once per session. The stage order is fixed by the field layout and
/// `process`; only stage parameters are exposed for mutation.
pub struct EffectGraph {
    gain: GainStage,
    panner: SpatialPanner,
    bass: BassFilter,
    sample_rate: u32,
}

impl EffectGraph {
    pub fn new(sample_rate: u32, model: PanningModel, bass_cutoff_hz: f32) -> Self {
        Self {
            gain: GainStage::new(),
            panner: SpatialPanner::new(sample_rate, model),
            bass: BassFilter::new(sample_rate, GRAPH_CHANNELS, bass_cutoff_hz),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn params(&self) -> GraphParams {
        GraphParams {
            volume: self.gain.gain(),
            position: self.panner.position(),
            bass_gain_db: self.bass.gain_db(),
        }
    }

    pub fn volume(&self) -> f32 {
        self.gain.gain()
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.gain.set_gain(volume);
    }

    pub fn position(&self) -> Position {
        self.panner.position()
    }

    pub fn set_position(&mut self, position: Position) {
        self.panner.set_position(position);
    }

    pub fn bass_gain_db(&self) -> f32 {
        self.bass.gain_db()
    }

    pub fn set_bass_gain_db(&mut self, gain_db: f32) {
        self.bass.set_gain_db(gain_db);
    }

    /// Run one interleaved stereo block through every stage in order.
    pub fn process(&mut self, buffer: &mut [f32]) {
        self.gain.process(buffer);
        self.panner.process(buffer);
        self.bass.process(buffer, GRAPH_CHANNELS);
    }
}
