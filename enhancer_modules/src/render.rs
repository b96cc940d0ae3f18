// src/render.rs
//
// Offline rendering: a whole file through a fresh graph, no device.

use crate::config::EnhancerConfig;
use crate::decoder::{decode_to_stereo, DecodedAudio};
use crate::engine::Engine;
use crate::error::EnhancerError;
use crate::graph::{EffectGraph, SpatialPreset, GRAPH_CHANNELS};
use crate::orbit::OrbitMotion;
use crate::recorder::RecordingArtifact;
use crate::source::BufferSource;
use anyhow::{Context, Result};
use log::info;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Which effects an offline render applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPlan {
    pub preset: Option<SpatialPreset>,
    pub surround: bool,
    pub bass: bool,
    pub volume: f32,
}

impl Default for RenderPlan {
    fn default() -> Self {
        Self {
            preset: None,
            surround: false,
            bass: false,
            volume: 1.0,
        }
    }
}

impl FromStr for RenderPlan {
    type Err = EnhancerError;

    /// Comma list of `4d`, `6d`, `8d`, `surround`, `bass`. A later preset
    /// replaces an earlier one.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut plan = RenderPlan::default();
        for step in s.split(',').map(str::trim).filter(|step| !step.is_empty()) {
            match step.to_ascii_lowercase().as_str() {
                "surround" => plan.surround = true,
                "bass" => plan.bass = true,
                other => {
                    let preset = other
                        .parse::<SpatialPreset>()
                        .map_err(|_| EnhancerError::UnknownRenderStep(step.to_string()))?;
                    plan.preset = Some(preset);
                }
            }
        }
        Ok(plan)
    }
}

impl fmt::Display for RenderPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut steps = Vec::new();
        if let Some(preset) = self.preset {
            steps.push(preset.label().to_ascii_lowercase());
        }
        if self.surround {
            steps.push("surround".into());
        }
        if self.bass {
            steps.push("bass".into());
        }
        if steps.is_empty() {
            write!(f, "dry")
        } else {
            write!(f, "{}", steps.join(","))
        }
    }
}

/// Decode `path`, run it through the graph and return the recording.
pub fn render_file(path: &Path, plan: &RenderPlan, config: &EnhancerConfig) -> Result<RecordingArtifact> {
    let audio = decode_to_stereo(path).with_context(|| format!("decoding {}", path.display()))?;
    info!(
        "rendering {} ({:.2}s) with {plan}",
        path.display(),
        audio.duration().as_secs_f64()
    );
    render_audio(audio, plan, config)
}

/// Same as `render_file` for audio that is already decoded.
///
/// Output has exactly as many frames as the input. With surround on, the
/// orbit moves one step per frame tick's worth of samples.
pub fn render_audio(audio: DecodedAudio, plan: &RenderPlan, config: &EnhancerConfig) -> Result<RecordingArtifact> {
    config.validate()?;

    let sample_rate = audio.sample_rate;
    let total = audio.samples.len();
    let mut graph = EffectGraph::new(sample_rate, config.panning_model, config.bass_cutoff_hz);
    graph.set_volume(plan.volume);
    if let Some(preset) = plan.preset {
        graph.set_position(preset.position());
    }
    if plan.bass {
        graph.set_bass_gain_db(config.bass_boost_db);
    }

    let mut engine = Engine::new(Box::new(BufferSource::from(audio)), graph);
    engine.play();

    let mut orbit = plan
        .surround
        .then(|| OrbitMotion::new(config.orbit_step, config.orbit_radius));

    let block = config.frames_per_tick(sample_rate) * GRAPH_CHANNELS;
    let mut rendered = vec![0.0f32; total];
    for out in rendered.chunks_mut(block) {
        if let Some(motion) = orbit.as_mut() {
            engine.graph_mut().set_position(motion.advance());
        }
        engine.render(out);
    }
    engine.close();

    let chunk_samples = config.chunk_frames * GRAPH_CHANNELS;
    let chunks: Vec<Vec<f32>> = rendered.chunks(chunk_samples).map(<[f32]>::to_vec).collect();
    RecordingArtifact::assemble(chunks, sample_rate, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_parses_steps_in_any_case() {
        let plan: RenderPlan = "8D, bass,Surround".parse().unwrap();
        assert_eq!(plan.preset, Some(SpatialPreset::EightD));
        assert!(plan.bass);
        assert!(plan.surround);
        assert_eq!(plan.to_string(), "8d,surround,bass");
    }

    #[test]
    fn later_preset_wins() {
        let plan: RenderPlan = "4d,6d".parse().unwrap();
        assert_eq!(plan.preset, Some(SpatialPreset::SixD));
    }

    #[test]
    fn empty_plan_is_dry() {
        let plan: RenderPlan = "".parse().unwrap();
        assert_eq!(plan, RenderPlan::default());
        assert_eq!(plan.to_string(), "dry");
    }

    #[test]
    fn unknown_step_is_rejected() {
        let err = "bass,reverb".parse::<RenderPlan>().unwrap_err();
        assert_eq!(err, EnhancerError::UnknownRenderStep("reverb".to_string()));
    }

    #[test]
    fn dry_render_is_transparent() {
        let samples: Vec<f32> = (0..2000).map(|i| ((i as f32) * 0.01).sin() * 0.5).collect();
        let audio = DecodedAudio {
            samples: samples.clone(),
            sample_rate: 8000,
            source_channels: 2,
        };
        // HRTF folds stereo to mono even at the origin; equal-power does not
        let config = EnhancerConfig {
            panning_model: crate::graph::PanningModel::EqualPower,
            ..Default::default()
        };
        let artifact = render_audio(audio, &RenderPlan::default(), &config).unwrap();
        assert_eq!(artifact.frames(), 1000);
        assert_eq!(artifact.samples().collect::<Vec<_>>(), samples);
    }
}
