// src/controller.rs

use crate::config::EnhancerConfig;
use crate::graph::{Position, SpatialPreset};
use crate::orbit::OrbitMotion;
use crate::recorder::RecordingArtifact;
use crate::session::AudioSession;
use crate::source::SampleSource;
use anyhow::Result;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The effect graph controller: owns at most one session and maps user
/// commands onto graph parameters and the recorder.
///
/// Every effect operation is a silent no-op while no file is loaded.
pub struct EffectController {
    config: EnhancerConfig,
    session: Option<AudioSession>,
    last_artifact: Option<RecordingArtifact>,
    artifact_count: usize,
}

impl EffectController {
    pub fn new(config: EnhancerConfig) -> Self {
        Self {
            config,
            session: None,
            last_artifact: None,
            artifact_count: 0,
        }
    }

    // -------------------------------------------------------------
    // Session lifecycle
    // -------------------------------------------------------------

    /// Open `path` on the default output device. On failure the current
    /// session is left as it was.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let session = AudioSession::open(path, &self.config)?;
        self.replace_session(session);
        Ok(())
    }

    /// Same as `load_file` but for a source with no device behind it.
    pub fn load_source(&mut self, source: Box<dyn SampleSource>) -> Result<()> {
        let session = AudioSession::from_source(source, &self.config)?;
        self.replace_session(session);
        Ok(())
    }

    fn replace_session(&mut self, session: AudioSession) {
        self.close();
        self.session = Some(session);
    }

    /// Tear down the current session. Returns the artifact of a recording
    /// that was still running, if any.
    pub fn close(&mut self) -> Option<&RecordingArtifact> {
        let artifact = self.session.take().and_then(|mut session| session.close());
        match artifact {
            Some(artifact) => Some(self.store_artifact(artifact)),
            None => None,
        }
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&AudioSession> {
        self.session.as_ref()
    }

    // -------------------------------------------------------------
    // Effects
    // -------------------------------------------------------------

    pub fn apply_spatial_preset(&mut self, preset: SpatialPreset) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.stop_orbit();
        session.with_engine(|eng| {
            let graph = eng.graph_mut();
            graph.set_position(Position::ORIGIN);
            graph.set_position(preset.position());
        });
        info!("{} preset at {}", preset.label(), preset.position());
    }

    /// Put the source on a circle around the listener. The first step lands
    /// immediately; the motion only keeps going while playing.
    pub fn start_surround(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.stop_orbit();

        let mut motion = OrbitMotion::new(self.config.orbit_step, self.config.orbit_radius);
        let first = motion.advance();
        session.with_engine(|eng| eng.graph_mut().set_position(first));

        if session.is_playing() {
            session.start_orbit(motion);
            info!("surround started (r = {})", motion.radius());
        } else {
            debug!("surround: paused, single step to {first}");
        }
    }

    pub fn toggle_bass_boost(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let boost = self.config.bass_boost_db;
        let gain = session.with_engine(|eng| {
            let graph = eng.graph_mut();
            let next = if graph.bass_gain_db() == 0.0 { boost } else { 0.0 };
            graph.set_bass_gain_db(next);
            next
        });
        if let Some(gain) = gain {
            info!("bass shelf at {gain:+.1} dB");
        }
    }

    pub fn reset_effects(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.stop_orbit();
        session.with_engine(|eng| {
            let graph = eng.graph_mut();
            graph.set_position(Position::ORIGIN);
            graph.set_bass_gain_db(0.0);
        });
        info!("effects reset");
    }

    pub fn set_volume(&mut self, level: f32) {
        if let Some(session) = &self.session {
            session.with_engine(|eng| eng.graph_mut().set_volume(level));
        }
    }

    pub fn volume(&self) -> Option<f32> {
        self.session.as_ref()?.params().map(|p| p.volume)
    }

    pub fn spatial_position(&self) -> Option<Position> {
        self.session.as_ref()?.params().map(|p| p.position)
    }

    pub fn bass_gain_db(&self) -> Option<f32> {
        self.session.as_ref()?.params().map(|p| p.bass_gain_db)
    }

    pub fn is_orbiting(&self) -> bool {
        self.session.as_ref().is_some_and(AudioSession::is_orbiting)
    }

    // -------------------------------------------------------------
    // Transport + recording
    // -------------------------------------------------------------

    /// Start playback and a fresh recording.
    pub fn play(&mut self) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if session.is_playing() {
            return Ok(());
        }
        session.start_recording()?;
        session.with_engine(|eng| eng.play());
        Ok(())
    }

    /// Stop playback; the recording made since `play` becomes the new
    /// artifact. Pausing while not playing does nothing.
    pub fn pause(&mut self) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if !session.is_playing() {
            return Ok(());
        }

        session.stop_orbit();
        session.with_engine(|eng| eng.pause());
        if let Some(artifact) = session.stop_recording()? {
            self.store_artifact(artifact);
        }
        Ok(())
    }

    pub fn toggle_play(&mut self) -> Result<()> {
        if self.is_playing() { self.pause() } else { self.play() }
    }

    pub fn is_playing(&self) -> bool {
        self.session.as_ref().is_some_and(AudioSession::is_playing)
    }

    pub fn is_recording(&self) -> bool {
        self.session.as_ref().is_some_and(AudioSession::is_recording)
    }

    pub fn seek(&mut self, pos: Duration) {
        if let Some(session) = &self.session {
            session.with_engine(|eng| eng.seek(pos));
        }
    }

    /// Relative seek, clamped at the start of the track.
    pub fn seek_by(&mut self, delta_secs: f64) {
        let target = (self.position().as_secs_f64() + delta_secs).max(0.0);
        self.seek(Duration::from_secs_f64(target));
    }

    pub fn position(&self) -> Duration {
        self.session.as_ref().map(AudioSession::position).unwrap_or_default()
    }

    pub fn duration(&self) -> Duration {
        self.session.as_ref().map(AudioSession::duration).unwrap_or_default()
    }

    /// Per-frame housekeeping: a source that ran dry counts as a pause.
    pub fn tick(&mut self) -> Result<()> {
        let finished = self
            .session
            .as_ref()
            .is_some_and(|s| s.is_playing() && s.is_finished());
        if finished {
            info!("track finished");
            self.pause()?;
        }
        Ok(())
    }

    // -------------------------------------------------------------
    // Artifacts
    // -------------------------------------------------------------

    fn store_artifact(&mut self, artifact: RecordingArtifact) -> &RecordingArtifact {
        self.artifact_count += 1;
        self.last_artifact.insert(artifact)
    }

    pub fn last_artifact(&self) -> Option<&RecordingArtifact> {
        self.last_artifact.as_ref()
    }

    /// Number of artifacts produced since the controller was created.
    pub fn artifact_count(&self) -> usize {
        self.artifact_count
    }

    /// Write the latest artifact into the configured output directory.
    pub fn save_last_artifact(&self) -> Result<Option<PathBuf>> {
        match &self.last_artifact {
            Some(artifact) => artifact.save_to(&self.config.output_dir).map(Some),
            None => Ok(None),
        }
    }
}

impl Drop for EffectController {
    fn drop(&mut self) {
        self.close();
    }
}
