// src/session.rs

use crate::audio::{setup_output_device, start_output_stream};
use crate::config::EnhancerConfig;
use crate::decoder::probe_file;
use crate::engine::Engine;
use crate::graph::{EffectGraph, GraphParams};
use crate::orbit::{OrbitHandle, OrbitMotion};
use crate::recorder::{Recorder, RecordingArtifact};
use crate::source::{SampleSource, StreamingSource};
use anyhow::{Context, Result};
use cpal::Stream;
use log::{info, warn};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Everything that belongs to one loaded file: the engine (source + graph),
/// the device stream, the running recorder and orbit task.
///
/// Built with `open` (device playback) or `from_source` (no device, the
/// caller drives `render`). Torn down by `close`, which also runs on drop.
pub struct AudioSession {
    label: String,
    engine: Arc<Mutex<Engine>>,
    stream: Option<Stream>,
    recorder: Option<Recorder>,
    orbit: Option<OrbitHandle>,
    config: EnhancerConfig,
    closed: bool,
}

impl AudioSession {
    pub fn open(path: &Path, config: &EnhancerConfig) -> Result<Self> {
        // An unreadable file fails before the device is claimed
        probe_file(path).with_context(|| format!("loading {}", path.display()))?;
        let output = setup_output_device()?;
        let source = StreamingSource::open(path, output.output_sample_rate, config.ring_capacity)
            .with_context(|| format!("loading {}", path.display()))?;

        let mut session = Self::from_source(Box::new(source), config)?;
        session.label = path.display().to_string();
        session.stream = Some(start_output_stream(output, session.engine.clone())?);

        info!("session opened: {}", session.label);
        Ok(session)
    }

    /// Build the graph around `source` without touching any audio device.
    pub fn from_source(source: Box<dyn SampleSource>, config: &EnhancerConfig) -> Result<Self> {
        config.validate()?;
        let graph = EffectGraph::new(source.sample_rate(), config.panning_model, config.bass_cutoff_hz);
        let engine = Engine::new(source, graph);

        Ok(Self {
            label: String::from("<memory>"),
            engine: Arc::new(Mutex::new(engine)),
            stream: None,
            recorder: None,
            orbit: None,
            config: config.clone(),
            closed: false,
        })
    }

    /// Run `f` against the engine. `None` if the lock is poisoned.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> Option<R> {
        self.engine.lock().ok().map(|mut eng| f(&mut eng))
    }

    pub fn params(&self) -> Option<GraphParams> {
        self.with_engine(|eng| eng.graph().params())
    }

    pub fn position(&self) -> Duration {
        self.with_engine(|eng| eng.transport.position).unwrap_or_default()
    }

    pub fn duration(&self) -> Duration {
        self.with_engine(|eng| eng.duration()).unwrap_or_default()
    }

    pub fn is_playing(&self) -> bool {
        self.with_engine(|eng| eng.transport.playing).unwrap_or(false)
    }

    pub fn is_finished(&self) -> bool {
        self.with_engine(|eng| eng.transport.finished).unwrap_or(false)
    }

    /// Drive the engine by hand (sessions without a device stream).
    pub fn render(&self, out: &mut [f32]) {
        if self.with_engine(|eng| eng.render(out)).is_none() {
            out.fill(0.0);
        }
    }

    // --- Orbit ---

    pub fn is_orbiting(&self) -> bool {
        self.orbit.as_ref().is_some_and(OrbitHandle::is_running)
    }

    pub fn start_orbit(&mut self, motion: OrbitMotion) {
        self.stop_orbit();
        let interval = self.config.frame_interval();
        self.orbit = Some(OrbitHandle::spawn(self.engine.clone(), motion, interval));
    }

    pub fn stop_orbit(&mut self) -> Option<OrbitMotion> {
        self.orbit.take().and_then(OrbitHandle::cancel)
    }

    // --- Recording ---

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    pub fn start_recording(&mut self) -> Result<()> {
        if self.recorder.is_some() {
            return Ok(());
        }
        let sample_rate = self.with_engine(|eng| eng.sample_rate()).unwrap_or(44_100);
        let (recorder, tap) = Recorder::start(sample_rate, self.config.record_capacity, self.config.chunk_frames)?;
        self.with_engine(|eng| eng.install_tap(tap));
        self.recorder = Some(recorder);
        Ok(())
    }

    pub fn stop_recording(&mut self) -> Result<Option<RecordingArtifact>> {
        let Some(recorder) = self.recorder.take() else {
            return Ok(None);
        };
        // Tap must be gone before the collector's final drain
        self.with_engine(|eng| eng.take_tap());
        recorder.stop().map(Some)
    }

    // --- Teardown ---

    /// Cancel the orbit, finish any recording, stop the stream and the
    /// decoder. Safe to call more than once.
    pub fn close(&mut self) -> Option<RecordingArtifact> {
        if self.closed {
            return None;
        }
        self.closed = true;

        self.stop_orbit();
        let artifact = match self.stop_recording() {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!("dropping unfinished recording: {e:#}");
                None
            }
        };

        self.stream = None;
        self.with_engine(Engine::close);
        info!("session closed: {}", self.label);
        artifact
    }
}

impl Drop for AudioSession {
    fn drop(&mut self) {
        self.close();
    }
}

