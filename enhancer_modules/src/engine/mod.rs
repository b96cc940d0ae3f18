// src/engine/mod.rs

use crate::graph::{EffectGraph, GRAPH_CHANNELS};
use crate::recorder::CaptureTap;
use crate::source::SampleSource;
use std::time::Duration;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transport {
    pub position: Duration,
    pub playing: bool,
    /// The source ran dry while playing. Cleared by `play` and `seek`.
    pub finished: bool,
}

/// Everything the audio callback touches: source, graph, capture tap.
///
/// Shared as `Arc<Mutex<Engine>>` between the output stream, the controller
/// and the orbit task.
pub struct Engine {
    pub transport: Transport,
    source: Box<dyn SampleSource>,
    graph: EffectGraph,
    tap: Option<CaptureTap>,
}

impl Engine {
    pub fn new(source: Box<dyn SampleSource>, graph: EffectGraph) -> Self {
        Self {
            transport: Transport::default(),
            source,
            graph,
            tap: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.graph.sample_rate()
    }

    pub fn duration(&self) -> Duration {
        self.source.duration()
    }

    pub fn graph(&self) -> &EffectGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut EffectGraph {
        &mut self.graph
    }

    /// Start the transport. A source that already ran out starts over from
    /// the top.
    pub fn play(&mut self) {
        if self.transport.finished || self.source.is_exhausted() {
            self.seek(Duration::ZERO);
        }
        self.transport.playing = true;
        self.transport.finished = false;
        self.source.set_playing(true);
    }

    pub fn pause(&mut self) {
        self.transport.playing = false;
        self.source.set_playing(false);
    }

    /// Move the playhead. Returns false, leaving the transport untouched, when
    /// the source could not follow.
    pub fn seek(&mut self, pos: Duration) -> bool {
        // Zero means the length is unknown (some mp3 streams)
        let duration = self.source.duration();
        let pos = if duration > Duration::ZERO { pos.min(duration) } else { pos };
        if !self.source.seek(pos) {
            return false;
        }
        self.transport.position = pos;
        self.transport.finished = false;
        true
    }

    /// Attach the recorder's end of the capture path. Returns the previous tap.
    pub fn install_tap(&mut self, tap: CaptureTap) -> Option<CaptureTap> {
        self.tap.replace(tap)
    }

    pub fn take_tap(&mut self) -> Option<CaptureTap> {
        self.tap.take()
    }

    /// Render one block of interleaved stereo into `out`.
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);

        if !self.transport.playing {
            return;
        }

        let read = self.source.read(out);
        if read == 0 && self.source.is_exhausted() {
            self.transport.finished = true;
            return;
        }

        self.graph.process(out);

        if let Some(tap) = self.tap.as_mut() {
            tap.capture(out);
        }

        let frames = read / GRAPH_CHANNELS;
        self.transport.position += Duration::from_secs_f64(frames as f64 / self.sample_rate() as f64);
    }

    pub fn close(&mut self) {
        self.transport.playing = false;
        self.tap = None;
        self.source.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PanningModel;
    use crate::source::BufferSource;

    fn engine_with(frames: usize) -> Engine {
        let source = BufferSource::new(vec![0.25; frames * 2], 1000);
        let graph = EffectGraph::new(1000, PanningModel::EqualPower, 200.0);
        Engine::new(Box::new(source), graph)
    }

    fn assert_secs(d: Duration, secs: f64) {
        assert!((d.as_secs_f64() - secs).abs() < 1e-6, "{d:?} != {secs}s");
    }

    #[test]
    fn paused_engine_renders_silence() {
        let mut engine = engine_with(100);
        let mut out = vec![1.0; 20];
        engine.render(&mut out);
        assert!(out.iter().all(|s| *s == 0.0));
        assert_eq!(engine.transport.position, Duration::ZERO);
    }

    #[test]
    fn playing_advances_position_and_finishes() {
        let mut engine = engine_with(100);
        engine.play();

        let mut out = vec![0.0; 100]; // 50 frames
        engine.render(&mut out);
        assert_eq!(out, vec![0.25; 100]);
        assert_secs(engine.transport.position, 0.05);

        engine.render(&mut out);
        assert!(!engine.transport.finished);
        engine.render(&mut out);
        assert!(engine.transport.finished);
        assert_secs(engine.transport.position, 0.1);
    }

    #[test]
    fn seek_is_clamped_to_duration() {
        let mut engine = engine_with(100);
        assert!(engine.seek(Duration::from_secs(10)));
        assert_secs(engine.transport.position, 0.1);
    }

    #[test]
    fn play_after_the_end_starts_over() {
        let mut engine = engine_with(50);
        engine.play();
        let mut out = vec![0.0; 100];
        engine.render(&mut out);
        engine.render(&mut out);
        assert!(engine.transport.finished);

        engine.pause();
        engine.play();
        assert_eq!(engine.transport.position, Duration::ZERO);
        engine.render(&mut out);
        assert_eq!(out, vec![0.25; 100]);
    }

    /// A source whose seeks never land.
    struct StuckSource(BufferSource);

    impl SampleSource for StuckSource {
        fn read(&mut self, dst: &mut [f32]) -> usize {
            self.0.read(dst)
        }
        fn sample_rate(&self) -> u32 {
            self.0.sample_rate()
        }
        fn duration(&self) -> Duration {
            self.0.duration()
        }
        fn seek(&mut self, _pos: Duration) -> bool {
            false
        }
        fn is_exhausted(&self) -> bool {
            self.0.is_exhausted()
        }
    }

    #[test]
    fn failed_seek_leaves_the_playhead_alone() {
        let source = StuckSource(BufferSource::new(vec![0.25; 200], 1000));
        let mut engine = Engine::new(Box::new(source), EffectGraph::new(1000, PanningModel::EqualPower, 200.0));
        engine.play();
        let mut out = vec![0.0; 40];
        engine.render(&mut out);

        assert!(!engine.seek(Duration::from_millis(80)));
        assert_secs(engine.transport.position, 0.02);
    }
}
