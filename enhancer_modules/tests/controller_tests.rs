use enhancer_modules::{
    BufferSource, EffectController, EnhancerConfig, PanningModel, Position, SampleSource, SpatialPreset,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const SR: u32 = 8_000;

fn test_config() -> EnhancerConfig {
    EnhancerConfig {
        panning_model: PanningModel::EqualPower,
        frame_rate: 200.0,
        chunk_frames: 256,
        ..Default::default()
    }
}

fn tone(frames: usize) -> BufferSource {
    let samples = (0..frames)
        .flat_map(|i| {
            let s = (i as f32 * 0.05).sin() * 0.3;
            [s, s]
        })
        .collect();
    BufferSource::new(samples, SR)
}

fn loaded(frames: usize) -> EffectController {
    let mut controller = EffectController::new(test_config());
    controller.load_source(Box::new(tone(frames))).unwrap();
    controller
}

/// Pull `blocks` blocks of `block_len` samples through the session, as the
/// output stream would.
fn pull(controller: &EffectController, blocks: usize, block_len: usize) -> Vec<f32> {
    let session = controller.session().unwrap();
    let mut rendered = Vec::new();
    let mut buf = vec![0.0; block_len];
    for _ in 0..blocks {
        session.render(&mut buf);
        rendered.extend_from_slice(&buf);
    }
    rendered
}

/// A source that reports when it has been closed.
struct TrackedSource {
    inner: BufferSource,
    closed: Arc<AtomicBool>,
}

impl SampleSource for TrackedSource {
    fn read(&mut self, dst: &mut [f32]) -> usize {
        self.inner.read(dst)
    }
    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }
    fn duration(&self) -> Duration {
        self.inner.duration()
    }
    fn seek(&mut self, pos: Duration) -> bool {
        self.inner.seek(pos)
    }
    fn is_exhausted(&self) -> bool {
        self.inner.is_exhausted()
    }
    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[test]
fn effect_operations_without_a_file_are_noops() {
    let mut controller = EffectController::new(test_config());

    controller.apply_spatial_preset(SpatialPreset::EightD);
    controller.start_surround();
    controller.toggle_bass_boost();
    controller.reset_effects();
    controller.set_volume(0.5);
    controller.seek(Duration::from_secs(3));
    controller.play().unwrap();
    controller.pause().unwrap();
    controller.tick().unwrap();

    assert!(!controller.has_session());
    assert!(!controller.is_playing());
    assert!(!controller.is_recording());
    assert!(!controller.is_orbiting());
    assert_eq!(controller.spatial_position(), None);
    assert_eq!(controller.bass_gain_db(), None);
    assert_eq!(controller.artifact_count(), 0);
    assert!(controller.close().is_none());
}

#[test]
fn fresh_session_has_neutral_parameters() {
    let controller = loaded(1000);
    assert_eq!(controller.volume(), Some(1.0));
    assert_eq!(controller.spatial_position(), Some(Position::ORIGIN));
    assert_eq!(controller.bass_gain_db(), Some(0.0));
    assert!(!controller.is_playing());
}

#[test]
fn reset_after_any_toggles_returns_to_neutral() {
    let mut controller = loaded(1000);
    controller.toggle_bass_boost();
    controller.apply_spatial_preset(SpatialPreset::SixD);
    controller.start_surround();

    controller.reset_effects();
    assert_eq!(controller.spatial_position(), Some(Position::ORIGIN));
    assert_eq!(controller.bass_gain_db(), Some(0.0));

    // Reset from neutral stays neutral
    controller.reset_effects();
    assert_eq!(controller.bass_gain_db(), Some(0.0));
}

#[test]
fn bass_toggle_alternates_between_zero_and_boost() {
    let mut controller = loaded(1000);
    controller.toggle_bass_boost();
    assert_eq!(controller.bass_gain_db(), Some(15.0));
    controller.toggle_bass_boost();
    assert_eq!(controller.bass_gain_db(), Some(0.0));
}

#[test]
fn presets_land_on_their_coordinates() {
    let mut controller = loaded(1000);
    controller.start_surround();

    for preset in SpatialPreset::ALL {
        controller.apply_spatial_preset(preset);
        assert_eq!(controller.spatial_position(), Some(preset.position()));
    }
    assert_eq!(controller.spatial_position(), Some(Position::new(1.0, 1.0, 1.0)));
}

#[test]
fn surround_while_paused_takes_a_single_step() {
    let mut controller = loaded(1000);
    controller.start_surround();
    assert!(!controller.is_orbiting());

    let p = controller.spatial_position().unwrap();
    assert!((p.x - 3.0 * 0.02f32.cos()).abs() < 1e-5);
    assert!((p.z - 3.0 * 0.02f32.sin()).abs() < 1e-5);

    thread::sleep(Duration::from_millis(30));
    assert_eq!(controller.spatial_position(), Some(p));
}

#[test]
fn surround_orbits_while_playing_and_freezes_on_pause() {
    let mut controller = loaded(SR as usize * 10);
    controller.play().unwrap();
    controller.start_surround();
    assert!(controller.is_orbiting());

    let mut last_angle = f32::MIN;
    for _ in 0..6 {
        thread::sleep(Duration::from_millis(15));
        let p = controller.spatial_position().unwrap();
        assert_eq!(p.y, 0.0);
        assert!((p.x * p.x + p.z * p.z - 9.0).abs() < 1e-3);
        let angle = p.z.atan2(p.x);
        assert!(angle >= last_angle);
        last_angle = angle;
    }
    assert!(last_angle > 0.02);

    controller.pause().unwrap();
    assert!(!controller.is_orbiting());
    let frozen = controller.spatial_position();
    thread::sleep(Duration::from_millis(40));
    assert_eq!(controller.spatial_position(), frozen);
}

#[test]
fn play_pause_yields_one_artifact_with_everything_rendered() {
    let mut controller = loaded(SR as usize);
    controller.play().unwrap();
    assert!(controller.is_recording());

    let rendered = pull(&controller, 5, 300);
    controller.pause().unwrap();

    assert!(!controller.is_recording());
    assert_eq!(controller.artifact_count(), 1);

    let artifact = controller.last_artifact().unwrap();
    assert_eq!(artifact.file_name(), "enhanced_music.mp3");
    assert_eq!(artifact.declared_mime(), "audio/mpeg");
    assert_eq!(artifact.sample_rate(), SR);
    assert_eq!(artifact.dropped_samples(), 0);
    assert_eq!(artifact.samples().collect::<Vec<_>>(), rendered);
    assert!(artifact.chunks().iter().all(|c| c.len() <= 256 * 2));

    // A second pause is a no-op
    controller.pause().unwrap();
    assert_eq!(controller.artifact_count(), 1);
}

#[test]
fn each_cycle_records_from_scratch() {
    let mut controller = loaded(SR as usize);

    controller.play().unwrap();
    pull(&controller, 2, 200);
    controller.pause().unwrap();
    assert_eq!(controller.last_artifact().unwrap().frames(), 200);

    controller.play().unwrap();
    pull(&controller, 1, 100);
    controller.pause().unwrap();
    assert_eq!(controller.artifact_count(), 2);
    assert_eq!(controller.last_artifact().unwrap().frames(), 50);
}

#[test]
fn end_of_track_counts_as_pause() {
    let mut controller = loaded(100);
    controller.play().unwrap();
    controller.start_surround();

    pull(&controller, 3, 100);
    controller.tick().unwrap();

    assert!(!controller.is_playing());
    assert!(!controller.is_orbiting());
    assert_eq!(controller.artifact_count(), 1);
    assert_eq!(controller.last_artifact().unwrap().frames(), 100);
}

#[test]
fn replay_after_the_end_starts_from_the_top() {
    let mut controller = loaded(100);
    controller.play().unwrap();
    pull(&controller, 3, 100);
    controller.tick().unwrap();
    assert!(!controller.is_playing());

    controller.play().unwrap();
    assert_eq!(controller.position(), Duration::ZERO);
    let rendered = pull(&controller, 1, 100);
    controller.pause().unwrap();

    assert!(rendered.iter().any(|s| *s != 0.0));
    assert_eq!(controller.artifact_count(), 2);
    assert_eq!(controller.last_artifact().unwrap().frames(), 50);
}

#[test]
fn seek_moves_the_playhead() {
    let mut controller = loaded(SR as usize * 4);
    controller.seek(Duration::from_secs(2));
    assert_eq!(controller.position(), Duration::from_secs(2));

    controller.seek_by(-5.0);
    assert_eq!(controller.position(), Duration::ZERO);
}

#[test]
fn loading_again_closes_the_previous_session() {
    let closed = Arc::new(AtomicBool::new(false));
    let first = TrackedSource {
        inner: tone(SR as usize),
        closed: closed.clone(),
    };

    let mut controller = EffectController::new(test_config());
    controller.load_source(Box::new(first)).unwrap();
    controller.toggle_bass_boost();
    controller.play().unwrap();
    controller.start_surround();
    pull(&controller, 2, 128);

    controller.load_source(Box::new(tone(500))).unwrap();

    assert!(closed.load(Ordering::SeqCst));
    assert_eq!(controller.artifact_count(), 1);
    assert_eq!(controller.last_artifact().unwrap().frames(), 128);
    assert!(!controller.is_playing());
    assert!(!controller.is_orbiting());
    assert_eq!(controller.bass_gain_db(), Some(0.0));
}

#[test]
fn failed_load_keeps_the_current_session() {
    let mut controller = loaded(1000);
    controller.toggle_bass_boost();

    // The file is checked before any output device is opened
    let err = controller.load_file(Path::new("does/not/exist.wav")).unwrap_err();
    let chain = format!("{err:#}");
    assert!(chain.contains("loading does/not/exist.wav"), "{chain}");
    assert!(controller.has_session());
    assert_eq!(controller.bass_gain_db(), Some(15.0));
}

#[test]
fn closing_mid_recording_hands_back_the_artifact() {
    let mut controller = loaded(SR as usize);
    controller.play().unwrap();
    pull(&controller, 1, 64);

    let artifact = controller.close().unwrap();
    assert_eq!(artifact.frames(), 32);
    assert!(!controller.has_session());
}

#[test]
fn saving_writes_the_fixed_name_into_the_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = EffectController::new(EnhancerConfig {
        output_dir: dir.path().to_path_buf(),
        ..test_config()
    });
    assert!(controller.save_last_artifact().unwrap().is_none());

    controller.load_source(Box::new(tone(1000))).unwrap();
    controller.play().unwrap();
    pull(&controller, 1, 64);
    controller.pause().unwrap();

    let path = controller.save_last_artifact().unwrap().unwrap();
    assert_eq!(path, dir.path().join("enhanced_music.mp3"));
    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.len(), 64);
}
