// src/recorder/mod.rs

pub mod artifact;
pub mod collector;
pub mod tap;

pub use artifact::{Container, RecordingArtifact, ARTIFACT_FILE_NAME, DECLARED_MIME};
pub use collector::ChunkCollector;
pub use tap::CaptureTap;

use crate::error::EnhancerError;
use crate::graph::GRAPH_CHANNELS;
use anyhow::Result;
use log::{info, warn};
use ringbuf::traits::Split;
use ringbuf::HeapRb;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// One play-to-pause capture. `start` hands back the tap to install in the
/// engine; `stop` must only be called once that tap has been removed.
pub struct Recorder {
    collector: Option<JoinHandle<Vec<Vec<f32>>>>,
    stop: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    sample_rate: u32,
}

impl Recorder {
    pub fn start(sample_rate: u32, capacity: usize, chunk_frames: usize) -> Result<(Self, CaptureTap)> {
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();
        let dropped = Arc::new(AtomicU64::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let collector = ChunkCollector::new(consumer, chunk_frames * GRAPH_CHANNELS);
        let stop_clone = stop.clone();
        let handle = thread::Builder::new()
            .name("recorder-collector".into())
            .spawn(move || collector.run(stop_clone))?;

        info!("recording started ({sample_rate} Hz)");

        let tap = CaptureTap::new(producer, dropped.clone());
        Ok((
            Self {
                collector: Some(handle),
                stop,
                dropped,
                sample_rate,
            },
            tap,
        ))
    }

    pub fn stop(mut self) -> Result<RecordingArtifact> {
        let handle = self.collector.take().ok_or(EnhancerError::RecorderNotRunning)?;
        self.stop.store(true, Ordering::Release);
        let chunks = handle.join().map_err(|_| EnhancerError::CollectorPanicked)?;

        let dropped = self.dropped.load(Ordering::Relaxed);
        if dropped > 0 {
            warn!("recorder ring overflowed, {dropped} samples lost");
        }

        let artifact = RecordingArtifact::assemble(chunks, self.sample_rate, dropped)?;
        info!(
            "recording stopped: {} chunks, {:.2}s",
            artifact.chunks().len(),
            artifact.duration().as_secs_f64()
        );
        Ok(artifact)
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        // Abandoned without stop(): let the collector exit
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.collector.take() {
            let _ = handle.join();
        }
    }
}
