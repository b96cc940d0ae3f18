// src/source.rs

use crate::decoder::{probe_file, spawn_decoder, DecodedAudio, DecoderCmd, DecoderFlags, TrackInfo};
use crate::graph::GRAPH_CHANNELS;
use anyhow::Result;
use log::{debug, warn};
use ringbuf::traits::{Consumer, Observer, Split};
use ringbuf::{HeapCons, HeapRb};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;
use std::time::Duration;

/// The head of the graph: something that yields interleaved stereo at the
/// graph's sample rate.
pub trait SampleSource: Send {
    /// Copy up to `dst.len()` samples into `dst`, returning how many were
    /// written. Short reads are fine; the engine pads with silence.
    fn read(&mut self, dst: &mut [f32]) -> usize;

    fn sample_rate(&self) -> u32;

    fn duration(&self) -> Duration;

    /// Jump to `pos`. Returns false if the source could not move.
    fn seek(&mut self, pos: Duration) -> bool;

    /// True once every sample has been handed out.
    fn is_exhausted(&self) -> bool;

    fn set_playing(&mut self, _playing: bool) {}

    /// Release background resources. Must be idempotent.
    fn close(&mut self) {}
}

/// Streams a file from a decoder thread through a ring buffer.
pub struct StreamingSource {
    consumer: HeapCons<f32>,
    decoder_thread: Option<JoinHandle<()>>,
    flags: DecoderFlags,
    seek_tx: Sender<DecoderCmd>,
    info: TrackInfo,
    output_sample_rate: u32,
}

impl StreamingSource {
    pub fn open(path: &Path, output_sample_rate: u32, ring_capacity: usize) -> Result<Self> {
        let info = probe_file(path)?;
        debug!(
            "{}: {} ch, {} Hz, {:?}",
            path.display(),
            info.channels,
            info.sample_rate,
            info.duration
        );

        let (producer, consumer) = HeapRb::<f32>::new(ring_capacity).split();
        let flags = DecoderFlags::new(false);

        let (decoder_thread, seek_tx) = spawn_decoder(
            path.to_string_lossy().into_owned(),
            producer,
            flags.clone(),
            GRAPH_CHANNELS,
            info.sample_rate,
            output_sample_rate,
        );

        Ok(Self {
            consumer,
            decoder_thread: Some(decoder_thread),
            flags,
            seek_tx,
            info,
            output_sample_rate,
        })
    }

    pub fn info(&self) -> &TrackInfo {
        &self.info
    }
}

impl SampleSource for StreamingSource {
    fn read(&mut self, dst: &mut [f32]) -> usize {
        self.consumer.pop_slice(dst)
    }

    fn sample_rate(&self) -> u32 {
        self.output_sample_rate
    }

    fn duration(&self) -> Duration {
        self.info.duration
    }

    fn seek(&mut self, pos: Duration) -> bool {
        // Not exhausted until the decoder reaches the end again
        self.flags.finished.store(false, Ordering::Release);
        if self.seek_tx.send(DecoderCmd::Seek(pos)).is_err() {
            warn!("seek to {pos:?} dropped, decoder thread is gone");
            self.flags.finished.store(true, Ordering::Release);
            return false;
        }
        // Drop queued audio so the jump is immediate
        while self.consumer.try_pop().is_some() {}
        true
    }

    fn is_exhausted(&self) -> bool {
        self.flags.is_finished() && self.consumer.is_empty()
    }

    fn set_playing(&mut self, playing: bool) {
        self.flags.is_playing.store(playing, Ordering::Relaxed);
    }

    fn close(&mut self) {
        self.flags.request_shutdown();
        if let Some(handle) = self.decoder_thread.take() {
            if handle.join().is_err() {
                warn!("decoder thread panicked");
            }
        }
    }
}

impl Drop for StreamingSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// A fully decoded signal held in memory.
pub struct BufferSource {
    samples: Vec<f32>,
    cursor: usize,
    sample_rate: u32,
}

impl BufferSource {
    /// `samples` must be interleaved stereo.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, cursor: 0, sample_rate }
    }

    pub fn remaining(&self) -> usize {
        self.samples.len() - self.cursor
    }
}

impl From<DecodedAudio> for BufferSource {
    fn from(audio: DecodedAudio) -> Self {
        Self::new(audio.samples, audio.sample_rate)
    }
}

impl SampleSource for BufferSource {
    fn read(&mut self, dst: &mut [f32]) -> usize {
        let n = dst.len().min(self.remaining());
        dst[..n].copy_from_slice(&self.samples[self.cursor..self.cursor + n]);
        self.cursor += n;
        n
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn duration(&self) -> Duration {
        let frames = self.samples.len() / GRAPH_CHANNELS;
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }

    fn seek(&mut self, pos: Duration) -> bool {
        let frame = (pos.as_secs_f64() * self.sample_rate as f64).round() as usize;
        self.cursor = (frame * GRAPH_CHANNELS).min(self.samples.len());
        true
    }

    fn is_exhausted(&self) -> bool {
        self.cursor >= self.samples.len()
    }
}
