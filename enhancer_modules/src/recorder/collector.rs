// src/recorder/collector.rs

use ringbuf::traits::{Consumer, Observer};
use ringbuf::HeapCons;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const IDLE_SLEEP: Duration = Duration::from_millis(5);

/// Drains the capture ring into fixed-size chunks until told to stop.
pub struct ChunkCollector {
    consumer: HeapCons<f32>,
    chunk_samples: usize,
    chunks: Vec<Vec<f32>>,
    current: Vec<f32>,
}

impl ChunkCollector {
    pub fn new(consumer: HeapCons<f32>, chunk_samples: usize) -> Self {
        Self {
            consumer,
            chunk_samples,
            chunks: Vec::new(),
            current: Vec::with_capacity(chunk_samples),
        }
    }

    /// Pull whatever is queued. Returns the number of samples taken.
    fn drain(&mut self) -> usize {
        let mut taken = 0;
        loop {
            let room = self.chunk_samples - self.current.len();
            let start = self.current.len();
            self.current.resize(start + room, 0.0);
            let popped = self.consumer.pop_slice(&mut self.current[start..]);
            self.current.truncate(start + popped);
            taken += popped;

            if self.current.len() == self.chunk_samples {
                let full = std::mem::replace(&mut self.current, Vec::with_capacity(self.chunk_samples));
                self.chunks.push(full);
            }
            if popped < room {
                return taken;
            }
        }
    }

    /// Run until `stop` is raised. The producer must be gone (or idle)
    /// before `stop` is set so the final drain sees everything.
    pub fn run(mut self, stop: Arc<AtomicBool>) -> Vec<Vec<f32>> {
        loop {
            if self.drain() > 0 {
                continue;
            }
            if stop.load(Ordering::Acquire) {
                break;
            }
            thread::sleep(IDLE_SLEEP);
        }

        // Anything pushed between the last empty read and the stop flag
        while !self.consumer.is_empty() {
            self.drain();
        }
        if !self.current.is_empty() {
            self.chunks.push(std::mem::take(&mut self.current));
        }
        self.chunks
    }
}
