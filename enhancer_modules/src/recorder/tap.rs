// src/recorder/tap.rs

use ringbuf::traits::Producer;
use ringbuf::HeapProd;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Producer end of the capture path. Lives inside the engine and is fed
/// every rendered block while recording. Never blocks: what does not fit
/// in the ring is dropped and counted.
pub struct CaptureTap {
    producer: HeapProd<f32>,
    dropped: Arc<AtomicU64>,
}

impl CaptureTap {
    pub(crate) fn new(producer: HeapProd<f32>, dropped: Arc<AtomicU64>) -> Self {
        Self { producer, dropped }
    }

    pub fn capture(&mut self, block: &[f32]) {
        let pushed = self.producer.push_slice(block);
        if pushed < block.len() {
            self.dropped.fetch_add((block.len() - pushed) as u64, Ordering::Relaxed);
        }
    }
}
