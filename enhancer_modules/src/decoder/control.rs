// src/decoder/control.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Commands the decoder thread picks up between packets.
pub enum DecoderCmd {
    Seek(Duration),
}

/// Flags shared between a decoder thread and its owner.
#[derive(Clone, Default)]
pub struct DecoderFlags {
    /// Throttles decoding while the transport is paused.
    pub is_playing: Arc<AtomicBool>,
    /// Set by the owner to make the thread exit, even mid-push.
    pub shutdown: Arc<AtomicBool>,
    /// Set by the thread once it has pushed its last sample. A seek clears it.
    pub finished: Arc<AtomicBool>,
}

impl DecoderFlags {
    pub fn new(playing: bool) -> Self {
        let flags = Self::default();
        flags.is_playing.store(playing, Ordering::Relaxed);
        flags
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}
