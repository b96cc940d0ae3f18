// src/decoder/output.rs

use ringbuf::traits::Producer as RbProducer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Push `data` into the ring, ramping in the first `post_seek_fade_samples`
/// samples. Parks while the ring is full. Returns `false` if `shutdown` was
/// raised before everything was pushed.
pub fn push_with_fade<P: RbProducer<Item = f32>>(
    producer: &mut P,
    data: &[f32],
    post_seek_fade_samples: &mut usize,
    shutdown: &AtomicBool,
) -> bool {
    let fade_len = (*post_seek_fade_samples).min(data.len());

    for (i, &s) in data.iter().enumerate() {
        let s = if i < fade_len { s * (i as f32 / fade_len as f32) } else { s };
        while producer.try_push(s).is_err() {
            if shutdown.load(Ordering::Acquire) {
                return false;
            }
            std::thread::park_timeout(Duration::from_micros(200));
        }
    }

    *post_seek_fade_samples -= fade_len;
    true
}
