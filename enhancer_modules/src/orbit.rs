// src/orbit.rs
//
// The surround effect: the source circles the listener in the horizontal
// plane, one step per frame tick, until its handle is cancelled.

use crate::engine::Engine;
use crate::graph::Position;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Angle accumulator on a fixed-radius circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitMotion {
    angle: f32,
    step: f32,
    radius: f32,
}

impl OrbitMotion {
    pub fn new(step: f32, radius: f32) -> Self {
        Self { angle: 0.0, step, radius }
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Advance one tick and return the new position.
    pub fn advance(&mut self) -> Position {
        self.angle += self.step;
        self.position()
    }

    pub fn position(&self) -> Position {
        Position::new(self.radius * self.angle.cos(), 0.0, self.radius * self.angle.sin())
    }
}

/// Running surround task. Cancelling (or dropping) the handle stops it;
/// once `cancel` returns the task will not touch the panner again.
pub struct OrbitHandle {
    cancelled: Arc<AtomicBool>,
    thread: Option<JoinHandle<OrbitMotion>>,
}

impl OrbitHandle {
    pub fn spawn(engine: Arc<Mutex<Engine>>, mut motion: OrbitMotion, interval: Duration) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();

        let thread = thread::spawn(move || {
            let mut next = Instant::now() + interval;
            while !flag.load(Ordering::Acquire) {
                let now = Instant::now();
                if now < next {
                    // Short naps so cancel() never waits a whole frame
                    thread::sleep((next - now).min(Duration::from_millis(2)));
                    continue;
                }
                next += interval;

                let position = motion.advance();
                match engine.lock() {
                    // Checked under the lock: cancel() cannot slip in between
                    Ok(mut eng) if !flag.load(Ordering::Acquire) => eng.graph_mut().set_position(position),
                    Ok(_) => break,
                    Err(_) => break,
                }
            }
            motion
        });

        Self { cancelled, thread: Some(thread) }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the task and wait for it. Returns the motion state it reached.
    pub fn cancel(mut self) -> Option<OrbitMotion> {
        self.stop()
    }

    fn stop(&mut self) -> Option<OrbitMotion> {
        self.cancelled.store(true, Ordering::Release);
        let motion = self.thread.take().and_then(|t| t.join().ok());
        if let Some(m) = &motion {
            debug!("orbit stopped at {:.2} rad", m.angle());
        }
        motion
    }
}

impl Drop for OrbitHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn angle_increases_and_stays_on_circle() {
        let mut motion = OrbitMotion::new(0.02, 3.0);
        let mut last = motion.angle();
        for _ in 0..500 {
            let p = motion.advance();
            assert!(motion.angle() > last);
            last = motion.angle();
            assert_eq!(p.y, 0.0);
            assert_relative_eq!(p.x * p.x + p.z * p.z, 9.0, epsilon = 1e-3);
        }
        assert_relative_eq!(motion.angle(), 10.0, epsilon = 1e-3);
    }

    #[test]
    fn first_step_matches_a_single_tick() {
        let mut motion = OrbitMotion::new(0.02, 3.0);
        let p = motion.advance();
        assert_relative_eq!(p.x, 3.0 * 0.02f32.cos(), epsilon = 1e-6);
        assert_relative_eq!(p.z, 3.0 * 0.02f32.sin(), epsilon = 1e-6);
    }
}
