// src/graph/panner.rs
//
// Listener is fixed at the origin, facing -z with +y up. Azimuth, elevation,
// distance attenuation and the equal-power law follow the Web Audio
// PannerNode. The HRTF model is a spherical-head approximation: interaural
// delay on the far ear, head shadow, and a soft high cut behind the head.

use super::position::Position;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};

const HEAD_RADIUS_M: f32 = 0.0875;
const SPEED_OF_SOUND: f32 = 343.0;
const SHADOW_CUTOFF_HZ: f32 = 1_500.0;
const REAR_CUTOFF_HZ: f32 = 4_000.0;
const SMOOTHING_SECS: f32 = 0.01;
const SNAP_EPS: f32 = 1e-5;
const MAX_DELAY_SAMPLES: usize = 256;

const REF_DISTANCE: f32 = 1.0;
const ROLLOFF: f32 = 1.0;
const MAX_DISTANCE: f32 = 10_000.0;

const LISTENER_FORWARD: Position = Position::new(0.0, 0.0, -1.0);
const LISTENER_UP: Position = Position::new(0.0, 1.0, 0.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanningModel {
    EqualPower,
    Hrtf,
}

/// Azimuth and elevation in degrees. Azimuth is positive to the right,
/// 0 straight ahead, ±180 straight behind.
pub fn azimuth_elevation(source: Position) -> (f32, f32) {
    let Some(dir) = source.normalized() else {
        return (0.0, 0.0);
    };

    let right = LISTENER_FORWARD.cross(LISTENER_UP);
    let up = right.cross(LISTENER_FORWARD);

    let up_projection = dir.dot(up);
    let elevation = (90.0 - dir.dot(up).clamp(-1.0, 1.0).acos().to_degrees()).clamp(-90.0, 90.0);

    // Straight above or below: no horizontal component
    let Some(projected) = dir.sub(up.scale(up_projection)).normalized() else {
        return (0.0, elevation);
    };

    let mut azimuth = projected.dot(right).clamp(-1.0, 1.0).acos().to_degrees();
    if projected.dot(LISTENER_FORWARD) < 0.0 {
        azimuth = 360.0 - azimuth;
    }
    let azimuth = if (0.0..=270.0).contains(&azimuth) {
        90.0 - azimuth
    } else {
        450.0 - azimuth
    };

    (azimuth, elevation)
}

/// Inverse distance model.
pub fn distance_gain(source: Position) -> f32 {
    let d = source.length().clamp(REF_DISTANCE, MAX_DISTANCE);
    REF_DISTANCE / (REF_DISTANCE + ROLLOFF * (d - REF_DISTANCE))
}

/// Fold an azimuth onto the frontal half-plane [-90, 90].
fn fold_azimuth(azimuth: f32) -> f32 {
    let az = azimuth.clamp(-180.0, 180.0);
    if az < -90.0 {
        -180.0 - az
    } else if az > 90.0 {
        180.0 - az
    } else {
        az
    }
}

/// cos(pi/2) is not exactly zero in f32; keep the centre position bit-exact.
fn snap_unit(g: f32) -> f32 {
    if g.abs() < 1e-6 {
        0.0
    } else if (g - 1.0).abs() < 1e-6 {
        1.0
    } else {
        g
    }
}

/// Per-sample mixing targets. Every field is smoothed towards its target.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PanParams {
    // 2x2 mixing matrix: out_l = ll*in_l + rl*in_r, out_r = lr*in_l + rr*in_r
    ll: f32,
    rl: f32,
    lr: f32,
    rr: f32,
    delay_l: f32,
    delay_r: f32,
    shadow_l: f32,
    shadow_r: f32,
    rear: f32,
}

impl PanParams {
    const IDENTITY: PanParams = PanParams {
        ll: 1.0,
        rl: 0.0,
        lr: 0.0,
        rr: 1.0,
        delay_l: 0.0,
        delay_r: 0.0,
        shadow_l: 0.0,
        shadow_r: 0.0,
        rear: 0.0,
    };

    fn equal_power(position: Position) -> Self {
        let (azimuth, _) = azimuth_elevation(position);
        let az = fold_azimuth(azimuth);
        let dist = distance_gain(position);

        let x = if az <= 0.0 { (az + 90.0) / 90.0 } else { az / 90.0 };
        let gain_l = snap_unit((x * FRAC_PI_2).cos());
        let gain_r = snap_unit((x * FRAC_PI_2).sin());

        let (ll, rl, lr, rr) = if az <= 0.0 {
            (1.0, gain_l, 0.0, gain_r)
        } else {
            (gain_l, 0.0, gain_r, 1.0)
        };

        PanParams {
            ll: ll * dist,
            rl: rl * dist,
            lr: lr * dist,
            rr: rr * dist,
            ..PanParams::IDENTITY
        }
    }

    fn hrtf(position: Position, sr: u32) -> Self {
        let (azimuth, _) = azimuth_elevation(position);
        let dist = distance_gain(position);
        let lateral = fold_azimuth(azimuth).to_radians();
        let side = lateral.sin(); // -1 full left, +1 full right

        // Woodworth ITD
        let itd_secs = HEAD_RADIUS_M / SPEED_OF_SOUND * (lateral.abs() + side.abs());
        let itd = (itd_secs * sr as f32).min((MAX_DELAY_SAMPLES - 2) as f32);

        let far_gain = 1.0 - 0.4 * side.abs();
        let (gain_l, gain_r) = if side >= 0.0 { (far_gain, 1.0) } else { (1.0, far_gain) };
        let (delay_l, delay_r) = if side > 0.0 { (itd, 0.0) } else { (0.0, itd) };
        let (shadow_l, shadow_r) = if side > 0.0 { (side, 0.0) } else { (0.0, -side) };

        let behind = (azimuth.abs() - 90.0).max(0.0) / 90.0;

        // Stereo input is summed to mono before the head model
        PanParams {
            ll: 0.5 * gain_l * dist,
            rl: 0.5 * gain_l * dist,
            lr: 0.5 * gain_r * dist,
            rr: 0.5 * gain_r * dist,
            delay_l,
            delay_r,
            shadow_l,
            shadow_r,
            rear: 0.5 * behind,
        }
    }

    fn approach(&mut self, target: &PanParams, k: f32) {
        // Lands exactly on the target once the remaining gap is negligible
        // or too small for f32 to move
        let step = |cur: &mut f32, tgt: f32| {
            let next = *cur + k * (tgt - *cur);
            *cur = if next == *cur || (tgt - next).abs() <= SNAP_EPS * tgt.abs().max(1.0) {
                tgt
            } else {
                next
            };
        };
        step(&mut self.ll, target.ll);
        step(&mut self.rl, target.rl);
        step(&mut self.lr, target.lr);
        step(&mut self.rr, target.rr);
        step(&mut self.delay_l, target.delay_l);
        step(&mut self.delay_r, target.delay_r);
        step(&mut self.shadow_l, target.shadow_l);
        step(&mut self.shadow_r, target.shadow_r);
        step(&mut self.rear, target.rear);
    }
}

struct DelayLine {
    buf: [f32; MAX_DELAY_SAMPLES],
    write: usize,
}

impl DelayLine {
    fn new() -> Self {
        Self { buf: [0.0; MAX_DELAY_SAMPLES], write: 0 }
    }

    /// Push `x` and read back `delay` samples ago, linearly interpolated.
    fn tick(&mut self, x: f32, delay: f32) -> f32 {
        self.buf[self.write] = x;
        let out = if delay <= 0.0 {
            x
        } else {
            let whole = delay.floor() as usize;
            let frac = delay - whole as f32;
            let a = self.buf[(self.write + MAX_DELAY_SAMPLES - whole) % MAX_DELAY_SAMPLES];
            let b = self.buf[(self.write + MAX_DELAY_SAMPLES - whole - 1) % MAX_DELAY_SAMPLES];
            a + frac * (b - a)
        };
        self.write = (self.write + 1) % MAX_DELAY_SAMPLES;
        out
    }
}

struct OnePole {
    a: f32,
    y: f32,
}

impl OnePole {
    fn new(cutoff_hz: f32, sr: u32) -> Self {
        Self { a: one_pole_coeff(cutoff_hz, sr), y: 0.0 }
    }

    #[inline]
    fn run(&mut self, x: f32) -> f32 {
        self.y += self.a * (x - self.y);
        if self.y.abs() < 1e-20 {
            self.y = 0.0;
        }
        self.y
    }
}

fn one_pole_coeff(cutoff_hz: f32, sr: u32) -> f32 {
    let cutoff = cutoff_hz.min(sr as f32 * 0.45);
    1.0 - (-2.0 * PI * cutoff / sr as f32).exp()
}

/// The spatial stage. Stereo in, stereo out.
pub struct SpatialPanner {
    position: Position,
    model: PanningModel,
    sr: u32,
    current: PanParams,
    target: PanParams,
    smoothing: f32,
    delay_l: DelayLine,
    delay_r: DelayLine,
    shadow_l: OnePole,
    shadow_r: OnePole,
    rear_l: OnePole,
    rear_r: OnePole,
}

impl SpatialPanner {
    pub fn new(sr: u32, model: PanningModel) -> Self {
        let target = Self::params_for(model, Position::ORIGIN, sr);
        Self {
            position: Position::ORIGIN,
            model,
            sr,
            current: target,
            target,
            smoothing: 1.0 - (-1.0 / (SMOOTHING_SECS * sr as f32)).exp(),
            delay_l: DelayLine::new(),
            delay_r: DelayLine::new(),
            shadow_l: OnePole::new(SHADOW_CUTOFF_HZ, sr),
            shadow_r: OnePole::new(SHADOW_CUTOFF_HZ, sr),
            rear_l: OnePole::new(REAR_CUTOFF_HZ, sr),
            rear_r: OnePole::new(REAR_CUTOFF_HZ, sr),
        }
    }

    fn params_for(model: PanningModel, position: Position, sr: u32) -> PanParams {
        match model {
            PanningModel::EqualPower => PanParams::equal_power(position),
            PanningModel::Hrtf => PanParams::hrtf(position, sr),
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Non-finite coordinates are ignored.
    pub fn set_position(&mut self, position: Position) {
        if !position.is_finite() {
            return;
        }
        self.position = position;
        self.target = Self::params_for(self.model, position, self.sr);
    }

    /// In-place processing of interleaved stereo.
    pub fn process(&mut self, buffer: &mut [f32]) {
        if self.current == PanParams::IDENTITY && self.target == PanParams::IDENTITY {
            return;
        }

        for frame in buffer.chunks_exact_mut(2) {
            if self.current != self.target {
                self.current.approach(&self.target, self.smoothing);
            }
            let p = self.current;
            let (in_l, in_r) = (frame[0], frame[1]);

            let mut l = p.ll * in_l + p.rl * in_r;
            let mut r = p.lr * in_l + p.rr * in_r;

            if self.model == PanningModel::Hrtf {
                l = self.delay_l.tick(l, p.delay_l);
                r = self.delay_r.tick(r, p.delay_r);

                l += p.shadow_l * (self.shadow_l.run(l) - l);
                r += p.shadow_r * (self.shadow_r.run(r) - r);

                l += p.rear * (self.rear_l.run(l) - l);
                r += p.rear * (self.rear_r.run(r) - r);
            }

            frame[0] = l;
            frame[1] = r;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn noise(frames: usize) -> Vec<f32> {
        // Cheap deterministic broadband signal, identical on both channels
        let mut state = 0x1234_5678u32;
        let mut out = Vec::with_capacity(frames * 2);
        for _ in 0..frames {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let s = (state as f32 / u32::MAX as f32) * 0.5 - 0.25;
            out.push(s);
            out.push(s);
        }
        out
    }

    fn energy(buf: &[f32], channel: usize, skip_frames: usize) -> f32 {
        buf.chunks_exact(2).skip(skip_frames).map(|f| f[channel] * f[channel]).sum()
    }

    #[test]
    fn azimuth_matches_listener_frame() {
        assert_relative_eq!(azimuth_elevation(Position::new(1.0, 0.0, 0.0)).0, 90.0, epsilon = 1e-3);
        assert_relative_eq!(azimuth_elevation(Position::new(-1.0, 0.0, 0.0)).0, -90.0, epsilon = 1e-3);
        assert_relative_eq!(azimuth_elevation(Position::new(0.0, 0.0, -1.0)).0, 0.0, epsilon = 1e-3);
        assert_relative_eq!(azimuth_elevation(Position::new(0.0, 0.0, 1.0)).0.abs(), 180.0, epsilon = 1e-3);

        let (az, el) = azimuth_elevation(Position::new(0.0, 2.0, 0.0));
        assert_eq!(az, 0.0);
        assert_relative_eq!(el, 90.0, epsilon = 1e-3);
    }

    #[test]
    fn inverse_distance() {
        assert_eq!(distance_gain(Position::ORIGIN), 1.0);
        assert_eq!(distance_gain(Position::new(0.0, 0.0, 1.0)), 1.0);
        assert_relative_eq!(distance_gain(Position::new(3.0, 0.0, 0.0)), 1.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn origin_is_transparent_for_equal_power() {
        let mut panner = SpatialPanner::new(48_000, PanningModel::EqualPower);
        let input = noise(1024);
        let mut buf = input.clone();
        panner.process(&mut buf);
        assert_eq!(buf, input);
    }

    #[test]
    fn smoothing_settles_exactly_after_a_round_trip() {
        let mut panner = SpatialPanner::new(48_000, PanningModel::EqualPower);
        panner.set_position(Position::new(1.0, 0.0, 0.0));
        panner.process(&mut noise(4800));
        panner.set_position(Position::ORIGIN);
        // One second is a hundred time constants
        panner.process(&mut noise(48_000));
        assert_eq!(panner.current, panner.target);

        let input = noise(1024);
        let mut buf = input.clone();
        panner.process(&mut buf);
        assert_eq!(buf, input);
    }

    #[test]
    fn equal_power_hard_right() {
        let mut panner = SpatialPanner::new(48_000, PanningModel::EqualPower);
        panner.set_position(Position::new(1.0, 0.0, 0.0));
        let mut buf = noise(9600);
        panner.process(&mut buf);

        // After smoothing settles the left channel is silent
        let left = energy(&buf, 0, 4800);
        let right = energy(&buf, 1, 4800);
        assert!(left < right * 1e-4, "left {left} right {right}");
    }

    #[test]
    fn hrtf_favours_the_near_ear() {
        let mut panner = SpatialPanner::new(48_000, PanningModel::Hrtf);
        panner.set_position(Position::new(1.0, 0.0, 0.0));
        let mut buf = noise(9600);
        panner.process(&mut buf);
        assert!(energy(&buf, 1, 4800) > 2.0 * energy(&buf, 0, 4800));

        let mut panner = SpatialPanner::new(48_000, PanningModel::Hrtf);
        panner.set_position(Position::new(-1.0, 0.0, 0.0));
        let mut buf = noise(9600);
        panner.process(&mut buf);
        assert!(energy(&buf, 0, 4800) > 2.0 * energy(&buf, 1, 4800));
    }

    #[test]
    fn ignores_non_finite_positions() {
        let mut panner = SpatialPanner::new(44_100, PanningModel::Hrtf);
        panner.set_position(Position::new(1.0, 0.0, 0.0));
        panner.set_position(Position::new(f32::NAN, 0.0, 0.0));
        assert_eq!(panner.position(), Position::new(1.0, 0.0, 0.0));
    }
}
