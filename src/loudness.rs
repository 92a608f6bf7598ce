use tracing::trace;

use crate::config::EngineConfig;

// ── RMS ─────────────────────────────────────────────────────────────────────

/// Normalize a signed 16-bit sample to `[-1, 1)`.
pub fn from_i16(s: i16) -> f32 {
    s as f32 / 32768.0
}

/// Normalize an unsigned 16-bit sample centered on 32768.
pub fn from_u16(s: u16) -> f32 {
    (s as f32 - 32768.0) / 32768.0
}

/// Normalize an unsigned 8-bit sample centered on 128.
pub fn from_u8(s: u8) -> f32 {
    (s as f32 - 128.0) / 128.0
}

/// RMS of float samples already centered on zero.
pub fn rms_f32(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let sum: f32 = data.iter().map(|v| v * v).sum();
    (sum / data.len() as f32).sqrt().clamp(0.0, 1.0)
}

/// Rolling window over the most recent mono samples.
#[derive(Debug, Clone)]
pub struct RmsWindow {
    buf: Vec<f32>,
    pos: usize,
    filled: bool,
}

impl RmsWindow {
    pub fn new(len: usize) -> Self {
        Self {
            buf: vec![0.0; len.max(1)],
            pos: 0,
            filled: false,
        }
    }

    pub fn push(&mut self, sample: f32) {
        self.buf[self.pos] = sample;
        self.pos += 1;
        if self.pos == self.buf.len() {
            self.pos = 0;
            self.filled = true;
        }
    }

    /// Push interleaved frames, converting each sample with `to_f32` and
    /// averaging the channels of each frame.
    pub fn push_frames<T: Copy>(
        &mut self,
        data: &[T],
        channels: usize,
        to_f32: impl Fn(T) -> f32,
    ) {
        for frame in data.chunks(channels.max(1)) {
            let mono = frame.iter().map(|&s| to_f32(s)).sum::<f32>() / frame.len() as f32;
            self.push(mono);
        }
    }

    pub fn rms(&self) -> f32 {
        if self.filled {
            rms_f32(&self.buf)
        } else {
            rms_f32(&self.buf[..self.pos])
        }
    }
}

// ── Impulse gate ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impulse {
    /// Velocity to assign to the hero. Negative is up.
    pub velocity: f64,
    /// How far past the threshold the sample was, in `[0, 1]`.
    pub strength: f64,
}

/// Turns loudness samples into jumps. The threshold is read on every sample
/// so it can be changed live.
#[derive(Debug, Clone)]
pub struct LoudnessGate {
    threshold: f64,
    threshold_min: f64,
    threshold_max: f64,
    cooldown_ms: f64,
    ceiling: f64,
    base_jump: f64,
    extra_impulse: f64,
    last_jump_ms: Option<f64>,
}

impl LoudnessGate {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            threshold: config.threshold,
            threshold_min: config.threshold_min,
            threshold_max: config.threshold_max,
            cooldown_ms: config.jump_cooldown_ms,
            ceiling: config.loudness_ceiling,
            base_jump: config.base_jump,
            extra_impulse: config.extra_impulse,
            last_jump_ms: None,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Set the threshold as-is. Out-of-range values are not rejected.
    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    /// Nudge the threshold the way a slider would, staying in its range.
    pub fn adjust_threshold(&mut self, delta: f64) -> f64 {
        self.threshold = (self.threshold + delta).clamp(self.threshold_min, self.threshold_max);
        self.threshold
    }

    pub fn last_jump_ms(&self) -> Option<f64> {
        self.last_jump_ms
    }

    /// Offer one loudness sample taken at `now_ms`. Fires when the sample is
    /// above the threshold and the cooldown since the last jump has elapsed.
    pub fn offer(&mut self, sample: f64, now_ms: f64) -> Option<Impulse> {
        if sample <= self.threshold {
            return None;
        }
        if let Some(last) = self.last_jump_ms {
            if now_ms - last < self.cooldown_ms {
                return None;
            }
        }
        self.last_jump_ms = Some(now_ms);

        let strength = self.strength(sample);
        let impulse = Impulse {
            velocity: self.base_jump - strength * self.extra_impulse,
            strength,
        };
        trace!(sample, strength, velocity = impulse.velocity, "loudness jump");
        Some(impulse)
    }

    fn strength(&self, sample: f64) -> f64 {
        let span = self.ceiling - self.threshold;
        if span <= 0.0 {
            return 1.0;
        }
        ((sample - self.threshold) / span).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(threshold: f64, cooldown_ms: f64) -> LoudnessGate {
        LoudnessGate::new(&EngineConfig {
            threshold,
            jump_cooldown_ms: cooldown_ms,
            ..EngineConfig::classic()
        })
    }

    #[test]
    fn test_rms_of_silence_and_square() {
        let mut w = RmsWindow::new(1024);
        w.push_frames(&[128u8; 1024], 1, from_u8);
        assert_eq!(w.rms(), 0.0);
        let square: Vec<u8> = (0..1024).map(|i| if i % 2 == 0 { 0 } else { 255 }).collect();
        w.push_frames(&square, 1, from_u8);
        assert!(w.rms() > 0.99);
        assert_eq!(rms_f32(&[1.0, -1.0, 1.0, -1.0]), 1.0);
        assert_eq!(rms_f32(&[]), 0.0);
    }

    #[test]
    fn test_rms_clamps_overdriven_input() {
        assert_eq!(rms_f32(&[3.0, -3.0]), 1.0);
    }

    #[test]
    fn test_window_keeps_latest_samples() {
        let mut w = RmsWindow::new(4);
        for _ in 0..4 {
            w.push(1.0);
        }
        assert_eq!(w.rms(), 1.0);
        for _ in 0..4 {
            w.push(0.0);
        }
        assert_eq!(w.rms(), 0.0);
    }

    #[test]
    fn test_window_downmixes() {
        let mut w = RmsWindow::new(2);
        w.push_frames(&[0.5, -0.5, 0.5, 0.5], 2, |s: f32| s);
        // frames average to 0.0 and 0.5
        assert!((w.rms() - (0.125f32).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_integer_formats_normalize() {
        assert_eq!(from_i16(i16::MIN), -1.0);
        assert_eq!(from_i16(0), 0.0);
        assert_eq!(from_u16(32768), 0.0);
        assert_eq!(from_u16(0), -1.0);
        assert_eq!(from_u8(128), 0.0);
        assert_eq!(from_u8(0), -1.0);

        let mut w = RmsWindow::new(2);
        w.push_frames(&[i16::MIN, i16::MIN, 0, 0], 2, from_i16);
        assert!((w.rms() - (0.5f32).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_cooldown_scenario() {
        let mut g = gate(0.3, 140.0);
        assert!(g.offer(0.1, -16.0).is_none());
        assert!(g.offer(0.5, 0.0).is_some());
        assert!(g.offer(0.6, 50.0).is_none());
        assert!(g.offer(0.5, 200.0).is_some());
        assert_eq!(g.last_jump_ms(), Some(200.0));
    }

    #[test]
    fn test_cooldown_boundary_is_inclusive() {
        let mut g = gate(0.3, 140.0);
        assert!(g.offer(0.5, 1000.0).is_some());
        assert!(g.offer(0.5, 1139.0).is_none());
        assert!(g.offer(0.5, 1140.0).is_some());
    }

    #[test]
    fn test_equal_to_threshold_does_not_fire() {
        let mut g = gate(0.3, 140.0);
        assert!(g.offer(0.3, 0.0).is_none());
        assert_eq!(g.last_jump_ms(), None);
    }

    #[test]
    fn test_louder_jumps_higher() {
        let mut g = gate(0.2, 0.0);
        let soft = g.offer(0.25, 0.0).unwrap();
        let loud = g.offer(0.35, 10.0).unwrap();
        let max = g.offer(0.9, 20.0).unwrap();
        assert!(loud.velocity < soft.velocity);
        assert!((soft.strength - 0.25).abs() < 1e-9);
        assert_eq!(max.strength, 1.0);
        assert_eq!(max.velocity, -20.0);
    }

    #[test]
    fn test_threshold_above_ceiling_gives_full_strength() {
        let mut g = gate(0.5, 0.0);
        let impulse = g.offer(0.6, 0.0).unwrap();
        assert_eq!(impulse.strength, 1.0);
    }

    #[test]
    fn test_adjust_threshold_stays_in_range() {
        let mut g = gate(0.02, 0.0);
        assert_eq!(g.adjust_threshold(-0.05), 0.0);
        g.set_threshold(0.995);
        assert_eq!(g.adjust_threshold(0.01), 1.0);
    }
}
