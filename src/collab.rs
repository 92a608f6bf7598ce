//! Seams between the engine and the outside world.

use std::time::Instant;

use crate::error::Result;
use crate::session::{EndReason, Snapshot};

/// Discrete player intents, however they were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Jump,
    StartStop,
    Reset,
    ThresholdUp,
    ThresholdDown,
    ToggleMic,
    Quit,
}

pub trait InputSource {
    /// Commands that arrived since the last poll. Must not block.
    fn poll(&mut self) -> Result<Vec<Command>>;
}

/// A microphone (or anything else) that publishes loudness in `[0, 1]`.
pub trait AudioCapture {
    fn start(&mut self) -> Result<()>;
    /// Stop sampling. Calling it while stopped is a no-op.
    fn stop(&mut self);
    fn is_active(&self) -> bool;
    /// Loudness of the most recent analysis window.
    fn latest(&mut self) -> Option<f32>;
}

/// Everything a renderer shows besides the playfield.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hud {
    pub threshold: f64,
    pub loudness: Option<f32>,
    pub mic_active: bool,
}

pub trait Renderer {
    fn draw(&mut self, snapshot: &Snapshot, hud: &Hud) -> Result<()>;
}

/// Audible feedback for game events.
pub trait Effects {
    fn jump(&mut self, strength: f64);
    fn crash(&mut self, reason: EndReason);
}

/// Silent effects, for headless runs and when no output device exists.
#[derive(Debug, Default)]
pub struct Mute;

impl Effects for Mute {
    fn jump(&mut self, _strength: f64) {}
    fn crash(&mut self, _reason: EndReason) {}
}

pub trait Clock {
    /// Milliseconds on a monotonic wall clock.
    fn now_ms(&self) -> f64;
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}
