use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::collab::{AudioCapture, Clock, Command, Effects, Hud, InputSource, Renderer};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::loudness::LoudnessGate;
use crate::session::{EndReason, GameSession, TickOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Frame driver: input, then audio, then one physics tick, then render.
pub struct App<I, A, R, K> {
    session: GameSession,
    gate: LoudnessGate,
    input: I,
    audio: A,
    renderer: R,
    clock: K,
    effects: Box<dyn Effects>,
    loudness: Option<f32>,
}

impl<I, A, R, K> App<I, A, R, K>
where
    I: InputSource,
    A: AudioCapture,
    R: Renderer,
    K: Clock,
{
    pub fn new(
        session: GameSession,
        input: I,
        audio: A,
        renderer: R,
        clock: K,
        effects: Box<dyn Effects>,
    ) -> Self {
        let gate = LoudnessGate::new(session.config());
        Self {
            session,
            gate,
            input,
            audio,
            renderer,
            clock,
            effects,
            loudness: None,
        }
    }

    pub fn with_config(
        config: EngineConfig,
        input: I,
        audio: A,
        renderer: R,
        clock: K,
        effects: Box<dyn Effects>,
    ) -> Self {
        Self::new(GameSession::new(config), input, audio, renderer, clock, effects)
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn gate(&self) -> &LoudnessGate {
        &self.gate
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn hud(&self) -> Hud {
        Hud {
            threshold: self.gate.threshold(),
            loudness: self.loudness,
            mic_active: self.audio.is_active(),
        }
    }

    /// Run frames at `frame_dur` pacing until a quit command arrives.
    pub fn run(&mut self, frame_dur: Duration) -> Result<()> {
        loop {
            let frame_start = Instant::now();
            if self.frame()? == Flow::Quit {
                return Ok(());
            }
            let elapsed = frame_start.elapsed();
            if elapsed < frame_dur {
                thread::sleep(frame_dur - elapsed);
            }
        }
    }

    pub fn frame(&mut self) -> Result<Flow> {
        for command in self.input.poll()? {
            if self.handle(command) == Flow::Quit {
                self.shutdown();
                return Ok(Flow::Quit);
            }
        }

        self.sample_audio();

        let outcome = self.session.tick();
        self.react(outcome);

        self.renderer.draw(&self.session.snapshot(), &self.hud())?;
        Ok(Flow::Continue)
    }

    pub fn handle(&mut self, command: Command) -> Flow {
        match command {
            Command::Jump => {
                if !self.session.manual_jump() {
                    self.start_round();
                }
            }
            Command::StartStop => {
                if !self.session.stop() {
                    self.start_round();
                }
            }
            Command::Reset => self.session.reset(),
            Command::ThresholdUp => {
                let step = self.session.config().threshold_step;
                self.gate.adjust_threshold(step);
            }
            Command::ThresholdDown => {
                let step = self.session.config().threshold_step;
                self.gate.adjust_threshold(-step);
            }
            Command::ToggleMic => {
                if self.audio.is_active() {
                    self.audio.stop();
                    self.loudness = None;
                    info!("microphone stopped");
                } else {
                    self.start_mic();
                }
            }
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Start a round, asking for the microphone first. Without one the
    /// round still runs on manual jumps.
    fn start_round(&mut self) {
        if !self.audio.is_active() {
            self.start_mic();
        }
        self.session.start();
    }

    fn start_mic(&mut self) {
        match self.audio.start() {
            Ok(()) => info!("microphone streaming"),
            Err(err) => warn!(%err, "microphone unavailable, manual jumps only"),
        }
    }

    fn sample_audio(&mut self) {
        if !self.audio.is_active() {
            self.loudness = None;
            return;
        }
        let Some(sample) = self.audio.latest() else {
            return;
        };
        self.loudness = Some(sample);
        if let Some(impulse) = self.gate.offer(sample as f64, self.clock.now_ms()) {
            if self.session.apply_impulse(impulse) {
                self.effects.jump(impulse.strength);
            }
        }
    }

    fn react(&mut self, outcome: TickOutcome) {
        match outcome.ended {
            Some(EndReason::Stopped) | None => {}
            Some(reason) => self.effects.crash(reason),
        }
    }

    /// Stop the round and the microphone. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        self.session.stop();
        self.audio.stop();
    }
}
