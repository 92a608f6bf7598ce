//! One game session: the round state machine plus the per-frame update.
//!
//! The session is the single owner of round state. Two producers write the
//! hero's velocity: [`GameSession::tick`] through gravity, and
//! [`GameSession::apply_impulse`] / [`GameSession::manual_jump`] from the
//! audio and input paths. Whichever write lands last before the next tick
//! wins. Ordering between them is best-effort, not strict.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::config::EngineConfig;
use crate::geometry::Rect;
use crate::loudness::Impulse;
use crate::obstacle::{self, Obstacle, Spawner};
use crate::physics::{Contact, Entity};
use crate::scoring;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Ended(EndReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Floor,
    Collision,
    Stopped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub scored: u32,
    pub spawned: bool,
    pub ended: Option<EndReason>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleView {
    pub rect: Rect,
    pub is_top: bool,
}

/// Read-only picture of one frame for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub hero: Rect,
    pub hero_vy: f64,
    pub obstacles: Vec<ObstacleView>,
    pub score: u32,
    pub best: u32,
    pub phase: Phase,
    pub speed: f64,
    pub field_width: f64,
    pub field_height: f64,
    pub floor_y: f64,
    pub frame: u64,
}

pub struct GameSession {
    config: EngineConfig,
    rng: StdRng,
    hero: Entity,
    obstacles: Vec<Obstacle>,
    spawner: Spawner,
    score: u32,
    best: u32,
    speed: f64,
    phase: Phase,
    frame: u64,
}

impl GameSession {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_seed(config: EngineConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: EngineConfig, rng: StdRng) -> Self {
        let hero = Entity {
            x: config.hero_x,
            y: Self::start_y(&config),
            w: config.hero_w,
            h: config.hero_h,
            vy: 0.0,
        };
        Self {
            speed: config.base_speed,
            config,
            rng,
            hero,
            obstacles: Vec::new(),
            spawner: Spawner::new(),
            score: 0,
            best: 0,
            phase: Phase::Idle,
            frame: 0,
        }
    }

    fn start_y(config: &EngineConfig) -> f64 {
        config.field_height / 2.0 - config.hero_h / 2.0
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn best(&self) -> u32 {
        self.best
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn hero(&self) -> &Entity {
        &self.hero
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn spawn_timer(&self) -> u32 {
        self.spawner.timer()
    }

    /// Begin a fresh round. Ignored while a round is already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        self.clear_round();
        self.phase = Phase::Running;
        info!(preset = ?self.config.preset, "round started");
        true
    }

    /// End the running round on request. Safe to call in any phase.
    pub fn stop(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.end(EndReason::Stopped);
        true
    }

    /// Back to idle with an empty field. The best score survives.
    pub fn reset(&mut self) {
        self.clear_round();
        self.phase = Phase::Idle;
    }

    fn clear_round(&mut self) {
        self.score = 0;
        self.speed = self.config.base_speed;
        self.hero.y = Self::start_y(&self.config);
        self.hero.vy = 0.0;
        self.obstacles.clear();
        self.spawner.reset();
    }

    fn end(&mut self, reason: EndReason) {
        self.phase = Phase::Ended(reason);
        self.best = self.best.max(self.score);
        info!(?reason, score = self.score, best = self.best, "round ended");
    }

    /// Overwrite the hero's velocity with a loudness impulse. Only lands
    /// while a round is running.
    pub fn apply_impulse(&mut self, impulse: Impulse) -> bool {
        self.set_velocity(impulse.velocity)
    }

    /// Tap-style jump with the fixed manual impulse.
    pub fn manual_jump(&mut self) -> bool {
        self.set_velocity(self.config.manual_jump)
    }

    fn set_velocity(&mut self, vy: f64) -> bool {
        if !self.is_running() {
            return false;
        }
        self.hero.vy = vy;
        true
    }

    /// Advance the round by one frame: physics, scroll, spawn, collision,
    /// then scoring. Does nothing unless running.
    pub fn tick(&mut self) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if !self.is_running() {
            return outcome;
        }
        self.frame += 1;
        let cfg = &self.config;

        if self.hero.integrate(cfg.gravity, cfg.floor_y()) == Contact::Floor {
            self.end(EndReason::Floor);
            outcome.ended = Some(EndReason::Floor);
            return outcome;
        }

        let dx = self.speed + scoring::speed_bonus(self.score, cfg.score_accel, cfg.speed_bonus_cap);
        obstacle::scroll(&mut self.obstacles, dx, cfg.cull_margin);

        outcome.spawned = self
            .spawner
            .step(cfg, self.score, &mut self.obstacles, &mut self.rng);

        if scoring::first_hit(&self.hero.rect(), &self.obstacles).is_some() {
            self.end(EndReason::Collision);
            outcome.ended = Some(EndReason::Collision);
            return outcome;
        }

        let passed = scoring::award_passed(self.hero.x, &mut self.obstacles);
        if passed > 0 {
            self.score += passed;
            self.speed += cfg.speed_step * passed as f64;
            outcome.scored = passed;
        }
        outcome
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            hero: self.hero.rect(),
            hero_vy: self.hero.vy,
            obstacles: self
                .obstacles
                .iter()
                .map(|o| ObstacleView {
                    rect: o.rect(),
                    is_top: o.is_top,
                })
                .collect(),
            score: self.score,
            best: self.best,
            phase: self.phase,
            speed: self.speed,
            field_width: self.config.field_width,
            field_height: self.config.field_height,
            floor_y: self.config.floor_y(),
            frame: self.frame,
        }
    }

    #[cfg(test)]
    pub(crate) fn push_obstacle(&mut self, o: Obstacle) {
        self.obstacles.push(o);
    }

    #[cfg(test)]
    pub(crate) fn set_score(&mut self, score: u32) {
        self.score = score;
    }
}
