use rand::Rng;
use tracing::debug;

use crate::config::EngineConfig;
use crate::geometry::Rect;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub is_top: bool,
    pub passed: bool,
}

impl Obstacle {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }
}

/// Build one top/bottom pair sharing a spawn x and a random gap.
pub fn spawn_pair(config: &EngineConfig, rng: &mut impl Rng) -> [Obstacle; 2] {
    let height = config.field_height;
    let gap = config.gap_min + unit(rng) * config.gap_range;

    // Keep the bottom obstacle non-negative even for the widest gap.
    let span = (height - config.top_reserve)
        .min(height - config.floor_margin - gap - config.top_min)
        .max(0.0);
    let top = config.top_min + unit(rng) * span;

    let x = config.field_width + config.spawn_offset;
    let bottom_y = top + gap;
    [
        Obstacle {
            x,
            y: 0.0,
            w: config.obstacle_w,
            h: top,
            is_top: true,
            passed: false,
        },
        Obstacle {
            x,
            y: bottom_y,
            w: config.obstacle_w,
            h: height - bottom_y - config.floor_margin,
            is_top: false,
            passed: false,
        },
    ]
}

fn unit(rng: &mut impl Rng) -> f64 {
    rng.gen_range(0.0..1.0)
}

/// Frame counter that decides when the next pair appears.
#[derive(Debug, Clone, Default)]
pub struct Spawner {
    timer: u32,
}

impl Spawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timer(&self) -> u32 {
        self.timer
    }

    pub fn reset(&mut self) {
        self.timer = 0;
    }

    /// Frames between spawns at `score`: shrinks by one every
    /// `spawn_score_divisor` points, never below `spawn_min`. A zero divisor
    /// counts as one.
    pub fn interval(config: &EngineConfig, score: u32) -> u32 {
        config
            .spawn_every
            .saturating_sub(score / config.spawn_score_divisor.max(1))
            .max(config.spawn_min)
    }

    /// Advance one frame and push a pair onto `obstacles` when due.
    pub fn step(
        &mut self,
        config: &EngineConfig,
        score: u32,
        obstacles: &mut Vec<Obstacle>,
        rng: &mut impl Rng,
    ) -> bool {
        self.timer += 1;
        if self.timer <= Self::interval(config, score) {
            return false;
        }
        self.timer = 0;
        let pair = spawn_pair(config, rng);
        debug!(
            top = pair[0].h,
            gap = pair[1].y - pair[0].h,
            bottom = pair[1].h,
            "spawned obstacle pair"
        );
        obstacles.extend(pair);
        true
    }
}

/// Shift every obstacle left by `dx` and drop the ones fully past the
/// left margin.
pub fn scroll(obstacles: &mut Vec<Obstacle>, dx: f64, cull_margin: f64) {
    for o in obstacles.iter_mut() {
        o.x -= dx;
    }
    obstacles.retain(|o| o.right() > -cull_margin);
}
