use tracing::debug;

use crate::geometry::Rect;
use crate::obstacle::Obstacle;

/// Index of the first live obstacle touching `hero`, if any.
pub fn first_hit(hero: &Rect, obstacles: &[Obstacle]) -> Option<usize> {
    obstacles.iter().position(|o| hero.intersects(&o.rect()))
}

/// Mark every top obstacle whose right edge has cleared `hero_x` as passed.
/// Returns how many pairs were newly passed. Bottoms never score on their
/// own; each one shares its spawn x with exactly one top.
pub fn award_passed(hero_x: f64, obstacles: &mut [Obstacle]) -> u32 {
    let mut newly = 0;
    for o in obstacles.iter_mut() {
        if o.is_top && !o.passed && o.right() < hero_x {
            o.passed = true;
            newly += 1;
            debug!(x = o.x, "pair passed");
        }
    }
    newly
}

/// Extra scroll speed earned by `score`, capped at `cap`.
pub fn speed_bonus(score: u32, score_accel: f64, cap: f64) -> f64 {
    (score as f64 * score_accel).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(x: f64) -> [Obstacle; 2] {
        [
            Obstacle {
                x,
                y: 0.0,
                w: 56.0,
                h: 120.0,
                is_top: true,
                passed: false,
            },
            Obstacle {
                x,
                y: 260.0,
                w: 56.0,
                h: 124.0,
                is_top: false,
                passed: false,
            },
        ]
    }

    #[test]
    fn test_hit_top_and_bottom() {
        let obstacles = pair(120.0).to_vec();
        assert_eq!(
            first_hit(&Rect::new(130.0, 100.0, 36.0, 36.0), &obstacles),
            Some(0)
        );
        assert_eq!(
            first_hit(&Rect::new(130.0, 240.0, 36.0, 36.0), &obstacles),
            Some(1)
        );
        assert_eq!(
            first_hit(&Rect::new(130.0, 150.0, 36.0, 36.0), &obstacles),
            None
        );
    }

    #[test]
    fn test_pair_scores_once() {
        let mut obstacles = pair(60.0).to_vec();
        assert_eq!(award_passed(130.0, &mut obstacles), 1);
        assert!(obstacles[0].passed);
        assert!(!obstacles[1].passed);
        assert_eq!(award_passed(130.0, &mut obstacles), 0);
        assert!(obstacles[0].passed);
    }

    #[test]
    fn test_not_passed_while_overlapping_hero_x() {
        let mut obstacles = pair(74.0).to_vec();
        assert_eq!(award_passed(130.0, &mut obstacles), 0);
    }

    #[test]
    fn test_bonus_is_capped() {
        assert_eq!(speed_bonus(0, 0.02, 4.0), 0.0);
        assert!((speed_bonus(100, 0.02, 4.0) - 2.0).abs() < 1e-12);
        assert_eq!(speed_bonus(10_000, 0.02, 4.0), 4.0);
        assert_eq!(speed_bonus(10_000, 0.02, 3.5), 3.5);
    }
}
