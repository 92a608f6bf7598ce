use scream_hero::obstacle::Obstacle;
use scream_hero::scoring::speed_bonus;
use scream_hero::*;

fn classic() -> GameSession {
    GameSession::with_seed(EngineConfig::classic(), 2024)
}

/// Jump whenever the hero sinks past y=150 on the way down.
fn hover(session: &mut GameSession) {
    let hero = *session.hero();
    if hero.y > 150.0 && hero.vy >= 0.0 {
        session.manual_jump();
    }
}

#[test]
fn test_hero_stays_in_bounds_every_tick() {
    let mut session = classic();
    session.start();
    let floor = session.config().floor_y();
    for i in 0..5000 {
        if i % 7 == 0 {
            session.manual_jump();
        }
        session.tick();
        let hero = session.hero();
        assert!(hero.y >= 0.0, "tick {i}: y={}", hero.y);
        assert!(hero.y <= floor - hero.h, "tick {i}: y={}", hero.y);
        if !session.is_running() {
            break;
        }
    }
}

/// Gaps span y in [84, 310] at worst, so hovering around y=200 clears
/// every pair.
fn wide_gaps() -> GameSession {
    let config = EngineConfig {
        gap_min: 300.0,
        gap_range: 0.0,
        top_min: 10.0,
        ..EngineConfig::classic()
    };
    config.validate().unwrap();
    GameSession::with_seed(config, 2024)
}

#[test]
fn test_passed_pairs_score_once_and_stay_passed() {
    let mut session = wide_gaps();
    session.start();
    let cfg = session.config().clone();
    for i in 0..3000 {
        let hero = *session.hero();
        if hero.y > 200.0 && hero.vy >= 0.0 {
            session.manual_jump();
        }
        let before: Vec<Obstacle> = session.obstacles().to_vec();
        let (score, speed) = (session.score(), session.speed());

        let outcome = session.tick();
        assert_eq!(outcome.ended, None, "tick {i}");

        // Culling only drops from the front and spawning only appends, so the
        // survivors line up with the tail of `before`.
        let after = session.obstacles();
        let fresh = if outcome.spawned { 2 } else { 0 };
        let culled = before.len() + fresh - after.len();
        let dx = speed + speed_bonus(score, cfg.score_accel, cfg.speed_bonus_cap);
        let mut newly = 0;
        for (old, new) in before[culled..].iter().zip(after) {
            assert!((old.x - dx - new.x).abs() < 1e-9, "tick {i}: shift");
            assert_eq!(old.is_top, new.is_top);
            assert!(!old.passed || new.passed, "tick {i}: passed flag cleared");
            if new.passed && !old.passed {
                assert!(new.is_top);
                newly += 1;
            }
        }
        assert!(newly <= 1);
        assert_eq!(outcome.scored, newly);
        assert_eq!(session.score(), score + newly);
    }
    assert!(session.score() >= 3, "score {}", session.score());
    let expected = cfg.base_speed + cfg.speed_step * session.score() as f64;
    assert!((session.speed() - expected).abs() < 1e-9);
}

#[test]
fn test_spawned_pairs_share_x_and_fill_the_field() {
    let mut session = classic();
    session.start();
    let cfg = session.config().clone();
    let mut seen = 0;
    for _ in 0..2000 {
        hover(&mut session);
        let outcome = session.tick();
        if outcome.spawned {
            let obstacles = session.obstacles();
            let n = obstacles.len();
            let (top, bottom) = (&obstacles[n - 2], &obstacles[n - 1]);
            assert!(top.is_top && !bottom.is_top);
            assert_eq!(top.x, bottom.x);
            let gap = bottom.y - top.h;
            let total = top.h + gap + bottom.h + cfg.floor_margin;
            assert!((total - cfg.field_height).abs() < 1e-9);
            seen += 1;
        }
        if !session.is_running() {
            break;
        }
    }
    assert!(seen >= 1);
}

#[test]
fn test_round_ends_only_on_contact() {
    let mut session = classic();
    session.start();
    let floor = session.config().floor_y();
    for _ in 0..20_000 {
        hover(&mut session);
        let outcome = session.tick();
        let hero = *session.hero();
        let touching = session
            .obstacles()
            .iter()
            .any(|o| hero.rect().intersects(&o.rect()));
        let on_floor = hero.y >= floor - hero.h;
        match outcome.ended {
            Some(EndReason::Collision) => {
                assert!(touching);
                break;
            }
            Some(EndReason::Floor) => {
                assert!(on_floor);
                break;
            }
            Some(EndReason::Stopped) => unreachable!("nobody stopped the round"),
            None => assert!(!touching && !on_floor),
        }
    }
    assert!(matches!(session.phase(), Phase::Ended(_)));
}

#[test]
fn test_ended_is_terminal_until_restart() {
    let mut session = classic();
    session.start();
    while session.tick().ended.is_none() {}
    let frozen = session.snapshot();
    for _ in 0..10 {
        assert_eq!(session.tick(), TickOutcome::default());
        assert!(!session.manual_jump());
    }
    assert_eq!(session.snapshot(), frozen);
    assert!(session.start());
    assert_eq!(session.phase(), Phase::Running);
    assert!(session.obstacles().is_empty());
}

#[test]
fn test_speed_bonus_cap_per_preset() {
    let classic = Preset::Classic.config();
    let gentle = Preset::Gentle.config();
    assert_eq!(
        speed_bonus(10_000, classic.score_accel, classic.speed_bonus_cap),
        4.0
    );
    assert_eq!(
        speed_bonus(10_000, gentle.score_accel, gentle.speed_bonus_cap),
        3.5
    );
}

#[test]
fn test_same_seed_same_round() {
    let run = || {
        let mut session = classic();
        session.start();
        for _ in 0..400 {
            hover(&mut session);
            session.tick();
        }
        session.snapshot()
    };
    assert_eq!(run(), run());
}
