use std::time::Duration;

use glam::Vec2;
use maze_chase_core::{
    AiState, Direction, EnemyTuning, Fragility, Life, OccupancyGrid, SlotCoord,
};
use maze_chase_system_enemy_ai::{policy, BrainTransition, EnemyBrain, Path, PathRequest};
use maze_chase_system_steering::{advance, open_directions, Motion, Pilot};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const FRAME: Duration = Duration::from_millis(100);

fn grid(pattern: &[&str]) -> OccupancyGrid {
    OccupancyGrid::from_pattern(pattern, 1.0, 1.0).expect("valid pattern")
}

#[test]
fn caged_enemy_starts_centering_once_its_timer_expires() {
    let mut brain = EnemyBrain::caged(EnemyTuning::new(Duration::from_secs(2), 50), 9);
    let mut out = Vec::new();

    for _ in 0..20 {
        brain.progress(FRAME, &mut out);
    }
    assert_eq!(brain.state(), AiState::Caged);

    brain.progress(FRAME, &mut out);
    assert_ne!(brain.state(), AiState::Caged);
    assert_eq!(
        out,
        vec![BrainTransition::State {
            from: AiState::Caged,
            to: AiState::Centering
        }]
    );
}

#[test]
fn fragility_warns_during_the_recovery_window() {
    let tuning = EnemyTuning::default();
    let grid = grid(&["#####", "#...#", "#####"]);
    let mut motion = Motion::resting_at(&grid, Vec2::new(2.5, -1.5));
    let mut brain = EnemyBrain::hunting(tuning, 1);
    let mut out = Vec::new();

    brain.become_fragile(
        &mut motion,
        Duration::from_secs(5),
        Duration::from_secs(1),
        &mut out,
    );
    assert_eq!(brain.fragility(), Fragility::Fragile);

    let mut history = Vec::new();
    for _ in 0..50 {
        brain.progress(FRAME, &mut out);
        history.push(brain.fragility());
    }

    assert!(history[..39].iter().all(|f| *f == Fragility::Fragile));
    assert!(history[39..49].iter().all(|f| *f == Fragility::Recovering));
    assert_eq!(history[49], Fragility::Normal);
    assert_eq!(
        out,
        vec![
            BrainTransition::Fragility(Fragility::Fragile),
            BrainTransition::Fragility(Fragility::Recovering),
            BrainTransition::Fragility(Fragility::Normal),
        ]
    );
}

#[test]
fn fragile_enemies_slow_down_and_reverse() {
    let grid = grid(&["#######", "#.....#", "#######"]);
    let tuning = EnemyTuning::default();
    let mut motion = Motion::resting_at(&grid, Vec2::new(1.5, -1.5));
    motion.push_only(Direction::Right);
    motion.start_going(Direction::Right, tuning.movement_speed);
    let mut brain = EnemyBrain::hunting(tuning, 4);
    let mut out = Vec::new();

    brain.become_fragile(
        &mut motion,
        Duration::from_secs(3),
        Duration::from_secs(1),
        &mut out,
    );

    assert_eq!(motion.going(), Some(Direction::Left));
    assert!(motion.pushing().contains(Direction::Left));
    assert!(!motion.pushing().contains(Direction::Right));
    assert_eq!(brain.movement_speed(), tuning.fragile_speed);

    brain.progress(Duration::from_secs(3), &mut out);
    assert_eq!(brain.fragility(), Fragility::Normal);
    assert_eq!(brain.movement_speed(), tuning.movement_speed);
}

#[test]
fn fright_on_a_centre_never_walks_into_the_wall_behind() {
    let grid = grid(&["#####", "#.###", "#...#", "#####"]);
    let tuning = EnemyTuning::default();
    let start = grid.row_column_to_offset(SlotCoord::new(2, 1));
    let mut motion = Motion::resting_at(&grid, start);
    motion.push_only(Direction::Up);
    motion.start_going(Direction::Up, tuning.movement_speed);
    let mut brain = EnemyBrain::hunting(tuning, 6);
    let mut out = Vec::new();

    brain.become_fragile(
        &mut motion,
        Duration::from_secs(3),
        Duration::from_secs(1),
        &mut out,
    );
    assert_eq!(motion.going(), Some(Direction::Down));
    assert_eq!(brain.fragile_remaining(), Duration::from_secs(3));

    let _ = advance(&mut motion, &mut brain, &grid, FRAME.as_secs_f32());
    assert_eq!(motion.offset(), start);
    assert_eq!(motion.going(), None);

    for tick in 0..5 {
        let _ = advance(&mut motion, &mut brain, &grid, FRAME.as_secs_f32());
        brain.progress(FRAME, &mut out);
        assert_eq!(
            grid.occupancy(motion.slot()),
            Some(false),
            "entered a wall at tick {tick}"
        );
    }
    assert_ne!(motion.offset(), start);
    assert_eq!(brain.fragile_remaining(), Duration::from_millis(2500));
}

#[test]
fn caught_enemy_returns_home_and_leaves_again() {
    let grid = grid(&["#######", "#.....#", "#######"]);
    let mut motion = Motion::resting_at(&grid, Vec2::new(3.5, -1.5));
    let mut brain = EnemyBrain::hunting(EnemyTuning::default(), 2);
    let mut out = Vec::new();

    brain.become_fragile(
        &mut motion,
        Duration::from_secs(4),
        Duration::from_secs(1),
        &mut out,
    );
    brain.start_dying(&mut motion, &mut out);

    assert_eq!(brain.state(), AiState::Dead);
    assert_eq!(brain.life(), Life::Dead);
    assert_eq!(brain.fragility(), Fragility::Normal);
    assert!(!motion.is_moving());
    assert!(!brain.can_move_without_target());
    assert_eq!(brain.path_request(), Some(PathRequest::ReturnHome));

    brain.set_path(Path::new(
        [SlotCoord::new(1, 3), SlotCoord::new(1, 4)],
        [Vec2::new(4.5, -1.5)],
    ));
    assert_eq!(brain.path_request(), None);
    for _ in 0..3 {
        brain.advance_target();
    }
    assert!(brain.is_path_completed());

    out.clear();
    brain.progress(FRAME, &mut out);
    assert_eq!(brain.state(), AiState::Leaving);
    assert_eq!(brain.life(), Life::Alive);
    assert_eq!(
        out,
        vec![BrainTransition::State {
            from: AiState::Dead,
            to: AiState::Leaving
        }]
    );
    assert_eq!(brain.path_request(), Some(PathRequest::EnclosureExit));
}

#[test]
fn defeated_enemy_ignores_fright() {
    let grid = grid(&["#####", "#...#", "#####"]);
    let mut motion = Motion::resting_at(&grid, Vec2::new(2.5, -1.5));
    let mut brain = EnemyBrain::hunting(EnemyTuning::default(), 3);
    let mut out = Vec::new();
    brain.start_dying(&mut motion, &mut out);
    out.clear();

    brain.become_fragile(
        &mut motion,
        Duration::from_secs(2),
        Duration::ZERO,
        &mut out,
    );

    assert_eq!(brain.fragility(), Fragility::Normal);
    assert!(out.is_empty());
}

#[test]
fn enemy_walks_out_of_the_enclosure_through_the_wall_row() {
    let grid = grid(&["#######", "#.....#", "#######", "#.....#", "#######"]);
    let center = Vec2::new(3.5, -3.5);
    let exit = Vec2::new(3.5, -1.5);
    let mut motion = Motion::resting_at(&grid, Vec2::new(1.5, -3.5));
    let mut brain = EnemyBrain::caged(EnemyTuning::new(Duration::from_millis(500), 50), 17);
    let mut out = Vec::new();
    let dt = Duration::from_millis(50);

    for _ in 0..400 {
        brain.track_adversary(Vec2::new(5.5, -1.5));
        let _ = advance(&mut motion, &mut brain, &grid, dt.as_secs_f32());
        brain.progress(dt, &mut out);
        match brain.path_request() {
            Some(PathRequest::EnclosureCenter) => {
                brain.set_path(Path::through_positions([center]));
            }
            Some(PathRequest::EnclosureExit) => brain.set_path(Path::through_positions([exit])),
            _ => {}
        }
        if brain.state() == AiState::Caged {
            assert_eq!(motion.slot().row(), 3, "caged enemy left the enclosure");
        }
        if brain.state() == AiState::Free {
            break;
        }
    }

    let states: Vec<_> = out
        .iter()
        .filter_map(|transition| match transition {
            BrainTransition::State { to, .. } => Some(*to),
            BrainTransition::Fragility(_) => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![AiState::Centering, AiState::Leaving, AiState::Free]
    );
    assert_eq!(motion.offset(), exit);
}

#[test]
fn direction_choice_is_reproducible_from_the_seed() {
    let grid = grid(&["#####", "#...#", "#...#", "#...#", "#####"]);
    let open = open_directions(&grid, SlotCoord::new(2, 2), None);
    let from = Vec2::new(2.5, -2.5);
    let toward = Vec2::new(0.5, -0.5);

    let mut first = ChaCha8Rng::seed_from_u64(42);
    let mut second = first.clone();
    let picks: Vec<_> = (0..32)
        .map(|_| policy::choose_direction(open, from, toward, 60, &mut first))
        .collect();
    let replay: Vec<_> = (0..32)
        .map(|_| policy::choose_direction(open, from, toward, 60, &mut second))
        .collect();

    assert_eq!(picks, replay);
    assert!(picks.iter().all(Option::is_some));
}

#[test]
fn brains_with_equal_seeds_choose_alike() {
    let grid = grid(&["#####", "#...#", "#...#", "#...#", "#####"]);
    let open = open_directions(&grid, SlotCoord::new(2, 2), None);
    let mut first = EnemyBrain::hunting(EnemyTuning::default(), 77);
    let mut second = EnemyBrain::hunting(EnemyTuning::default(), 77);

    for _ in 0..16 {
        assert_eq!(
            first.choose_direction(open, Vec2::new(2.5, -2.5)),
            second.choose_direction(open, Vec2::new(2.5, -2.5))
        );
    }
}
