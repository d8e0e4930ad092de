//! Direction choice for enemies that move without a target.

use glam::Vec2;
use maze_chase_core::{Direction, DirectionSet};
use rand::{seq::SliceRandom, Rng};

/// Picks one of the `open` directions for an agent at `from`.
///
/// A uniform draw in `1..=100` decides whether the choice favours
/// approaching `toward`: when the draw does not exceed `aggressiveness`,
/// the open directions that reduce the distance to `toward` along their axis
/// are preferred. Without such candidates, or when the draw fails, any open
/// direction may be picked. Returns `None` when nothing is open.
pub fn choose_direction<R: Rng + ?Sized>(
    open: DirectionSet,
    from: Vec2,
    toward: Vec2,
    aggressiveness: u8,
    rng: &mut R,
) -> Option<Direction> {
    let candidates: Vec<Direction> = open.iter().collect();
    if candidates.is_empty() {
        return None;
    }

    let draw: u8 = rng.gen_range(1..=100);
    if draw <= aggressiveness {
        let closer: Vec<Direction> = candidates
            .iter()
            .copied()
            .filter(|direction| approaches(*direction, from, toward))
            .collect();
        if let Some(direction) = closer.choose(rng) {
            return Some(*direction);
        }
    }
    candidates.choose(rng).copied()
}

/// Reports whether travelling in `direction` brings `from` closer to `toward`.
#[must_use]
pub fn approaches(direction: Direction, from: Vec2, toward: Vec2) -> bool {
    match direction {
        Direction::Up => toward.y > from.y,
        Direction::Left => toward.x < from.x,
        Direction::Down => toward.y < from.y,
        Direction::Right => toward.x > from.x,
    }
}
