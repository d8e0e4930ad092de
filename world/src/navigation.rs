//! Routes handed to enemies whose behaviour needs a destination.

use log::{debug, warn};
use maze_chase_core::{Enclosure, OccupancyGrid, SlotCoord, WALL_CODE};
use maze_chase_system_enemy_ai::{Path, PathRequest};
use maze_chase_system_pathfinding::a_star_manhattan;

/// Builds the path answering `request` for an enemy standing in `from`.
///
/// Returning home follows the A* route to the slot in front of the door
/// without its final waypoint, so enemies arriving from either side do not
/// cross the door front twice. The door and the enclosure centre are then
/// reached as positions. When no route exists the positions alone are
/// followed.
pub(crate) fn plan_path(
    request: PathRequest,
    grid: &OccupancyGrid,
    cells: &[u8],
    enclosure: &Enclosure,
    from: SlotCoord,
) -> Path {
    match request {
        PathRequest::EnclosureCenter => Path::through_positions([enclosure.center()]),
        PathRequest::EnclosureExit => Path::through_positions([enclosure.entrance()]),
        PathRequest::ReturnHome => {
            let positions = [enclosure.entrance(), enclosure.center()];
            let start = grid.wrap_slot(from);
            match a_star_manhattan(
                cells,
                grid.rows(),
                grid.columns(),
                WALL_CODE,
                start,
                enclosure.entrance_slot(),
            ) {
                Some(mut slots) => {
                    let _ = slots.pop();
                    debug!("routing home from {start:?} through {} slots", slots.len());
                    Path::new(slots, positions)
                }
                None => {
                    warn!("no route home from {start:?}, heading straight for the door");
                    Path::through_positions(positions)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use maze_chase_core::Target;

    fn grid() -> OccupancyGrid {
        OccupancyGrid::from_pattern(
            &[
                "#########",
                "#.......#",
                "#.#####.#",
                "#.#...#.#",
                "#########",
            ],
            1.0,
            1.0,
        )
        .expect("valid pattern")
    }

    #[test]
    fn return_home_drops_the_door_front_and_appends_positions() {
        let grid = grid();
        let enclosure = Enclosure::below_entrance(&grid, SlotCoord::new(1, 4));
        let mut path = plan_path(
            PathRequest::ReturnHome,
            &grid,
            &grid.linear_occupancy(),
            &enclosure,
            SlotCoord::new(3, 1),
        );

        let mut targets = Vec::new();
        while let Some(target) = path.current() {
            targets.push(target);
            path.advance();
        }
        assert_eq!(
            targets,
            vec![
                Target::Slot(SlotCoord::new(3, 1)),
                Target::Slot(SlotCoord::new(2, 1)),
                Target::Slot(SlotCoord::new(1, 1)),
                Target::Slot(SlotCoord::new(1, 2)),
                Target::Slot(SlotCoord::new(1, 3)),
                Target::Position(Vec2::new(4.0, -1.5)),
                Target::Position(Vec2::new(4.0, -4.5)),
            ]
        );
    }

    #[test]
    fn unreachable_home_falls_back_to_positions() {
        let grid = grid();
        let enclosure = Enclosure::below_entrance(&grid, SlotCoord::new(1, 4));
        let path = plan_path(
            PathRequest::ReturnHome,
            &grid,
            &grid.linear_occupancy(),
            &enclosure,
            SlotCoord::new(3, 4),
        );
        assert_eq!(path.len(), 2);
        assert_eq!(path.current(), Some(Target::Position(enclosure.entrance())));
    }
}
