#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame-stepped steering that keeps continuous agent motion consistent with
//! the discrete occupancy grid.
//!
//! Agents travel freely between slots but every decision (turning, stopping,
//! following a path) is taken exactly at a decision point: the centre of the
//! current slot, or the literal offset of a position target. Each tick the
//! travelled distance is split into sub-steps that end on every decision
//! point ahead; travel away from a decision point moves at most
//! [`MAX_STEP_FRACTION`] of a tile at once, so none can be skipped.
//!
//! A heading only carries an agent off a slot centre once it was checked
//! against the slot ahead, including reversals that happen on the centre.
//!
//! What an agent wants is described by its [`Pilot`]. The player is driven by
//! a [`ManualPilot`] that follows held inputs, while autonomous pilots supply
//! targets and pick directions at free decision points.

use glam::Vec2;
use log::{trace, warn};
use maze_chase_core::{Direction, DirectionSet, OccupancyGrid, SlotCoord, Target};

/// Longest sub-step away from a decision point, as a fraction of the tile
/// dimension along the travel axis.
pub const MAX_STEP_FRACTION: f32 = 0.4;

/// Tolerance, in slot units, under which a fraction counts as the slot's half.
pub const HALF_SLOT_EPSILON: f32 = 1e-4;

const MAX_SUBSTEPS: usize = 1024;

/// Kinematic state of a single agent.
///
/// At most one direction is travelled at a time and the speed is always
/// aligned with it, so the velocity is never diagonal.
#[derive(Clone, Debug, PartialEq)]
pub struct Motion {
    offset: Vec2,
    slot: SlotCoord,
    going: Option<Direction>,
    speed: f32,
    pushing: DirectionSet,
}

impl Motion {
    /// Creates a stopped agent at the provided offset.
    #[must_use]
    pub fn resting_at(grid: &OccupancyGrid, offset: Vec2) -> Self {
        Self {
            offset,
            slot: grid.slot_for_offset(offset),
            going: None,
            speed: 0.0,
            pushing: DirectionSet::EMPTY,
        }
    }

    /// Current world offset.
    #[must_use]
    pub const fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Slot containing the current offset.
    #[must_use]
    pub const fn slot(&self) -> SlotCoord {
        self.slot
    }

    /// Direction currently travelled, if moving.
    #[must_use]
    pub const fn going(&self) -> Option<Direction> {
        self.going
    }

    /// Directions currently requested.
    #[must_use]
    pub const fn pushing(&self) -> DirectionSet {
        self.pushing
    }

    /// Velocity in world units per second.
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.going
            .map_or(Vec2::ZERO, |direction| direction.unit() * self.speed)
    }

    /// Reports whether the agent is travelling.
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.going.is_some()
    }

    /// Presses or releases a direction.
    pub fn set_pushing(&mut self, direction: Direction, enabled: bool) {
        self.pushing.set(direction, enabled);
    }

    /// Replaces every request with a single direction.
    pub fn push_only(&mut self, direction: Direction) {
        self.pushing = DirectionSet::only(direction);
    }

    /// Releases every direction.
    pub fn cancel_input(&mut self) {
        self.pushing.clear();
    }

    /// Starts travelling in a direction, replacing the previous one.
    pub fn start_going(&mut self, direction: Direction, speed: f32) {
        self.going = Some(direction);
        self.speed = speed;
    }

    /// Stops travelling.
    pub fn stop(&mut self) {
        self.going = None;
        self.speed = 0.0;
    }

    /// Turns a travelling agent around, requesting the new direction only.
    ///
    /// Returns the new direction, or `None` when the agent was not moving.
    pub fn reverse(&mut self, speed: f32) -> Option<Direction> {
        let back = self.going?.opposite();
        self.push_only(back);
        self.start_going(back, speed);
        Some(back)
    }
}

/// Capabilities an agent exposes to the steering engine.
pub trait Pilot {
    /// Travel speed in world units per second.
    fn movement_speed(&self) -> f32;

    /// Reports whether the agent picks its own directions instead of
    /// following held input. Only non-autonomous agents may reverse freely.
    fn is_autonomous(&self) -> bool;

    /// Reports whether the agent may move at all this tick.
    fn is_able_to_move(&self) -> bool {
        true
    }

    /// Reports whether the agent may wander when it has no target.
    fn can_move_without_target(&self) -> bool {
        false
    }

    /// Target currently steered toward.
    fn target(&self) -> Option<Target> {
        None
    }

    /// Called when the current target was reached.
    fn advance_target(&mut self) {}

    /// Picks one of the `open` directions at a free decision point.
    fn choose_direction(&mut self, _open: DirectionSet, _offset: Vec2) -> Option<Direction> {
        None
    }
}

/// Pilot for an agent driven by held directional input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ManualPilot {
    movement_speed: f32,
    able: bool,
}

impl ManualPilot {
    /// Creates a pilot travelling at the provided speed.
    #[must_use]
    pub const fn new(movement_speed: f32) -> Self {
        Self {
            movement_speed,
            able: true,
        }
    }

    /// Allows or forbids any movement.
    pub fn set_able(&mut self, able: bool) {
        self.able = able;
    }
}

impl Pilot for ManualPilot {
    fn movement_speed(&self) -> f32 {
        self.movement_speed
    }

    fn is_autonomous(&self) -> bool {
        false
    }

    fn is_able_to_move(&self) -> bool {
        self.able
    }
}

/// Outcome of a single [`advance`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Number of targets reached during the tick.
    pub targets_reached: u32,
    /// Whether the agent left the grid and was wrapped to the opposite edge.
    pub wrapped: bool,
}

/// Advances an agent by `dt` seconds.
///
/// Starts a stopped agent when its input or pilot allows it, integrates the
/// travelled distance through every decision point on the way, wraps agents
/// that left the grid and finally updates the stored slot.
pub fn advance<P: Pilot + ?Sized>(
    motion: &mut Motion,
    pilot: &mut P,
    grid: &OccupancyGrid,
    dt: f32,
) -> StepReport {
    let mut report = StepReport::default();
    if !pilot.is_able_to_move() {
        return report;
    }

    let speed = pilot.movement_speed();
    if motion.going.is_none() {
        accelerate_from_rest(motion, pilot, grid, speed, &mut report);
    }
    if motion.going.is_some() {
        motion.speed = speed;
        integrate(motion, pilot, grid, speed * dt, &mut report);
    }

    let wrapped = grid.wrap_offset(motion.offset);
    if wrapped != motion.offset {
        trace!("wrapped {:?} to {:?}", motion.offset, wrapped);
        motion.offset = wrapped;
        report.wrapped = true;
    }
    motion.slot = grid.slot_for_offset(motion.offset);
    report
}

/// Direction leading from `offset` toward `target`.
///
/// Slot targets are approached row first, then column, comparing against
/// the slot centre. Position targets are approached vertically first, then
/// horizontally. Returns `None` once the target is reached.
#[must_use]
pub fn direction_toward(grid: &OccupancyGrid, offset: Vec2, target: Target) -> Option<Direction> {
    match target {
        Target::Slot(goal) => {
            let (slot, row_fraction, column_fraction) = locate(grid, offset);
            if slot.row() > goal.row()
                || (slot.row() == goal.row() && row_fraction > 0.5 + HALF_SLOT_EPSILON)
            {
                Some(Direction::Up)
            } else if slot.row() < goal.row()
                || (slot.row() == goal.row() && row_fraction < 0.5 - HALF_SLOT_EPSILON)
            {
                Some(Direction::Down)
            } else if slot.column() > goal.column()
                || (slot.column() == goal.column() && column_fraction > 0.5 + HALF_SLOT_EPSILON)
            {
                Some(Direction::Left)
            } else if slot.column() < goal.column()
                || (slot.column() == goal.column() && column_fraction < 0.5 - HALF_SLOT_EPSILON)
            {
                Some(Direction::Right)
            } else {
                None
            }
        }
        Target::Position(goal) => {
            if offset.y < goal.y {
                Some(Direction::Up)
            } else if offset.y > goal.y {
                Some(Direction::Down)
            } else if offset.x > goal.x {
                Some(Direction::Left)
            } else if offset.x < goal.x {
                Some(Direction::Right)
            } else {
                None
            }
        }
    }
}

/// Open directions around a slot.
///
/// When `heading` is given the way back is reported as blocked, which keeps
/// autonomous agents from reversing at decision points. Neighbours beyond
/// the border are checked on the opposite edge.
#[must_use]
pub fn open_directions(
    grid: &OccupancyGrid,
    slot: SlotCoord,
    heading: Option<Direction>,
) -> DirectionSet {
    Direction::ALL
        .into_iter()
        .filter(|direction| {
            heading != Some(direction.opposite())
                && !grid.is_occupied_wrapped(slot.neighbor(*direction))
        })
        .collect()
}

fn accelerate_from_rest<P: Pilot + ?Sized>(
    motion: &mut Motion,
    pilot: &mut P,
    grid: &OccupancyGrid,
    speed: f32,
    report: &mut StepReport,
) {
    let slot = grid.slot_for_offset(motion.offset);
    if let Some(direction) = motion.pushing.resolved() {
        // Past the half of a slot the agent may only leave into an open slot.
        if before_half(grid, motion.offset, direction)
            || !grid.is_occupied_wrapped(slot.neighbor(direction))
        {
            motion.start_going(direction, speed);
        }
        return;
    }
    if !pilot.is_autonomous() {
        return;
    }

    for _ in 0..MAX_SUBSTEPS {
        let Some(target) = pilot.target() else {
            if pilot.can_move_without_target() {
                let open = open_directions(grid, slot, None);
                if let Some(direction) = pilot.choose_direction(open, motion.offset) {
                    motion.push_only(direction);
                    motion.start_going(direction, speed);
                }
            }
            return;
        };
        match direction_toward(grid, motion.offset, target) {
            Some(direction) => {
                motion.push_only(direction);
                motion.start_going(direction, speed);
                return;
            }
            None => {
                pilot.advance_target();
                report.targets_reached += 1;
            }
        }
    }
}

fn integrate<P: Pilot + ?Sized>(
    motion: &mut Motion,
    pilot: &mut P,
    grid: &OccupancyGrid,
    mut remaining: f32,
    report: &mut StepReport,
) {
    let speed = motion.speed;
    let autonomous = pilot.is_autonomous();
    // Set once `decide` approved the heading at the centre the agent sits on.
    let mut decided_here = false;

    for _ in 0..MAX_SUBSTEPS {
        if remaining <= 0.0 {
            return;
        }
        let Some(heading) = motion.going else {
            return;
        };
        if !autonomous
            && motion.pushing.contains(heading.opposite())
            && !motion.pushing.contains(heading)
        {
            motion.start_going(heading.opposite(), speed);
            decided_here = false;
            continue;
        }

        let slot = grid.slot_for_offset(motion.offset);
        let position_target = match pilot.target() {
            Some(Target::Position(position)) if autonomous => Some(position),
            _ => None,
        };
        let decision_point = position_target.unwrap_or_else(|| grid.row_column_to_offset(slot));
        let unit = heading.unit();
        let ahead = (decision_point - motion.offset).dot(unit);

        if ahead > 0.0 {
            if remaining < ahead {
                let moved = motion.offset + unit * remaining;
                if (decision_point - moved).dot(unit) > 0.0 {
                    motion.offset = moved;
                    return;
                }
                remaining = 0.0;
            } else {
                remaining -= ahead;
            }
            snap_axis(&mut motion.offset, decision_point, heading);
        } else if position_target.is_some() {
            if ahead < 0.0 {
                let _ = motion.reverse(speed);
                decided_here = false;
                continue;
            }
        } else {
            if ahead == 0.0 && !decided_here && grid.is_occupied_wrapped(slot.neighbor(heading)) {
                trace!("unchecked {heading:?} blocked at {slot:?}");
                motion.stop();
                if autonomous {
                    motion.cancel_input();
                }
                return;
            }
            let step = remaining.min(max_step(grid, heading));
            motion.offset += unit * step;
            remaining -= step;
            decided_here = false;
            continue;
        }

        match decide(motion, pilot, grid, slot, heading, speed, report) {
            Decision::Continue => decided_here = true,
            Decision::Halt => return,
        }
    }
    warn!(
        "steering stopped after {MAX_SUBSTEPS} sub-steps at {:?}",
        motion.offset
    );
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Decision {
    Continue,
    Halt,
}

fn decide<P: Pilot + ?Sized>(
    motion: &mut Motion,
    pilot: &mut P,
    grid: &OccupancyGrid,
    slot: SlotCoord,
    heading: Direction,
    speed: f32,
    report: &mut StepReport,
) -> Decision {
    if !pilot.is_autonomous() {
        if let Some(turn) = motion.pushing.resolved() {
            if turn != heading && !grid.is_occupied_wrapped(slot.neighbor(turn)) {
                trace!("turning {heading:?} -> {turn:?} at {slot:?}");
                motion.start_going(turn, speed);
                return Decision::Continue;
            }
        }
        if grid.is_occupied_wrapped(slot.neighbor(heading)) {
            trace!("wall stop at {slot:?}");
            motion.offset = grid.row_column_to_offset(slot);
            motion.stop();
            return Decision::Halt;
        }
        return Decision::Continue;
    }

    if pilot.target().is_none() {
        if pilot.can_move_without_target() {
            let open = open_directions(grid, slot, Some(heading));
            if let Some(next) = pilot.choose_direction(open, motion.offset) {
                if next != heading {
                    trace!("autonomous turn {heading:?} -> {next:?} at {slot:?}");
                }
                motion.push_only(next);
                motion.start_going(next, speed);
                return Decision::Continue;
            }
        }
        motion.offset = grid.row_column_to_offset(slot);
        motion.stop();
        motion.cancel_input();
        return Decision::Halt;
    }

    for _ in 0..MAX_SUBSTEPS {
        let Some(target) = pilot.target() else {
            break;
        };
        match direction_toward(grid, motion.offset, target) {
            Some(next) => {
                motion.push_only(next);
                motion.start_going(next, speed);
                return Decision::Continue;
            }
            None => {
                pilot.advance_target();
                report.targets_reached += 1;
            }
        }
    }
    motion.stop();
    motion.cancel_input();
    Decision::Halt
}

fn locate(grid: &OccupancyGrid, offset: Vec2) -> (SlotCoord, f32, f32) {
    let (row, column) = grid.offset_to_row_column(offset);
    let slot = SlotCoord::new(row.floor() as i32, column.floor() as i32);
    (slot, row - row.floor(), column - column.floor())
}

fn before_half(grid: &OccupancyGrid, offset: Vec2, direction: Direction) -> bool {
    let (_, row_fraction, column_fraction) = locate(grid, offset);
    match direction {
        Direction::Up => row_fraction > 0.5 + HALF_SLOT_EPSILON,
        Direction::Down => row_fraction < 0.5 - HALF_SLOT_EPSILON,
        Direction::Left => column_fraction > 0.5 + HALF_SLOT_EPSILON,
        Direction::Right => column_fraction < 0.5 - HALF_SLOT_EPSILON,
    }
}

fn max_step(grid: &OccupancyGrid, direction: Direction) -> f32 {
    let tile = grid.tile_size();
    let length = if direction.is_horizontal() {
        tile.x
    } else {
        tile.y
    };
    MAX_STEP_FRACTION * length
}

fn snap_axis(offset: &mut Vec2, point: Vec2, direction: Direction) {
    if direction.is_horizontal() {
        offset.x = point.x;
    } else {
        offset.y = point.y;
    }
}
