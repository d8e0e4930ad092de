#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Behaviour state machine of the enemies.
//!
//! Every enemy owns an [`EnemyBrain`] that tracks its [`AiState`], its
//! fragility and its life, follows the [`Path`] handed to it by the world and
//! picks directions at free decision points through [`policy`]. The brain
//! implements the steering [`Pilot`] trait, so the steering engine reads
//! speeds and targets from it and reports arrivals back to it.
//!
//! Brains never plan routes themselves. Whenever a state needs a destination
//! they expose a [`PathRequest`] and wait for the owner to call
//! [`EnemyBrain::set_path`].

use std::{collections::VecDeque, time::Duration};

use glam::Vec2;
use log::debug;
use maze_chase_core::{
    AiState, Direction, DirectionSet, EnemyTuning, Fragility, Life, SlotCoord, Target,
};
use maze_chase_system_steering::{Motion, Pilot};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub mod policy;

/// Ordered targets an enemy follows: slot targets first, then positions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    slots: VecDeque<SlotCoord>,
    positions: VecDeque<Vec2>,
}

impl Path {
    /// Creates a path from slot waypoints followed by world positions.
    #[must_use]
    pub fn new(
        slots: impl IntoIterator<Item = SlotCoord>,
        positions: impl IntoIterator<Item = Vec2>,
    ) -> Self {
        Self {
            slots: slots.into_iter().collect(),
            positions: positions.into_iter().collect(),
        }
    }

    /// Creates a path made of world positions only.
    #[must_use]
    pub fn through_positions(positions: impl IntoIterator<Item = Vec2>) -> Self {
        Self::new(std::iter::empty(), positions)
    }

    /// Element currently steered toward.
    #[must_use]
    pub fn current(&self) -> Option<Target> {
        self.slots
            .front()
            .copied()
            .map(Target::Slot)
            .or_else(|| self.positions.front().copied().map(Target::Position))
    }

    /// Drops the current element.
    pub fn advance(&mut self) {
        if self.slots.pop_front().is_none() {
            let _ = self.positions.pop_front();
        }
    }

    /// Number of elements left.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() + self.positions.len()
    }

    /// Reports whether every element was consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() && self.positions.is_empty()
    }
}

/// Destination a brain waits for before it can make progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathRequest {
    /// Walk to the centre of the enclosure.
    EnclosureCenter,
    /// Walk out through the enclosure door.
    EnclosureExit,
    /// Route back into the enclosure after being caught.
    ReturnHome,
}

/// Observable change produced by a brain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrainTransition {
    /// The behaviour state changed.
    State {
        /// State before the change.
        from: AiState,
        /// State after the change.
        to: AiState,
    },
    /// The fragility changed to the provided value.
    Fragility(Fragility),
}

/// Behaviour and timers of a single enemy.
#[derive(Clone, Debug, PartialEq)]
pub struct EnemyBrain {
    tuning: EnemyTuning,
    state: AiState,
    fragility: Fragility,
    life: Life,
    caged_elapsed: Duration,
    fragile_remaining: Duration,
    recovery_window: Duration,
    path: Path,
    path_completed: bool,
    adversary: Vec2,
    rng: ChaCha8Rng,
}

impl EnemyBrain {
    /// Creates an enemy waiting in the enclosure.
    #[must_use]
    pub fn caged(tuning: EnemyTuning, seed: u64) -> Self {
        Self::with_state(tuning, seed, AiState::Caged)
    }

    /// Creates an enemy that roams the maze right away.
    #[must_use]
    pub fn hunting(tuning: EnemyTuning, seed: u64) -> Self {
        Self::with_state(tuning, seed, AiState::Free)
    }

    fn with_state(tuning: EnemyTuning, seed: u64, state: AiState) -> Self {
        Self {
            tuning,
            state,
            fragility: Fragility::Normal,
            life: Life::Alive,
            caged_elapsed: Duration::ZERO,
            fragile_remaining: Duration::ZERO,
            recovery_window: Duration::ZERO,
            path: Path::default(),
            path_completed: false,
            adversary: Vec2::ZERO,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Tuning the brain was created with.
    #[must_use]
    pub const fn tuning(&self) -> &EnemyTuning {
        &self.tuning
    }

    /// Current behaviour state.
    #[must_use]
    pub const fn state(&self) -> AiState {
        self.state
    }

    /// Current fragility.
    #[must_use]
    pub const fn fragility(&self) -> Fragility {
        self.fragility
    }

    /// Current life stage.
    #[must_use]
    pub const fn life(&self) -> Life {
        self.life
    }

    /// Reports whether the enemy takes part in contacts.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.life == Life::Alive
    }

    /// Time left before the enemy stops being fragile.
    #[must_use]
    pub const fn fragile_remaining(&self) -> Duration {
        self.fragile_remaining
    }

    /// Path currently followed.
    #[must_use]
    pub const fn path(&self) -> &Path {
        &self.path
    }

    /// Reports whether the last assigned path was followed to its end.
    #[must_use]
    pub const fn is_path_completed(&self) -> bool {
        self.path_completed
    }

    /// Records the position of the agent the enemy chases.
    pub fn track_adversary(&mut self, position: Vec2) {
        self.adversary = position;
    }

    /// Replaces the followed path.
    pub fn set_path(&mut self, path: Path) {
        self.path = path;
        self.path_completed = false;
    }

    /// Destination the brain is waiting for, if any.
    #[must_use]
    pub fn path_request(&self) -> Option<PathRequest> {
        if !self.path.is_empty() || self.path_completed {
            return None;
        }
        match self.state {
            AiState::Centering => Some(PathRequest::EnclosureCenter),
            AiState::Leaving => Some(PathRequest::EnclosureExit),
            AiState::Dead => Some(PathRequest::ReturnHome),
            AiState::Caged | AiState::Free => None,
        }
    }

    /// Advances the fragility and behaviour timers by `dt`.
    pub fn progress(&mut self, dt: Duration, out: &mut Vec<BrainTransition>) {
        self.progress_fragility(dt, out);

        match self.state {
            AiState::Caged => {
                self.caged_elapsed += dt;
                if self.caged_elapsed > self.tuning.caged_duration {
                    self.enter(AiState::Centering, out);
                }
            }
            AiState::Centering if self.path_completed => self.enter(AiState::Leaving, out),
            AiState::Leaving if self.path_completed => self.enter(AiState::Free, out),
            AiState::Dead if self.path_completed => {
                self.life = Life::Alive;
                self.enter(AiState::Leaving, out);
            }
            _ => {}
        }
    }

    fn progress_fragility(&mut self, dt: Duration, out: &mut Vec<BrainTransition>) {
        if !self.fragility.is_vulnerable() {
            return;
        }
        self.fragile_remaining = self.fragile_remaining.saturating_sub(dt);
        if self.fragile_remaining.is_zero() {
            self.set_fragility(Fragility::Normal, out);
        } else if self.fragility == Fragility::Fragile
            && self.fragile_remaining <= self.recovery_window
        {
            self.set_fragility(Fragility::Recovering, out);
        }
    }

    /// Makes a living enemy fragile and turns it around.
    ///
    /// Held input is dropped and the enemy reverses its travel direction,
    /// which is the only reversal an autonomous agent performs.
    pub fn become_fragile(
        &mut self,
        motion: &mut Motion,
        duration: Duration,
        recovery_window: Duration,
        out: &mut Vec<BrainTransition>,
    ) {
        if !self.is_alive() {
            return;
        }
        self.fragile_remaining = duration;
        self.recovery_window = recovery_window;
        self.set_fragility(Fragility::Fragile, out);

        motion.cancel_input();
        if let Some(direction) = motion.reverse(self.tuning.fragile_speed) {
            debug!("fragile enemy reversed to {direction:?}");
        }
    }

    /// Defeats the enemy, which then heads back to the enclosure.
    pub fn start_dying(&mut self, motion: &mut Motion, out: &mut Vec<BrainTransition>) {
        if self.life == Life::Dead {
            return;
        }
        self.life = Life::Dead;
        self.fragile_remaining = Duration::ZERO;
        self.set_fragility(Fragility::Normal, out);
        motion.cancel_input();
        motion.stop();
        self.enter(AiState::Dead, out);
    }

    fn enter(&mut self, state: AiState, out: &mut Vec<BrainTransition>) {
        if self.state == state {
            return;
        }
        debug!("enemy state {:?} -> {state:?}", self.state);
        out.push(BrainTransition::State {
            from: self.state,
            to: state,
        });
        self.state = state;
        self.path = Path::default();
        self.path_completed = false;
    }

    fn set_fragility(&mut self, fragility: Fragility, out: &mut Vec<BrainTransition>) {
        if self.fragility != fragility {
            self.fragility = fragility;
            out.push(BrainTransition::Fragility(fragility));
        }
    }
}

impl Pilot for EnemyBrain {
    fn movement_speed(&self) -> f32 {
        if self.fragility.is_vulnerable() {
            self.tuning.fragile_speed
        } else {
            self.tuning.movement_speed
        }
    }

    fn is_autonomous(&self) -> bool {
        true
    }

    fn can_move_without_target(&self) -> bool {
        matches!(self.state, AiState::Caged | AiState::Free)
    }

    fn target(&self) -> Option<Target> {
        self.path.current()
    }

    fn advance_target(&mut self) {
        self.path.advance();
        if self.path.is_empty() {
            self.path_completed = true;
        }
    }

    fn choose_direction(&mut self, open: DirectionSet, offset: Vec2) -> Option<Direction> {
        policy::choose_direction(
            open,
            offset,
            self.adversary,
            self.tuning.aggressiveness,
            &mut self.rng,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_yields_slots_before_positions() {
        let mut path = Path::new([SlotCoord::new(1, 2)], [Vec2::new(3.0, -1.5)]);
        assert_eq!(path.len(), 2);
        assert_eq!(path.current(), Some(Target::Slot(SlotCoord::new(1, 2))));
        path.advance();
        assert_eq!(path.current(), Some(Target::Position(Vec2::new(3.0, -1.5))));
        path.advance();
        assert!(path.is_empty());
        assert_eq!(path.current(), None);
        path.advance();
        assert!(path.is_empty());
    }

    #[test]
    fn state_change_discards_the_path() {
        let mut brain = EnemyBrain::caged(EnemyTuning::new(Duration::ZERO, 0), 1);
        brain.set_path(Path::through_positions([Vec2::ONE]));
        let mut out = Vec::new();
        brain.progress(Duration::from_millis(10), &mut out);
        assert_eq!(brain.state(), AiState::Centering);
        assert!(brain.path().is_empty());
        assert_eq!(brain.path_request(), Some(PathRequest::EnclosureCenter));
    }
}
