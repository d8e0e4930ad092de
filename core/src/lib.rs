#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Maze Chase engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and the simulation systems. Adapters submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point and reports [`Event`] values that
//! scoring, presentation and replay tooling consume. The occupancy grid, the
//! stage layout and the tuning records live here as well so that every system
//! agrees on a single representation of the maze.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

mod grid;
mod layout;

pub use grid::{GridError, OccupancyGrid, OPEN_CODE, WALL_CODE};
pub use layout::{Enclosure, ItemKind, ItemSeed, LayoutError, StageLayout, ENCLOSURE_PENS};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Loads a stage, replacing any stage that was previously configured.
    ConfigureStage {
        /// Maze, anchors and items of the stage.
        layout: StageLayout,
        /// Speeds, timers and rewards applied to the stage's agents.
        tuning: StageTuning,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Presses or releases a directional input on behalf of the player.
    SetPushing {
        /// Direction affected by the input change.
        direction: Direction,
        /// Whether the direction is held after the change.
        enabled: bool,
    },
    /// Makes every living enemy fragile for the provided duration.
    FrightenEnemies {
        /// Total time the enemies remain vulnerable.
        duration: Duration,
        /// Trailing part of the duration reported as recovering.
        recovery_window: Duration,
    },
    /// Recreates the player and the enemies at their starting anchors.
    RetryStage,
    /// Tears the current stage down.
    ClearStage,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a stage was loaded and populated.
    StageConfigured {
        /// Number of rows in the stage grid.
        rows: u32,
        /// Number of columns in the stage grid.
        columns: u32,
        /// Number of enemies created for the stage.
        enemies: usize,
        /// Number of collectible items placed in the stage.
        items: usize,
    },
    /// Reports that a stage configuration request was rejected.
    StageRejected {
        /// Specific reason the configuration failed.
        reason: TuningError,
    },
    /// Confirms that the stage was torn down.
    StageUnloaded,
    /// Confirms that the agents were recreated for a new attempt.
    AgentsReset,
    /// Reports that the player collected an item.
    ItemConsumed {
        /// Identifier of the collected item.
        item: ItemId,
        /// Kind of the collected item.
        kind: ItemKind,
        /// Score awarded for the item.
        reward: u32,
    },
    /// Reports that the player caught a fragile enemy.
    EnemyCaught {
        /// Identifier of the caught enemy.
        enemy: EnemyId,
        /// Score awarded for the catch.
        reward: u32,
    },
    /// Reports that an enemy caught the player.
    PlayerCaught {
        /// Identifier of the enemy that caught the player.
        enemy: EnemyId,
    },
    /// Reports that the player finished dying.
    PlayerDied,
    /// Reports that the current attempt failed and awaits a retry.
    StageFailed,
    /// Reports that every item of the stage was collected.
    StageCompleted,
    /// Announces a transition of an enemy's behaviour state.
    EnemyStateChanged {
        /// Identifier of the enemy that transitioned.
        enemy: EnemyId,
        /// State before the transition.
        from: AiState,
        /// State after the transition.
        to: AiState,
    },
    /// Announces a change of an enemy's fragility.
    EnemyFragilityChanged {
        /// Identifier of the enemy whose fragility changed.
        enemy: EnemyId,
        /// Fragility after the change.
        fragility: Fragility,
    },
    /// Reports that an enemy arrived at one element of its path.
    EnemyTargetReached {
        /// Identifier of the enemy that arrived.
        enemy: EnemyId,
    },
}

/// Cardinal movement directions available to agents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices and increasing vertical offsets.
    Up,
    /// Movement toward decreasing column indices.
    Left,
    /// Movement toward increasing row indices and decreasing vertical offsets.
    Down,
    /// Movement toward increasing column indices.
    Right,
}

impl Direction {
    /// All directions in the order used for vicinity enumeration.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Left,
        Direction::Down,
        Direction::Right,
    ];

    /// Direction pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Left => Self::Right,
            Self::Down => Self::Up,
            Self::Right => Self::Left,
        }
    }

    /// Reports whether the direction moves along the horizontal axis.
    #[must_use]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    /// Unit vector of the direction in world space, where up is positive.
    #[must_use]
    pub const fn unit(self) -> Vec2 {
        match self {
            Self::Up => Vec2::new(0.0, 1.0),
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Down => Vec2::new(0.0, -1.0),
            Self::Right => Vec2::new(1.0, 0.0),
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Up => 0b0001,
            Self::Left => 0b0010,
            Self::Down => 0b0100,
            Self::Right => 0b1000,
        }
    }
}

/// Compact set of directions, used for held inputs and open neighbours.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DirectionSet(u8);

impl DirectionSet {
    /// Set without any direction.
    pub const EMPTY: Self = Self(0);

    /// Set that holds exactly one direction.
    #[must_use]
    pub const fn only(direction: Direction) -> Self {
        Self(direction.bit())
    }

    /// Reports whether the direction is part of the set.
    #[must_use]
    pub const fn contains(self, direction: Direction) -> bool {
        self.0 & direction.bit() != 0
    }

    /// Reports whether the set holds no direction at all.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Adds or removes a direction.
    pub fn set(&mut self, direction: Direction, enabled: bool) {
        if enabled {
            self.0 |= direction.bit();
        } else {
            self.0 &= !direction.bit();
        }
    }

    /// Adds a direction.
    pub fn insert(&mut self, direction: Direction) {
        self.set(direction, true);
    }

    /// Removes a direction.
    pub fn remove(&mut self, direction: Direction) {
        self.set(direction, false);
    }

    /// Removes every direction.
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// Iterates the contained directions in [`Direction::ALL`] order.
    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL
            .into_iter()
            .filter(move |direction| self.contains(*direction))
    }

    /// Single direction requested by the set.
    ///
    /// Opposite directions held together cancel each other, and a horizontal
    /// request takes precedence over a vertical one.
    #[must_use]
    pub fn resolved(self) -> Option<Direction> {
        let along = |first: Direction, second: Direction| {
            match (self.contains(first), self.contains(second)) {
                (true, false) => Some(first),
                (false, true) => Some(second),
                _ => None,
            }
        };
        along(Direction::Left, Direction::Right).or_else(|| along(Direction::Up, Direction::Down))
    }
}

impl FromIterator<Direction> for DirectionSet {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for direction in iter {
            set.insert(direction);
        }
        set
    }
}

/// Location of a single grid slot expressed as row and column indices.
///
/// Coordinates are signed because agents may briefly step past the grid
/// border before being wrapped to the opposite edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotCoord {
    row: i32,
    column: i32,
}

impl SlotCoord {
    /// Creates a new slot coordinate.
    #[must_use]
    pub const fn new(row: i32, column: i32) -> Self {
        Self { row, column }
    }

    /// Zero-based row index of the slot.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Zero-based column index of the slot.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Slot adjacent to this one in the provided direction.
    #[must_use]
    pub const fn neighbor(self, direction: Direction) -> Self {
        match direction {
            Direction::Up => Self::new(self.row - 1, self.column),
            Direction::Left => Self::new(self.row, self.column - 1),
            Direction::Down => Self::new(self.row + 1, self.column),
            Direction::Right => Self::new(self.row, self.column + 1),
        }
    }

    /// Computes the Manhattan distance between two slot coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: SlotCoord) -> u32 {
        self.row.abs_diff(other.row) + self.column.abs_diff(other.column)
    }
}

/// Destination an autonomous agent steers toward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Target {
    /// Centre of a discrete slot, reached through open slots only.
    Slot(SlotCoord),
    /// Exact world offset, approached axis by axis regardless of walls.
    Position(Vec2),
}

/// Unique identifier assigned to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a collectible item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(u32);

impl ItemId {
    /// Creates a new item identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// High level behaviour of an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiState {
    /// Wandering inside the enclosure until its release timer expires.
    Caged,
    /// Heading for the centre of the enclosure.
    Centering,
    /// Heading for the enclosure exit.
    Leaving,
    /// Roaming the maze.
    Free,
    /// Returning to the enclosure after being caught.
    Dead,
}

/// Vulnerability of an enemy, orthogonal to its [`AiState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fragility {
    /// The enemy catches the player on contact.
    Normal,
    /// The enemy is caught by the player on contact.
    Fragile,
    /// The enemy is still fragile but about to recover.
    Recovering,
}

impl Fragility {
    /// Reports whether contact with the player defeats the enemy.
    #[must_use]
    pub const fn is_vulnerable(self) -> bool {
        matches!(self, Self::Fragile | Self::Recovering)
    }
}

/// Life cycle of an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Life {
    /// The agent takes part in the simulation.
    Alive,
    /// The agent was caught and is playing out its defeat.
    Dying,
    /// The agent is defeated.
    Dead,
}

/// Movement and defeat parameters of the player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerTuning {
    /// Travel speed in world units per second.
    pub movement_speed: f32,
    /// Time spent dying before the attempt fails.
    pub dying_duration: Duration,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            movement_speed: 5.0,
            dying_duration: Duration::from_millis(1500),
        }
    }
}

/// Behaviour parameters of a single enemy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyTuning {
    /// Travel speed in world units per second while not fragile.
    pub movement_speed: f32,
    /// Travel speed in world units per second while fragile.
    pub fragile_speed: f32,
    /// Time spent caged before heading for the exit.
    pub caged_duration: Duration,
    /// Chance in percent that a free choice favours approaching the player.
    pub aggressiveness: u8,
    /// Score awarded when the player catches the enemy.
    pub reward: u32,
}

impl EnemyTuning {
    /// Creates tuning with the default speeds and reward.
    #[must_use]
    pub const fn new(caged_duration: Duration, aggressiveness: u8) -> Self {
        Self {
            movement_speed: 4.5,
            fragile_speed: 2.5,
            caged_duration,
            aggressiveness,
            reward: 200,
        }
    }
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), 50)
    }
}

/// Complete parameter set of a stage.
#[derive(Clone, Debug, PartialEq)]
pub struct StageTuning {
    /// Parameters of the player.
    pub player: PlayerTuning,
    /// Parameters of each enemy in spawn order; at most four are used.
    pub enemies: Vec<EnemyTuning>,
    /// Time enemies stay fragile after a big pellet.
    pub fragile_duration: Duration,
    /// Trailing part of the fragile time reported as recovering.
    pub recovery_window: Duration,
    /// Score awarded for a small pellet.
    pub small_pellet_reward: u32,
    /// Score awarded for a big pellet.
    pub big_pellet_reward: u32,
    /// Pickup distance per axis, as a fraction of the tile dimensions.
    pub pickup_reach: f32,
    /// Contact distance per axis between agents, as a fraction of the tile dimensions.
    pub catch_reach: f32,
    /// Seed from which every enemy derives its random source.
    pub rng_seed: u64,
}

impl StageTuning {
    /// Checks the parameters for values the simulation cannot honour.
    pub fn validate(&self) -> Result<(), TuningError> {
        let speeds = std::iter::once(self.player.movement_speed).chain(
            self.enemies
                .iter()
                .flat_map(|enemy| [enemy.movement_speed, enemy.fragile_speed]),
        );
        for speed in speeds {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(TuningError::NonPositiveSpeed);
            }
        }
        if let Some(enemy) = self.enemies.iter().find(|enemy| enemy.aggressiveness > 100) {
            return Err(TuningError::AggressivenessOutOfRange {
                value: enemy.aggressiveness,
            });
        }
        if self.recovery_window > self.fragile_duration {
            return Err(TuningError::RecoveryExceedsFragility);
        }
        for reach in [self.pickup_reach, self.catch_reach] {
            if !reach.is_finite() || reach <= 0.0 {
                return Err(TuningError::NonPositiveReach);
            }
        }
        Ok(())
    }
}

impl Default for StageTuning {
    fn default() -> Self {
        Self {
            player: PlayerTuning::default(),
            enemies: vec![
                EnemyTuning::new(Duration::ZERO, 80),
                EnemyTuning::new(Duration::from_secs(2), 60),
                EnemyTuning::new(Duration::from_secs(5), 40),
                EnemyTuning::new(Duration::from_secs(8), 20),
            ],
            fragile_duration: Duration::from_secs(6),
            recovery_window: Duration::from_secs(2),
            small_pellet_reward: 10,
            big_pellet_reward: 50,
            pickup_reach: 0.5,
            catch_reach: 0.5,
            rng_seed: 0x6d61_7a65_6368_6173,
        }
    }
}

/// Reasons a stage configuration may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum TuningError {
    /// A movement speed is zero, negative or not finite.
    #[error("movement speeds must be positive and finite")]
    NonPositiveSpeed,
    /// An aggressiveness exceeds one hundred percent.
    #[error("aggressiveness {value} exceeds 100")]
    AggressivenessOutOfRange {
        /// Offending aggressiveness value.
        value: u8,
    },
    /// The recovery window is longer than the fragile duration.
    #[error("recovery window exceeds the fragile duration")]
    RecoveryExceedsFragility,
    /// A pickup or contact reach is zero, negative or not finite.
    #[error("pickup and contact reaches must be positive and finite")]
    NonPositiveReach,
}
