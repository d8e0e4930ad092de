#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative stage state management for Maze Chase.
//!
//! The world owns the loaded stage: its grid, the player, the enemies and the
//! collectible items. Every mutation goes through [`apply`], which executes a
//! [`Command`] and reports what happened as [`Event`] values. Each tick runs a
//! single ordered pass that collects items, moves the player and then moves
//! every enemy in spawn order.

use std::time::Duration;

use glam::Vec2;
use log::{debug, info};
use maze_chase_core::{
    Command, EnemyId, Event, ItemId, ItemKind, Life, SlotCoord, StageLayout, StageTuning,
    ENCLOSURE_PENS,
};
use maze_chase_system_enemy_ai::{BrainTransition, EnemyBrain};
use maze_chase_system_steering::{advance, ManualPilot, Motion};

mod navigation;

/// Largest enemy population a stage supports: one outside and one per pen.
pub const MAX_ENEMIES: usize = ENCLOSURE_PENS + 1;

/// Progress of the current attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageStatus {
    /// The attempt is being played.
    Running,
    /// The player died; the stage waits for a retry.
    Failed,
    /// Every item was collected.
    Completed,
}

/// Represents the authoritative Maze Chase world state.
#[derive(Debug, Default)]
pub struct World {
    stage: Option<Stage>,
    tick_index: u64,
}

impl World {
    /// Creates an empty world without a stage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureStage { layout, tuning } => {
            if let Err(reason) = tuning.validate() {
                info!("stage rejected: {reason}");
                out_events.push(Event::StageRejected { reason });
                return;
            }
            let stage = Stage::new(layout, tuning);
            let grid = stage.layout.grid();
            info!(
                "stage configured: {}x{} grid, {} enemies, {} items",
                grid.rows(),
                grid.columns(),
                stage.enemies.len(),
                stage.items.len()
            );
            out_events.push(Event::StageConfigured {
                rows: grid.rows(),
                columns: grid.columns(),
                enemies: stage.enemies.len(),
                items: stage.items.len(),
            });
            world.stage = Some(stage);
        }
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });
            if let Some(stage) = world.stage.as_mut() {
                stage.tick(dt, out_events);
            }
        }
        Command::SetPushing { direction, enabled } => {
            if let Some(stage) = world.stage.as_mut() {
                if stage.player.life == Life::Alive {
                    stage.player.motion.set_pushing(direction, enabled);
                }
            }
        }
        Command::FrightenEnemies {
            duration,
            recovery_window,
        } => {
            if let Some(stage) = world.stage.as_mut() {
                if stage.status == StageStatus::Running {
                    stage.frighten(duration, recovery_window, out_events);
                }
            }
        }
        Command::RetryStage => {
            if let Some(stage) = world.stage.as_mut() {
                if stage.status != StageStatus::Completed {
                    stage.retry();
                    info!("stage attempt {} started", stage.attempt + 1);
                    out_events.push(Event::AgentsReset);
                }
            }
        }
        Command::ClearStage => {
            if world.stage.take().is_some() {
                info!("stage unloaded");
                out_events.push(Event::StageUnloaded);
            }
        }
    }
}

#[derive(Debug)]
struct Stage {
    layout: StageLayout,
    tuning: StageTuning,
    cells: Vec<u8>,
    player: Player,
    enemies: Vec<Enemy>,
    items: Vec<Item>,
    status: StageStatus,
    attempt: u32,
}

impl Stage {
    fn new(layout: StageLayout, tuning: StageTuning) -> Self {
        let grid = layout.grid();
        let items = layout
            .items()
            .iter()
            .enumerate()
            .map(|(index, seed)| Item {
                id: ItemId::new(index as u32),
                kind: seed.kind,
                slot: seed.slot,
                center: grid.row_column_to_offset(seed.slot),
                consumed: false,
            })
            .collect();
        let player = Player::spawn(&layout, &tuning);
        let enemies = spawn_enemies(&layout, &tuning, 0);
        Self {
            cells: grid.linear_occupancy(),
            layout,
            tuning,
            player,
            enemies,
            items,
            status: StageStatus::Running,
            attempt: 0,
        }
    }

    fn retry(&mut self) {
        self.attempt = self.attempt.saturating_add(1);
        self.player = Player::spawn(&self.layout, &self.tuning);
        self.enemies = spawn_enemies(&self.layout, &self.tuning, self.attempt);
        self.status = StageStatus::Running;
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.status != StageStatus::Running {
            return;
        }
        self.collect_items(out_events);
        if self.status != StageStatus::Running {
            return;
        }
        self.progress_player(dt, out_events);
        if self.status != StageStatus::Running {
            return;
        }
        self.progress_enemies(dt, out_events);
    }

    fn collect_items(&mut self, out_events: &mut Vec<Event>) {
        if self.player.life == Life::Alive {
            self.consume_reachable_items(out_events);
        }
        if self.items.iter().all(|item| item.consumed) {
            info!("stage completed");
            self.status = StageStatus::Completed;
            out_events.push(Event::StageCompleted);
        }
    }

    fn consume_reachable_items(&mut self, out_events: &mut Vec<Event>) {
        let reach = self.layout.grid().tile_size() * self.tuning.pickup_reach;
        let position = self.player.motion.offset();
        let mut big_pellet = false;

        for item in self.items.iter_mut().filter(|item| !item.consumed) {
            if !within(item.center, position, reach) {
                continue;
            }
            item.consumed = true;
            let reward = match item.kind {
                ItemKind::SmallPellet => self.tuning.small_pellet_reward,
                ItemKind::BigPellet => {
                    big_pellet = true;
                    self.tuning.big_pellet_reward
                }
            };
            debug!("item {:?} consumed at {:?}", item.id, item.slot);
            out_events.push(Event::ItemConsumed {
                item: item.id,
                kind: item.kind,
                reward,
            });
        }

        if big_pellet {
            self.frighten(
                self.tuning.fragile_duration,
                self.tuning.recovery_window,
                out_events,
            );
        }
    }

    fn progress_player(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let player = &mut self.player;
        let _ = advance(
            &mut player.motion,
            &mut player.pilot,
            self.layout.grid(),
            dt.as_secs_f32(),
        );

        if player.life == Life::Dying {
            player.dying_elapsed = player.dying_elapsed.saturating_add(dt);
            if player.dying_elapsed >= self.tuning.player.dying_duration {
                player.life = Life::Dead;
                info!("player died, attempt {} failed", self.attempt + 1);
                self.status = StageStatus::Failed;
                out_events.push(Event::PlayerDied);
                out_events.push(Event::StageFailed);
            }
        }
    }

    fn progress_enemies(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let grid = self.layout.grid();
        let enclosure = self.layout.enclosure();
        let contact = grid.tile_size() * self.tuning.catch_reach;
        let mut transitions = Vec::new();

        for enemy in &mut self.enemies {
            enemy.brain.track_adversary(self.player.motion.offset());
            let report = advance(
                &mut enemy.motion,
                &mut enemy.brain,
                grid,
                dt.as_secs_f32(),
            );
            for _ in 0..report.targets_reached {
                out_events.push(Event::EnemyTargetReached { enemy: enemy.id });
            }

            enemy.brain.progress(dt, &mut transitions);
            publish(enemy.id, &mut transitions, out_events);

            if let Some(request) = enemy.brain.path_request() {
                let path = navigation::plan_path(
                    request,
                    grid,
                    &self.cells,
                    enclosure,
                    enemy.motion.slot(),
                );
                enemy.brain.set_path(path);
            }

            if !enemy.brain.is_alive()
                || self.player.life != Life::Alive
                || !within(enemy.motion.offset(), self.player.motion.offset(), contact)
            {
                continue;
            }
            if enemy.brain.fragility().is_vulnerable() {
                let reward = enemy.brain.tuning().reward;
                debug!("enemy {:?} caught by the player", enemy.id);
                out_events.push(Event::EnemyCaught {
                    enemy: enemy.id,
                    reward,
                });
                enemy.brain.start_dying(&mut enemy.motion, &mut transitions);
                publish(enemy.id, &mut transitions, out_events);
            } else {
                debug!("player caught by enemy {:?}", enemy.id);
                self.player.start_dying();
                out_events.push(Event::PlayerCaught { enemy: enemy.id });
            }
        }
    }

    fn frighten(
        &mut self,
        duration: Duration,
        recovery_window: Duration,
        out_events: &mut Vec<Event>,
    ) {
        let mut transitions = Vec::new();
        for enemy in &mut self.enemies {
            enemy.brain.become_fragile(
                &mut enemy.motion,
                duration,
                recovery_window,
                &mut transitions,
            );
            publish(enemy.id, &mut transitions, out_events);
        }
    }
}

#[derive(Debug)]
struct Player {
    motion: Motion,
    pilot: ManualPilot,
    life: Life,
    dying_elapsed: Duration,
}

impl Player {
    fn spawn(layout: &StageLayout, tuning: &StageTuning) -> Self {
        Self {
            motion: Motion::resting_at(layout.grid(), layout.player_start()),
            pilot: ManualPilot::new(tuning.player.movement_speed),
            life: Life::Alive,
            dying_elapsed: Duration::ZERO,
        }
    }

    fn start_dying(&mut self) {
        self.life = Life::Dying;
        self.dying_elapsed = Duration::ZERO;
        self.motion.cancel_input();
        self.motion.stop();
        self.pilot.set_able(false);
    }
}

#[derive(Debug)]
struct Enemy {
    id: EnemyId,
    motion: Motion,
    brain: EnemyBrain,
}

#[derive(Debug)]
struct Item {
    id: ItemId,
    kind: ItemKind,
    slot: SlotCoord,
    center: Vec2,
    consumed: bool,
}

fn spawn_enemies(layout: &StageLayout, tuning: &StageTuning, attempt: u32) -> Vec<Enemy> {
    let grid = layout.grid();
    let enclosure = layout.enclosure();
    let mut seed = tuning.rng_seed ^ u64::from(attempt);

    tuning
        .enemies
        .iter()
        .take(MAX_ENEMIES)
        .enumerate()
        .map(|(index, enemy_tuning)| {
            seed = next_random(seed);
            let (start, brain) = match index.checked_sub(1) {
                None => (
                    enclosure.entrance(),
                    EnemyBrain::hunting(*enemy_tuning, seed),
                ),
                Some(pen) => (
                    enclosure.pens()[pen],
                    EnemyBrain::caged(*enemy_tuning, seed),
                ),
            };
            Enemy {
                id: EnemyId::new(index as u32),
                motion: Motion::resting_at(grid, start),
                brain,
            }
        })
        .collect()
}

fn next_random(state: u64) -> u64 {
    state
        .wrapping_mul(636_413_622_384_679_3005)
        .wrapping_add(1_442_695_040_888_963_407)
}

fn within(a: Vec2, b: Vec2, reach: Vec2) -> bool {
    let gap = (a - b).abs();
    gap.x <= reach.x && gap.y <= reach.y
}

fn publish(enemy: EnemyId, transitions: &mut Vec<BrainTransition>, out_events: &mut Vec<Event>) {
    out_events.extend(transitions.drain(..).map(|transition| match transition {
        BrainTransition::State { from, to } => Event::EnemyStateChanged { enemy, from, to },
        BrainTransition::Fragility(fragility) => Event::EnemyFragilityChanged { enemy, fragility },
    }));
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use glam::Vec2;
    use maze_chase_core::{
        AiState, Direction, DirectionSet, EnemyId, Fragility, ItemId, ItemKind, Life,
        OccupancyGrid, SlotCoord, StageLayout, Target,
    };
    use maze_chase_system_steering::Pilot;

    use super::{StageStatus, World};

    /// Reports whether a stage is loaded.
    #[must_use]
    pub fn is_configured(world: &World) -> bool {
        world.stage.is_some()
    }

    /// Number of ticks processed since the world was created.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Layout of the loaded stage.
    #[must_use]
    pub fn layout(world: &World) -> Option<&StageLayout> {
        world.stage.as_ref().map(|stage| &stage.layout)
    }

    /// Occupancy grid of the loaded stage.
    #[must_use]
    pub fn grid(world: &World) -> Option<&OccupancyGrid> {
        layout(world).map(StageLayout::grid)
    }

    /// Progress of the current attempt.
    #[must_use]
    pub fn status(world: &World) -> Option<StageStatus> {
        world.stage.as_ref().map(|stage| stage.status)
    }

    /// Zero-based index of the current attempt.
    #[must_use]
    pub fn attempt(world: &World) -> Option<u32> {
        world.stage.as_ref().map(|stage| stage.attempt)
    }

    /// Captures the player's state.
    #[must_use]
    pub fn player(world: &World) -> Option<PlayerSnapshot> {
        world.stage.as_ref().map(|stage| {
            let motion = &stage.player.motion;
            PlayerSnapshot {
                offset: motion.offset(),
                slot: motion.slot(),
                going: motion.going(),
                pushing: motion.pushing(),
                life: stage.player.life,
            }
        })
    }

    /// Captures a read-only view of the enemies in spawn order.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        let snapshots = world
            .stage
            .iter()
            .flat_map(|stage| stage.enemies.iter())
            .map(|enemy| EnemySnapshot {
                id: enemy.id,
                offset: enemy.motion.offset(),
                slot: enemy.motion.slot(),
                going: enemy.motion.going(),
                state: enemy.brain.state(),
                fragility: enemy.brain.fragility(),
                life: enemy.brain.life(),
                target: enemy.brain.target(),
            })
            .collect();
        EnemyView { snapshots }
    }

    /// Lists the items that were not collected yet.
    #[must_use]
    pub fn items(world: &World) -> Vec<ItemSnapshot> {
        world
            .stage
            .iter()
            .flat_map(|stage| stage.items.iter())
            .filter(|item| !item.consumed)
            .map(|item| ItemSnapshot {
                id: item.id,
                kind: item.kind,
                slot: item.slot,
                center: item.center,
            })
            .collect()
    }

    /// Immutable representation of the player.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct PlayerSnapshot {
        /// Current world offset.
        pub offset: Vec2,
        /// Slot containing the offset.
        pub slot: SlotCoord,
        /// Direction travelled, if moving.
        pub going: Option<Direction>,
        /// Directions currently held.
        pub pushing: DirectionSet,
        /// Life stage of the player.
        pub life: Life,
    }

    /// Read-only snapshot describing every enemy.
    #[derive(Clone, Debug, Default)]
    pub struct EnemyView {
        snapshots: Vec<EnemySnapshot>,
    }

    impl EnemyView {
        /// Iterator over the captured snapshots in spawn order.
        pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
            self.snapshots.iter()
        }

        /// Snapshot of a specific enemy.
        #[must_use]
        pub fn get(&self, id: EnemyId) -> Option<&EnemySnapshot> {
            self.snapshots.iter().find(|snapshot| snapshot.id == id)
        }

        /// Consumes the view, yielding the underlying snapshots.
        pub fn into_vec(self) -> Vec<EnemySnapshot> {
            self.snapshots
        }
    }

    /// Immutable representation of a single enemy.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct EnemySnapshot {
        /// Identifier of the enemy.
        pub id: EnemyId,
        /// Current world offset.
        pub offset: Vec2,
        /// Slot containing the offset.
        pub slot: SlotCoord,
        /// Direction travelled, if moving.
        pub going: Option<Direction>,
        /// Behaviour state.
        pub state: AiState,
        /// Vulnerability to the player.
        pub fragility: Fragility,
        /// Life stage.
        pub life: Life,
        /// Path element currently steered toward.
        pub target: Option<Target>,
    }

    /// Immutable representation of an uncollected item.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct ItemSnapshot {
        /// Identifier of the item.
        pub id: ItemId,
        /// Kind of the item.
        pub kind: ItemKind,
        /// Slot holding the item.
        pub slot: SlotCoord,
        /// World offset of the item.
        pub center: Vec2,
    }
}
