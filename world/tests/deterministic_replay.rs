use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use glam::Vec2;
use maze_chase_core::{
    AiState, Command, Direction, Enclosure, EnemyId, EnemyTuning, Event, Fragility, ItemId,
    ItemKind, ItemSeed, OccupancyGrid, PlayerTuning, SlotCoord, StageLayout, StageTuning,
};
use maze_chase_world::{self as world, query, World};

const TICKS: usize = 480;

#[test]
fn deterministic_replay_of_a_scripted_session() {
    let script = scripted_commands();
    let script_len = script.len();
    let first = replay(script.clone());
    let second = replay(script);

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.snapshots.len(), script_len);

    let released = first
        .events
        .iter()
        .filter(|event| {
            matches!(
                event,
                EventRecord::EnemyStateChanged {
                    to: AiState::Free,
                    ..
                }
            )
        })
        .count();
    assert!(released > 0, "no enemy left the enclosure");
    assert!(first
        .events
        .iter()
        .any(|event| matches!(event, EventRecord::ItemConsumed { .. })));
}

#[test]
fn different_seeds_diverge() {
    let script = scripted_commands();
    let reseeded: Vec<_> = script
        .iter()
        .cloned()
        .map(|command| match command {
            Command::ConfigureStage { layout, mut tuning } => {
                tuning.rng_seed ^= 0xdead_beef;
                Command::ConfigureStage { layout, tuning }
            }
            other => other,
        })
        .collect();

    let first = replay(script);
    let second = replay(reseeded);
    assert_ne!(first.snapshots, second.snapshots, "seed had no effect");
}

fn replay(commands: Vec<Command>) -> ReplayOutcome {
    let mut world = World::new();
    let mut events = Vec::new();
    let mut snapshots = Vec::new();

    for command in commands {
        let mut generated = Vec::new();
        world::apply(&mut world, command, &mut generated);
        events.extend(generated.iter().map(EventRecord::from));

        snapshots.push(
            query::enemy_view(&world)
                .iter()
                .map(|enemy| EnemyRecord {
                    enemy: enemy.id,
                    offset: bits(enemy.offset),
                    state: enemy.state,
                    fragility: enemy.fragility,
                })
                .collect(),
        );
    }

    ReplayOutcome { events, snapshots }
}

fn scripted_commands() -> Vec<Command> {
    let grid = OccupancyGrid::from_pattern(
        &[
            "###########",
            "#.........#",
            "#.#######.#",
            "#.#.....#.#",
            "#.#.....#.#",
            "#.#######.#",
            "#.........#",
            "###########",
        ],
        1.0,
        1.0,
    )
    .expect("valid pattern");
    let enclosure = Enclosure::below_entrance(&grid, SlotCoord::new(1, 5));
    let mut items: Vec<_> = (1..10)
        .map(|column| ItemSeed {
            kind: ItemKind::SmallPellet,
            slot: SlotCoord::new(6, column),
        })
        .collect();
    items.push(ItemSeed {
        kind: ItemKind::BigPellet,
        slot: SlotCoord::new(3, 1),
    });
    let layout = StageLayout::new(grid, Vec2::new(5.5, -6.5), enclosure, items)
        .expect("valid layout");
    let tuning = StageTuning {
        player: PlayerTuning {
            dying_duration: Duration::from_millis(300),
            ..Default::default()
        },
        enemies: vec![
            EnemyTuning::new(Duration::ZERO, 80),
            EnemyTuning::new(Duration::ZERO, 60),
            EnemyTuning::new(Duration::from_secs(3), 40),
        ],
        ..StageTuning::default()
    };

    let turns = [
        Direction::Left,
        Direction::Up,
        Direction::Right,
        Direction::Down,
    ];
    let mut commands = vec![Command::ConfigureStage { layout, tuning }];
    let mut held = None;
    for tick in 0..TICKS {
        if tick % 60 == 0 {
            let direction = turns[(tick / 60) % turns.len()];
            if let Some(previous) = held.replace(direction) {
                commands.push(Command::SetPushing {
                    direction: previous,
                    enabled: false,
                });
            }
            commands.push(Command::SetPushing {
                direction,
                enabled: true,
            });
        }
        if tick == 240 {
            commands.push(Command::RetryStage);
        }
        commands.push(Command::Tick {
            dt: Duration::from_millis(16),
        });
    }
    commands
}

fn bits(offset: Vec2) -> (u32, u32) {
    (offset.x.to_bits(), offset.y.to_bits())
}

#[derive(Debug, PartialEq, Eq)]
struct ReplayOutcome {
    events: Vec<EventRecord>,
    snapshots: Vec<Vec<EnemyRecord>>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.events.hash(&mut hasher);
        self.snapshots.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct EnemyRecord {
    enemy: EnemyId,
    offset: (u32, u32),
    state: AiState,
    fragility: Fragility,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum EventRecord {
    TimeAdvanced {
        dt_micros: u128,
    },
    StageConfigured {
        enemies: usize,
        items: usize,
    },
    ItemConsumed {
        item: ItemId,
        reward: u32,
    },
    EnemyCaught {
        enemy: EnemyId,
        reward: u32,
    },
    PlayerCaught {
        enemy: EnemyId,
    },
    EnemyStateChanged {
        enemy: EnemyId,
        from: AiState,
        to: AiState,
    },
    EnemyFragilityChanged {
        enemy: EnemyId,
        fragility: Fragility,
    },
    EnemyTargetReached {
        enemy: EnemyId,
    },
    Other(String),
}

impl From<&Event> for EventRecord {
    fn from(event: &Event) -> Self {
        match event {
            Event::TimeAdvanced { dt } => Self::TimeAdvanced {
                dt_micros: dt.as_micros(),
            },
            Event::StageConfigured { enemies, items, .. } => Self::StageConfigured {
                enemies: *enemies,
                items: *items,
            },
            Event::ItemConsumed { item, reward, .. } => Self::ItemConsumed {
                item: *item,
                reward: *reward,
            },
            Event::EnemyCaught { enemy, reward } => Self::EnemyCaught {
                enemy: *enemy,
                reward: *reward,
            },
            Event::PlayerCaught { enemy } => Self::PlayerCaught { enemy: *enemy },
            Event::EnemyStateChanged { enemy, from, to } => Self::EnemyStateChanged {
                enemy: *enemy,
                from: *from,
                to: *to,
            },
            Event::EnemyFragilityChanged { enemy, fragility } => Self::EnemyFragilityChanged {
                enemy: *enemy,
                fragility: *fragility,
            },
            Event::EnemyTargetReached { enemy } => Self::EnemyTargetReached { enemy: *enemy },
            other => Self::Other(format!("{other:?}")),
        }
    }
}
