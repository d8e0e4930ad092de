#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Maze Chase session.
//!
//! The driver loads a maze blueprint and an optional session file, then plays
//! the stage with seeded random input, retrying failed attempts while lives
//! remain. Every notable event is printed as it happens, followed by a
//! summary of the final state.

mod blueprint;
mod config;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec2;
use log::{info, warn};
use maze_chase_core::{Command, Direction, Event};
use maze_chase_world::{self as world, query, StageStatus, World};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::config::SessionConfig;

/// Maze played when no blueprint is provided.
pub(crate) const CLASSIC_MAZE: &str = include_str!("../mazes/classic.txt");

#[derive(Debug, Parser)]
#[command(name = "maze-chase", about = "Plays a headless Maze Chase session")]
struct Args {
    /// Maze blueprint to load; the bundled classic maze when omitted.
    #[arg(long)]
    blueprint: Option<PathBuf>,
    /// TOML session file overriding speeds, timers and rewards.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 3600)]
    ticks: u32,
    /// Simulated milliseconds per tick.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,
    /// Seed for the enemies and the autoplay input.
    #[arg(long)]
    seed: Option<u64>,
    /// Ticks between autoplay direction changes.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..))]
    input_interval: u32,
    /// Retries granted after the first failed attempt.
    #[arg(long, default_value_t = 2)]
    lives: u32,
    /// Writes a TOML summary of the session to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

/// Entry point for the Maze Chase command-line interface.
fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    let mut tuning = config.tuning()?;
    if let Some(seed) = args.seed {
        tuning.rng_seed = seed;
    }
    let seed = tuning.rng_seed;

    let text = match &args.blueprint {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read blueprint at {}", path.display()))?,
        None => CLASSIC_MAZE.to_owned(),
    };
    let (tile_width, tile_height) = config.tile_size();
    let layout = blueprint::parse(&text, tile_width, tile_height)
        .context("failed to load the maze blueprint")?;

    let mut world = World::new();
    let mut session = Session::new(args.lives);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::ConfigureStage { layout, tuning },
        &mut events,
    );
    session.record(0, &events);
    if !query::is_configured(&world) {
        anyhow::bail!("the stage rejected the session configuration");
    }

    let mut autoplay = Autoplay::new(seed);
    let dt = Duration::from_millis(args.frame_ms);
    for tick in 0..args.ticks {
        events.clear();
        if tick % args.input_interval == 0 {
            autoplay.steer(&mut world, &mut events);
        }
        world::apply(&mut world, Command::Tick { dt }, &mut events);
        session.record(tick, &events);

        match query::status(&world) {
            Some(StageStatus::Failed) if session.lives > 0 => {
                session.lives -= 1;
                events.clear();
                world::apply(&mut world, Command::RetryStage, &mut events);
                session.record(tick, &events);
                autoplay.release();
            }
            Some(StageStatus::Running) => {}
            _ => break,
        }
    }

    let report = session.report(&world, seed);
    print_summary(&report);
    if let Some(path) = &args.report {
        let contents = toml::to_string_pretty(&report).context("failed to encode the report")?;
        fs::write(path, contents)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        info!("report written to {}", path.display());
    }
    Ok(())
}

/// Random player input, steering toward a new direction at a fixed cadence.
struct Autoplay {
    rng: ChaCha8Rng,
    held: Option<Direction>,
}

impl Autoplay {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed.rotate_left(17)),
            held: None,
        }
    }

    fn steer(&mut self, world: &mut World, out_events: &mut Vec<Event>) {
        let Some(direction) = Direction::ALL.choose(&mut self.rng).copied() else {
            return;
        };
        if let Some(previous) = self.held.replace(direction) {
            world::apply(
                world,
                Command::SetPushing {
                    direction: previous,
                    enabled: false,
                },
                out_events,
            );
        }
        world::apply(
            world,
            Command::SetPushing {
                direction,
                enabled: true,
            },
            out_events,
        );
    }

    fn release(&mut self) {
        self.held = None;
    }
}

struct Session {
    lives: u32,
    score: u32,
    attempts: u32,
    items_consumed: u32,
    enemies_caught: u32,
    completed: bool,
}

impl Session {
    fn new(lives: u32) -> Self {
        Self {
            lives,
            score: 0,
            attempts: 1,
            items_consumed: 0,
            enemies_caught: 0,
            completed: false,
        }
    }

    fn record(&mut self, tick: u32, events: &[Event]) {
        for event in events {
            match event {
                Event::TimeAdvanced { .. } | Event::EnemyTargetReached { .. } => continue,
                Event::ItemConsumed { reward, .. } => {
                    self.items_consumed += 1;
                    self.score = self.score.saturating_add(*reward);
                }
                Event::EnemyCaught { reward, .. } => {
                    self.enemies_caught += 1;
                    self.score = self.score.saturating_add(*reward);
                }
                Event::AgentsReset => self.attempts += 1,
                Event::StageCompleted => self.completed = true,
                Event::StageRejected { reason } => warn!("stage rejected: {reason}"),
                _ => {}
            }
            println!("{tick:>6}  {event:?}");
        }
    }

    fn report(&self, world: &World, seed: u64) -> SessionReport {
        let outcome = match query::status(world) {
            Some(StageStatus::Completed) => "completed",
            Some(StageStatus::Failed) => "failed",
            Some(StageStatus::Running) => "running",
            None => "unloaded",
        };
        SessionReport {
            seed,
            outcome: outcome.to_owned(),
            completed: self.completed,
            score: self.score,
            attempts: self.attempts,
            items_consumed: self.items_consumed,
            items_left: query::items(world).len(),
            enemies_caught: self.enemies_caught,
            ticks: query::tick_index(world),
            player: query::player(world).map(|player| AgentReport {
                name: "player".to_owned(),
                offset: point(player.offset),
                state: format!("{:?}", player.life),
            }),
            enemies: query::enemy_view(world)
                .iter()
                .map(|enemy| AgentReport {
                    name: format!("enemy {}", enemy.id.get()),
                    offset: point(enemy.offset),
                    state: format!("{:?} / {:?}", enemy.state, enemy.fragility),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SessionReport {
    seed: u64,
    outcome: String,
    completed: bool,
    score: u32,
    attempts: u32,
    items_consumed: u32,
    items_left: usize,
    enemies_caught: u32,
    ticks: u64,
    player: Option<AgentReport>,
    enemies: Vec<AgentReport>,
}

#[derive(Debug, Serialize)]
struct AgentReport {
    name: String,
    offset: [f32; 2],
    state: String,
}

fn point(offset: Vec2) -> [f32; 2] {
    offset.to_array()
}

fn print_summary(report: &SessionReport) {
    println!();
    println!(
        "outcome: {} after {} ticks (seed {:#x})",
        report.outcome, report.ticks, report.seed
    );
    println!(
        "score: {} ({} items, {} enemies caught, {} items left)",
        report.score, report.items_consumed, report.enemies_caught, report.items_left
    );
    println!("attempts: {}", report.attempts);
    for agent in report.player.iter().chain(&report.enemies) {
        println!(
            "  {:<8} at ({:>6.2}, {:>6.2})  {}",
            agent.name, agent.offset[0], agent.offset[1], agent.state
        );
    }
}
