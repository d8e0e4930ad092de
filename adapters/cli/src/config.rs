//! TOML session configuration.
//!
//! Every field is optional; anything left out keeps the engine defaults.
//! Durations are written in seconds.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use maze_chase_core::{EnemyTuning, StageTuning};
use serde::Deserialize;

/// Parameters read from a session file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SessionConfig {
    pub(crate) tile_width: Option<f32>,
    pub(crate) tile_height: Option<f32>,
    pub(crate) seed: Option<u64>,
    pub(crate) fragile_seconds: Option<f32>,
    pub(crate) recovery_seconds: Option<f32>,
    pub(crate) small_pellet_reward: Option<u32>,
    pub(crate) big_pellet_reward: Option<u32>,
    pub(crate) pickup_reach: Option<f32>,
    pub(crate) catch_reach: Option<f32>,
    pub(crate) player: PlayerSection,
    pub(crate) enemies: Option<Vec<EnemySection>>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PlayerSection {
    pub(crate) movement_speed: Option<f32>,
    pub(crate) dying_seconds: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct EnemySection {
    pub(crate) movement_speed: Option<f32>,
    pub(crate) fragile_speed: Option<f32>,
    pub(crate) caged_seconds: Option<f32>,
    pub(crate) aggressiveness: Option<u8>,
    pub(crate) reward: Option<u32>,
}

impl SessionConfig {
    /// Reads and parses the session file at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read session config at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse session config at {}", path.display()))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid session config toml")
    }

    /// Width and height of a maze tile in world units.
    pub(crate) fn tile_size(&self) -> (f32, f32) {
        (
            self.tile_width.unwrap_or(1.0),
            self.tile_height.unwrap_or(1.0),
        )
    }

    /// Stage tuning with every configured value applied over the defaults.
    pub(crate) fn tuning(&self) -> Result<StageTuning> {
        let mut tuning = StageTuning::default();

        if let Some(speed) = self.player.movement_speed {
            tuning.player.movement_speed = speed;
        }
        if let Some(seconds) = self.player.dying_seconds {
            tuning.player.dying_duration = seconds_to_duration("player.dying_seconds", seconds)?;
        }
        if let Some(sections) = &self.enemies {
            let defaults = tuning.enemies.clone();
            tuning.enemies = sections
                .iter()
                .enumerate()
                .map(|(index, section)| {
                    let base = defaults.get(index).copied().unwrap_or_default();
                    section.apply(base)
                })
                .collect::<Result<_>>()?;
        }
        if let Some(seconds) = self.fragile_seconds {
            tuning.fragile_duration = seconds_to_duration("fragile_seconds", seconds)?;
        }
        if let Some(seconds) = self.recovery_seconds {
            tuning.recovery_window = seconds_to_duration("recovery_seconds", seconds)?;
        }
        if let Some(reward) = self.small_pellet_reward {
            tuning.small_pellet_reward = reward;
        }
        if let Some(reward) = self.big_pellet_reward {
            tuning.big_pellet_reward = reward;
        }
        if let Some(reach) = self.pickup_reach {
            tuning.pickup_reach = reach;
        }
        if let Some(reach) = self.catch_reach {
            tuning.catch_reach = reach;
        }
        if let Some(seed) = self.seed {
            tuning.rng_seed = seed;
        }

        Ok(tuning)
    }
}

impl EnemySection {
    fn apply(&self, mut tuning: EnemyTuning) -> Result<EnemyTuning> {
        if let Some(speed) = self.movement_speed {
            tuning.movement_speed = speed;
        }
        if let Some(speed) = self.fragile_speed {
            tuning.fragile_speed = speed;
        }
        if let Some(seconds) = self.caged_seconds {
            tuning.caged_duration = seconds_to_duration("enemies.caged_seconds", seconds)?;
        }
        if let Some(aggressiveness) = self.aggressiveness {
            tuning.aggressiveness = aggressiveness;
        }
        if let Some(reward) = self.reward {
            tuning.reward = reward;
        }
        Ok(tuning)
    }
}

fn seconds_to_duration(field: &str, seconds: f32) -> Result<Duration> {
    Duration::try_from_secs_f32(seconds)
        .with_context(|| format!("`{field}` must be a non-negative number of seconds"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_keeps_defaults() {
        let config = SessionConfig::parse("").expect("empty config parses");
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.tuning().expect("valid"), StageTuning::default());
        assert_eq!(config.tile_size(), (1.0, 1.0));
    }

    #[test]
    fn configured_values_override_defaults() {
        let config = SessionConfig::parse(
            r#"
            seed = 7
            fragile_seconds = 4.5
            recovery_seconds = 1.5
            tile_width = 2.0

            [player]
            dying_seconds = 0.75

            [[enemies]]
            aggressiveness = 90

            [[enemies]]
            caged_seconds = 1.0
            reward = 400
            "#,
        )
        .expect("config parses");
        let tuning = config.tuning().expect("valid");

        assert_eq!(tuning.rng_seed, 7);
        assert_eq!(tuning.fragile_duration, Duration::from_millis(4500));
        assert_eq!(tuning.recovery_window, Duration::from_millis(1500));
        assert_eq!(tuning.player.dying_duration, Duration::from_millis(750));
        assert_eq!(tuning.enemies.len(), 2);
        assert_eq!(tuning.enemies[0].aggressiveness, 90);
        assert_eq!(tuning.enemies[0].caged_duration, Duration::ZERO);
        assert_eq!(tuning.enemies[1].caged_duration, Duration::from_secs(1));
        assert_eq!(tuning.enemies[1].reward, 400);
        assert_eq!(config.tile_size(), (2.0, 1.0));
    }

    #[test]
    fn negative_durations_are_rejected() {
        let config = SessionConfig::parse("fragile_seconds = -1.0").expect("config parses");
        assert!(config.tuning().is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(SessionConfig::parse("lives = 3").is_err());
    }
}
