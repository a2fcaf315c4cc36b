//! Tunables for spawning and the built-in animal roster.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ecs::components::{AnimationClip, DeathProfile};
use crate::error::ConfigError;
use crate::prefab::{
    AttackInProximityConfig, AttackOnHitConfig, FleeOnHitConfig, GrowthConfig, Prefab,
    PrefabId, PrefabLibrary,
};

/// Population placement parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnConfig {
    pub min_group_size: usize,
    pub max_group_size: usize,
    /// Footholds a chunk needs per member of the smallest group.
    pub min_footholds_per_member: usize,
    /// Chance in [0, 100] that a freshly generated chunk gets a group.
    pub spawn_chance_percent: u32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            min_group_size: 4,
            max_group_size: 10,
            min_footholds_per_member: 5,
            spawn_chance_percent: 10,
        }
    }
}

impl SpawnConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_group_size == 0 {
            return Err(ConfigError::InvalidSpawn(
                "min_group_size must be at least 1".to_string(),
            ));
        }
        if self.min_group_size > self.max_group_size {
            return Err(ConfigError::InvalidSpawn(format!(
                "min_group_size {} exceeds max_group_size {}",
                self.min_group_size, self.max_group_size
            )));
        }
        if self.spawn_chance_percent > 100 {
            return Err(ConfigError::InvalidSpawn(format!(
                "spawn_chance_percent {} is above 100",
                self.spawn_chance_percent
            )));
        }
        Ok(())
    }
}

/// Full configuration: placement, which species flock-spawn, and archetypes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WildlifeConfig {
    #[serde(default)]
    pub spawn: SpawnConfig,
    /// Species the placement engine picks from.
    pub species: Vec<PrefabId>,
    pub prefabs: Vec<Prefab>,
}

impl WildlifeConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.spawn.validate()?;
        let library = self.library();
        for prefab in &self.prefabs {
            prefab.validate()?;
            if let Some(growth) = &prefab.growth {
                if !library.contains(&growth.next_stage) {
                    return Err(ConfigError::UnknownPrefab(growth.next_stage.clone()));
                }
            }
        }
        for species in &self.species {
            if !library.contains(species) {
                return Err(ConfigError::UnknownPrefab(species.clone()));
            }
        }
        Ok(())
    }

    pub fn library(&self) -> PrefabLibrary {
        let mut library = PrefabLibrary::new();
        for prefab in &self.prefabs {
            library.insert(prefab.clone());
        }
        library
    }
}

fn clip(name: &str, time_per_frame: f32, frame_count: u32) -> AnimationClip {
    AnimationClip {
        name: name.to_string(),
        time_per_frame,
        frame_count,
    }
}

impl Default for WildlifeConfig {
    /// Deer and sheep flocks, a fawn that grows into a deer, a boar that
    /// fights back and a wolf that attacks on sight.
    fn default() -> Self {
        let death = DeathProfile {
            clips: vec![clip("die", 0.1, 21), clip("lie", 0.2, 6)],
            drops: vec!["WildAnimals:Meat".to_string()],
        };
        let idle = vec![clip("idle", 0.3, 8), clip("graze", 0.25, 12)];

        let mut deer = Prefab::new("WildAnimals:Deer", "Deer");
        deer.icon = Some("WildAnimals:icons#Deer".to_string());
        deer.base_speed = 5.0;
        deer.flee_on_hit = Some(FleeOnHitConfig {
            speed_multiplier: 1.6,
            min_distance: 12.0,
            timeout_ms: Some(15_000),
        });
        deer.death = Some(death.clone());
        deer.animations = Some(idle.clone());
        deer.health = Some(20);

        let mut fawn = Prefab::new("WildAnimals:Fawn", "Fawn");
        fawn.base_speed = 3.5;
        fawn.flee_on_hit = Some(FleeOnHitConfig {
            speed_multiplier: 1.4,
            min_distance: 8.0,
            timeout_ms: Some(10_000),
        });
        fawn.growth = Some(GrowthConfig {
            min_duration_ms: 300_000,
            max_duration_ms: 600_000,
            next_stage: PrefabId::new("WildAnimals:Deer"),
        });
        fawn.death = Some(death.clone());
        fawn.animations = Some(idle.clone());
        fawn.health = Some(10);

        let mut sheep = Prefab::new("WildAnimals:Sheep", "Sheep");
        sheep.base_speed = 3.0;
        sheep.search_radius = Some(8.0);
        sheep.lurable = true;
        sheep.flee_on_hit = Some(FleeOnHitConfig {
            speed_multiplier: 1.3,
            min_distance: 8.0,
            timeout_ms: Some(8_000),
        });
        sheep.death = Some(DeathProfile {
            clips: death.clips.clone(),
            drops: vec![
                "WildAnimals:Meat".to_string(),
                "WildAnimals:Wool".to_string(),
            ],
        });
        sheep.animations = Some(idle.clone());
        sheep.health = Some(15);

        let mut boar = Prefab::new("WildAnimals:Boar", "Boar");
        boar.base_speed = 4.0;
        boar.attack_on_hit = Some(AttackOnHitConfig {
            speed_multiplier: 1.2,
            max_distance: 10.0,
            timeout_ms: None,
        });
        boar.death = Some(death.clone());
        boar.animations = Some(idle.clone());
        boar.health = Some(30);

        let mut wolf = Prefab::new("WildAnimals:Wolf", "Wolf");
        wolf.base_speed = 6.0;
        wolf.search_radius = Some(14.0);
        wolf.attack_in_proximity = Some(AttackInProximityConfig {
            speed_multiplier: 1.5,
            max_distance: 14.0,
        });
        wolf.attack_on_hit = Some(AttackOnHitConfig {
            speed_multiplier: 1.5,
            max_distance: 20.0,
            timeout_ms: Some(20_000),
        });
        wolf.death = Some(death);
        wolf.animations = Some(idle);
        wolf.health = Some(25);

        Self {
            spawn: SpawnConfig::default(),
            species: vec![
                PrefabId::new("WildAnimals:Deer"),
                PrefabId::new("WildAnimals:Sheep"),
            ],
            prefabs: vec![deer, fawn, sheep, boar, wolf],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_config_is_valid() {
        WildlifeConfig::default().validate().unwrap();
    }

    #[test]
    fn json_round_trip_keeps_roster() {
        let json = serde_json::to_string(&WildlifeConfig::default()).unwrap();
        let parsed = WildlifeConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed.prefabs.len(), 5);
        assert_eq!(parsed.spawn, SpawnConfig::default());
    }

    #[test]
    fn minimal_json_uses_defaults() {
        let json = r#"{
            "species": ["Test:Hare"],
            "prefabs": [{ "id": "Test:Hare", "name": "Hare" }]
        }"#;
        let config = WildlifeConfig::from_json_str(json).unwrap();
        assert_eq!(config.spawn.spawn_chance_percent, 10);
        assert_eq!(config.prefabs[0].default_speed_multiplier, 0.3);
    }

    #[test]
    fn unknown_species_rejected() {
        let json = r#"{ "species": ["Test:Ghost"], "prefabs": [] }"#;
        assert!(matches!(
            WildlifeConfig::from_json_str(json),
            Err(ConfigError::UnknownPrefab(_))
        ));
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(matches!(
            WildlifeConfig::from_json_str("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[rstest]
    #[case(0, 5, 50)]
    #[case(6, 5, 50)]
    #[case(2, 5, 101)]
    fn bad_spawn_ranges_rejected(#[case] min: usize, #[case] max: usize, #[case] chance: u32) {
        let config = SpawnConfig {
            min_group_size: min,
            max_group_size: max,
            min_footholds_per_member: 1,
            spawn_chance_percent: chance,
        };
        assert!(config.validate().is_err());
    }
}
