//! Animal archetypes and actor creation.

use std::collections::HashMap;
use std::fmt;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::ecs::components::{
    AnimationClip, AttackInProximity, AttackOnHit, Behavior, DeathProfile, FleeOnHit, Growth,
    Health, Locomotion, Lurable, Position, ProximityWatch, Rotation, SkeletalAnimation,
    SpeedProfile, Velocity, WildAnimal,
};
use crate::error::{ConfigError, SpawnError};

/// Name of an actor archetype, e.g. `WildAnimals:Deer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefabId(pub String);

impl PrefabId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrefabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleeOnHitConfig {
    pub speed_multiplier: f32,
    pub min_distance: f32,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackOnHitConfig {
    pub speed_multiplier: f32,
    pub max_distance: f32,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackInProximityConfig {
    pub speed_multiplier: f32,
    pub max_distance: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthConfig {
    pub min_duration_ms: u64,
    pub max_duration_ms: u64,
    pub next_stage: PrefabId,
}

fn default_base_speed() -> f32 {
    4.0
}

fn default_speed_multiplier() -> f32 {
    0.3
}

/// Everything needed to create one kind of animal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prefab {
    pub id: PrefabId,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "default_base_speed")]
    pub base_speed: f32,
    #[serde(default = "default_speed_multiplier")]
    pub default_speed_multiplier: f32,
    /// Proximity watch radius. Required by proximity aggression and luring.
    #[serde(default)]
    pub search_radius: Option<f32>,
    #[serde(default)]
    pub flee_on_hit: Option<FleeOnHitConfig>,
    #[serde(default)]
    pub attack_on_hit: Option<AttackOnHitConfig>,
    #[serde(default)]
    pub attack_in_proximity: Option<AttackInProximityConfig>,
    #[serde(default)]
    pub lurable: bool,
    #[serde(default)]
    pub growth: Option<GrowthConfig>,
    #[serde(default)]
    pub death: Option<DeathProfile>,
    /// Idle animation pool. Present only for actors with a skeletal mesh.
    #[serde(default)]
    pub animations: Option<Vec<AnimationClip>>,
    #[serde(default)]
    pub health: Option<i32>,
}

impl Prefab {
    /// Bare archetype: strays at the default multiplier and nothing else.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: PrefabId::new(id),
            name: name.into(),
            icon: None,
            base_speed: default_base_speed(),
            default_speed_multiplier: default_speed_multiplier(),
            search_radius: None,
            flee_on_hit: None,
            attack_on_hit: None,
            attack_in_proximity: None,
            lurable: false,
            growth: None,
            death: None,
            animations: None,
            health: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidPrefab {
            prefab: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.flee_on_hit.is_some() && self.attack_on_hit.is_some() {
            return Err(invalid("flee_on_hit and attack_on_hit are mutually exclusive"));
        }
        if self.base_speed < 0.0 || self.default_speed_multiplier < 0.0 {
            return Err(invalid("speeds must not be negative"));
        }
        if let Some(radius) = self.search_radius {
            if radius < 0.0 {
                return Err(invalid("search_radius must not be negative"));
            }
        } else if self.attack_in_proximity.is_some() || self.lurable {
            return Err(invalid("proximity aggression and luring need a search_radius"));
        }
        if let Some(flee) = &self.flee_on_hit {
            if flee.speed_multiplier < 0.0 || flee.min_distance < 0.0 {
                return Err(invalid("flee_on_hit values must not be negative"));
            }
        }
        if let Some(attack) = &self.attack_on_hit {
            if attack.speed_multiplier < 0.0 || attack.max_distance < 0.0 {
                return Err(invalid("attack_on_hit values must not be negative"));
            }
        }
        if let Some(attack) = &self.attack_in_proximity {
            if attack.speed_multiplier < 0.0 || attack.max_distance < 0.0 {
                return Err(invalid("attack_in_proximity values must not be negative"));
            }
            if self.search_radius.is_some_and(|radius| radius > attack.max_distance) {
                return Err(invalid("search_radius exceeds attack_in_proximity max_distance"));
            }
        }
        if let Some(growth) = &self.growth {
            if growth.min_duration_ms > growth.max_duration_ms {
                return Err(invalid("growth min_duration_ms exceeds max_duration_ms"));
            }
        }
        if let Some(death) = &self.death {
            if death.clips.iter().any(|clip| clip.time_per_frame < 0.0) {
                return Err(invalid("death clips need a non-negative time_per_frame"));
            }
        }
        Ok(())
    }
}

/// Actor creation capability.
pub trait ActorSpawner {
    fn spawn(
        &mut self,
        prefab: &PrefabId,
        position: Vec3,
        rotation: Quat,
    ) -> Result<hecs::Entity, SpawnError>;
}

/// Registered archetypes by id.
#[derive(Debug, Clone, Default)]
pub struct PrefabLibrary {
    prefabs: HashMap<PrefabId, Prefab>,
}

impl PrefabLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a prefab, replacing any previous one with the same id.
    pub fn insert(&mut self, prefab: Prefab) {
        self.prefabs.insert(prefab.id.clone(), prefab);
    }

    pub fn get(&self, id: &PrefabId) -> Option<&Prefab> {
        self.prefabs.get(id)
    }

    pub fn contains(&self, id: &PrefabId) -> bool {
        self.prefabs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.prefabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefabs.is_empty()
    }

    /// Create an actor with every facet the prefab describes.
    pub fn spawn_into(
        &self,
        world: &mut hecs::World,
        id: &PrefabId,
        position: Vec3,
        rotation: Quat,
    ) -> Result<hecs::Entity, SpawnError> {
        let prefab = self
            .get(id)
            .ok_or_else(|| SpawnError::UnknownPrefab(id.clone()))?;

        let mut builder = hecs::EntityBuilder::new();
        builder
            .add(Position(position))
            .add(Rotation(rotation))
            .add(Velocity(Vec3::ZERO))
            .add(Locomotion {
                base_speed: prefab.base_speed,
                wander_timer: 0.0,
            })
            .add(WildAnimal {
                name: prefab.name.clone(),
                icon: prefab.icon.clone(),
                prefab: prefab.id.clone(),
            })
            .add(SpeedProfile::resting(prefab.default_speed_multiplier))
            .add(Behavior::default());

        if let Some(radius) = prefab.search_radius {
            builder.add(ProximityWatch::new(radius));
        }
        if let Some(flee) = &prefab.flee_on_hit {
            builder.add(FleeOnHit {
                instigator: None,
                time_of_hit_ms: 0,
                speed_multiplier: flee.speed_multiplier,
                min_distance: flee.min_distance,
                timeout_ms: flee.timeout_ms,
            });
        } else if let Some(attack) = &prefab.attack_on_hit {
            builder.add(AttackOnHit {
                instigator: None,
                time_of_hit_ms: 0,
                speed_multiplier: attack.speed_multiplier,
                max_distance: attack.max_distance,
                timeout_ms: attack.timeout_ms,
            });
        }
        if let Some(attack) = &prefab.attack_in_proximity {
            builder.add(AttackInProximity {
                speed_multiplier: attack.speed_multiplier,
                max_distance: attack.max_distance,
                nearest_threat: None,
            });
        }
        if prefab.lurable {
            builder.add(Lurable::default());
        }
        if let Some(growth) = &prefab.growth {
            builder.add(Growth {
                min_duration_ms: growth.min_duration_ms,
                max_duration_ms: growth.max_duration_ms,
                next_stage: growth.next_stage.clone(),
            });
        }
        if let Some(death) = &prefab.death {
            builder.add(death.clone());
        }
        if let Some(clips) = &prefab.animations {
            builder.add(SkeletalAnimation {
                queue: clips.clone(),
                current: clips.first().cloned(),
                looping: true,
            });
        }
        if let Some(max) = prefab.health {
            builder.add(Health::full(max));
        }

        let entity = world.spawn(builder.build());
        log::debug!("Spawned {} ({:?}) at {:?}", prefab.id, entity, position);
        Ok(entity)
    }
}

/// Spawns straight into a world from a prefab library.
pub struct WorldSpawner<'a> {
    pub world: &'a mut hecs::World,
    pub prefabs: &'a PrefabLibrary,
}

impl ActorSpawner for WorldSpawner<'_> {
    fn spawn(
        &mut self,
        prefab: &PrefabId,
        position: Vec3,
        rotation: Quat,
    ) -> Result<hecs::Entity, SpawnError> {
        self.prefabs.spawn_into(self.world, prefab, position, rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deer() -> Prefab {
        let mut prefab = Prefab::new("WildAnimals:Deer", "Deer");
        prefab.flee_on_hit = Some(FleeOnHitConfig {
            speed_multiplier: 1.5,
            min_distance: 10.0,
            timeout_ms: None,
        });
        prefab.health = Some(20);
        prefab
    }

    #[test]
    fn spawn_attaches_described_facets() {
        let mut library = PrefabLibrary::new();
        library.insert(deer());
        let mut world = hecs::World::new();

        let entity = library
            .spawn_into(
                &mut world,
                &PrefabId::new("WildAnimals:Deer"),
                Vec3::new(1.0, 2.0, 3.0),
                Quat::IDENTITY,
            )
            .unwrap();

        assert_eq!(world.get::<&Position>(entity).unwrap().0, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(world.get::<&SpeedProfile>(entity).unwrap().current, 0.3);
        assert!(world.get::<&FleeOnHit>(entity).is_ok());
        assert!(world.get::<&AttackOnHit>(entity).is_err());
        assert!(world.get::<&ProximityWatch>(entity).is_err());
        assert_eq!(world.get::<&Health>(entity).unwrap().current, 20);
    }

    #[test]
    fn unknown_prefab_is_an_error() {
        let library = PrefabLibrary::new();
        let mut world = hecs::World::new();
        let err = library
            .spawn_into(&mut world, &PrefabId::new("nope"), Vec3::ZERO, Quat::IDENTITY)
            .unwrap_err();
        assert_eq!(err, SpawnError::UnknownPrefab(PrefabId::new("nope")));
        assert_eq!(world.len(), 0);
    }

    #[test]
    fn both_damage_profiles_rejected() {
        let mut prefab = deer();
        prefab.attack_on_hit = Some(AttackOnHitConfig {
            speed_multiplier: 1.2,
            max_distance: 10.0,
            timeout_ms: None,
        });
        assert!(matches!(
            prefab.validate(),
            Err(ConfigError::InvalidPrefab { .. })
        ));
    }

    #[test]
    fn proximity_aggression_needs_radius() {
        let mut prefab = Prefab::new("WildAnimals:Wolf", "Wolf");
        prefab.attack_in_proximity = Some(AttackInProximityConfig {
            speed_multiplier: 1.4,
            max_distance: 12.0,
        });
        assert!(prefab.validate().is_err());
        prefab.search_radius = Some(12.0);
        assert!(prefab.validate().is_ok());
    }

    #[test]
    fn search_radius_beyond_attack_range_rejected() {
        let mut prefab = Prefab::new("WildAnimals:Wolf", "Wolf");
        prefab.attack_in_proximity = Some(AttackInProximityConfig {
            speed_multiplier: 1.4,
            max_distance: 10.0,
        });
        prefab.search_radius = Some(20.0);
        assert!(matches!(
            prefab.validate(),
            Err(ConfigError::InvalidPrefab { .. })
        ));
        prefab.search_radius = Some(10.0);
        assert!(prefab.validate().is_ok());
    }
}
