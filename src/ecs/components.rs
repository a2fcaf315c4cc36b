use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::prefab::PrefabId;

/// World position in block units, y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position(pub Vec3);

/// Orientation of an actor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation(pub Quat);

/// Velocity in blocks/second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity(pub Vec3);

/// Movement capability. Stripped when an animal starts dying.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Locomotion {
    /// Speed in blocks/second at a multiplier of 1.0.
    pub base_speed: f32,
    /// Seconds until a straying actor picks a new heading.
    pub wander_timer: f32,
}

/// Player-controlled character. These are the "foreign characters" the
/// proximity scanner looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Character;

/// Item a character currently holds, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeldItem(pub Option<String>);

/// Marks an actor as a wild animal subject to death and aging rules.
/// Name and icon are render-only.
#[derive(Debug, Clone, PartialEq)]
pub struct WildAnimal {
    pub name: String,
    pub icon: Option<String>,
    /// Prefab the actor was created from.
    pub prefab: PrefabId,
}

/// Movement speed multipliers. Only the arbitrator writes `current`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedProfile {
    pub current: f32,
    /// Resting multiplier restored when the actor strays.
    pub default: f32,
}

impl SpeedProfile {
    pub fn resting(default: f32) -> Self {
        Self {
            current: default,
            default,
        }
    }
}

/// Current behavior intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Mode {
    Stray,
    Flee,
    Pursue,
    ProximityHostile,
    Lured,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Stray => "stray",
            Mode::Flee => "flee",
            Mode::Pursue => "hostile-on-hit",
            Mode::ProximityHostile => "hostile",
            Mode::Lured => "lured",
        }
    }

    /// Reactive modes always carry a [`FollowTarget`].
    pub fn is_reactive(self) -> bool {
        !matches!(self, Mode::Stray)
    }
}

/// Behavior facet. Stripped when an animal starts dying, which makes it
/// invisible to the arbitrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Behavior {
    pub mode: Mode,
}

impl Default for Behavior {
    fn default() -> Self {
        Self { mode: Mode::Stray }
    }
}

/// Actor to move toward (or away from, when fleeing). Non-owning: the target
/// may be gone, so check liveness before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowTarget(pub hecs::Entity);

/// Search radius plus the characters found within it on the last tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityWatch {
    pub search_radius: f32,
    /// In scan order. Compared by membership, never by order.
    pub in_range: Vec<hecs::Entity>,
}

impl ProximityWatch {
    pub fn new(search_radius: f32) -> Self {
        Self {
            search_radius,
            in_range: Vec::new(),
        }
    }
}

/// "Flee on hit" damage profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FleeOnHit {
    pub instigator: Option<hecs::Entity>,
    pub time_of_hit_ms: u64,
    pub speed_multiplier: f32,
    /// Fleeing stops once the actor is at least this far from the instigator.
    pub min_distance: f32,
    /// Fleeing also stops this long after the hit, when set.
    pub timeout_ms: Option<u64>,
}

/// "Pursue and attack on hit" damage profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackOnHit {
    pub instigator: Option<hecs::Entity>,
    pub time_of_hit_ms: u64,
    pub speed_multiplier: f32,
    /// Pursuit stops once the target is farther than this.
    pub max_distance: f32,
    pub timeout_ms: Option<u64>,
}

/// Attack any character that comes within `max_distance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackInProximity {
    pub speed_multiplier: f32,
    pub max_distance: f32,
    pub nearest_threat: Option<hecs::Entity>,
}

/// Follows characters holding a luring item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lurable {
    pub lured_by: Option<hecs::Entity>,
}

/// Non-terminal life stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Growth {
    pub min_duration_ms: u64,
    pub max_duration_ms: u64,
    pub next_stage: PrefabId,
}

/// Growth timer has been armed for this actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowthScheduled;

/// One skeletal animation clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: String,
    /// Seconds per frame.
    pub time_per_frame: f32,
    pub frame_count: u32,
}

impl AnimationClip {
    /// Playback time in seconds from first to last frame.
    pub fn duration_secs(&self) -> f32 {
        self.time_per_frame * self.frame_count.saturating_sub(1) as f32
    }
}

/// Clips to play while dying and items an external loot system drops.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeathProfile {
    #[serde(default)]
    pub clips: Vec<AnimationClip>,
    #[serde(default)]
    pub drops: Vec<String>,
}

/// Skeletal animation playback state. Playback itself is external.
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletalAnimation {
    pub queue: Vec<AnimationClip>,
    pub current: Option<AnimationClip>,
    pub looping: bool,
}

/// Pending despawn after the death animation. Exists only between the death
/// trigger and final destruction.
#[derive(Debug, Clone, PartialEq)]
pub struct DespawnTimer {
    pub fire_at_ms: u64,
    pub instigator: Option<hecs::Entity>,
    pub direct_cause: Option<hecs::Entity>,
    pub damage_type: Option<String>,
}

/// Hit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

/// At or below this many hit points an actor is critically wounded.
pub const CRITICAL_HEALTH: i32 = 5;

impl Health {
    pub fn full(max: i32) -> Self {
        Self { current: max, max }
    }

    pub fn is_critical(&self) -> bool {
        self.current <= CRITICAL_HEALTH
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0
    }
}
