//! Life-stage transitions. Each growth-capable actor gets one randomized
//! timer; when it fires the actor is replaced by its next stage.

use glam::Quat;

use crate::ecs::components::{Growth, GrowthScheduled, WildAnimal};
use crate::ecs::position_of;
use crate::events::{EventQueue, SimEvent};
use crate::prefab::{ActorSpawner, PrefabLibrary, WorldSpawner};
use crate::timers::{DelayedActions, TimerKey};

/// Arm a growth timer for every wild animal whose growth facet is not yet
/// scheduled. Returns how many were armed.
pub fn activate(
    world: &mut hecs::World,
    timers: &mut DelayedActions,
    rng: &mut fastrand::Rng,
    now_ms: u64,
) -> usize {
    let pending: Vec<(hecs::Entity, u64, u64)> = world
        .query::<(&Growth, &WildAnimal, Option<&GrowthScheduled>)>()
        .iter()
        .filter(|(_, (_, _, scheduled))| scheduled.is_none())
        .map(|(entity, (growth, _, _))| (entity, growth.min_duration_ms, growth.max_duration_ms))
        .collect();

    for &(entity, min, max) in &pending {
        let delay = if min < max { rng.u64(min..max) } else { min };
        timers.schedule_once(entity, TimerKey::Growth, now_ms, delay);
        let _ = world.insert_one(entity, GrowthScheduled);
        log::debug!("{:?}: grows in {} ms", entity, delay);
    }
    pending.len()
}

/// Replace `entity` with its next life stage at the same position.
/// Returns the new actor, or `None` when there was nothing to grow.
pub fn grow(
    world: &mut hecs::World,
    prefabs: &PrefabLibrary,
    timers: &mut DelayedActions,
    events: &mut EventQueue,
    entity: hecs::Entity,
) -> Option<hecs::Entity> {
    let next_stage = world.get::<&Growth>(entity).ok()?.next_stage.clone();
    let position = position_of(world, entity)?;
    if !prefabs.contains(&next_stage) {
        log::warn!("{:?}: unknown next stage {}, not growing", entity, next_stage);
        return None;
    }

    let _ = world.despawn(entity);
    timers.cancel_all(entity);

    let mut spawner = WorldSpawner { world, prefabs };
    match spawner.spawn(&next_stage, position, Quat::IDENTITY) {
        Ok(next) => {
            log::info!("{:?} grew into {} ({:?})", entity, next_stage, next);
            events.push(SimEvent::AnimalGrew {
                previous: entity,
                next,
                prefab: next_stage,
            });
            Some(next)
        }
        Err(e) => {
            log::warn!("{:?}: growth failed: {}", entity, e);
            None
        }
    }
}
