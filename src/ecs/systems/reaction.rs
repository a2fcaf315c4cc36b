//! Entry and exit of reactive episodes: damage intake starts one, the
//! per-tick stop conditions end it. Both only edit the damage profiles and
//! leave mode changes to the arbitrator.

use crate::ecs::components::{
    AttackInProximity, AttackOnHit, Behavior, FleeOnHit, FollowTarget, Mode, Position,
};
use crate::ecs::position_of;

/// Record a hit on the actor's damage profile. Returns whether the actor has
/// one, in which case the caller raises a re-evaluation trigger.
pub fn damage_intake(
    world: &mut hecs::World,
    entity: hecs::Entity,
    instigator: Option<hecs::Entity>,
    now_ms: u64,
) -> bool {
    if let Ok(mut flee) = world.get::<&mut FleeOnHit>(entity) {
        flee.instigator = instigator;
        flee.time_of_hit_ms = now_ms;
        return true;
    }
    if let Ok(mut attack) = world.get::<&mut AttackOnHit>(entity) {
        attack.instigator = instigator;
        attack.time_of_hit_ms = now_ms;
        return true;
    }
    false
}

fn timed_out(timeout_ms: Option<u64>, time_of_hit_ms: u64, now_ms: u64) -> bool {
    timeout_ms.is_some_and(|timeout| now_ms.saturating_sub(time_of_hit_ms) >= timeout)
}

/// End reactive episodes whose distance or time limit has been passed.
/// Clears the instigator and returns the actors that need re-evaluation.
pub fn check_stop_conditions(world: &mut hecs::World, now_ms: u64) -> Vec<hecs::Entity> {
    let mut flee_stops = Vec::new();
    for (entity, (pos, flee)) in world.query::<(&Position, &FleeOnHit)>().iter() {
        let Some(instigator) = flee.instigator else {
            continue;
        };
        let escaped = match position_of(world, instigator) {
            Some(threat) => {
                pos.0.distance_squared(threat) >= flee.min_distance * flee.min_distance
            }
            None => true,
        };
        if escaped || timed_out(flee.timeout_ms, flee.time_of_hit_ms, now_ms) {
            flee_stops.push(entity);
        }
    }

    let mut pursuit_stops = Vec::new();
    for (entity, (pos, attack)) in world.query::<(&Position, &AttackOnHit)>().iter() {
        let Some(instigator) = attack.instigator else {
            continue;
        };
        let lost = match position_of(world, instigator) {
            Some(target) => {
                pos.0.distance_squared(target) > attack.max_distance * attack.max_distance
            }
            None => true,
        };
        if lost || timed_out(attack.timeout_ms, attack.time_of_hit_ms, now_ms) {
            pursuit_stops.push(entity);
        }
    }

    let mut triggered = Vec::new();
    for (entity, (pos, attack, behavior, follow)) in world
        .query::<(&Position, &AttackInProximity, &Behavior, &FollowTarget)>()
        .iter()
    {
        if behavior.mode != Mode::ProximityHostile {
            continue;
        }
        let lost = match position_of(world, follow.0) {
            Some(target) => {
                pos.0.distance_squared(target) > attack.max_distance * attack.max_distance
            }
            None => true,
        };
        if lost {
            triggered.push(entity);
        }
    }

    for entity in flee_stops {
        if let Ok(mut flee) = world.get::<&mut FleeOnHit>(entity) {
            log::debug!("{:?}: flee over", entity);
            flee.instigator = None;
            triggered.push(entity);
        }
    }
    for entity in pursuit_stops {
        if let Ok(mut attack) = world.get::<&mut AttackOnHit>(entity) {
            log::debug!("{:?}: pursuit over", entity);
            attack.instigator = None;
            triggered.push(entity);
        }
    }

    triggered.sort_by_key(|entity| entity.to_bits());
    triggered.dedup();
    triggered
}
