//! Death sequencing: a dying wild animal plays its death clips and is only
//! removed once they have finished.

use crate::ecs::components::{
    Behavior, DeathProfile, DespawnTimer, FollowTarget, Growth, GrowthScheduled, Locomotion,
    SkeletalAnimation, Velocity, WildAnimal,
};
use crate::events::{DestroyDisposition, DestroyRequest, EventQueue, SimEvent};
use crate::timers::DelayedActions;

/// Total playback time in seconds of a death clip list.
pub fn death_duration_secs(profile: &DeathProfile) -> f32 {
    profile.clips.iter().map(|clip| clip.duration_secs()).sum()
}

/// Intercept a destroy notification. Wild animals with a death profile and a
/// skeletal animation are put into the dying state and despawned later;
/// everything else proceeds down the default destruction path.
pub fn on_before_destroy(
    world: &mut hecs::World,
    timers: &mut DelayedActions,
    now_ms: u64,
    entity: hecs::Entity,
    request: &DestroyRequest,
) -> DestroyDisposition {
    if let Ok(timer) = world.get::<&DespawnTimer>(entity) {
        return DestroyDisposition::Deferred {
            fire_at_ms: timer.fire_at_ms,
        };
    }
    if world.get::<&WildAnimal>(entity).is_err() {
        return DestroyDisposition::Proceed;
    }
    let profile = match world.get::<&DeathProfile>(entity) {
        Ok(profile) => (*profile).clone(),
        Err(_) => return DestroyDisposition::Proceed,
    };
    if world.get::<&SkeletalAnimation>(entity).is_err() {
        log::warn!("{:?}: no skeletal animation, destroying immediately", entity);
        return DestroyDisposition::Proceed;
    }
    if profile.clips.is_empty() {
        log::warn!("{:?}: empty death clip list, destroying immediately", entity);
        return DestroyDisposition::Proceed;
    }

    let _ = world.remove_one::<Behavior>(entity);
    let _ = world.remove_one::<Locomotion>(entity);
    let _ = world.remove_one::<Velocity>(entity);
    let _ = world.remove_one::<FollowTarget>(entity);
    let _ = world.remove_one::<Growth>(entity);
    let _ = world.remove_one::<GrowthScheduled>(entity);
    timers.cancel_all(entity);

    if let Ok(mut anim) = world.get::<&mut SkeletalAnimation>(entity) {
        anim.queue = profile.clips.clone();
        anim.current = profile.clips.first().cloned();
        anim.looping = false;
    }

    let duration = death_duration_secs(&profile);
    let fire_at_ms = now_ms + (duration * 1000.0) as u64;
    let _ = world.insert_one(
        entity,
        DespawnTimer {
            fire_at_ms,
            instigator: request.instigator,
            direct_cause: request.direct_cause,
            damage_type: request.damage_type.clone(),
        },
    );
    log::info!("{:?}: dying, despawn at {} ms", entity, fire_at_ms);
    DestroyDisposition::Deferred { fire_at_ms }
}

/// Remove an actor and emit the final destroy notification.
pub fn finish(
    world: &mut hecs::World,
    timers: &mut DelayedActions,
    events: &mut EventQueue,
    entity: hecs::Entity,
    request: DestroyRequest,
) {
    let drops = world
        .get::<&DeathProfile>(entity)
        .map(|profile| profile.drops.clone())
        .unwrap_or_default();
    if world.despawn(entity).is_err() {
        return;
    }
    timers.cancel_all(entity);
    log::info!("{:?}: destroyed", entity);
    events.push(SimEvent::Destroyed {
        entity,
        instigator: request.instigator,
        direct_cause: request.direct_cause,
        damage_type: request.damage_type,
        drops,
    });
}

/// Destroy every dying actor whose deadline has passed. Returns how many
/// were removed.
pub fn sweep(
    world: &mut hecs::World,
    timers: &mut DelayedActions,
    events: &mut EventQueue,
    now_ms: u64,
) -> usize {
    let mut due: Vec<(hecs::Entity, DestroyRequest)> = world
        .query::<&DespawnTimer>()
        .iter()
        .filter(|(_, timer)| now_ms >= timer.fire_at_ms)
        .map(|(entity, timer)| {
            (
                entity,
                DestroyRequest {
                    instigator: timer.instigator,
                    direct_cause: timer.direct_cause,
                    damage_type: timer.damage_type.clone(),
                },
            )
        })
        .collect();
    due.sort_by_key(|(entity, _)| entity.to_bits());

    let count = due.len();
    for (entity, request) in due {
        finish(world, timers, events, entity, request);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::{AnimationClip, Position};
    use crate::prefab::PrefabId;
    use crate::timers::TimerKey;
    use glam::Vec3;

    fn clip(name: &str, time_per_frame: f32, frame_count: u32) -> AnimationClip {
        AnimationClip {
            name: name.into(),
            time_per_frame,
            frame_count,
        }
    }

    fn tag() -> WildAnimal {
        WildAnimal {
            name: "Deer".into(),
            icon: None,
            prefab: PrefabId::new("WildAnimals:Deer"),
        }
    }

    fn dying_deer(world: &mut hecs::World, clips: Vec<AnimationClip>) -> hecs::Entity {
        world.spawn((
            Position(Vec3::ZERO),
            tag(),
            Behavior::default(),
            Locomotion {
                base_speed: 4.0,
                wander_timer: 0.0,
            },
            Velocity(Vec3::ZERO),
            DeathProfile {
                clips,
                drops: vec!["WildAnimals:Meat".into()],
            },
            SkeletalAnimation {
                queue: vec![clip("idle", 0.1, 10)],
                current: None,
                looping: true,
            },
        ))
    }

    #[test]
    fn duration_sums_frame_gaps() {
        let profile = DeathProfile {
            clips: vec![clip("fall", 0.5, 5), clip("lie", 0.25, 3), clip("still", 1.0, 0)],
            drops: Vec::new(),
        };
        // 0.5 * 4 + 0.25 * 2 + 0
        assert_eq!(death_duration_secs(&profile), 2.5);
    }

    #[test]
    fn dying_strips_movement_and_defers() {
        let mut world = hecs::World::new();
        let mut timers = DelayedActions::new();
        let hunter = world.spawn(());
        let deer = dying_deer(&mut world, vec![clip("fall", 0.5, 5)]);
        timers.schedule_once(deer, TimerKey::Growth, 0, 10_000);
        let request = DestroyRequest {
            instigator: Some(hunter),
            direct_cause: None,
            damage_type: Some("Engine:physicalDamage".into()),
        };

        let disposition = on_before_destroy(&mut world, &mut timers, 1_000, deer, &request);

        assert_eq!(disposition, DestroyDisposition::Deferred { fire_at_ms: 3_000 });
        assert!(world.get::<&Behavior>(deer).is_err());
        assert!(world.get::<&Locomotion>(deer).is_err());
        assert!(timers.is_empty());
        let anim = world.get::<&SkeletalAnimation>(deer).unwrap();
        assert!(!anim.looping);
        assert_eq!(anim.current.as_ref().unwrap().name, "fall");
        let timer = world.get::<&DespawnTimer>(deer).unwrap();
        assert_eq!(timer.instigator, Some(hunter));
        assert_eq!(timer.damage_type.as_deref(), Some("Engine:physicalDamage"));
    }

    #[test]
    fn deadline_is_set_once() {
        let mut world = hecs::World::new();
        let mut timers = DelayedActions::new();
        let deer = dying_deer(&mut world, vec![clip("fall", 0.5, 5)]);
        let request = DestroyRequest::default();

        on_before_destroy(&mut world, &mut timers, 0, deer, &request);
        let again = on_before_destroy(&mut world, &mut timers, 500, deer, &request);

        assert_eq!(again, DestroyDisposition::Deferred { fire_at_ms: 2_000 });
    }

    #[test]
    fn despawns_at_deadline_never_earlier() {
        let mut world = hecs::World::new();
        let mut timers = DelayedActions::new();
        let mut events = EventQueue::new();
        let deer = dying_deer(&mut world, vec![clip("fall", 0.5, 5)]);
        on_before_destroy(&mut world, &mut timers, 0, deer, &DestroyRequest::default());

        assert_eq!(sweep(&mut world, &mut timers, &mut events, 1_999), 0);
        assert!(world.contains(deer));

        assert_eq!(sweep(&mut world, &mut timers, &mut events, 2_000), 1);
        assert!(!world.contains(deer));
        assert_eq!(
            events.drain().collect::<Vec<_>>(),
            vec![SimEvent::Destroyed {
                entity: deer,
                instigator: None,
                direct_cause: None,
                damage_type: None,
                drops: vec!["WildAnimals:Meat".into()],
            }]
        );
    }

    #[test]
    fn empty_clip_list_proceeds() {
        let mut world = hecs::World::new();
        let mut timers = DelayedActions::new();
        let deer = dying_deer(&mut world, Vec::new());

        let disposition =
            on_before_destroy(&mut world, &mut timers, 0, deer, &DestroyRequest::default());

        assert_eq!(disposition, DestroyDisposition::Proceed);
        assert!(world.get::<&DespawnTimer>(deer).is_err());
        assert!(world.get::<&Behavior>(deer).is_ok());
    }

    #[test]
    fn missing_animation_facet_proceeds() {
        let mut world = hecs::World::new();
        let mut timers = DelayedActions::new();
        let deer = dying_deer(&mut world, vec![clip("fall", 0.5, 5)]);
        world.remove_one::<SkeletalAnimation>(deer).unwrap();

        let disposition =
            on_before_destroy(&mut world, &mut timers, 0, deer, &DestroyRequest::default());
        assert_eq!(disposition, DestroyDisposition::Proceed);
    }

    #[test]
    fn untagged_actor_proceeds() {
        let mut world = hecs::World::new();
        let mut timers = DelayedActions::new();
        let rock = world.spawn((Position(Vec3::ZERO), DeathProfile::default()));
        assert_eq!(
            on_before_destroy(&mut world, &mut timers, 0, rock, &DestroyRequest::default()),
            DestroyDisposition::Proceed
        );
    }
}
