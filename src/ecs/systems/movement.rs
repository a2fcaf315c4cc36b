use std::collections::HashMap;

use glam::{Quat, Vec3};

use crate::ecs::components::{
    Behavior, FollowTarget, Locomotion, Mode, Position, Rotation, SpeedProfile, Velocity,
};
use crate::ecs::position_of;

/// Followers stop closing in at this distance.
const ARRIVE_DISTANCE: f32 = 1.5;
/// Chance a straying actor stands still instead of picking a heading.
const IDLE_CHANCE: f32 = 0.3;

/// Steer every mobile actor for one tick and integrate its position.
/// Reactive actors head straight toward their target (away from it when
/// fleeing). Straying actors wander on a random timer.
pub fn integrate(world: &mut hecs::World, dt: f32, rng: &mut fastrand::Rng) {
    let targets: HashMap<hecs::Entity, Vec3> = world
        .query::<(&FollowTarget, &Locomotion)>()
        .iter()
        .filter_map(|(entity, (follow, _))| {
            position_of(world, follow.0).map(|target| (entity, target))
        })
        .collect();

    for (entity, (pos, vel, loco, behavior, speed, rotation)) in world.query_mut::<(
        &mut Position,
        &mut Velocity,
        &mut Locomotion,
        &Behavior,
        &SpeedProfile,
        Option<&mut Rotation>,
    )>() {
        let max_speed = loco.base_speed * speed.current;

        match (behavior.mode, targets.get(&entity)) {
            (Mode::Stray, _) | (_, None) => {
                loco.wander_timer -= dt;
                if loco.wander_timer <= 0.0 {
                    loco.wander_timer = 2.0 + rng.f32() * 4.0;
                    vel.0 = if rng.f32() < IDLE_CHANCE {
                        Vec3::ZERO
                    } else {
                        let angle = rng.f32() * std::f32::consts::TAU;
                        Vec3::new(angle.cos(), 0.0, angle.sin()) * max_speed
                    };
                }
            }
            (Mode::Flee, Some(&target)) => {
                let away = flat(pos.0 - target);
                vel.0 = away.normalize_or_zero() * max_speed;
            }
            (_, Some(&target)) => {
                let toward = flat(target - pos.0);
                vel.0 = if toward.length_squared() <= ARRIVE_DISTANCE * ARRIVE_DISTANCE {
                    Vec3::ZERO
                } else {
                    toward.normalize_or_zero() * max_speed
                };
            }
        }

        pos.0 += vel.0 * dt;

        if let Some(rotation) = rotation {
            if vel.0.length_squared() > 1e-6 {
                rotation.0 = Quat::from_rotation_y(vel.0.x.atan2(vel.0.z));
            }
        }
    }
}

fn flat(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}
