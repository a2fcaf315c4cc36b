pub mod components;
pub mod systems;

use glam::Vec3;

use components::Position;

/// World position of an actor, if it has one.
pub fn position_of(world: &hecs::World, entity: hecs::Entity) -> Option<Vec3> {
    world.get::<&Position>(entity).ok().map(|pos| pos.0)
}

/// Drop handles whose actor has been destroyed.
pub fn alive(world: &hecs::World, handle: Option<hecs::Entity>) -> Option<hecs::Entity> {
    handle.filter(|&entity| world.contains(entity))
}
