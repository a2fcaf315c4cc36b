use crate::ecs::components::{Character, Position};
use crate::spatial::{CharacterSnapshot, SpatialHash};

/// Rebuild the spatial hash grid and snapshot cache from current character
/// positions. Snapshot order is the world's query order.
pub fn rebuild(
    world: &hecs::World,
    grid: &mut SpatialHash,
    snapshots: &mut Vec<CharacterSnapshot>,
) {
    grid.clear();
    snapshots.clear();
    for (entity, (pos, _)) in world.query::<(&Position, &Character)>().iter() {
        let idx = snapshots.len() as u32;
        snapshots.push(CharacterSnapshot { entity, pos: pos.0 });
        grid.insert(pos.0, idx);
    }
}
