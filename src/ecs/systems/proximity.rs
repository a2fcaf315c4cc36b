use std::collections::HashSet;

use crate::ecs::components::{Position, ProximityWatch};
use crate::spatial::{CharacterSnapshot, SpatialHash};

/// Reusable per-tick scratch space.
#[derive(Default)]
pub struct ProximityBuffers {
    hits: Vec<u32>,
    changes: Vec<(hecs::Entity, Vec<hecs::Entity>)>,
}

impl ProximityBuffers {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Recompute every watcher's in-range character set. Stores the new set and
/// reports the watcher only when membership changed; order is ignored.
pub fn scan(
    world: &mut hecs::World,
    grid: &SpatialHash,
    snapshots: &[CharacterSnapshot],
    bufs: &mut ProximityBuffers,
) -> Vec<hecs::Entity> {
    bufs.changes.clear();

    for (entity, (pos, watch)) in world.query::<(&Position, &ProximityWatch)>().iter() {
        let radius_sq = watch.search_radius * watch.search_radius;
        grid.query_radius(pos.0, watch.search_radius, &mut bufs.hits);

        let found: Vec<hecs::Entity> = bufs
            .hits
            .iter()
            .filter_map(|&idx| snapshots.get(idx as usize))
            .filter(|snap| snap.entity != entity)
            .filter(|snap| snap.pos.distance_squared(pos.0) <= radius_sq)
            .map(|snap| snap.entity)
            .collect();

        if !same_members(&found, &watch.in_range) {
            bufs.changes.push((entity, found));
        }
    }

    let mut triggered = Vec::with_capacity(bufs.changes.len());
    for (entity, found) in bufs.changes.drain(..) {
        if let Ok(mut watch) = world.get::<&mut ProximityWatch>(entity) {
            watch.in_range = found;
            triggered.push(entity);
        }
    }
    triggered
}

fn same_members(a: &[hecs::Entity], b: &[hecs::Entity]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let a: HashSet<_> = a.iter().collect();
    let b: HashSet<_> = b.iter().collect();
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::Character;
    use crate::ecs::systems::spatial;
    use glam::Vec3;

    struct Harness {
        world: hecs::World,
        grid: SpatialHash,
        snapshots: Vec<CharacterSnapshot>,
        bufs: ProximityBuffers,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                world: hecs::World::new(),
                grid: SpatialHash::new(8.0, 128),
                snapshots: Vec::new(),
                bufs: ProximityBuffers::new(),
            }
        }

        fn scan(&mut self) -> Vec<hecs::Entity> {
            spatial::rebuild(&self.world, &mut self.grid, &mut self.snapshots);
            scan(&mut self.world, &self.grid, &self.snapshots, &mut self.bufs)
        }

        fn move_to(&mut self, e: hecs::Entity, pos: Vec3) {
            self.world.get::<&mut Position>(e).unwrap().0 = pos;
        }
    }

    #[test]
    fn entering_radius_triggers_once() {
        let mut h = Harness::new();
        let watcher = h
            .world
            .spawn((Position(Vec3::ZERO), ProximityWatch::new(5.0)));
        let player = h.world.spawn((Position(Vec3::new(20.0, 0.0, 0.0)), Character));

        assert!(h.scan().is_empty());

        h.move_to(player, Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(h.scan(), vec![watcher]);
        assert_eq!(
            h.world.get::<&ProximityWatch>(watcher).unwrap().in_range,
            vec![player]
        );

        // Still in range, moved a little: same membership, no trigger.
        h.move_to(player, Vec3::new(2.0, 0.0, 1.0));
        assert!(h.scan().is_empty());
    }

    #[test]
    fn radius_is_inclusive() {
        let mut h = Harness::new();
        let watcher = h
            .world
            .spawn((Position(Vec3::ZERO), ProximityWatch::new(5.0)));
        h.world.spawn((Position(Vec3::new(0.0, 0.0, 5.0)), Character));
        assert_eq!(h.scan(), vec![watcher]);
    }

    #[test]
    fn leaving_radius_triggers() {
        let mut h = Harness::new();
        let watcher = h
            .world
            .spawn((Position(Vec3::ZERO), ProximityWatch::new(5.0)));
        let player = h.world.spawn((Position(Vec3::X), Character));
        h.scan();

        h.move_to(player, Vec3::new(50.0, 0.0, 0.0));
        assert_eq!(h.scan(), vec![watcher]);
        assert!(h
            .world
            .get::<&ProximityWatch>(watcher)
            .unwrap()
            .in_range
            .is_empty());
    }

    #[test]
    fn reordered_set_is_not_a_change() {
        let mut h = Harness::new();
        let a = h.world.spawn((Position(Vec3::X), Character));
        let b = h.world.spawn((Position(Vec3::Z), Character));
        let watcher = h.world.spawn((
            Position(Vec3::ZERO),
            ProximityWatch {
                search_radius: 5.0,
                in_range: vec![b, a],
            },
        ));

        assert!(h.scan().is_empty());
        assert_eq!(
            h.world.get::<&ProximityWatch>(watcher).unwrap().in_range,
            vec![b, a]
        );
    }

    #[test]
    fn watcher_never_sees_itself() {
        let mut h = Harness::new();
        h.world
            .spawn((Position(Vec3::ZERO), ProximityWatch::new(5.0), Character));
        assert!(h.scan().is_empty());
    }
}
