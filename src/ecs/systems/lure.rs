use crate::ecs::components::{HeldItem, Lurable, Position, ProximityWatch};

/// Items that make lurable animals follow whoever holds them.
pub const LURING_ITEMS: [&str; 5] = [
    "CoreAssets:TallGrass1",
    "CoreAssets:TallGrass2",
    "CoreAssets:TallGrass3",
    "CoreAssets:Lavender",
    "CoreAssets:Dandelion",
];

pub fn is_luring_item(item: &str) -> bool {
    LURING_ITEMS.contains(&item)
}

/// Point every lurable actor at the closest in-range character holding a
/// luring item. Returns the actors whose lure changed.
pub fn check(world: &mut hecs::World) -> Vec<hecs::Entity> {
    let mut changes = Vec::new();

    for (entity, (pos, lurable, watch)) in world
        .query::<(&Position, &Lurable, &ProximityWatch)>()
        .iter()
    {
        let mut best: Option<(hecs::Entity, f32)> = None;
        for &candidate in &watch.in_range {
            let Ok(mut query) = world.query_one::<(&Position, &HeldItem)>(candidate) else {
                continue;
            };
            let Some((their_pos, held)) = query.get() else {
                continue;
            };
            if !held.0.as_deref().is_some_and(is_luring_item) {
                continue;
            }
            let dist_sq = pos.0.distance_squared(their_pos.0);
            if best.map_or(true, |(_, d)| dist_sq < d) {
                best = Some((candidate, dist_sq));
            }
        }

        let lured_by = best.map(|(candidate, _)| candidate);
        if lured_by != lurable.lured_by {
            changes.push((entity, lured_by));
        }
    }

    let mut triggered = Vec::with_capacity(changes.len());
    for (entity, lured_by) in changes {
        if let Ok(mut lurable) = world.get::<&mut Lurable>(entity) {
            log::debug!("{:?}: lured by {:?}", entity, lured_by);
            lurable.lured_by = lured_by;
            triggered.push(entity);
        }
    }
    triggered
}
