//! Population placement: when a chunk becomes ready, maybe spawn one group of
//! a single species on the chunk's valid footholds.

use std::f32::consts::TAU;

use glam::{IVec3, Quat, UVec3};

use crate::config::SpawnConfig;
use crate::prefab::{ActorSpawner, PrefabId};
use crate::terrain::{BlockLookup, FootholdPredicate, GroundFoothold};

pub struct PlacementEngine {
    config: SpawnConfig,
    species: Vec<PrefabId>,
    foothold: Box<dyn FootholdPredicate>,
}

impl PlacementEngine {
    /// Engine using the grass-under-air foothold rule.
    pub fn new(config: SpawnConfig, species: Vec<PrefabId>) -> Self {
        Self {
            config,
            species,
            foothold: Box::new(GroundFoothold::default()),
        }
    }

    /// Swap the foothold rule.
    pub fn with_foothold(mut self, foothold: impl FootholdPredicate + 'static) -> Self {
        self.foothold = Box::new(foothold);
        self
    }

    pub fn species(&self) -> &[PrefabId] {
        &self.species
    }

    /// Every valid foothold in the chunk, top layer first, then by z, then x.
    pub fn find_footholds(
        &self,
        chunk: IVec3,
        extent: UVec3,
        blocks: &dyn BlockLookup,
    ) -> Vec<IVec3> {
        let size = extent.as_ivec3();
        let origin = chunk * size;
        let mut found = Vec::new();
        for y in (0..size.y).rev() {
            for z in 0..size.z {
                for x in 0..size.x {
                    let pos = origin + IVec3::new(x, y, z);
                    if self.foothold.is_valid(pos, blocks) {
                        found.push(pos);
                    }
                }
            }
        }
        found
    }

    /// Handle a chunk-ready notification. Rejections are silent and spawn
    /// nothing. Returns the actors created.
    pub fn on_chunk_ready(
        &self,
        chunk: IVec3,
        extent: UVec3,
        blocks: &dyn BlockLookup,
        rng: &mut fastrand::Rng,
        spawner: &mut dyn ActorSpawner,
    ) -> Vec<hecs::Entity> {
        if rng.u32(0..100) >= self.config.spawn_chance_percent {
            return Vec::new();
        }
        if self.species.is_empty() {
            log::debug!("chunk {}: no species configured", chunk);
            return Vec::new();
        }
        let species = &self.species[rng.usize(0..self.species.len())];

        let mut found = self.find_footholds(chunk, extent, blocks);
        let min_group = self.config.min_group_size;
        let needed = min_group * self.config.min_footholds_per_member;
        if min_group == 0 || found.len() < needed {
            log::debug!(
                "chunk {}: {} footholds, {} needed for {}",
                chunk,
                found.len(),
                needed,
                species
            );
            return Vec::new();
        }

        let max_allowed = self.config.max_group_size.min(found.len() / min_group);
        if max_allowed <= min_group {
            log::debug!(
                "chunk {}: group range [{}, {}) is empty",
                chunk,
                min_group,
                max_allowed
            );
            return Vec::new();
        }
        let group_size = rng.usize(min_group..max_allowed);

        let mut spawned = Vec::with_capacity(group_size);
        for _ in 0..group_size {
            let pos = found.remove(rng.usize(0..found.len()));
            let rotation = Quat::from_rotation_y(rng.f32() * TAU);
            match spawner.spawn(species, pos.as_vec3(), rotation) {
                Ok(entity) => spawned.push(entity),
                Err(e) => log::warn!("chunk {}: {}", chunk, e),
            }
        }
        log::info!(
            "chunk {}: spawned {} x {}",
            chunk,
            spawned.len(),
            species
        );
        spawned
    }
}
