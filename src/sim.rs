//! The host-facing simulation: owns the world, clock and every system, and
//! runs them in a fixed order each tick.

use glam::{IVec3, Quat, UVec3, Vec3};

use crate::config::WildlifeConfig;
use crate::debug::timer::{SystemPhase, SystemTimers};
use crate::ecs::components::{Behavior, Character, HeldItem, Health, Mode, Position, WildAnimal};
use crate::ecs::systems::arbitrator::{Arbitrator, TriggerCtx};
use crate::ecs::systems::placement::PlacementEngine;
use crate::ecs::systems::proximity::ProximityBuffers;
use crate::ecs::systems::{self, death, growth, lure, movement, proximity, reaction, spatial};
use crate::error::{ConfigError, SpawnError};
use crate::events::{DestroyDisposition, DestroyRequest, EventQueue, SimEvent};
use crate::prefab::{PrefabId, PrefabLibrary, WorldSpawner};
use crate::spatial::{CharacterSnapshot, SpatialHash};
use crate::terrain::{BlockLookup, FootholdPredicate};
use crate::timers::{DelayedActions, TimerKey};

/// Spatial hash cell size, in blocks. Roughly the common search radius.
const SPATIAL_CELL_SIZE: f32 = 16.0;
/// Spatial hash table size.
const SPATIAL_TABLE_SIZE: usize = 1024;
/// Damage type recorded when lethal damage comes through [`Simulation::damage`].
pub const PHYSICAL_DAMAGE: &str = "Engine:physicalDamage";

pub struct Simulation {
    world: hecs::World,
    now_ms: u64,
    rng: fastrand::Rng,
    prefabs: PrefabLibrary,
    placement: PlacementEngine,
    arbitrator: Arbitrator,
    timers: DelayedActions,
    events: EventQueue,
    grid: SpatialHash,
    snapshots: Vec<CharacterSnapshot>,
    proximity_bufs: ProximityBuffers,
    system_timers: SystemTimers,
}

impl Simulation {
    /// Build a simulation from a validated config. The seed drives every
    /// random draw, so equal seeds and inputs replay identically.
    pub fn new(config: WildlifeConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let prefabs = config.library();
        let placement = PlacementEngine::new(config.spawn, config.species);
        log::info!(
            "Simulation ready: {} prefabs, {} species, seed {}",
            prefabs.len(),
            placement.species().len(),
            seed
        );
        Ok(Self {
            world: hecs::World::new(),
            now_ms: 0,
            rng: fastrand::Rng::with_seed(seed),
            prefabs,
            placement,
            arbitrator: Arbitrator::new(),
            timers: DelayedActions::new(),
            events: EventQueue::new(),
            grid: SpatialHash::new(SPATIAL_CELL_SIZE, SPATIAL_TABLE_SIZE),
            snapshots: Vec::new(),
            proximity_bufs: ProximityBuffers::new(),
            system_timers: SystemTimers::new(),
        })
    }

    /// Replace the placement engine's foothold rule.
    pub fn with_foothold(mut self, foothold: impl FootholdPredicate + 'static) -> Self {
        self.placement = self.placement.with_foothold(foothold);
        self
    }

    pub fn world(&self) -> &hecs::World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut hecs::World {
        &mut self.world
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn mode_of(&self, entity: hecs::Entity) -> Option<Mode> {
        self.world.get::<&Behavior>(entity).ok().map(|b| b.mode)
    }

    pub fn prefabs(&self) -> &PrefabLibrary {
        &self.prefabs
    }

    pub fn timers(&self) -> &DelayedActions {
        &self.timers
    }

    pub fn system_timers(&self) -> &SystemTimers {
        &self.system_timers
    }

    /// Live wild animals, dying ones included.
    pub fn animal_count(&self) -> usize {
        self.world.query::<&WildAnimal>().iter().count()
    }

    /// Chunk-ready notification: maybe place a group on the new chunk.
    pub fn on_chunk_ready(
        &mut self,
        chunk: IVec3,
        extent: UVec3,
        blocks: &dyn BlockLookup,
    ) -> Vec<hecs::Entity> {
        let mut spawner = WorldSpawner {
            world: &mut self.world,
            prefabs: &self.prefabs,
        };
        let spawned =
            self.placement
                .on_chunk_ready(chunk, extent, blocks, &mut self.rng, &mut spawner);
        for &entity in &spawned {
            self.announce_spawn(entity);
        }
        spawned
    }

    /// Create one actor directly.
    pub fn spawn(
        &mut self,
        prefab: &PrefabId,
        position: Vec3,
        rotation: Quat,
    ) -> Result<hecs::Entity, SpawnError> {
        let entity = self
            .prefabs
            .spawn_into(&mut self.world, prefab, position, rotation)?;
        self.announce_spawn(entity);
        Ok(entity)
    }

    /// Add a player-controlled character.
    pub fn spawn_character(&mut self, position: Vec3) -> hecs::Entity {
        self.world
            .spawn((Position(position), Character, HeldItem::default()))
    }

    fn announce_spawn(&mut self, entity: hecs::Entity) {
        let prefab = match self.world.get::<&WildAnimal>(entity) {
            Ok(tag) => tag.prefab.clone(),
            Err(_) => return,
        };
        let Some(position) = crate::ecs::position_of(&self.world, entity) else {
            return;
        };
        self.events.push(SimEvent::Spawned {
            entity,
            prefab,
            position,
        });
    }

    /// Damage notification. Lethal damage becomes a destroy request;
    /// otherwise the hit starts a reactive episode.
    pub fn damage(&mut self, target: hecs::Entity, instigator: Option<hecs::Entity>, amount: i32) {
        if !self.world.contains(target) {
            return;
        }
        let lethal = match self.world.get::<&mut Health>(target) {
            Ok(mut health) => {
                health.current = health.current.saturating_sub(amount);
                health.is_dead()
            }
            Err(_) => false,
        };
        if lethal {
            self.destroy(
                target,
                DestroyRequest {
                    instigator,
                    direct_cause: instigator,
                    damage_type: Some(PHYSICAL_DAMAGE.to_string()),
                },
            );
            return;
        }

        if reaction::damage_intake(&mut self.world, target, instigator, self.now_ms) {
            self.raise_trigger(target);
        }
    }

    /// Destroy notification. The death sequencer may defer it; otherwise
    /// the actor is destroyed now.
    pub fn destroy(&mut self, target: hecs::Entity, request: DestroyRequest) -> DestroyDisposition {
        let disposition = death::on_before_destroy(
            &mut self.world,
            &mut self.timers,
            self.now_ms,
            target,
            &request,
        );
        if disposition == DestroyDisposition::Proceed {
            death::finish(
                &mut self.world,
                &mut self.timers,
                &mut self.events,
                target,
                request,
            );
        }
        disposition
    }

    /// Run the behavior chain for one actor. Returns the consuming handler.
    pub fn raise_trigger(&mut self, entity: hecs::Entity) -> Option<&'static str> {
        let mut ctx = TriggerCtx {
            events: &mut self.events,
        };
        self.arbitrator.reevaluate(&mut self.world, entity, &mut ctx)
    }

    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.events.drain().collect()
    }

    /// Advance the clock by `dt_ms` and run every system once.
    pub fn tick(&mut self, dt_ms: u64) {
        self.now_ms += dt_ms;
        let now_ms = self.now_ms;

        self.system_timers.begin();
        growth::activate(&mut self.world, &mut self.timers, &mut self.rng, now_ms);
        self.system_timers.end(SystemPhase::Growth);

        self.system_timers.begin();
        spatial::rebuild(&self.world, &mut self.grid, &mut self.snapshots);
        self.system_timers.end(SystemPhase::SpatialRebuild);

        self.system_timers.begin();
        let triggered = proximity::scan(
            &mut self.world,
            &self.grid,
            &self.snapshots,
            &mut self.proximity_bufs,
        );
        self.fan_out(&triggered);
        self.system_timers.end(SystemPhase::Proximity);

        self.system_timers.begin();
        let triggered = lure::check(&mut self.world);
        self.fan_out(&triggered);
        self.system_timers.end(SystemPhase::Lure);

        self.system_timers.begin();
        let triggered = reaction::check_stop_conditions(&mut self.world, now_ms);
        self.fan_out(&triggered);
        self.system_timers.end(SystemPhase::StopConditions);

        self.system_timers.begin();
        for (entity, key) in self.timers.poll(now_ms) {
            log::debug!("{:?}: timer {} fired", entity, key.id());
            match key {
                TimerKey::Growth => {
                    growth::grow(
                        &mut self.world,
                        &self.prefabs,
                        &mut self.timers,
                        &mut self.events,
                        entity,
                    );
                }
            }
        }
        self.system_timers.end(SystemPhase::Timers);

        self.system_timers.begin();
        death::sweep(&mut self.world, &mut self.timers, &mut self.events, now_ms);
        self.system_timers.end(SystemPhase::Despawn);

        self.system_timers.begin();
        movement::integrate(&mut self.world, dt_ms as f32 / 1000.0, &mut self.rng);
        self.system_timers.end(SystemPhase::Movement);
    }

    fn fan_out(&mut self, triggered: &[hecs::Entity]) {
        let mut ctx = TriggerCtx {
            events: &mut self.events,
        };
        systems::fan_out(&self.arbitrator, &mut self.world, triggered, &mut ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpawnConfig;
    use crate::ecs::components::{
        AnimationClip, DeathProfile, DespawnTimer, FleeOnHit, FollowTarget, Locomotion,
        SpeedProfile,
    };
    use crate::prefab::{AttackInProximityConfig, FleeOnHitConfig, GrowthConfig, Prefab};
    use crate::terrain::VoxelGrid;

    fn deer_prefab() -> Prefab {
        let mut deer = Prefab::new("Test:Deer", "Deer");
        deer.flee_on_hit = Some(FleeOnHitConfig {
            speed_multiplier: 1.5,
            min_distance: 10.0,
            timeout_ms: None,
        });
        deer.health = Some(20);
        deer.death = Some(DeathProfile {
            clips: vec![AnimationClip {
                name: "die".into(),
                time_per_frame: 0.25,
                frame_count: 5,
            }],
            drops: vec!["Test:Meat".into()],
        });
        deer.animations = Some(Vec::new());
        deer
    }

    fn config(prefabs: Vec<Prefab>) -> WildlifeConfig {
        WildlifeConfig {
            spawn: SpawnConfig {
                min_group_size: 2,
                max_group_size: 5,
                min_footholds_per_member: 1,
                spawn_chance_percent: 100,
            },
            species: vec![PrefabId::new("Test:Deer")],
            prefabs,
        }
    }

    fn sim() -> Simulation {
        Simulation::new(config(vec![deer_prefab()]), 7).unwrap()
    }

    fn spawn_deer(sim: &mut Simulation, pos: Vec3) -> hecs::Entity {
        sim.spawn(&PrefabId::new("Test:Deer"), pos, Quat::IDENTITY)
            .unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = config(vec![deer_prefab()]);
        config.spawn.min_group_size = 0;
        assert!(Simulation::new(config, 0).is_err());
    }

    #[test]
    fn flee_ends_on_same_tick_once_far_enough() {
        let mut sim = sim();
        let hunter = sim.spawn_character(Vec3::ZERO);
        let deer = spawn_deer(&mut sim, Vec3::new(3.0, 0.0, 0.0));

        sim.damage(deer, Some(hunter), 1);
        assert_eq!(sim.mode_of(deer), Some(Mode::Flee));
        assert_eq!(
            sim.world().get::<&SpeedProfile>(deer).unwrap().current,
            1.5
        );

        sim.world_mut().get::<&mut Position>(deer).unwrap().0 = Vec3::new(12.0, 0.0, 0.0);
        sim.tick(1);

        assert_eq!(sim.mode_of(deer), Some(Mode::Stray));
        assert!(sim.world().get::<&FleeOnHit>(deer).unwrap().instigator.is_none());
        assert!(sim.world().get::<&FollowTarget>(deer).is_err());
        assert_eq!(
            sim.world().get::<&SpeedProfile>(deer).unwrap().current,
            0.3
        );
    }

    #[test]
    fn lethal_damage_defers_until_death_animation_ends() {
        let mut sim = sim();
        let hunter = sim.spawn_character(Vec3::new(50.0, 0.0, 0.0));
        let deer = spawn_deer(&mut sim, Vec3::ZERO);
        sim.drain_events();

        sim.damage(deer, Some(hunter), 25);

        // 0.25 * 4 = 1 second of death animation.
        assert!(sim.world().contains(deer));
        assert!(sim.mode_of(deer).is_none());
        sim.tick(999);
        assert!(sim.world().contains(deer));
        sim.tick(1);
        assert!(!sim.world().contains(deer));

        let events = sim.drain_events();
        assert!(events.contains(&SimEvent::Destroyed {
            entity: deer,
            instigator: Some(hunter),
            direct_cause: Some(hunter),
            damage_type: Some(PHYSICAL_DAMAGE.to_string()),
            drops: vec!["Test:Meat".into()],
        }));
    }

    #[test]
    fn hitting_a_dying_animal_keeps_its_deadline() {
        let mut sim = sim();
        let deer = spawn_deer(&mut sim, Vec3::ZERO);

        sim.damage(deer, None, i32::MAX);
        sim.damage(deer, None, i32::MAX);

        assert_eq!(sim.world().get::<&Health>(deer).unwrap().current, i32::MIN);
        assert_eq!(
            sim.world().get::<&DespawnTimer>(deer).unwrap().fire_at_ms,
            1_000
        );
        sim.tick(1_000);
        assert!(!sim.world().contains(deer));
    }

    #[test]
    fn destroy_without_death_profile_is_immediate() {
        let mut sim = Simulation::new(
            config(vec![deer_prefab(), Prefab::new("Test:Rabbit", "Rabbit")]),
            1,
        )
        .unwrap();
        let rabbit = sim
            .spawn(&PrefabId::new("Test:Rabbit"), Vec3::ZERO, Quat::IDENTITY)
            .unwrap();

        let disposition = sim.destroy(rabbit, DestroyRequest::default());

        assert_eq!(disposition, DestroyDisposition::Proceed);
        assert!(!sim.world().contains(rabbit));
    }

    #[test]
    fn chunk_ready_places_reproducible_group() {
        let twenty = |pos: IVec3, _: &dyn BlockLookup| pos.y == 0 && pos.z == 0 && pos.x < 20;
        let blocks = VoxelGrid::new();
        let run = || {
            let mut sim = sim().with_foothold(twenty);
            let spawned = sim.on_chunk_ready(IVec3::ZERO, UVec3::new(32, 4, 32), &blocks);
            let positions: Vec<Vec3> = spawned
                .iter()
                .map(|&e| sim.world().get::<&Position>(e).unwrap().0)
                .collect();
            (spawned.len(), positions, sim.drain_events().len())
        };

        let (count, positions, events) = run();
        assert!((2..5).contains(&count));
        assert_eq!(events, count);
        assert_eq!(run(), (count, positions, events));
    }

    #[test]
    fn wolf_attacks_character_that_comes_close() {
        let mut wolf = Prefab::new("Test:Wolf", "Wolf");
        wolf.search_radius = Some(10.0);
        wolf.attack_in_proximity = Some(AttackInProximityConfig {
            speed_multiplier: 1.5,
            max_distance: 10.0,
        });
        let mut sim = Simulation::new(config(vec![deer_prefab(), wolf]), 3).unwrap();
        let wolf = sim
            .spawn(&PrefabId::new("Test:Wolf"), Vec3::ZERO, Quat::IDENTITY)
            .unwrap();
        let player = sim.spawn_character(Vec3::new(40.0, 0.0, 0.0));

        sim.tick(16);
        assert_eq!(sim.mode_of(wolf), Some(Mode::Stray));

        sim.world_mut().get::<&mut Position>(player).unwrap().0 = Vec3::new(5.0, 0.0, 0.0);
        sim.tick(16);
        assert_eq!(sim.mode_of(wolf), Some(Mode::ProximityHostile));
        assert_eq!(sim.world().get::<&FollowTarget>(wolf).unwrap().0, player);

        sim.world_mut().get::<&mut Position>(player).unwrap().0 = Vec3::new(80.0, 0.0, 0.0);
        sim.tick(16);
        assert_eq!(sim.mode_of(wolf), Some(Mode::Stray));
    }

    #[test]
    fn fawn_grows_into_deer() {
        let mut fawn = Prefab::new("Test:Fawn", "Fawn");
        fawn.growth = Some(GrowthConfig {
            min_duration_ms: 1_000,
            max_duration_ms: 2_000,
            next_stage: PrefabId::new("Test:Deer"),
        });
        let mut sim = Simulation::new(config(vec![deer_prefab(), fawn]), 11).unwrap();
        let fawn = sim
            .spawn(&PrefabId::new("Test:Fawn"), Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY)
            .unwrap();
        sim.drain_events();

        sim.tick(1);
        let fire_at = sim.timers().fire_at(fawn, TimerKey::Growth).unwrap();
        assert!((1_001..2_001).contains(&fire_at));

        // Pin the fawn in place so the replacement position is predictable.
        sim.world_mut().remove_one::<Locomotion>(fawn).unwrap();
        while sim.now_ms() < fire_at {
            sim.tick(100);
        }

        assert!(!sim.world().contains(fawn));
        let grew = sim
            .drain_events()
            .into_iter()
            .find_map(|event| match event {
                SimEvent::AnimalGrew { previous, next, .. } if previous == fawn => Some(next),
                _ => None,
            })
            .unwrap();
        // The new stage may already have taken its first wandering step.
        let pos = sim.world().get::<&Position>(grew).unwrap().0;
        assert_eq!(pos.y, 2.0);
        assert!(pos.distance(Vec3::new(1.0, 2.0, 3.0)) < 0.2);
    }

    #[test]
    fn repeated_trigger_keeps_mode() {
        let mut sim = sim();
        let hunter = sim.spawn_character(Vec3::ZERO);
        let deer = spawn_deer(&mut sim, Vec3::X);
        sim.damage(deer, Some(hunter), 1);

        let first = sim.raise_trigger(deer);
        let second = sim.raise_trigger(deer);

        assert_eq!(first, second);
        assert_eq!(sim.mode_of(deer), Some(Mode::Flee));
    }

    #[test]
    fn follow_target_present_only_while_reactive() {
        let mut sim = sim();
        let hunter = sim.spawn_character(Vec3::ZERO);
        let deer = spawn_deer(&mut sim, Vec3::new(2.0, 0.0, 0.0));
        sim.damage(deer, Some(hunter), 1);

        for _ in 0..100 {
            sim.tick(50);
            let mode = sim.mode_of(deer).unwrap();
            let following = sim.world().get::<&FollowTarget>(deer).is_ok();
            assert_eq!(mode.is_reactive(), following, "mode {}", mode.label());
        }
        // 1.5 * 4 blocks/s clears the 10 block flee distance well within 5s.
        assert_eq!(sim.mode_of(deer), Some(Mode::Stray));
    }
}
