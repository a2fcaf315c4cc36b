use glam::{IVec3, UVec3, Vec3};
use instant::Instant;

use wildlife::debug::ring::RingBuffer;
use wildlife::ecs::components::{HeldItem, Position, WildAnimal};
use wildlife::{BlockId, SimEvent, Simulation, VoxelGrid, WildlifeConfig};

/// Simulation tick length in milliseconds.
const TICK_MS: u64 = 50;
/// How many ticks the demo runs (10 simulated minutes).
const DEMO_TICKS: u64 = 12_000;
/// How often to log tick statistics, in ticks.
const STATS_LOG_INTERVAL: u64 = 1_200;
/// Recent tick durations kept for the rolling max.
const TICK_HISTORY_LEN: usize = 256;
/// Chunk edge length in blocks.
const CHUNK_SIZE: u32 = 16;
/// The demo world is CHUNKS_PER_SIDE x CHUNKS_PER_SIDE chunks, one chunk tall.
const CHUNKS_PER_SIDE: i32 = 6;
/// The player swings at the nearest animal this often.
const ATTACK_INTERVAL_MS: u64 = 20_000;
const ATTACK_RANGE: f32 = 12.0;
const ATTACK_DAMAGE: i32 = 8;
/// Radius of the player's walk around the world centre.
const WALK_RADIUS: f32 = 30.0;
/// Seconds per lap of the walk.
const WALK_PERIOD_SECS: f32 = 120.0;

// ---------------------------------------------------------------------------
// Tick timing
// ---------------------------------------------------------------------------

struct TickStats {
    tick_count: u64,
    last_log_time: Instant,
    tick_time_sum: f64,
    tick_time_min: f64,
    tick_time_max: f64,
    ticks_since_log: u32,
    recent: RingBuffer<f64>,
}

impl TickStats {
    fn new() -> Self {
        Self {
            tick_count: 0,
            last_log_time: Instant::now(),
            tick_time_sum: 0.0,
            tick_time_min: f64::MAX,
            tick_time_max: 0.0,
            ticks_since_log: 0,
            recent: RingBuffer::new(TICK_HISTORY_LEN),
        }
    }

    fn record_tick(&mut self, dt: f64, sim: &Simulation) {
        self.tick_count += 1;
        self.ticks_since_log += 1;
        self.tick_time_sum += dt;
        self.tick_time_min = self.tick_time_min.min(dt);
        self.tick_time_max = self.tick_time_max.max(dt);
        self.recent.push(dt);

        if self.tick_count % STATS_LOG_INTERVAL == 0 {
            let elapsed = self.last_log_time.elapsed().as_secs_f64();
            let avg_us = (self.tick_time_sum / self.ticks_since_log as f64) * 1_000_000.0;
            let tps = self.ticks_since_log as f64 / elapsed.max(1e-9);
            log::info!(
                "TPS: {:.0} | avg: {:.1}us | min: {:.1}us | max: {:.1}us | recent max: {:.1}us | animals: {} | sim time: {}s",
                tps,
                avg_us,
                self.tick_time_min * 1_000_000.0,
                self.tick_time_max * 1_000_000.0,
                self.recent.max() * 1_000_000.0,
                sim.animal_count(),
                sim.now_ms() / 1000,
            );
            log::info!("Systems: {}", sim.system_timers().summary());
            self.last_log_time = Instant::now();
            self.tick_time_sum = 0.0;
            self.tick_time_min = f64::MAX;
            self.tick_time_max = 0.0;
            self.ticks_since_log = 0;
        }
    }
}

// ---------------------------------------------------------------------------
// Demo world
// ---------------------------------------------------------------------------

#[derive(Default)]
struct EventTally {
    spawned: u32,
    mode_changes: u32,
    grew: u32,
    destroyed: u32,
}

impl EventTally {
    fn count(&mut self, events: Vec<SimEvent>) {
        for event in events {
            match event {
                SimEvent::Spawned { .. } => self.spawned += 1,
                SimEvent::ModeChanged { .. } => self.mode_changes += 1,
                SimEvent::AnimalGrew { .. } => self.grew += 1,
                SimEvent::Destroyed { drops, .. } => {
                    self.destroyed += 1;
                    log::debug!("Loot dropped: {:?}", drops);
                }
            }
        }
    }
}

/// Rolling grassland: dirt columns with a grass top, a few stone outcrops.
fn build_terrain() -> VoxelGrid {
    let mut grid = VoxelGrid::new();
    let extent = CHUNKS_PER_SIDE * CHUNK_SIZE as i32;
    for x in 0..extent {
        for z in 0..extent {
            let (fx, fz) = (x as f32, z as f32);
            let height = 5.0 + (fx * 0.13).sin() * 2.5 + (fz * 0.09).cos() * 2.0;
            let height = height.round() as i32;
            let top = if (x * 7 + z * 13) % 23 == 0 {
                BlockId::STONE
            } else {
                BlockId::GRASS
            };
            grid.fill_column(x, z, height, top);
            if top == BlockId::GRASS && (x + z * 3) % 11 == 0 {
                grid.set(IVec3::new(x, height + 1, z), BlockId::TALL_GRASS);
            }
        }
    }
    grid
}

fn walk_position(now_ms: u64) -> Vec3 {
    let centre = (CHUNKS_PER_SIDE as f32 * CHUNK_SIZE as f32) * 0.5;
    let angle = (now_ms as f32 / 1000.0) / WALK_PERIOD_SECS * std::f32::consts::TAU;
    Vec3::new(
        centre + angle.cos() * WALK_RADIUS,
        8.0,
        centre + angle.sin() * WALK_RADIUS,
    )
}

fn nearest_animal(sim: &Simulation, from: Vec3, range: f32) -> Option<hecs::Entity> {
    sim.world()
        .query::<(&Position, &WildAnimal)>()
        .iter()
        .map(|(entity, (pos, _))| (entity, pos.0.distance_squared(from)))
        .filter(|&(_, dist_sq)| dist_sq <= range * range)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(entity, _)| entity)
}

/// Entry point: build a world, populate it and run the simulation headless.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading config from {}", path);
            WildlifeConfig::load(path)?
        }
        None => WildlifeConfig::default(),
    };
    let seed = fastrand::u64(..);
    let mut sim = Simulation::new(config, seed)?;

    let terrain = build_terrain();
    let extent = UVec3::splat(CHUNK_SIZE);
    let mut placed = 0;
    for cx in 0..CHUNKS_PER_SIDE {
        for cz in 0..CHUNKS_PER_SIDE {
            placed += sim
                .on_chunk_ready(IVec3::new(cx, 0, cz), extent, &terrain)
                .len();
        }
    }
    log::info!(
        "Terrain ready: {} blocks, {} animals placed",
        terrain.len(),
        placed
    );

    let player = sim.spawn_character(walk_position(0));
    let mut tally = EventTally::default();
    let mut stats = TickStats::new();
    let mut next_attack_ms = ATTACK_INTERVAL_MS;

    for _ in 0..DEMO_TICKS {
        let now_ms = sim.now_ms();
        if let Ok(mut pos) = sim.world_mut().get::<&mut Position>(player) {
            pos.0 = walk_position(now_ms);
        }
        // Carry lavender for the first half of each lap.
        let lap_ms = (WALK_PERIOD_SECS * 1000.0) as u64;
        let luring = now_ms % lap_ms < lap_ms / 2;
        if let Ok(mut held) = sim.world_mut().get::<&mut HeldItem>(player) {
            held.0 = luring.then(|| "CoreAssets:Lavender".to_string());
        }

        if now_ms >= next_attack_ms {
            next_attack_ms += ATTACK_INTERVAL_MS;
            let from = walk_position(now_ms);
            if let Some(target) = nearest_animal(&sim, from, ATTACK_RANGE) {
                log::info!("Player strikes {:?}", target);
                sim.damage(target, Some(player), ATTACK_DAMAGE);
            }
        }

        let start = Instant::now();
        sim.tick(TICK_MS);
        stats.record_tick(start.elapsed().as_secs_f64(), &sim);
        tally.count(sim.drain_events());
    }

    log::info!(
        "Done after {}s: {} spawned, {} mode changes, {} grew, {} destroyed, {} animals left",
        sim.now_ms() / 1000,
        tally.spawned,
        tally.mode_changes,
        tally.grew,
        tally.destroyed,
        sim.animal_count()
    );
    Ok(())
}
