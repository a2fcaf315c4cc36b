//! Wild animal actors for a voxel world: where they spawn, how they react to
//! proximity, damage, idleness and aging, and how they die.

pub mod config;
pub mod debug;
pub mod ecs;
pub mod error;
pub mod events;
pub mod prefab;
pub mod sim;
pub mod spatial;
pub mod terrain;
pub mod timers;

pub use config::{SpawnConfig, WildlifeConfig};
pub use ecs::components::Mode;
pub use error::{ConfigError, SpawnError};
pub use events::{DestroyDisposition, DestroyRequest, SimEvent};
pub use prefab::{ActorSpawner, Prefab, PrefabId, PrefabLibrary};
pub use sim::Simulation;
pub use terrain::{BlockId, BlockLookup, FootholdPredicate, GroundFoothold, VoxelGrid};
