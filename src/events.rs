//! Notifications the simulation produces for the host.

use glam::Vec3;

use crate::ecs::components::Mode;
use crate::prefab::PrefabId;

/// Informational events, drained by the host after each call.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    Spawned {
        entity: hecs::Entity,
        prefab: PrefabId,
        position: Vec3,
    },
    ModeChanged {
        entity: hecs::Entity,
        from: Mode,
        to: Mode,
    },
    /// `previous` has been destroyed and replaced by `next`.
    AnimalGrew {
        previous: hecs::Entity,
        next: hecs::Entity,
        prefab: PrefabId,
    },
    /// Final destroy notification, forwarded to the host's destruction path.
    Destroyed {
        entity: hecs::Entity,
        instigator: Option<hecs::Entity>,
        direct_cause: Option<hecs::Entity>,
        damage_type: Option<String>,
        /// Item ids for an external loot system.
        drops: Vec<String>,
    },
}

/// Destroy notification as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DestroyRequest {
    pub instigator: Option<hecs::Entity>,
    pub direct_cause: Option<hecs::Entity>,
    pub damage_type: Option<String>,
}

/// What happened to a destroy notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyDisposition {
    /// Consumed by the death sequencer; the actor despawns at `fire_at_ms`.
    Deferred { fire_at_ms: u64 },
    /// Not consumed; the default destruction path runs.
    Proceed,
}

/// Ordered outbox of [`SimEvent`]s.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<SimEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, SimEvent> {
        self.events.drain(..)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
