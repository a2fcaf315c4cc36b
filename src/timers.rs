//! One-shot delayed actions keyed by actor.

use std::collections::HashMap;

/// Identifies what a delayed action is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKey {
    Growth,
}

impl TimerKey {
    pub fn id(self) -> &'static str {
        match self {
            TimerKey::Growth => "WildAnimals:Growth",
        }
    }
}

/// Pending one-shot timers, polled once per tick against the sim clock.
#[derive(Debug, Default)]
pub struct DelayedActions {
    pending: HashMap<(hecs::Entity, TimerKey), u64>,
}

impl DelayedActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `key` for `entity` at `now_ms + delay_ms`. Replaces an existing
    /// timer with the same key.
    pub fn schedule_once(&mut self, entity: hecs::Entity, key: TimerKey, now_ms: u64, delay_ms: u64) {
        self.pending
            .insert((entity, key), now_ms.saturating_add(delay_ms));
    }

    pub fn fire_at(&self, entity: hecs::Entity, key: TimerKey) -> Option<u64> {
        self.pending.get(&(entity, key)).copied()
    }

    pub fn cancel_all(&mut self, entity: hecs::Entity) {
        self.pending.retain(|(owner, _), _| *owner != entity);
    }

    /// Remove and return every timer due at `now_ms`, ordered by deadline,
    /// then entity, then key.
    pub fn poll(&mut self, now_ms: u64) -> Vec<(hecs::Entity, TimerKey)> {
        let mut due: Vec<(u64, hecs::Entity, TimerKey)> = self
            .pending
            .iter()
            .filter(|&(_, &fire_at)| fire_at <= now_ms)
            .map(|(&(entity, key), &fire_at)| (fire_at, entity, key))
            .collect();
        due.sort_by_key(|&(fire_at, entity, key)| (fire_at, entity.to_bits(), key));

        for &(_, entity, key) in &due {
            self.pending.remove(&(entity, key));
        }
        due.into_iter().map(|(_, entity, key)| (entity, key)).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
