//! Behavior arbitration.
//!
//! Every re-evaluation trigger runs an ordered chain of guard/action handlers
//! for one actor, highest priority first. A handler that returns
//! [`Outcome::Consumed`] ends the chain. Mode, speed multiplier and
//! [`FollowTarget`] are only ever changed through [`apply_mode`].

use crate::ecs::components::{
    AttackInProximity, AttackOnHit, Behavior, FleeOnHit, FollowTarget, Health, Lurable, Mode,
    ProximityWatch, SpeedProfile,
};
use crate::ecs::alive;
use crate::events::{EventQueue, SimEvent};

/// Handler priority. Higher runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(pub i32);

impl Priority {
    pub const PROXIMITY_AGGRESSION: Priority = Priority(400);
    pub const DAMAGE_PURSUIT: Priority = Priority(300);
    pub const FLEE: Priority = Priority(250);
    pub const LURE: Priority = Priority(200);
    pub const PURSUIT_RESET: Priority = Priority(100);
    pub const STRAY: Priority = Priority(0);
}

/// Whether a handler claimed the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Consumed,
    Continue,
}

/// State a handler may touch besides the world.
pub struct TriggerCtx<'a> {
    pub events: &'a mut EventQueue,
}

/// Does the handler subscribe for this actor (required facets present)?
pub type Guard = fn(&hecs::World, hecs::Entity) -> bool;
/// Condition plus action.
pub type Action = fn(&mut hecs::World, hecs::Entity, &mut TriggerCtx) -> Outcome;

#[derive(Clone, Copy)]
pub struct Handler {
    pub name: &'static str,
    pub priority: Priority,
    pub guard: Guard,
    pub action: Action,
}

/// Priority-ordered handler chain.
pub struct Arbitrator {
    handlers: Vec<Handler>,
}

impl Arbitrator {
    /// Chain with no handlers.
    pub fn empty() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Chain with the built-in wild animal handlers.
    pub fn new() -> Self {
        let mut arbitrator = Self::empty();
        arbitrator.register(Handler {
            name: "proximity-aggression",
            priority: Priority::PROXIMITY_AGGRESSION,
            guard: |world, e| {
                has::<AttackInProximity>(world, e)
                    && has::<ProximityWatch>(world, e)
                    && has::<Behavior>(world, e)
            },
            action: proximity_aggression,
        });
        arbitrator.register(Handler {
            name: "damage-pursuit",
            priority: Priority::DAMAGE_PURSUIT,
            guard: |world, e| has::<AttackOnHit>(world, e) && has::<Behavior>(world, e),
            action: damage_pursuit,
        });
        arbitrator.register(Handler {
            name: "flee",
            priority: Priority::FLEE,
            guard: |world, e| has::<FleeOnHit>(world, e) && has::<Behavior>(world, e),
            action: flee,
        });
        arbitrator.register(Handler {
            name: "lure",
            priority: Priority::LURE,
            guard: |world, e| has::<Lurable>(world, e) && has::<Behavior>(world, e),
            action: lure,
        });
        arbitrator.register(Handler {
            name: "pursuit-reset",
            priority: Priority::PURSUIT_RESET,
            guard: |world, e| has::<AttackOnHit>(world, e) && has::<Behavior>(world, e),
            action: pursuit_reset,
        });
        arbitrator.register(Handler {
            name: "stray-if-idle",
            priority: Priority::STRAY,
            guard: |world, e| has::<Behavior>(world, e) && has::<SpeedProfile>(world, e),
            action: stray_if_idle,
        });
        arbitrator
    }

    /// Add a handler after every handler of equal or higher priority.
    pub fn register(&mut self, handler: Handler) {
        let at = self
            .handlers
            .iter()
            .position(|h| h.priority < handler.priority)
            .unwrap_or(self.handlers.len());
        self.handlers.insert(at, handler);
    }

    pub fn handler_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.iter().map(|h| h.name)
    }

    /// Run the chain for `entity`. Returns the consuming handler's name.
    pub fn reevaluate(
        &self,
        world: &mut hecs::World,
        entity: hecs::Entity,
        ctx: &mut TriggerCtx,
    ) -> Option<&'static str> {
        for handler in &self.handlers {
            if !world.contains(entity) {
                return None;
            }
            if !(handler.guard)(world, entity) {
                continue;
            }
            if (handler.action)(world, entity, ctx) == Outcome::Consumed {
                log::trace!("{:?}: trigger consumed by {}", entity, handler.name);
                return Some(handler.name);
            }
        }
        None
    }
}

impl Default for Arbitrator {
    fn default() -> Self {
        Self::new()
    }
}

fn has<T: hecs::Component>(world: &hecs::World, entity: hecs::Entity) -> bool {
    world.get::<&T>(entity).is_ok()
}

/// Set mode, speed multiplier and follow target together. Returns whether the
/// mode changed.
pub fn apply_mode(
    world: &mut hecs::World,
    entity: hecs::Entity,
    mode: Mode,
    speed_multiplier: f32,
    follow: Option<hecs::Entity>,
    ctx: &mut TriggerCtx,
) -> bool {
    let previous = match world.get::<&mut Behavior>(entity) {
        Ok(mut behavior) => {
            let previous = behavior.mode;
            behavior.mode = mode;
            previous
        }
        Err(_) => return false,
    };

    if let Ok(mut speed) = world.get::<&mut SpeedProfile>(entity) {
        speed.current = speed_multiplier;
    }

    match follow {
        Some(target) => {
            let _ = world.insert_one(entity, FollowTarget(target));
        }
        None => {
            let _ = world.remove_one::<FollowTarget>(entity);
        }
    }

    if previous == mode {
        return false;
    }
    log::info!(
        "{:?}: changed behavior {} -> {}",
        entity,
        previous.label(),
        mode.label()
    );
    ctx.events.push(SimEvent::ModeChanged {
        entity,
        from: previous,
        to: mode,
    });
    true
}

fn default_speed(world: &hecs::World, entity: hecs::Entity) -> f32 {
    world
        .get::<&SpeedProfile>(entity)
        .map(|speed| speed.default)
        .unwrap_or(1.0)
}

/// Attack the first live character in the proximity set. Not necessarily
/// the nearest one.
fn proximity_aggression(
    world: &mut hecs::World,
    entity: hecs::Entity,
    ctx: &mut TriggerCtx,
) -> Outcome {
    let speed_multiplier = match world.get::<&AttackInProximity>(entity) {
        Ok(attack) => attack.speed_multiplier,
        Err(_) => return Outcome::Continue,
    };
    let in_range = match world.get::<&ProximityWatch>(entity) {
        Ok(watch) => watch.in_range.clone(),
        Err(_) => return Outcome::Continue,
    };

    let target = in_range
        .into_iter()
        .find(|&candidate| world.contains(candidate));

    if let Ok(mut attack) = world.get::<&mut AttackInProximity>(entity) {
        attack.nearest_threat = target;
    }

    match target {
        Some(target) => {
            apply_mode(
                world,
                entity,
                Mode::ProximityHostile,
                speed_multiplier,
                Some(target),
                ctx,
            );
            Outcome::Consumed
        }
        None => {
            let _ = world.remove_one::<FollowTarget>(entity);
            Outcome::Continue
        }
    }
}

/// Pursue whoever hit us, unless critically wounded.
fn damage_pursuit(world: &mut hecs::World, entity: hecs::Entity, ctx: &mut TriggerCtx) -> Outcome {
    let (instigator, speed_multiplier) = match world.get::<&AttackOnHit>(entity) {
        Ok(attack) => (attack.instigator, attack.speed_multiplier),
        Err(_) => return Outcome::Continue,
    };
    let Some(instigator) = alive(world, instigator) else {
        return Outcome::Continue;
    };
    let critical = world
        .get::<&Health>(entity)
        .map(|health| health.is_critical())
        .unwrap_or(false);
    if critical {
        log::debug!("{:?}: too wounded to pursue", entity);
        return Outcome::Continue;
    }

    apply_mode(
        world,
        entity,
        Mode::Pursue,
        speed_multiplier,
        Some(instigator),
        ctx,
    );
    Outcome::Consumed
}

fn flee(world: &mut hecs::World, entity: hecs::Entity, ctx: &mut TriggerCtx) -> Outcome {
    let (instigator, speed_multiplier) = match world.get::<&FleeOnHit>(entity) {
        Ok(flee) => (flee.instigator, flee.speed_multiplier),
        Err(_) => return Outcome::Continue,
    };

    if let Some(instigator) = alive(world, instigator) {
        apply_mode(
            world,
            entity,
            Mode::Flee,
            speed_multiplier,
            Some(instigator),
            ctx,
        );
        return Outcome::Consumed;
    }

    // No live threat: lower handlers settle the mode.
    if let Ok(mut flee) = world.get::<&mut FleeOnHit>(entity) {
        flee.instigator = None;
    }
    Outcome::Continue
}

fn lure(world: &mut hecs::World, entity: hecs::Entity, ctx: &mut TriggerCtx) -> Outcome {
    let lured_by = world
        .get::<&Lurable>(entity)
        .ok()
        .and_then(|lurable| lurable.lured_by);
    let Some(character) = alive(world, lured_by) else {
        return Outcome::Continue;
    };
    let speed = default_speed(world, entity);
    apply_mode(world, entity, Mode::Lured, speed, Some(character), ctx);
    Outcome::Consumed
}

/// Nothing higher claimed the trigger, so any pursuit is over.
fn pursuit_reset(world: &mut hecs::World, entity: hecs::Entity, ctx: &mut TriggerCtx) -> Outcome {
    if let Ok(mut attack) = world.get::<&mut AttackOnHit>(entity) {
        attack.instigator = None;
    }
    let speed = default_speed(world, entity);
    apply_mode(world, entity, Mode::Stray, speed, None, ctx);
    Outcome::Continue
}

fn stray_if_idle(world: &mut hecs::World, entity: hecs::Entity, ctx: &mut TriggerCtx) -> Outcome {
    let speed = default_speed(world, entity);
    apply_mode(world, entity, Mode::Stray, speed, None, ctx);
    Outcome::Consumed
}
