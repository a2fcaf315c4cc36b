pub mod arbitrator;
pub mod death;
pub mod growth;
pub mod lure;
pub mod movement;
pub mod placement;
pub mod proximity;
pub mod reaction;
pub mod spatial;

use arbitrator::{Arbitrator, TriggerCtx};

/// Run the arbitrator chain once for each triggered actor, in order.
pub fn fan_out(
    arbitrator: &Arbitrator,
    world: &mut hecs::World,
    triggered: &[hecs::Entity],
    ctx: &mut TriggerCtx,
) {
    for &entity in triggered {
        arbitrator.reevaluate(world, entity, ctx);
    }
}
