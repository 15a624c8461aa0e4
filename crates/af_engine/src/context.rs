//! # Tick context
//!
//! The per-agent, per-tick view handed to `Agent::initialize` and
//! `Agent::step`. Owns the agent-scoped RNG stream and a world snapshot;
//! borrows the pack for read-only queries.

use af_api::WorldState;
use af_types::Tick;

use crate::pack::Pack;
use crate::rng::ForgeRng;

/// Everything an agent may look at while deciding its action for a tick.
pub struct TickContext<'a> {
    /// Current tick
    pub tick: Tick,
    /// Simulated time for this tick
    pub timestamp: f64,
    /// RNG stream scoped to `(tick, agent)`; draws here never perturb any
    /// other agent's stream
    pub rng: ForgeRng,
    /// World snapshot taken after `set_current_agent`
    pub world: WorldState,
    /// Read-only pack handle for live queries
    pub pack: &'a dyn Pack,
}
