//! # Pack contract
//!
//! The pluggable simulated world. The engine consumes this interface and
//! never implements it; packs live outside the kernel.
//!
//! ## Determinism obligations
//! A pack must be a pure function of its initial configuration and the
//! sequence of `on_tick` / `set_current_agent` / `execute_action` calls.
//! Any randomness inside a pack must come from the run seed; ambient random
//! sources violate the contract.

use af_api::{Action, ActionResult, WorldState};
use af_types::{ForgeResult, MetricMap, Tick};

/// The simulated world boundary.
pub trait Pack {
    /// Short label identifying the pack (used in resolved config).
    fn name(&self) -> &str;

    /// Prepare or reset all world state. Called once per run before tick 0.
    fn initialize(&mut self) -> ForgeResult<()>;

    /// Advance world time; may update endogenous state. Called before any
    /// agent acts in a tick.
    fn on_tick(&mut self, tick: Tick, timestamp: f64) {
        let _ = (tick, timestamp);
    }

    /// Inform the pack whose viewpoint follows, so `world_state` may return
    /// per-agent views.
    fn set_current_agent(&mut self, agent_id: &str) {
        let _ = agent_id;
    }

    /// Read-only snapshot of the world.
    fn world_state(&self) -> WorldState;

    /// Mutate the world to reflect `action`. The pack validates
    /// preconditions and reports business failures as `ok: false`.
    fn execute_action(&mut self, action: &Action, agent_id: &str) -> ActionResult;

    /// The current tick's metrics snapshot.
    fn metrics(&self) -> MetricMap;

    /// Release resources. Idempotent.
    fn cleanup(&mut self) {}
}

/// Builds a fresh pack per run, so sweeps and matrices never share world
/// state between runs.
pub trait PackFactory: Send + Sync {
    /// Label recorded in the resolved configuration.
    fn label(&self) -> &str;

    /// Construct a fresh, uninitialized pack instance.
    fn build(&self) -> Box<dyn Pack>;
}

impl std::fmt::Debug for dyn PackFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackFactory").field("label", &self.label()).finish()
    }
}
