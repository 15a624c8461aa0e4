//! # Agent contract
//!
//! An agent is an autonomous decision-maker: once per tick it may propose
//! one action or skip. Behavior shared by all agents (memory, cooldowns,
//! parameter access, action ids, statistics) lives in [`AgentCore`], an
//! embedded struct agents own and call through; the engine's polymorphism
//! surface stays minimal.
//!
//! ## Rules
//! - `attempted = succeeded + failed` at all times; skips touch nothing
//! - Action ids are `<agent_id>-<name>-<tick>-<k>` with `k` a per-agent,
//!   per-run monotone counter starting at zero (documented determinism
//!   contract; never wall clock)

use std::collections::BTreeMap;

use af_api::record::AgentStateSnapshot;
use af_api::{Action, AgentStats, AgentStatsEntry};
use af_types::{ForgeResult, ParamValue, Params, Tick};

use crate::context::TickContext;

// ============================================================================
// Agent trait
// ============================================================================

/// An autonomous participant in the simulation.
pub trait Agent {
    /// Shared base state (id, params, memory, cooldowns, stats).
    fn core(&self) -> &AgentCore;

    /// Mutable access to the shared base state.
    fn core_mut(&mut self) -> &mut AgentCore;

    /// One-time setup at tick 0. Default: no-op.
    fn initialize(&mut self, ctx: &mut TickContext<'_>) -> ForgeResult<()> {
        let _ = ctx;
        Ok(())
    }

    /// The decision function. `None` skips the tick.
    fn step(&mut self, ctx: &mut TickContext<'_>) -> ForgeResult<Option<Action>>;

    /// Release resources at the end of the run. Default: no-op.
    fn cleanup(&mut self) {}
}

// ============================================================================
// AgentCore
// ============================================================================

/// Shared base behavior every agent embeds.
#[derive(Debug, Clone)]
pub struct AgentCore {
    id: String,
    type_tag: String,
    params: Params,
    memory: BTreeMap<String, ParamValue>,
    /// action name → first tick at which it is available again
    cooldowns: BTreeMap<String, Tick>,
    stats: AgentStats,
    last_tick_executed: Option<Tick>,
    action_counter: u64,
}

impl AgentCore {
    /// Agents are constructed with `(id, params)`; the engine assigns ids
    /// of the form `<type_tag>-<global_index>`.
    pub fn new(id: impl Into<String>, type_tag: impl Into<String>, params: Params) -> Self {
        AgentCore {
            id: id.into(),
            type_tag: type_tag.into(),
            params,
            memory: BTreeMap::new(),
            cooldowns: BTreeMap::new(),
            stats: AgentStats::default(),
            last_tick_executed: None,
            action_counter: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    #[inline]
    pub fn stats(&self) -> AgentStats {
        self.stats
    }

    #[inline]
    pub fn last_tick_executed(&self) -> Option<Tick> {
        self.last_tick_executed
    }

    // ------------------------------------------------------------------
    // Memory
    // ------------------------------------------------------------------

    pub fn remember(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let _ = self.memory.insert(key.into(), value.into());
    }

    pub fn recall(&self, key: &str) -> Option<&ParamValue> {
        self.memory.get(key)
    }

    /// Recall with a fallback, cloning the stored value.
    pub fn recall_or(&self, key: &str, default: ParamValue) -> ParamValue {
        self.memory.get(key).cloned().unwrap_or(default)
    }

    pub fn has_memory(&self, key: &str) -> bool {
        self.memory.contains_key(key)
    }

    pub fn forget(&mut self, key: &str) -> Option<ParamValue> {
        self.memory.remove(key)
    }

    pub fn clear_memory(&mut self) {
        self.memory.clear();
    }

    // ------------------------------------------------------------------
    // Cooldowns
    // ------------------------------------------------------------------

    pub fn set_cooldown(&mut self, action: impl Into<String>, ticks_from_now: u64, current: Tick) {
        let available = Tick(current.as_u64().saturating_add(ticks_from_now));
        let _ = self.cooldowns.insert(action.into(), available);
    }

    pub fn is_on_cooldown(&self, action: &str, current: Tick) -> bool {
        self.cooldowns
            .get(action)
            .is_some_and(|available| current < *available)
    }

    /// Ticks left until `action` is available again (0 when ready).
    pub fn cooldown_remaining(&self, action: &str, current: Tick) -> u64 {
        self.cooldowns
            .get(action)
            .map(|available| available.as_u64().saturating_sub(current.as_u64()))
            .unwrap_or(0)
    }

    pub fn clear_cooldown(&mut self, action: &str) {
        let _ = self.cooldowns.remove(action);
    }

    pub fn clear_all_cooldowns(&mut self) {
        self.cooldowns.clear();
    }

    /// Filter `candidates` down to actions not on cooldown, preserving order.
    pub fn available_actions<'a>(&self, candidates: &'a [&'a str], current: Tick) -> Vec<&'a str> {
        candidates
            .iter()
            .copied()
            .filter(|name| !self.is_on_cooldown(name, current))
            .collect()
    }

    // ------------------------------------------------------------------
    // Parameters
    // ------------------------------------------------------------------

    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn param_f64(&self, key: &str, default: f64) -> f64 {
        self.params
            .get(key)
            .and_then(ParamValue::as_f64)
            .unwrap_or(default)
    }

    pub fn param_i64(&self, key: &str, default: i64) -> i64 {
        self.params
            .get(key)
            .and_then(ParamValue::as_i64)
            .unwrap_or(default)
    }

    pub fn param_bool(&self, key: &str, default: bool) -> bool {
        self.params
            .get(key)
            .and_then(ParamValue::as_bool)
            .unwrap_or(default)
    }

    pub fn param_str(&self, key: &str, default: &str) -> String {
        self.params
            .get(key)
            .and_then(ParamValue::as_str)
            .unwrap_or(default)
            .to_string()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    // ------------------------------------------------------------------
    // Action ids & statistics
    // ------------------------------------------------------------------

    /// `<agent_id>-<name>-<tick>-<k>`; `k` is monotone per agent per run.
    pub fn generate_action_id(&mut self, name: &str, tick: Tick) -> String {
        let k = self.action_counter;
        self.action_counter += 1;
        format!("{}-{}-{}-{}", self.id, name, tick.as_u64(), k)
    }

    pub fn record_success(&mut self) {
        self.stats.record_success();
    }

    pub fn record_failure(&mut self) {
        self.stats.record_failure();
    }

    pub fn record_skip(&mut self) {
        self.stats.record_skip();
    }

    /// Engine bookkeeping: the agent's step ran for `tick`.
    pub fn mark_executed(&mut self, tick: Tick) {
        self.last_tick_executed = Some(tick);
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    pub fn stats_entry(&self) -> AgentStatsEntry {
        AgentStatsEntry {
            agent_id: self.id.clone(),
            agent_type: self.type_tag.clone(),
            attempted: self.stats.attempted,
            succeeded: self.stats.succeeded,
            failed: self.stats.failed,
        }
    }

    /// Checkpoint view: full memory plus cooldowns still pending at `current`.
    pub fn state_snapshot(&self, current: Tick) -> AgentStateSnapshot {
        let active_cooldowns = self
            .cooldowns
            .iter()
            .filter(|(_, available)| current < **available)
            .map(|(name, available)| (name.clone(), available.as_u64()))
            .collect();
        AgentStateSnapshot {
            memory: self.memory.clone(),
            active_cooldowns,
        }
    }
}
