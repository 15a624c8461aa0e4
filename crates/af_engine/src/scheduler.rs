//! # Scheduler
//!
//! Chooses the order agents execute in within a tick. The order is a pure
//! function of `(strategy, seed, tick, agent-list-order)`; the scheduler
//! never mutates the caller's list.

use std::sync::Arc;

use af_types::Tick;

use crate::agent::{Agent, AgentCore};
use crate::rng::ForgeRng;

/// Caller-supplied priority function for [`ScheduleStrategy::Priority`].
pub type PriorityFn = Arc<dyn Fn(&AgentCore) -> f64 + Send + Sync>;

/// Intra-tick ordering strategy.
#[derive(Clone, Default)]
pub enum ScheduleStrategy {
    /// Fisher–Yates over a fresh index list using the tick-scoped RNG
    #[default]
    Shuffle,
    /// Cyclic order with a starting position that advances one per tick
    Rotate,
    /// Stable sort by priority, descending; identity order without a function
    Priority(Option<PriorityFn>),
}

impl std::fmt::Debug for ScheduleStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleStrategy::Shuffle => f.write_str("Shuffle"),
            ScheduleStrategy::Rotate => f.write_str("Rotate"),
            ScheduleStrategy::Priority(p) => {
                write!(f, "Priority({})", if p.is_some() { "fn" } else { "identity" })
            }
        }
    }
}

impl ScheduleStrategy {
    /// Label recorded in logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            ScheduleStrategy::Shuffle => "shuffle",
            ScheduleStrategy::Rotate => "rotate",
            ScheduleStrategy::Priority(_) => "priority",
        }
    }
}

/// Produces per-tick execution orders as index lists into the agent list.
#[derive(Debug)]
pub struct Scheduler {
    strategy: ScheduleStrategy,
    rotate_offset: u64,
}

impl Scheduler {
    pub fn new(strategy: ScheduleStrategy) -> Self {
        Scheduler {
            strategy,
            rotate_offset: 0,
        }
    }

    /// Reset internal state between runs.
    pub fn reset(&mut self) {
        self.rotate_offset = 0;
    }

    /// The execution order for this tick, as indices into `agents`.
    pub fn order(
        &mut self,
        agents: &[Box<dyn Agent>],
        tick: Tick,
        rng: &mut ForgeRng,
    ) -> Vec<usize> {
        let _ = tick;
        let n = agents.len();
        if n == 0 {
            return Vec::new();
        }

        match &self.strategy {
            ScheduleStrategy::Shuffle => {
                let mut order: Vec<usize> = (0..n).collect();
                rng.shuffle(&mut order);
                order
            }
            ScheduleStrategy::Rotate => {
                let start = (self.rotate_offset % n as u64) as usize;
                self.rotate_offset += 1;
                (0..n).map(|i| (start + i) % n).collect()
            }
            ScheduleStrategy::Priority(priority_fn) => {
                let mut order: Vec<usize> = (0..n).collect();
                if let Some(f) = priority_fn {
                    let priorities: Vec<f64> = agents.iter().map(|a| f(a.core())).collect();
                    // Stable sort keeps list order among equal priorities.
                    order.sort_by(|a, b| priorities[*b].total_cmp(&priorities[*a]));
                }
                order
            }
        }
    }
}
