//! # Mocks
//!
//! Fake worlds and scripted agents for testing:
//! - `CounterPack`: counts executed actions, exposes simple metrics, and
//!   records execution order into a shared log
//! - `FailingInitPackFactory`: a pack whose initialization always fails
//! - Scripted agents: always act, always skip, always error

use std::sync::{Arc, Mutex};

use af_api::{Action, ActionResult, WorldState, WORLD_TIMESTAMP_KEY};
use af_engine::{Agent, AgentConstructor, AgentCore, Pack, PackFactory, TickContext};
use af_types::{ForgeError, ForgeResult, MetricMap, MetricValue, Params, Tick};

/// Shared record of `(tick, agent_id)` execution order, observable from
/// outside a run.
pub type ExecutionLog = Arc<Mutex<Vec<(u64, String)>>>;

// ============================================================================
// CounterPack
// ============================================================================

/// A minimal deterministic world: executes anything, counts what happened.
/// Actions named `reject` come back as business failures.
pub struct CounterPack {
    tick: Tick,
    timestamp: f64,
    executed: u64,
    rejected: u64,
    log: ExecutionLog,
}

impl Pack for CounterPack {
    fn name(&self) -> &str {
        "counter"
    }

    fn initialize(&mut self) -> ForgeResult<()> {
        self.tick = Tick::ZERO;
        self.executed = 0;
        self.rejected = 0;
        Ok(())
    }

    fn on_tick(&mut self, tick: Tick, timestamp: f64) {
        self.tick = tick;
        self.timestamp = timestamp;
    }

    fn world_state(&self) -> WorldState {
        let mut world = WorldState::new();
        let _ = world.insert(
            WORLD_TIMESTAMP_KEY.into(),
            MetricValue::Number(self.timestamp),
        );
        let _ = world.insert(
            "counter.executed".into(),
            MetricValue::Number(self.executed as f64),
        );
        world
    }

    fn execute_action(&mut self, action: &Action, agent_id: &str) -> ActionResult {
        self.log
            .lock()
            .expect("execution log poisoned")
            .push((self.tick.as_u64(), agent_id.to_string()));

        if action.name == "reject" {
            self.rejected += 1;
            return ActionResult::failure("rejected by pack");
        }

        self.executed += 1;
        ActionResult::success().with_gas(21_000)
    }

    fn metrics(&self) -> MetricMap {
        let mut m = MetricMap::new();
        let _ = m.insert(
            "executed".into(),
            MetricValue::Number(self.executed as f64),
        );
        let _ = m.insert(
            "rejected".into(),
            MetricValue::Number(self.rejected as f64),
        );
        let _ = m.insert("tick".into(), MetricValue::Number(self.tick.as_u64() as f64));
        m
    }
}

/// Factory for [`CounterPack`], sharing one execution log across builds.
pub struct CounterPackFactory {
    log: ExecutionLog,
}

impl CounterPackFactory {
    pub fn new() -> Self {
        CounterPackFactory {
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The `(tick, agent_id)` pairs in execution order.
    pub fn log(&self) -> ExecutionLog {
        self.log.clone()
    }
}

impl Default for CounterPackFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl PackFactory for CounterPackFactory {
    fn label(&self) -> &str {
        "counter"
    }

    fn build(&self) -> Box<dyn Pack> {
        Box::new(CounterPack {
            tick: Tick::ZERO,
            timestamp: 0.0,
            executed: 0,
            rejected: 0,
            log: self.log.clone(),
        })
    }
}

// ============================================================================
// FailingInitPack
// ============================================================================

struct FailingInitPack;

impl Pack for FailingInitPack {
    fn name(&self) -> &str {
        "failing-init"
    }

    fn initialize(&mut self) -> ForgeResult<()> {
        Err(ForgeError::PackInit("initialization always fails".into()))
    }

    fn world_state(&self) -> WorldState {
        WorldState::new()
    }

    fn execute_action(&mut self, _action: &Action, _agent_id: &str) -> ActionResult {
        ActionResult::failure("uninitialized")
    }

    fn metrics(&self) -> MetricMap {
        MetricMap::new()
    }
}

/// Factory whose packs refuse to initialize.
pub struct FailingInitPackFactory;

impl PackFactory for FailingInitPackFactory {
    fn label(&self) -> &str {
        "failing-init"
    }

    fn build(&self) -> Box<dyn Pack> {
        Box::new(FailingInitPack)
    }
}

// ============================================================================
// Scripted agents
// ============================================================================

/// Acts every tick with a `ping` action.
struct EagerAgent {
    core: AgentCore,
}

impl Agent for EagerAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    fn step(&mut self, ctx: &mut TickContext<'_>) -> ForgeResult<Option<Action>> {
        let id = self.core.generate_action_id("ping", ctx.tick);
        Ok(Some(Action::new(id, "ping", Params::new())))
    }
}

/// Constructor for an agent that always acts.
pub fn eager_constructor() -> AgentConstructor {
    Arc::new(|id, params| {
        Box::new(EagerAgent {
            core: AgentCore::new(id, "eager", params),
        })
    })
}

/// Skips every tick.
struct SkippingAgent {
    core: AgentCore,
}

impl Agent for SkippingAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    fn step(&mut self, _ctx: &mut TickContext<'_>) -> ForgeResult<Option<Action>> {
        Ok(None)
    }
}

/// Constructor for an agent that never acts.
pub fn skipping_constructor() -> AgentConstructor {
    Arc::new(|id, params| {
        Box::new(SkippingAgent {
            core: AgentCore::new(id, "skipper", params),
        })
    })
}

/// Fails every step at the step boundary.
struct ErroringAgent {
    core: AgentCore,
}

impl Agent for ErroringAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    fn step(&mut self, _ctx: &mut TickContext<'_>) -> ForgeResult<Option<Action>> {
        Err(ForgeError::Agent("scripted failure".into()))
    }
}

/// Constructor for an agent whose step always fails.
pub fn erroring_constructor() -> AgentConstructor {
    Arc::new(|id, params| {
        Box::new(ErroringAgent {
            core: AgentCore::new(id, "erroring", params),
        })
    })
}
