//! # Scenario
//!
//! The immutable declaration a run executes: seed, tick budget, pack,
//! agent population, and the optional metrics / assertion / checkpoint /
//! probe configuration. Built through [`ScenarioBuilder`], which applies
//! defaults and validates.
//!
//! ## Defaults
//! `seed = 1337`, `ticks = 100`, `tick_seconds = 86400`,
//! `sample_every_ticks = 1`, no assertions, shuffle scheduling.

use std::sync::Arc;

use af_api::assertion::AssertionSpec;
use af_api::resolved::{
    AgentShape, CheckpointShape, MetricsShape, ProbeShape, ScenarioShape,
};
use af_types::{ForgeError, ForgeResult, Params, Seed};

use crate::agent::Agent;
use crate::pack::PackFactory;
use crate::probes::ProbeSpec;
use crate::scheduler::ScheduleStrategy;

/// Constructs one agent instance from `(id, params)`.
pub type AgentConstructor = Arc<dyn Fn(&str, Params) -> Box<dyn Agent> + Send + Sync>;

/// One agent configuration: `count` instances of one type.
#[derive(Clone)]
pub struct AgentSpec {
    pub type_tag: String,
    pub count: u32,
    pub params: Params,
    pub constructor: AgentConstructor,
}

impl AgentSpec {
    pub fn new(
        type_tag: impl Into<String>,
        count: u32,
        params: Params,
        constructor: AgentConstructor,
    ) -> Self {
        AgentSpec {
            type_tag: type_tag.into(),
            count,
            params,
            constructor,
        }
    }
}

/// Metrics collection settings.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub sample_every_ticks: u64,
    pub allow_list: Option<Vec<String>>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            sample_every_ticks: 1,
            allow_list: None,
        }
    }
}

/// Checkpoint settings. Tick 0 is never checkpointed.
#[derive(Debug, Clone)]
pub struct CheckpointConfig {
    pub every_ticks: u64,
    pub include_agent_memory: bool,
    pub include_probes: bool,
}

/// An immutable run declaration. Read-only for the duration of a run.
#[derive(Clone)]
pub struct Scenario {
    pub name: String,
    pub seed: Seed,
    pub ticks: u64,
    pub tick_seconds: f64,
    pub pack: Arc<dyn PackFactory>,
    pub agents: Vec<AgentSpec>,
    pub metrics: MetricsConfig,
    pub assertions: Vec<AssertionSpec>,
    pub checkpoints: Option<CheckpointConfig>,
    pub probes: Vec<ProbeSpec>,
    pub probe_every_ticks: u64,
    pub schedule: ScheduleStrategy,
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("seed", &self.seed)
            .field("ticks", &self.ticks)
            .field("tick_seconds", &self.tick_seconds)
            .finish()
    }
}

impl Scenario {
    /// The serializable shape recorded in `config_resolved.json`.
    /// Seed/ticks/tick_seconds reflect the values passed in (the engine
    /// substitutes its resolved overrides).
    pub fn shape(&self, seed: Seed, ticks: u64, tick_seconds: f64) -> ScenarioShape {
        ScenarioShape {
            name: self.name.clone(),
            seed: seed.as_u64(),
            ticks,
            tick_seconds,
            pack: self.pack.label().to_string(),
            agents: self
                .agents
                .iter()
                .map(|a| AgentShape {
                    type_tag: a.type_tag.clone(),
                    count: a.count,
                    params: a.params.clone(),
                })
                .collect(),
            metrics: Some(MetricsShape {
                sample_every_ticks: self.metrics.sample_every_ticks,
                allow_list: self.metrics.allow_list.clone(),
            }),
            assertions: self.assertions.clone(),
            checkpoints: self.checkpoints.as_ref().map(|c| CheckpointShape {
                every_ticks: c.every_ticks,
                include_agent_memory: c.include_agent_memory,
                include_probes: c.include_probes,
            }),
            probes: self
                .probes
                .iter()
                .map(|p| ProbeShape {
                    name: p.name.clone(),
                    kind: p.kind_label().to_string(),
                })
                .collect(),
            probe_every_ticks: if self.probes.is_empty() {
                None
            } else {
                Some(self.probe_every_ticks)
            },
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder with defaults and validation (`define_scenario`).
pub struct ScenarioBuilder {
    name: String,
    seed: Seed,
    ticks: u64,
    tick_seconds: f64,
    pack: Option<Arc<dyn PackFactory>>,
    agents: Vec<AgentSpec>,
    metrics: MetricsConfig,
    assertions: Vec<AssertionSpec>,
    checkpoints: Option<CheckpointConfig>,
    probes: Vec<ProbeSpec>,
    probe_every_ticks: u64,
    schedule: ScheduleStrategy,
}

impl ScenarioBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        ScenarioBuilder {
            name: name.into(),
            seed: Seed::new(1337),
            ticks: 100,
            tick_seconds: 86_400.0,
            pack: None,
            agents: Vec::new(),
            metrics: MetricsConfig::default(),
            assertions: Vec::new(),
            checkpoints: None,
            probes: Vec::new(),
            probe_every_ticks: 1,
            schedule: ScheduleStrategy::default(),
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Seed::new(seed);
        self
    }

    pub fn ticks(mut self, ticks: u64) -> Self {
        self.ticks = ticks;
        self
    }

    pub fn tick_seconds(mut self, tick_seconds: f64) -> Self {
        self.tick_seconds = tick_seconds;
        self
    }

    pub fn pack(mut self, pack: Arc<dyn PackFactory>) -> Self {
        self.pack = Some(pack);
        self
    }

    pub fn agents(
        mut self,
        type_tag: impl Into<String>,
        count: u32,
        params: Params,
        constructor: AgentConstructor,
    ) -> Self {
        self.agents
            .push(AgentSpec::new(type_tag, count, params, constructor));
        self
    }

    pub fn metrics(mut self, config: MetricsConfig) -> Self {
        self.metrics = config;
        self
    }

    pub fn assertion(mut self, spec: AssertionSpec) -> Self {
        self.assertions.push(spec);
        self
    }

    pub fn checkpoints(mut self, config: CheckpointConfig) -> Self {
        self.checkpoints = Some(config);
        self
    }

    pub fn probe(mut self, probe: ProbeSpec) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn probe_every_ticks(mut self, every: u64) -> Self {
        self.probe_every_ticks = every;
        self
    }

    pub fn schedule(mut self, strategy: ScheduleStrategy) -> Self {
        self.schedule = strategy;
        self
    }

    /// Validate and build. Violations are `InvalidScenario`.
    pub fn build(self) -> ForgeResult<Scenario> {
        if self.name.is_empty() {
            return Err(ForgeError::InvalidScenario(
                "scenario name cannot be empty".into(),
            ));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ForgeError::InvalidScenario(format!(
                "scenario name \"{}\" must match [A-Za-z0-9_-]+",
                self.name
            )));
        }
        if self.ticks == 0 {
            return Err(ForgeError::InvalidScenario("ticks must be > 0".into()));
        }
        if !(self.tick_seconds > 0.0) || !self.tick_seconds.is_finite() {
            return Err(ForgeError::InvalidScenario(
                "tick_seconds must be a positive number".into(),
            ));
        }
        let pack = self
            .pack
            .ok_or_else(|| ForgeError::InvalidScenario("scenario requires a pack".into()))?;
        if self.agents.is_empty() {
            return Err(ForgeError::InvalidScenario(
                "scenario requires at least one agent configuration".into(),
            ));
        }
        for spec in &self.agents {
            if spec.count == 0 {
                return Err(ForgeError::InvalidScenario(format!(
                    "agent configuration \"{}\" must have count >= 1",
                    spec.type_tag
                )));
            }
        }
        if self.metrics.sample_every_ticks == 0 {
            return Err(ForgeError::InvalidScenario(
                "metrics.sample_every_ticks must be >= 1".into(),
            ));
        }
        if self.probe_every_ticks == 0 {
            return Err(ForgeError::InvalidScenario(
                "probe_every_ticks must be >= 1".into(),
            ));
        }
        if let Some(cp) = &self.checkpoints {
            if cp.every_ticks == 0 {
                return Err(ForgeError::InvalidScenario(
                    "checkpoints.every_ticks must be >= 1".into(),
                ));
            }
        }

        Ok(Scenario {
            name: self.name,
            seed: self.seed,
            ticks: self.ticks,
            tick_seconds: self.tick_seconds,
            pack,
            agents: self.agents,
            metrics: self.metrics,
            assertions: self.assertions,
            checkpoints: self.checkpoints,
            probes: self.probes,
            probe_every_ticks: self.probe_every_ticks,
            schedule: self.schedule,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_api::{Action, ActionResult, WorldState};
    use af_types::MetricMap;

    use crate::agent::AgentCore;
    use crate::context::TickContext;
    use crate::pack::Pack;

    struct NullPack;

    impl Pack for NullPack {
        fn name(&self) -> &str {
            "null"
        }
        fn initialize(&mut self) -> ForgeResult<()> {
            Ok(())
        }
        fn world_state(&self) -> WorldState {
            WorldState::new()
        }
        fn execute_action(&mut self, _action: &Action, _agent_id: &str) -> ActionResult {
            ActionResult::success()
        }
        fn metrics(&self) -> MetricMap {
            MetricMap::new()
        }
    }

    struct NullPackFactory;

    impl PackFactory for NullPackFactory {
        fn label(&self) -> &str {
            "null"
        }
        fn build(&self) -> Box<dyn Pack> {
            Box::new(NullPack)
        }
    }

    struct NullAgent {
        core: AgentCore,
    }

    impl Agent for NullAgent {
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

    fn null_constructor() -> AgentConstructor {
        Arc::new(|id, params| {
            Box::new(NullAgent {
                core: AgentCore::new(id, "null", params),
            })
        })
    }

    fn valid_builder() -> ScenarioBuilder {
        ScenarioBuilder::new("test-scenario")
            .pack(Arc::new(NullPackFactory))
            .agents("null", 2, Params::new(), null_constructor())
    }

    #[test]
    fn defaults_are_applied() {
        let scenario = valid_builder().build().unwrap();
        assert_eq!(scenario.seed, Seed::new(1337));
        assert_eq!(scenario.ticks, 100);
        assert_eq!(scenario.tick_seconds, 86_400.0);
        assert_eq!(scenario.metrics.sample_every_ticks, 1);
        assert!(scenario.assertions.is_empty());
    }

    #[test]
    fn rejects_empty_name() {
        let err = ScenarioBuilder::new("")
            .pack(Arc::new(NullPackFactory))
            .agents("null", 1, Params::new(), null_constructor())
            .build()
            .unwrap_err();
        assert_eq!(err.kind_code(), "invalid_scenario");
    }

    #[test]
    fn rejects_bad_name_characters() {
        let err = ScenarioBuilder::new("bad name!")
            .pack(Arc::new(NullPackFactory))
            .agents("null", 1, Params::new(), null_constructor())
            .build()
            .unwrap_err();
        assert_eq!(err.kind_code(), "invalid_scenario");
    }

    #[test]
    fn rejects_zero_ticks() {
        let err = valid_builder().ticks(0).build().unwrap_err();
        assert_eq!(err.kind_code(), "invalid_scenario");
    }

    #[test]
    fn rejects_non_positive_tick_seconds() {
        let err = valid_builder().tick_seconds(0.0).build().unwrap_err();
        assert_eq!(err.kind_code(), "invalid_scenario");
    }

    #[test]
    fn rejects_missing_agents() {
        let err = ScenarioBuilder::new("no-agents")
            .pack(Arc::new(NullPackFactory))
            .build()
            .unwrap_err();
        assert_eq!(err.kind_code(), "invalid_scenario");
    }

    #[test]
    fn rejects_zero_count() {
        let err = ScenarioBuilder::new("zero-count")
            .pack(Arc::new(NullPackFactory))
            .agents("null", 0, Params::new(), null_constructor())
            .build()
            .unwrap_err();
        assert_eq!(err.kind_code(), "invalid_scenario");
    }

    #[test]
    fn shape_reflects_resolved_values() {
        let scenario = valid_builder().build().unwrap();
        let shape = scenario.shape(Seed::new(9), 50, 60.0);
        assert_eq!(shape.name, "test-scenario");
        assert_eq!(shape.seed, 9);
        assert_eq!(shape.ticks, 50);
        assert_eq!(shape.pack, "null");
        assert_eq!(shape.agents.len(), 1);
        assert_eq!(shape.agents[0].count, 2);
        assert!(shape.probe_every_ticks.is_none());
    }
}
